use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::Orientation;

/// Errors raised while constructing or parsing a paper size.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaperError {
    #[error(
        "paper dimensions must be between {min}mm and {max}mm, got {width_mm}x{height_mm}mm",
        min = PaperSize::CUSTOM_MIN_MM,
        max = PaperSize::CUSTOM_MAX_MM
    )]
    InvalidDimensions { width_mm: f32, height_mm: f32 },
    #[error("unknown paper size '{0}'")]
    Unknown(String),
}

/// Physical page sizes offered by the preview panel.
///
/// Dimensions are in millimetres, portrait reference. `Custom` can only be
/// built through [`PaperSize::custom`], which only accepts sides within
/// [`PaperSize::CUSTOM_MIN_MM`]..=[`PaperSize::CUSTOM_MAX_MM`], so every value
/// of this type has a finite, strictly positive width, height and aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PaperSizeRepr", into = "PaperSizeRepr")]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: f32, height_mm: f32 },
}

impl Default for PaperSize {
    fn default() -> Self {
        PaperSize::A4
    }
}

impl PaperSize {
    /// Width used for a `"Custom"` identifier without explicit dimensions.
    pub const CUSTOM_DEFAULT: (f32, f32) = (210.0, 297.0);

    /// 自訂紙張邊長範圍（公釐）。 / Accepted side length range for custom paper.
    pub const CUSTOM_MIN_MM: f32 = 1.0;
    pub const CUSTOM_MAX_MM: f32 = 1000.0;

    pub fn custom(width_mm: f32, height_mm: f32) -> Result<Self, PaperError> {
        let valid = |v: f32| (Self::CUSTOM_MIN_MM..=Self::CUSTOM_MAX_MM).contains(&v);
        if !valid(width_mm) || !valid(height_mm) {
            return Err(PaperError::InvalidDimensions {
                width_mm,
                height_mm,
            });
        }
        Ok(PaperSize::Custom {
            width_mm,
            height_mm,
        })
    }

    /// Named sizes, in the order the settings panel lists them.
    pub const fn standard() -> [PaperSize; 5] {
        [
            PaperSize::A4,
            PaperSize::A3,
            PaperSize::A5,
            PaperSize::Letter,
            PaperSize::Legal,
        ]
    }

    pub const fn id(&self) -> &'static str {
        match self {
            PaperSize::A4 => "A4",
            PaperSize::A3 => "A3",
            PaperSize::A5 => "A5",
            PaperSize::Letter => "Letter",
            PaperSize::Legal => "Legal",
            PaperSize::Custom { .. } => "Custom",
        }
    }

    /// Portrait width and height in millimetres.
    pub const fn portrait_mm(&self) -> (f32, f32) {
        match *self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (216.0, 279.0),
            PaperSize::Legal => (216.0, 356.0),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Width and height under the given orientation.
    pub const fn dimensions_mm(&self, orientation: Orientation) -> (f32, f32) {
        let (width, height) = self.portrait_mm();
        match orientation {
            Orientation::Portrait => (width, height),
            Orientation::Landscape => (height, width),
        }
    }

    pub fn aspect_ratio(&self, orientation: Orientation) -> f32 {
        let (width, height) = self.dimensions_mm(orientation);
        width / height
    }

    /// Human readable label, e.g. `A4 (210×297mm)`.
    pub fn label(&self) -> String {
        let (width, height) = self.portrait_mm();
        format!("{} ({}×{}mm)", self.id(), width, height)
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PaperSize {
    type Err = PaperError;

    /// Accepts the identifiers (case-insensitive) and `WxH` in millimetres
    /// for custom sizes, e.g. `100x150`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "a4" => return Ok(PaperSize::A4),
            "a3" => return Ok(PaperSize::A3),
            "a5" => return Ok(PaperSize::A5),
            "letter" => return Ok(PaperSize::Letter),
            "legal" => return Ok(PaperSize::Legal),
            "custom" => {
                let (width, height) = PaperSize::CUSTOM_DEFAULT;
                return PaperSize::custom(width, height);
            }
            _ => {}
        }
        let Some((w, h)) = trimmed.split_once(['x', 'X', '×']) else {
            return Err(PaperError::Unknown(trimmed.to_string()));
        };
        match (w.trim().parse::<f32>(), h.trim().parse::<f32>()) {
            (Ok(width), Ok(height)) => PaperSize::custom(width, height),
            _ => Err(PaperError::Unknown(trimmed.to_string())),
        }
    }
}

/// Wire form: the identifier plus dimensions for custom sizes.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PaperSizeRepr {
    Named(String),
    Custom {
        #[serde(rename = "widthMm")]
        width_mm: f32,
        #[serde(rename = "heightMm")]
        height_mm: f32,
    },
}

impl From<PaperSize> for PaperSizeRepr {
    fn from(paper: PaperSize) -> Self {
        match paper {
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => PaperSizeRepr::Custom {
                width_mm,
                height_mm,
            },
            named => PaperSizeRepr::Named(named.id().to_string()),
        }
    }
}

impl TryFrom<PaperSizeRepr> for PaperSize {
    type Error = PaperError;

    fn try_from(repr: PaperSizeRepr) -> Result<Self, Self::Error> {
        match repr {
            PaperSizeRepr::Named(name) => name.parse(),
            PaperSizeRepr::Custom {
                width_mm,
                height_mm,
            } => PaperSize::custom(width_mm, height_mm),
        }
    }
}
