use std::fmt;
use std::str::FromStr;

use image::{Rgba, RgbaImage};
use papercraft_catalog::ContentKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::{ColorMode, PrintSettings};

/// Accent used for header/footer text when no custom palette is active.
pub const DEFAULT_ACCENT: HexColor = HexColor::rgb(0x0E, 0xA5, 0xE9);
pub const DEFAULT_SECONDARY: HexColor = HexColor::rgb(0x10, 0xB9, 0x81);
pub const WHITE: HexColor = HexColor::rgb(0xFF, 0xFF, 0xFF);

/// Contrast factor applied in black/white mode (`contrast(200%)`).
pub const BLACK_WHITE_CONTRAST: f32 = 2.0;
/// Hue shift applied to raster styles once the primary colour is changed.
pub const CUSTOM_HUE_SHIFT_DEG: f32 = 30.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hex colour '{0}'")]
pub struct ColorParseError(pub String);

/// Opaque RGB colour written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Accepts `#RRGGBB`, `RRGGBB` and the `#RGB` shorthand.
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let trimmed = input.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let err = || ColorParseError(input.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        match hex.len() {
            6 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
                Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
            }
            3 => {
                let channel = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| err())
                };
                Ok(Self::rgb(channel(0)?, channel(1)?, channel(2)?))
            }
            _ => Err(err()),
        }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for HexColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HexColor {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

/// Visual filter applied to the content area of a preview.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ColorFilter {
    None,
    Grayscale,
    /// Desaturation followed by a contrast boost. Approximates a bilevel
    /// threshold; pixels are not quantised to 1 bit.
    BlackWhite { contrast: f32 },
    HueRotate { degrees: f32 },
}

impl ColorFilter {
    /// CSS `filter` equivalent, as used by the browser preview.
    pub fn css(&self) -> String {
        match self {
            ColorFilter::None => "none".to_string(),
            ColorFilter::Grayscale => "grayscale(100%)".to_string(),
            ColorFilter::BlackWhite { contrast } => {
                format!("grayscale(100%) contrast({}%)", (contrast * 100.0).round())
            }
            ColorFilter::HueRotate { degrees } => format!("hue-rotate({}deg)", degrees.round()),
        }
    }

    pub fn is_identity(&self) -> bool {
        match self {
            ColorFilter::None => true,
            ColorFilter::HueRotate { degrees } => degrees.rem_euclid(360.0) == 0.0,
            _ => false,
        }
    }

    pub fn apply_to_pixel(&self, pixel: Rgba<u8>) -> Rgba<u8> {
        let Rgba([r, g, b, a]) = pixel;
        match *self {
            ColorFilter::None => pixel,
            ColorFilter::Grayscale => {
                let l = luma(r, g, b);
                Rgba([l, l, l, a])
            }
            ColorFilter::BlackWhite { contrast } => {
                let l = apply_contrast(luma(r, g, b), contrast);
                Rgba([l, l, l, a])
            }
            ColorFilter::HueRotate { degrees } => {
                let [r, g, b] = hue_rotate([r, g, b], degrees);
                Rgba([r, g, b, a])
            }
        }
    }

    pub fn apply_to_image(&self, image: &mut RgbaImage) {
        if self.is_identity() {
            return;
        }
        for pixel in image.pixels_mut() {
            *pixel = self.apply_to_pixel(*pixel);
        }
    }
}

// Rec. 709 weights, which is what `grayscale(100%)` uses.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let value = 0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32;
    value.round().clamp(0.0, 255.0) as u8
}

fn apply_contrast(value: u8, factor: f32) -> u8 {
    ((value as f32 - 127.5) * factor + 127.5)
        .round()
        .clamp(0.0, 255.0) as u8
}

fn hue_rotate(rgb: [u8; 3], degrees: f32) -> [u8; 3] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let matrix = [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ];
    let input = rgb.map(f32::from);
    let mut out = [0u8; 3];
    for (channel, row) in out.iter_mut().zip(matrix.iter()) {
        let value = row[0] * input[0] + row[1] * input[1] + row[2] * input[2];
        *channel = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Primary/secondary colours handed to the pattern painter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternColors {
    pub primary: HexColor,
    pub secondary: HexColor,
}

/// Filter for the content area given the colour mode and content kind.
///
/// Custom colours recolour vector patterns directly (see [`pattern_colors`])
/// and only hue-shift raster images.
pub fn filter_for(settings: &PrintSettings, kind: ContentKind) -> ColorFilter {
    match settings.color_mode() {
        ColorMode::Color => ColorFilter::None,
        ColorMode::Grayscale => ColorFilter::Grayscale,
        ColorMode::BlackWhite => ColorFilter::BlackWhite {
            contrast: BLACK_WHITE_CONTRAST,
        },
        ColorMode::Custom => match kind {
            ContentKind::Vector => ColorFilter::None,
            ContentKind::Raster => {
                let degrees = if settings.custom_colors().primary == DEFAULT_ACCENT {
                    0.0
                } else {
                    CUSTOM_HUE_SHIFT_DEG
                };
                ColorFilter::HueRotate { degrees }
            }
        },
    }
}

pub fn pattern_colors(settings: &PrintSettings) -> Option<PatternColors> {
    let custom = settings.custom_colors();
    custom.enabled.then_some(PatternColors {
        primary: custom.primary,
        secondary: custom.secondary,
    })
}

pub fn page_background(settings: &PrintSettings) -> HexColor {
    let custom = settings.custom_colors();
    if custom.enabled {
        custom.background
    } else {
        WHITE
    }
}

pub fn band_text_color(settings: &PrintSettings) -> HexColor {
    let custom = settings.custom_colors();
    if custom.enabled {
        custom.primary
    } else {
        DEFAULT_ACCENT
    }
}
