use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::{HexColor, DEFAULT_ACCENT, DEFAULT_SECONDARY, WHITE};

/// Upper bound for a single margin, in millimetres.
pub const MARGIN_MAX_MM: f32 = 50.0;
/// Margin applied by the `standard` preset and by default.
pub const STANDARD_MARGIN_MM: f32 = 20.0;
/// Largest copy count the settings panel offers. Not enforced.
pub const COPIES_HINT_MAX: u32 = 99;
pub const DEFAULT_BAND_FONT_PT: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintQuality {
    Draft,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Color,
    Grayscale,
    BlackWhite,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Portrait => Orientation::Landscape,
            Orientation::Landscape => Orientation::Portrait,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

macro_rules! impl_keyword_enum {
    ($ty:ty, $what:literal, { $($variant:path => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!("unknown {} '{}'", $what, other)),
                }
            }
        }
    };
}

impl_keyword_enum!(PrintQuality, "print quality", {
    PrintQuality::Draft => "draft",
    PrintQuality::Normal => "normal",
    PrintQuality::High => "high",
});

impl_keyword_enum!(ColorMode, "colour mode", {
    ColorMode::Color => "color",
    ColorMode::Grayscale => "grayscale",
    ColorMode::BlackWhite => "blackwhite",
    ColorMode::Custom => "custom",
});

impl_keyword_enum!(Orientation, "orientation", {
    Orientation::Portrait => "portrait",
    Orientation::Landscape => "landscape",
});

impl_keyword_enum!(Alignment, "alignment", {
    Alignment::Left => "left",
    Alignment::Center => "center",
    Alignment::Right => "right",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarginSide {
    Top,
    Right,
    Bottom,
    Left,
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self::uniform(STANDARD_MARGIN_MM)
    }
}

impl PageMargins {
    pub const fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub const fn zero() -> Self {
        Self::uniform(0.0)
    }

    pub fn get(&self, side: MarginSide) -> f32 {
        match side {
            MarginSide::Top => self.top,
            MarginSide::Right => self.right,
            MarginSide::Bottom => self.bottom,
            MarginSide::Left => self.left,
        }
    }

    fn slot(&mut self, side: MarginSide) -> &mut f32 {
        match side {
            MarginSide::Top => &mut self.top,
            MarginSide::Right => &mut self.right,
            MarginSide::Bottom => &mut self.bottom,
            MarginSide::Left => &mut self.left,
        }
    }

    /// Every side clamped to `[0, MARGIN_MAX_MM]`; NaN becomes 0.
    pub fn clamped(self) -> Self {
        Self {
            top: clamp_margin(self.top),
            right: clamp_margin(self.right),
            bottom: clamp_margin(self.bottom),
            left: clamp_margin(self.left),
        }
    }
}

fn clamp_margin(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, MARGIN_MAX_MM)
    } else if value == f32::INFINITY {
        MARGIN_MAX_MM
    } else {
        0.0
    }
}

/// Named margin presets offered next to the margin inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginPreset {
    None,
    Standard,
}

impl MarginPreset {
    pub fn margins(self) -> PageMargins {
        match self {
            MarginPreset::None => PageMargins::zero(),
            MarginPreset::Standard => PageMargins::uniform(STANDARD_MARGIN_MM),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(MarginPreset::None),
            "standard" => Some(MarginPreset::Standard),
            _ => None,
        }
    }
}

/// One header or footer band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderFooterBand {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size_pt: f32,
    #[serde(default)]
    pub alignment: Alignment,
}

fn default_font_size() -> f32 {
    DEFAULT_BAND_FONT_PT
}

impl Default for HeaderFooterBand {
    fn default() -> Self {
        Self {
            enabled: false,
            text: String::new(),
            font_size_pt: DEFAULT_BAND_FONT_PT,
            alignment: Alignment::Center,
        }
    }
}

impl HeaderFooterBand {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            enabled: true,
            text: text.into(),
            ..Self::default()
        }
    }

    /// Only enabled bands with text take part in the layout.
    pub fn is_visible(&self) -> bool {
        self.enabled && !self.text.is_empty()
    }

    fn sanitize(&mut self) {
        if !self.font_size_pt.is_finite() || self.font_size_pt <= 0.0 {
            self.font_size_pt = DEFAULT_BAND_FONT_PT;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderFooterConfig {
    #[serde(default)]
    pub header: HeaderFooterBand,
    #[serde(default)]
    pub footer: HeaderFooterBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomColorSettings {
    pub enabled: bool,
    #[serde(rename = "primaryColor")]
    pub primary: HexColor,
    #[serde(rename = "secondaryColor")]
    pub secondary: HexColor,
    #[serde(rename = "backgroundColor")]
    pub background: HexColor,
}

impl Default for CustomColorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            primary: DEFAULT_ACCENT,
            secondary: DEFAULT_SECONDARY,
            background: WHITE,
        }
    }
}

/// Live print configuration of a preview session.
///
/// Fields are private: every mutation goes through a setter that ends in
/// [`PrintSettings::sanitize`], so `color_mode == Custom` holds exactly when
/// custom colours are enabled, margins stay within `[0, 50]` mm and
/// `copies >= 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PrintSettingsRepr", into = "PrintSettingsRepr")]
pub struct PrintSettings {
    quality: PrintQuality,
    color_mode: ColorMode,
    orientation: Orientation,
    copies: u32,
    margins: PageMargins,
    header_footer: HeaderFooterConfig,
    custom_colors: CustomColorSettings,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            quality: PrintQuality::Normal,
            color_mode: ColorMode::Color,
            orientation: Orientation::Portrait,
            copies: 1,
            margins: PageMargins::default(),
            header_footer: HeaderFooterConfig::default(),
            custom_colors: CustomColorSettings::default(),
        }
    }
}

impl PrintSettings {
    pub fn quality(&self) -> PrintQuality {
        self.quality
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn copies(&self) -> u32 {
        self.copies
    }

    pub fn margins(&self) -> PageMargins {
        self.margins
    }

    pub fn header_footer(&self) -> &HeaderFooterConfig {
        &self.header_footer
    }

    pub fn custom_colors(&self) -> &CustomColorSettings {
        &self.custom_colors
    }

    pub fn set_quality(&mut self, quality: PrintQuality) {
        self.quality = quality;
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub fn set_margin(&mut self, side: MarginSide, value_mm: f32) {
        *self.margins.slot(side) = value_mm;
        self.sanitize();
    }

    /// Text-field variant of [`Self::set_margin`]: the leading integer is
    /// used, anything unparsable becomes 0.
    pub fn set_margin_input(&mut self, side: MarginSide, input: &str) {
        let value = parse_leading_int(input).unwrap_or(0);
        self.set_margin(side, value as f32);
    }

    pub fn set_margins(&mut self, margins: PageMargins) {
        self.margins = margins;
        self.sanitize();
    }

    /// Applies a named preset. Unknown names leave the margins untouched and
    /// return `false`.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        match MarginPreset::from_name(name) {
            Some(preset) => {
                self.set_margins(preset.margins());
                true
            }
            None => false,
        }
    }

    /// Non-positive counts become 1; counts past `u32::MAX` saturate.
    pub fn set_copies(&mut self, copies: i64) {
        self.copies = copies.clamp(1, i64::from(u32::MAX)) as u32;
    }

    pub fn set_copies_input(&mut self, input: &str) {
        self.set_copies(parse_leading_int(input).unwrap_or(0));
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.color_mode = mode;
        self.custom_colors.enabled = mode == ColorMode::Custom;
    }

    pub fn set_custom_colors_enabled(&mut self, enabled: bool) {
        self.custom_colors.enabled = enabled;
        self.color_mode = if enabled {
            ColorMode::Custom
        } else {
            ColorMode::Color
        };
    }

    pub fn set_primary_color(&mut self, color: HexColor) {
        self.custom_colors.primary = color;
    }

    pub fn set_secondary_color(&mut self, color: HexColor) {
        self.custom_colors.secondary = color;
    }

    pub fn set_background_color(&mut self, color: HexColor) {
        self.custom_colors.background = color;
    }

    pub fn set_header(&mut self, band: HeaderFooterBand) {
        self.header_footer.header = band;
        self.sanitize();
    }

    pub fn set_footer(&mut self, band: HeaderFooterBand) {
        self.header_footer.footer = band;
        self.sanitize();
    }

    /// The one place where out-of-range values are silently repaired.
    ///
    /// When the colour mode and the custom-colour flag disagree the flag
    /// wins, since it is the field the user toggles directly.
    pub fn sanitize(&mut self) {
        self.margins = self.margins.clamped();
        if self.copies == 0 {
            self.copies = 1;
        }
        self.header_footer.header.sanitize();
        self.header_footer.footer.sanitize();
        if self.custom_colors.enabled {
            self.color_mode = ColorMode::Custom;
        } else if self.color_mode == ColorMode::Custom {
            self.color_mode = ColorMode::Color;
        }
    }
}

/// `parseInt`-style parsing: optional sign, then leading digits.
fn parse_leading_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    // Only overflow can fail on a pure digit run.
    let value = rest[..digits_len].parse::<i64>().unwrap_or(i64::MAX);
    Some(value * sign)
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrintSettingsRepr {
    #[serde(default)]
    quality: PrintQuality,
    #[serde(default)]
    color_mode: ColorMode,
    #[serde(default)]
    orientation: Orientation,
    #[serde(default = "default_copies")]
    copies: u32,
    #[serde(default)]
    margins: PageMargins,
    #[serde(default)]
    header_footer: HeaderFooterConfig,
    #[serde(default)]
    custom_colors: CustomColorSettings,
}

fn default_copies() -> u32 {
    1
}

impl From<PrintSettingsRepr> for PrintSettings {
    fn from(repr: PrintSettingsRepr) -> Self {
        let mut settings = PrintSettings {
            quality: repr.quality,
            color_mode: repr.color_mode,
            orientation: repr.orientation,
            copies: repr.copies,
            margins: repr.margins,
            header_footer: repr.header_footer,
            custom_colors: repr.custom_colors,
        };
        // A stored `colorMode: custom` without the flag is treated as intent.
        if settings.color_mode == ColorMode::Custom {
            settings.custom_colors.enabled = true;
        }
        settings.sanitize();
        settings
    }
}

impl From<PrintSettings> for PrintSettingsRepr {
    fn from(settings: PrintSettings) -> Self {
        PrintSettingsRepr {
            quality: settings.quality,
            color_mode: settings.color_mode,
            orientation: settings.orientation,
            copies: settings.copies,
            margins: settings.margins,
            header_footer: settings.header_footer,
            custom_colors: settings.custom_colors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupled(settings: &PrintSettings) -> bool {
        (settings.color_mode() == ColorMode::Custom) == settings.custom_colors().enabled
    }

    #[test]
    fn margins_are_clamped() {
        let mut settings = PrintSettings::default();
        settings.set_margin(MarginSide::Top, 75.0);
        settings.set_margin(MarginSide::Left, -4.0);
        settings.set_margin(MarginSide::Right, f32::NAN);
        let margins = settings.margins();
        assert_eq!(margins.top, 50.0);
        assert_eq!(margins.left, 0.0);
        assert_eq!(margins.right, 0.0);
        assert_eq!(margins.bottom, 20.0);
    }

    #[test]
    fn margin_text_input_defaults_to_zero() {
        let mut settings = PrintSettings::default();
        settings.set_margin_input(MarginSide::Bottom, "abc");
        assert_eq!(settings.margins().bottom, 0.0);
        settings.set_margin_input(MarginSide::Bottom, "12.7mm");
        assert_eq!(settings.margins().bottom, 12.0);
        settings.set_margin_input(MarginSide::Bottom, "999");
        assert_eq!(settings.margins().bottom, 50.0);
        settings.set_margin_input(MarginSide::Bottom, "");
        assert_eq!(settings.margins().bottom, 0.0);
    }

    #[test]
    fn presets_are_idempotent_and_unknown_names_are_ignored() {
        let mut settings = PrintSettings::default();
        settings.set_margin(MarginSide::Top, 7.0);

        assert!(settings.apply_preset("standard"));
        let once = settings.margins();
        assert!(settings.apply_preset("standard"));
        assert_eq!(settings.margins(), once);
        assert_eq!(once, PageMargins::uniform(20.0));

        assert!(settings.apply_preset("none"));
        assert_eq!(settings.margins(), PageMargins::zero());

        assert!(!settings.apply_preset("wide"));
        assert_eq!(settings.margins(), PageMargins::zero());
    }

    #[test]
    fn copies_default_to_one() {
        let mut settings = PrintSettings::default();
        settings.set_copies(0);
        assert_eq!(settings.copies(), 1);
        settings.set_copies(-3);
        assert_eq!(settings.copies(), 1);
        settings.set_copies(150);
        assert_eq!(settings.copies(), 150);
        settings.set_copies_input("x");
        assert_eq!(settings.copies(), 1);
        settings.set_copies_input("4 copies");
        assert_eq!(settings.copies(), 4);
    }

    #[test]
    fn huge_copy_counts_saturate() {
        let mut settings = PrintSettings::default();
        settings.set_copies(i64::from(u32::MAX) + 1);
        assert_eq!(settings.copies(), u32::MAX);
        settings.set_copies(i64::MAX);
        assert_eq!(settings.copies(), u32::MAX);
        settings.set_copies_input("99999999999999999999999");
        assert_eq!(settings.copies(), u32::MAX);
        settings.set_copies(i64::MIN);
        assert_eq!(settings.copies(), 1);
    }

    #[test]
    fn colour_mode_and_custom_flag_stay_coupled() {
        let mut settings = PrintSettings::default();
        assert!(coupled(&settings));

        settings.set_color_mode(ColorMode::Custom);
        assert!(settings.custom_colors().enabled);
        assert!(coupled(&settings));

        settings.set_color_mode(ColorMode::Grayscale);
        assert!(!settings.custom_colors().enabled);
        assert!(coupled(&settings));

        settings.set_custom_colors_enabled(true);
        assert_eq!(settings.color_mode(), ColorMode::Custom);

        settings.set_custom_colors_enabled(false);
        assert_eq!(settings.color_mode(), ColorMode::Color);
        assert!(coupled(&settings));

        settings.set_margin(MarginSide::Top, 3.0);
        settings.set_copies(2);
        settings.set_header(HeaderFooterBand::with_text("x"));
        assert!(coupled(&settings));
    }

    #[test]
    fn band_font_size_is_repaired() {
        let mut settings = PrintSettings::default();
        let mut band = HeaderFooterBand::with_text("Title");
        band.font_size_pt = -2.0;
        settings.set_footer(band);
        assert_eq!(settings.header_footer().footer.font_size_pt, 12.0);
    }

    #[test]
    fn deserialized_settings_are_sanitized() {
        let json = r##"{
            "quality": "high",
            "colorMode": "custom",
            "orientation": "landscape",
            "copies": 0,
            "margins": { "top": 80, "right": 10, "bottom": -1, "left": 5 },
            "customColors": {
                "enabled": false,
                "primaryColor": "#EF4444",
                "secondaryColor": "#10B981",
                "backgroundColor": "#FFFFFF"
            }
        }"##;
        let settings: PrintSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.quality(), PrintQuality::High);
        assert_eq!(settings.orientation(), Orientation::Landscape);
        assert_eq!(settings.copies(), 1);
        assert_eq!(settings.margins().top, 50.0);
        assert_eq!(settings.margins().bottom, 0.0);
        assert!(coupled(&settings));
        assert!(settings.custom_colors().enabled);
    }

    #[test]
    fn keyword_enums_parse_case_insensitively() {
        assert_eq!("BlackWhite".parse::<ColorMode>(), Ok(ColorMode::BlackWhite));
        assert_eq!("HIGH".parse::<PrintQuality>(), Ok(PrintQuality::High));
        assert!("sideways".parse::<Orientation>().is_err());
        assert_eq!(Alignment::Right.to_string(), "right");
    }

    #[test]
    fn leading_int_parsing() {
        assert_eq!(parse_leading_int("  42px"), Some(42));
        assert_eq!(parse_leading_int("-7"), Some(-7));
        assert_eq!(parse_leading_int("+"), None);
        assert_eq!(parse_leading_int("mm"), None);
    }
}
