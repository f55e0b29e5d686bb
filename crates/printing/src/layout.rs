use serde::{Deserialize, Serialize};

use crate::paper::PaperSize;
use crate::settings::{Alignment, HeaderFooterBand, HeaderFooterConfig, Orientation, PageMargins, PrintSettings};

/// On-screen page width at 100% zoom, in display units (CSS pixels).
/// 100% 縮放時頁面在畫面上的寬度。
pub const BASE_DISPLAY_WIDTH: f32 = 300.0;
/// Empirical millimetre-to-display factor for margins. Not a physical
/// conversion; kept for visual parity with the browser preview.
/// 邊界的經驗換算係數，並非實際的毫米轉像素。
pub const MARGIN_SCALE: f32 = 0.3;
/// Header/footer font scale relative to the configured point size.
pub const BAND_FONT_SCALE: f32 = 0.1;
pub const HEADER_PADDING_OFFSET: f32 = 20.0;
pub const FOOTER_PADDING_OFFSET: f32 = 15.0;
pub const MIN_BAND_PADDING: f32 = 5.0;

const EPSILON: f32 = 1e-3;

/// Preview zoom level in percent, always on the 25% grid within [50, 200].
/// 預覽縮放比例，固定落在 50–200% 且以 25% 為級距。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u32", from = "u32")]
pub struct Zoom(u32);

impl Zoom {
    pub const MIN: u32 = 50;
    pub const MAX: u32 = 200;
    pub const STEP: u32 = 25;

    /// Clamps to the allowed range and snaps to the nearest step.
    pub fn new(percent: u32) -> Self {
        let clamped = percent.clamp(Self::MIN, Self::MAX);
        let steps = (clamped - Self::MIN + Self::STEP / 2) / Self::STEP;
        Self(Self::MIN + steps * Self::STEP)
    }

    pub const fn percent(self) -> u32 {
        self.0
    }

    pub fn factor(self) -> f32 {
        self.0 as f32 / 100.0
    }

    pub fn zoom_in(&mut self) {
        self.0 = (self.0 + Self::STEP).min(Self::MAX);
    }

    pub fn zoom_out(&mut self) {
        self.0 = self.0.saturating_sub(Self::STEP).max(Self::MIN);
    }

    pub fn can_zoom_in(self) -> bool {
        self.0 < Self::MAX
    }

    pub fn can_zoom_out(self) -> bool {
        self.0 > Self::MIN
    }

    /// Every reachable zoom level, ascending.
    pub fn levels() -> impl Iterator<Item = Zoom> {
        (Self::MIN..=Self::MAX)
            .step_by(Self::STEP as usize)
            .map(Zoom)
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(100)
    }
}

impl From<u32> for Zoom {
    fn from(value: u32) -> Self {
        Zoom::new(value)
    }
}

impl From<Zoom> for u32 {
    fn from(zoom: Zoom) -> Self {
        zoom.0
    }
}

/// Quarter-turn rotation of the previewed page.
/// 預覽頁面的旋轉角度（每次 90 度）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u16", from = "u16")]
pub struct Rotation(u16);

impl Rotation {
    /// Normalises any angle to 0/90/180/270, rounding down to a quarter turn.
    pub fn from_degrees(degrees: i32) -> Self {
        let normalized = degrees.rem_euclid(360) as u16;
        Self(normalized / 90 * 90)
    }

    pub const fn degrees(self) -> u16 {
        self.0
    }

    pub fn rotate(&mut self) {
        self.0 = (self.0 + 90) % 360;
    }

    pub fn is_quarter_turn(self) -> bool {
        self.0 == 90 || self.0 == 270
    }
}

impl From<u16> for Rotation {
    fn from(value: u16) -> Self {
        Rotation::from_degrees(i32::from(value))
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.0
    }
}

/// Axis-aligned rectangle in display units, origin at the page's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Shrinks by `insets`. When opposing insets overlap, that dimension
    /// collapses to zero at the midpoint of the overlap instead of going
    /// negative.
    pub fn inset(&self, insets: &Insets) -> Rect {
        let (x, width) = shrink_axis(self.x, self.width, insets.left, insets.right);
        let (y, height) = shrink_axis(self.y, self.height, insets.top, insets.bottom);
        Rect::new(x, y, width, height)
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x - EPSILON
            && other.y >= self.y - EPSILON
            && other.right() <= self.right() + EPSILON
            && other.bottom() <= self.bottom() + EPSILON
    }
}

fn shrink_axis(origin: f32, length: f32, start: f32, end: f32) -> (f32, f32) {
    let near = origin + start;
    let far = origin + length - end;
    if far >= near {
        (near, far - near)
    } else {
        ((near + far) / 2.0, 0.0)
    }
}

/// Per-side distances in display units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Insets {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Insets {
    /// `margin_mm × zoom × MARGIN_SCALE` on every side.
    pub fn from_margins(margins: &PageMargins, zoom: Zoom) -> Self {
        let scale = zoom.factor() * MARGIN_SCALE;
        Self {
            top: margins.top * scale,
            right: margins.right * scale,
            bottom: margins.bottom * scale,
            left: margins.left * scale,
        }
    }
}

/// Placement of a header or footer band on the previewed page.
/// 頁首或頁尾在預覽頁面上的位置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandGeometry {
    pub rect: Rect,
    /// Distance from the page edge the band hugs.
    pub padding: f32,
    pub font_size: f32,
    pub alignment: Alignment,
    pub text: String,
}

/// Inputs of the layout calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRequest {
    pub paper: PaperSize,
    pub orientation: Orientation,
    pub zoom: Zoom,
    pub rotation: Rotation,
    pub margins: PageMargins,
    pub header_footer: HeaderFooterConfig,
}

impl LayoutRequest {
    pub fn from_settings(
        paper: PaperSize,
        settings: &PrintSettings,
        zoom: Zoom,
        rotation: Rotation,
    ) -> Self {
        Self {
            paper,
            orientation: settings.orientation(),
            zoom,
            rotation,
            margins: settings.margins(),
            header_footer: settings.header_footer().clone(),
        }
    }
}

/// Geometry of the previewed page, before rotation is applied.
/// 預覽頁面的幾何資訊（旋轉前）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page: Rect,
    pub content: Rect,
    pub margins: Insets,
    pub header: Option<BandGeometry>,
    pub footer: Option<BandGeometry>,
    pub aspect_ratio: f32,
    pub zoom: Zoom,
    pub rotation: Rotation,
}

impl PageGeometry {
    /// True when the margins leave no drawable content area.
    pub fn is_degenerate(&self) -> bool {
        self.content.is_empty()
    }

    /// Axis-aligned bounds of the page after rotating about its centre.
    pub fn bounding_box(&self) -> Rect {
        let (cx, cy) = self.page.center();
        let (width, height) = if self.rotation.is_quarter_turn() {
            (self.page.height, self.page.width)
        } else {
            (self.page.width, self.page.height)
        };
        Rect::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }
}

/// Computes the on-screen geometry of the previewed page.
/// 計算預覽頁面在畫面上的幾何配置。
pub fn compute_layout(request: &LayoutRequest) -> PageGeometry {
    let zoom = request.zoom;
    let aspect_ratio = request.paper.aspect_ratio(request.orientation);
    let display_width = BASE_DISPLAY_WIDTH * zoom.factor();
    let display_height = display_width / aspect_ratio;
    let page = Rect::new(0.0, 0.0, display_width, display_height);

    let margins = Insets::from_margins(&request.margins, zoom);
    let content = page.inset(&margins);

    let header = visible_band(&request.header_footer.header).map(|band| {
        let padding = (margins.top - HEADER_PADDING_OFFSET).max(MIN_BAND_PADDING);
        let font_size = band_font_size(band, zoom);
        BandGeometry {
            rect: Rect::new(page.x, page.y + padding, page.width, font_size),
            padding,
            font_size,
            alignment: band.alignment,
            text: band.text.clone(),
        }
    });

    let footer = visible_band(&request.header_footer.footer).map(|band| {
        let padding = (margins.bottom - FOOTER_PADDING_OFFSET).max(MIN_BAND_PADDING);
        let font_size = band_font_size(band, zoom);
        BandGeometry {
            rect: Rect::new(
                page.x,
                page.bottom() - padding - font_size,
                page.width,
                font_size,
            ),
            padding,
            font_size,
            alignment: band.alignment,
            text: band.text.clone(),
        }
    });

    PageGeometry {
        page,
        content,
        margins,
        header,
        footer,
        aspect_ratio,
        zoom,
        rotation: request.rotation,
    }
}

fn visible_band(band: &HeaderFooterBand) -> Option<&HeaderFooterBand> {
    band.is_visible().then_some(band)
}

fn band_font_size(band: &HeaderFooterBand, zoom: Zoom) -> f32 {
    band.font_size_pt * zoom.factor() * BAND_FONT_SCALE
}

/// Physical content area left on the sheet after margins, in millimetres.
/// 套用邊界後紙張上實際可用的範圍（毫米）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintableArea {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PrintableArea {
    pub fn from_paper(paper: PaperSize, orientation: Orientation, margins: PageMargins) -> Self {
        let (width, height) = paper.dimensions_mm(orientation);
        Self {
            width_mm: (width - margins.left - margins.right).max(0.0),
            height_mm: (height - margins.top - margins.bottom).max(0.0),
        }
    }
}
