use std::io;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, ImageEncoder, ImageError, Rgba, RgbaImage};
use papercraft_catalog::{ContentKind, Style};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::color::{self, ColorFilter, HexColor};
use crate::display::{DisplayList, Stroke, TextRun};
use crate::layout::{compute_layout, BandGeometry, LayoutRequest, PageGeometry, Rotation, Zoom};
use crate::paper::PaperSize;
use crate::pattern::{PatternDrawing, PatternPainter, PatternRequest, PatternTable};
use crate::raster;
use crate::settings::PrintSettings;

/// Dashed outline marking the content area.
pub const MARGIN_GUIDE: Stroke = Stroke::dashed(1.0, HexColor::rgb(0xD1, 0xD5, 0xDB), 4.0, 4.0);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("image '{url}' is unavailable: {reason}")]
    ImageUnavailable { url: String, reason: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: ImageError,
    },
    #[error("failed to encode preview: {0}")]
    Encode(#[source] ImageError),
}

/// Resolves raster style images by URL.
pub trait ImageSource {
    fn load(&self, url: &str) -> Result<RgbaImage, RenderError>;
}

/// Image source that never yields an image; raster styles render as
/// placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl ImageSource for NoImages {
    fn load(&self, url: &str) -> Result<RgbaImage, RenderError> {
        Err(RenderError::ImageUnavailable {
            url: url.to_string(),
            reason: "no image source configured".to_string(),
        })
    }
}

/// Looks images up in a local directory by the last path segment of the URL.
#[derive(Debug, Clone)]
pub struct DirectoryImageSource {
    root: PathBuf,
}

impl DirectoryImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let name = url.rsplit('/').next()?.split(['?', '#']).next()?;
        (!name.is_empty()).then(|| self.root.join(name))
    }
}

impl ImageSource for DirectoryImageSource {
    fn load(&self, url: &str) -> Result<RgbaImage, RenderError> {
        let path = self
            .resolve(url)
            .ok_or_else(|| RenderError::ImageUnavailable {
                url: url.to_string(),
                reason: "url has no file name".to_string(),
            })?;
        let bytes = std::fs::read(&path).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        let decoded = image::load_from_memory(&bytes).map_err(|source| RenderError::Decode {
            url: url.to_string(),
            source,
        })?;
        Ok(decoded.to_rgba8())
    }
}

/// What fills the content area of a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PreviewContent {
    /// Vector pattern, already positioned in page coordinates.
    Pattern {
        pattern_id: String,
        drawing: DisplayList,
    },
    Image {
        url: String,
        #[serde(skip)]
        pixels: RgbaImage,
    },
    Placeholder { label: String, fill: HexColor },
}

/// Everything needed to draw one preview of a style.
/// 繪製單一樣式預覽所需的全部資訊。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFrame {
    pub style_id: String,
    pub style_name: String,
    pub kind: ContentKind,
    pub paper: PaperSize,
    pub geometry: PageGeometry,
    pub background: HexColor,
    pub filter: ColorFilter,
    pub content: PreviewContent,
    pub bands: Vec<TextRun>,
}

impl PreviewFrame {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.content, PreviewContent::Placeholder { .. })
    }

    /// CSS filter string applied to the content area.
    pub fn filter_css(&self) -> String {
        self.filter.css()
    }
}

/// Composes preview frames from a style and the current print settings.
#[derive(Debug, Clone)]
pub struct PreviewRenderer<P = PatternTable, I = NoImages> {
    painter: P,
    images: I,
}

impl PreviewRenderer {
    pub fn new() -> Self {
        Self::with_collaborators(PatternTable::new(), NoImages)
    }
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PatternPainter, I: ImageSource> PreviewRenderer<P, I> {
    pub fn with_collaborators(painter: P, images: I) -> Self {
        Self { painter, images }
    }

    pub fn compose(
        &self,
        style: &Style,
        settings: &PrintSettings,
        paper: PaperSize,
        zoom: Zoom,
        rotation: Rotation,
    ) -> PreviewFrame {
        let request = LayoutRequest::from_settings(paper, settings, zoom, rotation);
        let geometry = compute_layout(&request);
        let kind = style.content_kind();
        let filter = color::filter_for(settings, kind);

        let content = match kind {
            ContentKind::Vector => self.pattern_content(style, settings, &geometry),
            ContentKind::Raster => self.image_content(style),
        };

        let text_color = color::band_text_color(settings);
        let bands = [&geometry.header, &geometry.footer]
            .into_iter()
            .flatten()
            .map(|band| band_run(band, text_color))
            .collect();

        debug!(
            style = %style.id,
            zoom = zoom.percent(),
            rotation = rotation.degrees(),
            filter = %filter.css(),
            "preview composed"
        );

        PreviewFrame {
            style_id: style.id.clone(),
            style_name: style.name.clone(),
            kind,
            paper,
            background: color::page_background(settings),
            filter,
            content,
            bands,
            geometry,
        }
    }

    fn pattern_content(
        &self,
        style: &Style,
        settings: &PrintSettings,
        geometry: &PageGeometry,
    ) -> PreviewContent {
        let content = geometry.content;
        let drawing = self.painter.paint(&PatternRequest {
            pattern_id: &style.id,
            width_px: content.width,
            height_px: content.height,
            colors: color::pattern_colors(settings),
        });
        match drawing {
            PatternDrawing::Primitives(mut list) => {
                list.translate(content.x, content.y);
                PreviewContent::Pattern {
                    pattern_id: style.id.clone(),
                    drawing: list,
                }
            }
            PatternDrawing::Placeholder { fill } => PreviewContent::Placeholder {
                label: style.name.clone(),
                fill,
            },
        }
    }

    fn image_content(&self, style: &Style) -> PreviewContent {
        match self.images.load(&style.full_image_url) {
            Ok(pixels) => PreviewContent::Image {
                url: style.full_image_url.clone(),
                pixels,
            },
            Err(err) => {
                warn!(style = %style.id, error = %err, "style image unavailable, using placeholder");
                PreviewContent::Placeholder {
                    label: style.name.clone(),
                    fill: crate::pattern::PLACEHOLDER_FILL,
                }
            }
        }
    }
}

fn band_run(band: &BandGeometry, color: HexColor) -> TextRun {
    TextRun {
        text: band.text.clone(),
        rect: band.rect,
        font_size: band.font_size,
        alignment: band.alignment,
        color,
    }
}

/// Draws a frame to a bitmap, one pixel per display unit, rotated as the
/// frame requests.
/// 將預覽框架繪製成點陣圖。
pub fn rasterize(frame: &PreviewFrame) -> RgbaImage {
    let page = frame.geometry.page;
    let width = page.width.round().max(1.0) as u32;
    let height = page.height.round().max(1.0) as u32;
    let mut image = raster::solid(width, height, frame.background);

    let content = frame.geometry.content;
    if !content.is_empty() {
        let layer = content_layer(frame, width, height);
        raster::composite(&mut image, &layer, 0, 0);
    }

    raster::stroke_rect(&mut image, &content, &MARGIN_GUIDE);
    for run in &frame.bands {
        raster::draw_text_block(&mut image, run);
    }

    match frame.geometry.rotation.degrees() {
        90 => imageops::rotate90(&image),
        180 => imageops::rotate180(&image),
        270 => imageops::rotate270(&image),
        _ => image,
    }
}

// Content is drawn on a transparent layer so the filter never touches the
// page background.
fn content_layer(frame: &PreviewFrame, width: u32, height: u32) -> RgbaImage {
    let mut layer = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    let content = frame.geometry.content;
    match &frame.content {
        PreviewContent::Pattern { drawing, .. } => raster::draw_list(&mut layer, drawing),
        PreviewContent::Image { pixels, .. } => {
            let fitted = cover(pixels, content.width, content.height);
            raster::composite(
                &mut layer,
                &fitted,
                content.x.round() as i32,
                content.y.round() as i32,
            );
        }
        PreviewContent::Placeholder { label, fill } => {
            raster::fill_rect(&mut layer, &content, fill.to_rgba());
            let font_size = (content.width / 20.0).clamp(4.0, 14.0);
            let (_, cy) = content.center();
            let run = TextRun {
                text: label.clone(),
                rect: crate::layout::Rect::new(
                    content.x,
                    cy - font_size / 2.0,
                    content.width,
                    font_size,
                ),
                font_size,
                alignment: crate::settings::Alignment::Center,
                color: HexColor::rgb(0x9C, 0xA3, 0xAF),
            };
            raster::draw_text_block(&mut layer, &run);
        }
    }
    frame.filter.apply_to_image(&mut layer);
    layer
}

/// Scales `source` to cover a `width × height` box, cropping the overflow
/// around the centre.
fn cover(source: &RgbaImage, width: f32, height: f32) -> RgbaImage {
    let target_w = width.round().max(1.0) as u32;
    let target_h = height.round().max(1.0) as u32;
    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 {
        return RgbaImage::new(target_w, target_h);
    }
    let scale = (target_w as f32 / src_w as f32).max(target_h as f32 / src_h as f32);
    let scaled_w = ((src_w as f32 * scale).ceil() as u32).max(target_w);
    let scaled_h = ((src_h as f32 * scale).ceil() as u32).max(target_h);
    let scaled = imageops::resize(source, scaled_w, scaled_h, FilterType::Triangle);
    let x = (scaled_w - target_w) / 2;
    let y = (scaled_h - target_h) / 2;
    imageops::crop_imm(&scaled, x, y, target_w, target_h).to_image()
}

/// Encodes a bitmap preview as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut data = Vec::new();
    PngEncoder::new(&mut data)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(RenderError::Encode)?;
    Ok(data)
}

/// Rasterizes and writes a frame as a PNG file.
pub fn write_png(frame: &PreviewFrame, path: &Path) -> Result<(), RenderError> {
    let data = encode_png(&rasterize(frame))?;
    std::fs::write(path, data).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ColorMode, HeaderFooterBand, PageMargins};
    use chrono::Utc;
    use papercraft_catalog::PRACTICE_CATEGORY;

    fn style(id: &str, category: &str) -> Style {
        Style {
            id: id.into(),
            name: format!("{id} name"),
            category_id: category.into(),
            tags: Vec::new(),
            thumbnail_url: String::new(),
            full_image_url: format!("https://cdn.example.com/{id}.png"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct SolidImages(Rgba<u8>);

    impl ImageSource for SolidImages {
        fn load(&self, _url: &str) -> Result<RgbaImage, RenderError> {
            Ok(RgbaImage::from_pixel(40, 20, self.0))
        }
    }

    #[test]
    fn vector_style_draws_pattern_inside_content() {
        let renderer = PreviewRenderer::new();
        let frame = renderer.compose(
            &style("tian-zi-ge", PRACTICE_CATEGORY),
            &PrintSettings::default(),
            PaperSize::A4,
            Zoom::default(),
            Rotation::default(),
        );
        let PreviewContent::Pattern { drawing, .. } = &frame.content else {
            panic!("expected pattern content, got {:?}", frame.content);
        };
        assert!(!drawing.is_empty());
        assert_eq!(frame.filter, ColorFilter::None);
        assert_eq!(frame.background, color::WHITE);
    }

    #[test]
    fn raster_style_without_image_falls_back_to_placeholder() {
        let frame = PreviewRenderer::new().compose(
            &style("floral-letter", "letter"),
            &PrintSettings::default(),
            PaperSize::A4,
            Zoom::default(),
            Rotation::default(),
        );
        assert!(frame.is_placeholder());
        match &frame.content {
            PreviewContent::Placeholder { label, .. } => assert_eq!(label, "floral-letter name"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn custom_mode_hue_shifts_raster_content() {
        let mut settings = PrintSettings::default();
        settings.set_color_mode(ColorMode::Custom);
        settings.set_primary_color(HexColor::rgb(0xEF, 0x44, 0x44));
        let renderer = PreviewRenderer::with_collaborators(
            PatternTable::new(),
            SolidImages(Rgba([200, 30, 30, 255])),
        );
        let frame = renderer.compose(
            &style("kraft-letter", "letter"),
            &settings,
            PaperSize::A5,
            Zoom::default(),
            Rotation::default(),
        );
        assert_eq!(frame.filter_css(), "hue-rotate(30deg)");
        assert!(matches!(frame.content, PreviewContent::Image { .. }));
    }

    #[test]
    fn bands_carry_text_and_colour() {
        let mut settings = PrintSettings::default();
        settings.set_header(HeaderFooterBand::with_text("Name: ____"));
        let frame = PreviewRenderer::new().compose(
            &style("math-grid", PRACTICE_CATEGORY),
            &settings,
            PaperSize::A4,
            Zoom::default(),
            Rotation::default(),
        );
        assert_eq!(frame.bands.len(), 1);
        assert_eq!(frame.bands[0].text, "Name: ____");
        assert_eq!(frame.bands[0].color, color::DEFAULT_ACCENT);
    }

    #[test]
    fn rasterize_rotates_quarter_turns() {
        let frame = PreviewRenderer::new().compose(
            &style("dot-grid", PRACTICE_CATEGORY),
            &PrintSettings::default(),
            PaperSize::A4,
            Zoom::default(),
            Rotation::from_degrees(90),
        );
        let upright = (
            frame.geometry.page.width.round() as u32,
            frame.geometry.page.height.round() as u32,
        );
        let image = rasterize(&frame);
        assert_eq!(image.dimensions(), (upright.1, upright.0));
    }

    #[test]
    fn grayscale_leaves_background_untouched() {
        let mut settings = PrintSettings::default();
        settings.set_color_mode(ColorMode::Grayscale);
        settings.set_margins(PageMargins::uniform(20.0));
        let renderer = PreviewRenderer::with_collaborators(
            PatternTable::new(),
            SolidImages(Rgba([220, 20, 20, 255])),
        );
        let frame = renderer.compose(
            &style("watercolor-letter", "letter"),
            &settings,
            PaperSize::A4,
            Zoom::default(),
            Rotation::default(),
        );
        let image = rasterize(&frame);
        let (cx, cy) = frame.geometry.content.center();
        let inside = image.get_pixel(cx as u32, cy as u32);
        assert_eq!(inside[0], inside[1]);
        assert_eq!(inside[1], inside[2]);
        assert_eq!(*image.get_pixel(1, 1), color::WHITE.to_rgba());
    }

    #[test]
    fn png_encoding_produces_signature() {
        let frame = PreviewRenderer::new().compose(
            &style("english-ruled", PRACTICE_CATEGORY),
            &PrintSettings::default(),
            PaperSize::Letter,
            Zoom::new(50),
            Rotation::default(),
        );
        let data = encode_png(&rasterize(&frame)).unwrap();
        assert_eq!(&data[..8], b"\x89PNG\r\n\x1a\n");
    }
}
