use image::{Rgba, RgbaImage};

use crate::color::HexColor;
use crate::display::{DisplayCommand, DisplayList, Point, Stroke, TextRun};
use crate::layout::Rect;

/// Paints a display list onto `buffer`, one pixel per display unit.
pub fn draw_list(buffer: &mut RgbaImage, list: &DisplayList) {
    for command in list.iter() {
        draw_command(buffer, command);
    }
}

pub fn draw_command(buffer: &mut RgbaImage, command: &DisplayCommand) {
    match command {
        DisplayCommand::FillRect { rect, color } => fill_rect(buffer, rect, color.to_rgba()),
        DisplayCommand::Line { start, end, stroke } => draw_line(buffer, *start, *end, stroke),
        DisplayCommand::Dot {
            center,
            radius,
            color,
        } => fill_circle(buffer, *center, *radius, color.to_rgba()),
        DisplayCommand::Polygon { points, color } => fill_polygon(buffer, points, color.to_rgba()),
        DisplayCommand::Text(run) => draw_text_block(buffer, run),
    }
}

pub fn fill_rect(buffer: &mut RgbaImage, rect: &Rect, color: Rgba<u8>) {
    if rect.is_empty() {
        return;
    }
    let width_px = buffer.width() as i32;
    let height_px = buffer.height() as i32;
    let x0 = (rect.x.round() as i32).clamp(0, width_px);
    let y0 = (rect.y.round() as i32).clamp(0, height_px);
    let x1 = (rect.right().round() as i32).clamp(0, width_px);
    let y1 = (rect.bottom().round() as i32).clamp(0, height_px);
    for yy in y0..y1 {
        for xx in x0..x1 {
            blend_pixel(buffer, xx, yy, color);
        }
    }
}

/// Stamps square brushes along the segment. Strokes thinner than a pixel are
/// drawn one pixel wide with proportional opacity.
pub fn draw_line(buffer: &mut RgbaImage, start: Point, end: Point, stroke: &Stroke) {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length = (dx * dx + dy * dy).sqrt();
    let mut color = stroke.color.to_rgba();
    if stroke.width < 1.0 {
        color[3] = (f32::from(color[3]) * stroke.width.max(0.0)).round() as u8;
    }
    let brush = stroke.width.max(1.0);
    let half = brush / 2.0;
    let steps = (length * 2.0).ceil().max(1.0) as u32;
    let mut last: Option<(i32, i32)> = None;
    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        if let Some(dash) = stroke.dash {
            let period = dash.on + dash.off;
            if period > 0.0 && (t * length) % period >= dash.on {
                continue;
            }
        }
        let x = start.x + dx * t;
        let y = start.y + dy * t;
        let origin = ((x - half).round() as i32, (y - half).round() as i32);
        if last == Some(origin) {
            continue;
        }
        last = Some(origin);
        let size = brush.round().max(1.0) as i32;
        for yy in origin.1..origin.1 + size {
            for xx in origin.0..origin.0 + size {
                blend_pixel(buffer, xx, yy, color);
            }
        }
    }
}

pub fn fill_circle(buffer: &mut RgbaImage, center: Point, radius: f32, color: Rgba<u8>) {
    let r = radius.max(0.5);
    let x0 = (center.x - r).floor() as i32;
    let x1 = (center.x + r).ceil() as i32;
    let y0 = (center.y - r).floor() as i32;
    let y1 = (center.y + r).ceil() as i32;
    for yy in y0..=y1 {
        for xx in x0..=x1 {
            let px = xx as f32 + 0.5 - center.x;
            let py = yy as f32 + 0.5 - center.y;
            if px * px + py * py <= r * r {
                blend_pixel(buffer, xx, yy, color);
            }
        }
    }
}

/// Even-odd fill sampled at pixel centres.
pub fn fill_polygon(buffer: &mut RgbaImage, points: &[Point], color: Rgba<u8>) {
    if points.len() < 3 {
        return;
    }
    let min_x = points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor() as i32;
    let max_x = points.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil() as i32;
    let min_y = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor() as i32;
    let max_y = points.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil() as i32;
    for yy in min_y..=max_y {
        for xx in min_x..=max_x {
            if contains_point(points, xx as f32 + 0.5, yy as f32 + 0.5) {
                blend_pixel(buffer, xx, yy, color);
            }
        }
    }
}

fn contains_point(points: &[Point], x: f32, y: f32) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > y) != (b.y > y) && x < (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Glyphs are not rasterized; the run is drawn as a solid block covering its
/// estimated extent.
pub fn draw_text_block(buffer: &mut RgbaImage, run: &TextRun) {
    if run.text.is_empty() {
        return;
    }
    let width = run.estimated_width().max(2.0);
    let height = run.font_size.max(2.0);
    let rect = Rect::new(run.start_x(), run.rect.y, width, height);
    fill_rect(buffer, &rect, run.color.to_rgba());
}

/// Draws the outline of `rect` with `stroke`.
pub fn stroke_rect(buffer: &mut RgbaImage, rect: &Rect, stroke: &Stroke) {
    let corners = [
        Point::new(rect.x, rect.y),
        Point::new(rect.right(), rect.y),
        Point::new(rect.right(), rect.bottom()),
        Point::new(rect.x, rect.bottom()),
    ];
    for i in 0..corners.len() {
        draw_line(buffer, corners[i], corners[(i + 1) % corners.len()], stroke);
    }
}

/// Source-over composite of `layer` onto `buffer` at `(x, y)`.
pub fn composite(buffer: &mut RgbaImage, layer: &RgbaImage, x: i32, y: i32) {
    for (lx, ly, pixel) in layer.enumerate_pixels() {
        blend_pixel(buffer, x + lx as i32, y + ly as i32, *pixel);
    }
}

pub fn solid(width: u32, height: u32, color: HexColor) -> RgbaImage {
    RgbaImage::from_pixel(width.max(1), height.max(1), color.to_rgba())
}

fn blend_pixel(buffer: &mut RgbaImage, x: i32, y: i32, src: Rgba<u8>) {
    if x < 0 || y < 0 || x >= buffer.width() as i32 || y >= buffer.height() as i32 {
        return;
    }
    let alpha = src[3];
    if alpha == 0 {
        return;
    }
    let dst = buffer.get_pixel_mut(x as u32, y as u32);
    if alpha == 255 {
        *dst = src;
        return;
    }
    let sa = f32::from(alpha) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for channel in 0..3 {
        let s = f32::from(src[channel]) * sa;
        let d = f32::from(dst[channel]) * da * (1.0 - sa);
        dst[channel] = ((s + d) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}
