use serde::Serialize;

use crate::color::HexColor;
use crate::layout::Rect;
use crate::settings::Alignment;

/// Ordered drawing commands in display units, consumed by the rasterizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayList {
    pub commands: Vec<DisplayCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command to the display list.
    pub fn push(&mut self, command: DisplayCommand) {
        self.commands.push(command);
    }

    pub fn extend(&mut self, other: DisplayList) {
        self.commands.extend(other.commands);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayCommand> {
        self.commands.iter()
    }

    /// Shifts every command by `(dx, dy)`.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        for command in &mut self.commands {
            command.translate(dx, dy);
        }
    }
}

/// Low-level drawing commands emitted by the pattern table and renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DisplayCommand {
    FillRect { rect: Rect, color: HexColor },
    Line { start: Point, end: Point, stroke: Stroke },
    Dot { center: Point, radius: f32, color: HexColor },
    Polygon { points: Vec<Point>, color: HexColor },
    Text(TextRun),
}

impl DisplayCommand {
    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            DisplayCommand::FillRect { rect, .. } => {
                rect.x += dx;
                rect.y += dy;
            }
            DisplayCommand::Line { start, end, .. } => {
                *start = start.offset(dx, dy);
                *end = end.offset(dx, dy);
            }
            DisplayCommand::Dot { center, .. } => *center = center.offset(dx, dy),
            DisplayCommand::Polygon { points, .. } => {
                for point in points {
                    *point = point.offset(dx, dy);
                }
            }
            DisplayCommand::Text(run) => {
                run.rect.x += dx;
                run.rect.y += dy;
            }
        }
    }
}

/// 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Dash pattern: `on` units drawn, then `off` units skipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dash {
    pub on: f32,
    pub off: f32,
}

/// Stroke descriptor for line drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stroke {
    pub width: f32,
    pub color: HexColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<Dash>,
}

impl Stroke {
    pub const fn solid(width: f32, color: HexColor) -> Self {
        Self {
            width,
            color,
            dash: None,
        }
    }

    pub const fn dashed(width: f32, color: HexColor, on: f32, off: f32) -> Self {
        Self {
            width,
            color,
            dash: Some(Dash { on, off }),
        }
    }
}

/// One line of text placed inside `rect`, aligned horizontally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub text: String,
    pub rect: Rect,
    pub font_size: f32,
    pub alignment: Alignment,
    pub color: HexColor,
}

impl TextRun {
    /// Rough advance width; glyphs are not shaped.
    pub fn estimated_width(&self) -> f32 {
        self.text.chars().count() as f32 * self.font_size.max(1.0) * 0.6
    }

    /// Left edge of the text once alignment is applied.
    pub fn start_x(&self) -> f32 {
        let width = self.estimated_width();
        match self.alignment {
            Alignment::Left => self.rect.x,
            Alignment::Center => self.rect.x + (self.rect.width - width) / 2.0,
            Alignment::Right => self.rect.right() - width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_moves_every_command() {
        let black = HexColor::rgb(0, 0, 0);
        let mut list = DisplayList::new();
        list.push(DisplayCommand::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 0.0),
            stroke: Stroke::solid(1.0, black),
        });
        list.push(DisplayCommand::Text(TextRun {
            text: "Hi".into(),
            rect: Rect::new(0.0, 0.0, 100.0, 10.0),
            font_size: 10.0,
            alignment: Alignment::Left,
            color: black,
        }));
        list.translate(5.0, 7.0);

        match &list.commands[0] {
            DisplayCommand::Line { start, end, .. } => {
                assert_eq!(*start, Point::new(5.0, 7.0));
                assert_eq!(*end, Point::new(15.0, 7.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &list.commands[1] {
            DisplayCommand::Text(run) => assert_eq!((run.rect.x, run.rect.y), (5.0, 7.0)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn text_alignment_positions_run() {
        let mut run = TextRun {
            text: "abcd".into(),
            rect: Rect::new(0.0, 0.0, 100.0, 10.0),
            font_size: 10.0,
            alignment: Alignment::Center,
            color: HexColor::rgb(0, 0, 0),
        };
        let close = |a: f32, b: f32| (a - b).abs() < 1e-3;
        assert!(close(run.estimated_width(), 24.0));
        assert!(close(run.start_x(), 38.0));
        run.alignment = Alignment::Right;
        assert!(close(run.start_x(), 76.0));
    }
}
