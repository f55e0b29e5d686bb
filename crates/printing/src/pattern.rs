use tracing::debug;

use crate::color::{HexColor, PatternColors};
use crate::display::{DisplayCommand, DisplayList, Point, Stroke};

/// Neutral fill used when a pattern cannot be drawn.
pub const PLACEHOLDER_FILL: HexColor = HexColor::rgb(0xF3, 0xF4, 0xF6);

const INK_STRONG: HexColor = HexColor::rgb(0x33, 0x33, 0x33);
const INK_MEDIUM: HexColor = HexColor::rgb(0x66, 0x66, 0x66);
const INK_DASH: HexColor = HexColor::rgb(0x88, 0x88, 0x88);
const INK_LIGHT: HexColor = HexColor::rgb(0x99, 0x99, 0x99);
const INK_DOT: HexColor = HexColor::rgb(0xCC, 0xCC, 0xCC);
const INK_FAINT: HexColor = HexColor::rgb(0xDD, 0xDD, 0xDD);

const AXIS_WIDTH: f32 = 2.0;
const ARROW_SIZE: f32 = 8.0;

/// What the painter is asked to fill, in display units.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRequest<'a> {
    pub pattern_id: &'a str,
    pub width_px: f32,
    pub height_px: f32,
    pub colors: Option<PatternColors>,
}

/// Result of painting a pattern, in coordinates local to the requested area.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternDrawing {
    Primitives(DisplayList),
    Placeholder { fill: HexColor },
}

impl PatternDrawing {
    pub fn placeholder() -> Self {
        PatternDrawing::Placeholder {
            fill: PLACEHOLDER_FILL,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, PatternDrawing::Placeholder { .. })
    }
}

/// Draws vector content for practice styles.
pub trait PatternPainter {
    fn paint(&self, request: &PatternRequest<'_>) -> PatternDrawing;
}

/// Which custom colour replaces a primitive's default ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy)]
struct Ink {
    role: Role,
    default: HexColor,
}

impl Ink {
    const fn strong() -> Self {
        Self {
            role: Role::Primary,
            default: INK_STRONG,
        }
    }

    const fn secondary(default: HexColor) -> Self {
        Self {
            role: Role::Secondary,
            default,
        }
    }

    fn resolve(self, colors: Option<PatternColors>) -> HexColor {
        match (colors, self.role) {
            (Some(colors), Role::Primary) => colors.primary,
            (Some(colors), Role::Secondary) => colors.secondary,
            (None, _) => self.default,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Primitive {
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        ink: Ink,
        dash: Option<(f32, f32)>,
    },
    Dot {
        at: (f32, f32),
        radius: f32,
        ink: Ink,
    },
}

const fn line(from: (f32, f32), to: (f32, f32), width: f32, ink: Ink) -> Primitive {
    Primitive::Line {
        from,
        to,
        width,
        ink,
        dash: None,
    }
}

const fn dashed(from: (f32, f32), to: (f32, f32), width: f32, ink: Ink, dash: (f32, f32)) -> Primitive {
    Primitive::Line {
        from,
        to,
        width,
        ink,
        dash: Some(dash),
    }
}

const fn border(size: f32, width: f32, ink: Ink) -> [Primitive; 4] {
    [
        line((0.0, 0.0), (size, 0.0), width, ink),
        line((size, 0.0), (size, size), width, ink),
        line((size, size), (0.0, size), width, ink),
        line((0.0, size), (0.0, 0.0), width, ink),
    ]
}

/// One repeating cell of a grid pattern.
#[derive(Debug, Clone)]
struct PatternSpec {
    id: &'static str,
    cell: (f32, f32),
    tile: Vec<Primitive>,
    axes: bool,
}

impl PatternSpec {
    fn new(id: &'static str, cell: (f32, f32), tile: Vec<Primitive>) -> Self {
        Self {
            id,
            cell,
            tile,
            axes: false,
        }
    }

    fn with_axes(mut self) -> Self {
        self.axes = true;
        self
    }
}

fn builtin_specs() -> Vec<PatternSpec> {
    let strong = Ink::strong();
    let medium = Ink::secondary(INK_MEDIUM);
    let light = Ink::secondary(INK_LIGHT);
    let faint = Ink::secondary(INK_FAINT);

    let mut tian = border(40.0, 1.0, strong).to_vec();
    tian.push(line((20.0, 0.0), (20.0, 40.0), 0.5, medium));
    tian.push(line((0.0, 20.0), (40.0, 20.0), 0.5, medium));

    let mut mi = tian.clone();
    mi.push(line((0.0, 0.0), (40.0, 40.0), 0.3, light));
    mi.push(line((40.0, 0.0), (0.0, 40.0), 0.3, light));

    let mut jiu = border(60.0, 1.0, strong).to_vec();
    for offset in [20.0, 40.0] {
        jiu.push(line((offset, 0.0), (offset, 60.0), 0.5, medium));
        jiu.push(line((0.0, offset), (60.0, offset), 0.5, medium));
    }

    let dash_ink = Ink::secondary(INK_DASH);
    let mut large = border(80.0, 1.5, strong).to_vec();
    large.push(dashed((40.0, 0.0), (40.0, 80.0), 0.5, dash_ink, (2.0, 2.0)));
    large.push(dashed((0.0, 40.0), (80.0, 40.0), 0.5, dash_ink, (2.0, 2.0)));

    let four_line = vec![
        line((0.0, 0.0), (60.0, 0.0), 1.0, strong),
        dashed((0.0, 20.0), (60.0, 20.0), 0.5, light, (4.0, 4.0)),
        dashed((0.0, 40.0), (60.0, 40.0), 0.5, light, (4.0, 4.0)),
        line((0.0, 60.0), (60.0, 60.0), 1.0, strong),
    ];

    let staff = [10.0, 20.0, 30.0, 40.0, 50.0]
        .into_iter()
        .map(|y| line((0.0, y), (80.0, y), 1.0, strong))
        .collect();

    vec![
        PatternSpec::new("tian-zi-ge", (40.0, 40.0), tian),
        PatternSpec::new("mi-zi-ge", (40.0, 40.0), mi),
        PatternSpec::new("jiu-gong-ge", (60.0, 60.0), jiu),
        PatternSpec::new("calligraphy-large-grid", (80.0, 80.0), large),
        PatternSpec::new(
            "calligraphy-vertical",
            (30.0, 30.0),
            vec![line((0.0, 0.0), (0.0, 30.0), 1.0, strong)],
        ),
        PatternSpec::new("english-four-line", (60.0, 60.0), four_line),
        PatternSpec::new(
            "english-ruled",
            (30.0, 30.0),
            vec![line((0.0, 30.0), (30.0, 30.0), 1.0, strong)],
        ),
        PatternSpec::new("math-grid", (20.0, 20.0), border(20.0, 0.5, faint).to_vec()),
        PatternSpec::new(
            "coordinate-paper",
            (20.0, 20.0),
            border(20.0, 0.5, faint).to_vec(),
        )
        .with_axes(),
        PatternSpec::new(
            "dot-grid",
            (20.0, 20.0),
            vec![Primitive::Dot {
                at: (10.0, 10.0),
                radius: 1.0,
                ink: Ink::secondary(INK_DOT),
            }],
        ),
        PatternSpec::new("music-staff", (80.0, 80.0), staff),
    ]
}

/// Built-in table of named practice-grid patterns.
/// 內建的練習格線樣式表。
#[derive(Debug, Clone)]
pub struct PatternTable {
    specs: Vec<PatternSpec>,
}

impl Default for PatternTable {
    fn default() -> Self {
        Self {
            specs: builtin_specs(),
        }
    }
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.iter().map(|spec| spec.id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.spec(id).is_some()
    }

    /// Size of one repeating cell, if the pattern is known.
    pub fn cell_size(&self, id: &str) -> Option<(f32, f32)> {
        self.spec(id).map(|spec| spec.cell)
    }

    fn spec(&self, id: &str) -> Option<&PatternSpec> {
        self.specs.iter().find(|spec| spec.id == id)
    }
}

impl PatternPainter for PatternTable {
    fn paint(&self, request: &PatternRequest<'_>) -> PatternDrawing {
        let Some(spec) = self.spec(request.pattern_id) else {
            debug!(pattern = request.pattern_id, "unknown pattern, drawing placeholder");
            return PatternDrawing::placeholder();
        };
        let (width, height) = (request.width_px, request.height_px);
        let mut list = DisplayList::new();
        if width <= 0.0 || height <= 0.0 {
            return PatternDrawing::Primitives(list);
        }

        let (cell_w, cell_h) = spec.cell;
        let cols = (width / cell_w).ceil() as u32;
        let rows = (height / cell_h).ceil() as u32;
        for row in 0..rows {
            for col in 0..cols {
                let (ox, oy) = (col as f32 * cell_w, row as f32 * cell_h);
                for primitive in &spec.tile {
                    if let Some(command) =
                        place(primitive, ox, oy, width, height, request.colors)
                    {
                        list.push(command);
                    }
                }
            }
        }

        if spec.axes {
            push_axes(&mut list, width, height, Ink::strong().resolve(request.colors));
        }
        PatternDrawing::Primitives(list)
    }
}

fn place(
    primitive: &Primitive,
    ox: f32,
    oy: f32,
    width: f32,
    height: f32,
    colors: Option<PatternColors>,
) -> Option<DisplayCommand> {
    match *primitive {
        Primitive::Line {
            from,
            to,
            width: stroke_width,
            ink,
            dash,
        } => {
            let start = Point::new(from.0 + ox, from.1 + oy);
            let end = Point::new(to.0 + ox, to.1 + oy);
            let (start, end) = clip_segment(start, end, width, height)?;
            let color = ink.resolve(colors);
            let stroke = match dash {
                Some((on, off)) => Stroke::dashed(stroke_width, color, on, off),
                None => Stroke::solid(stroke_width, color),
            };
            Some(DisplayCommand::Line { start, end, stroke })
        }
        Primitive::Dot { at, radius, ink } => {
            let center = Point::new(at.0 + ox, at.1 + oy);
            let inside = center.x <= width && center.y <= height;
            inside.then(|| DisplayCommand::Dot {
                center,
                radius,
                color: ink.resolve(colors),
            })
        }
    }
}

/// Liang–Barsky clip of a segment against `[0, width] × [0, height]`.
fn clip_segment(start: Point, end: Point, width: f32, height: f32) -> Option<(Point, Point)> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let mut t0 = 0.0_f32;
    let mut t1 = 1.0_f32;
    let edges = [
        (-dx, start.x),
        (dx, width - start.x),
        (-dy, start.y),
        (dy, height - start.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    let clipped_start = Point::new(start.x + t0 * dx, start.y + t0 * dy);
    let clipped_end = Point::new(start.x + t1 * dx, start.y + t1 * dy);
    if clipped_start == clipped_end && (dx != 0.0 || dy != 0.0) {
        return None;
    }
    Some((clipped_start, clipped_end))
}

fn push_axes(list: &mut DisplayList, width: f32, height: f32, color: HexColor) {
    let (cx, cy) = (width / 2.0, height / 2.0);
    let stroke = Stroke::solid(AXIS_WIDTH, color);
    list.push(DisplayCommand::Line {
        start: Point::new(0.0, cy),
        end: Point::new(width, cy),
        stroke,
    });
    list.push(DisplayCommand::Line {
        start: Point::new(cx, height),
        end: Point::new(cx, 0.0),
        stroke,
    });
    let half = ARROW_SIZE / 2.0;
    list.push(DisplayCommand::Polygon {
        points: vec![
            Point::new(width, cy),
            Point::new(width - ARROW_SIZE, cy - half),
            Point::new(width - ARROW_SIZE, cy + half),
        ],
        color,
    });
    list.push(DisplayCommand::Polygon {
        points: vec![
            Point::new(cx, 0.0),
            Point::new(cx - half, ARROW_SIZE),
            Point::new(cx + half, ARROW_SIZE),
        ],
        color,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, colors: Option<PatternColors>) -> PatternRequest<'_> {
        PatternRequest {
            pattern_id: id,
            width_px: 100.0,
            height_px: 90.0,
            colors,
        }
    }

    fn commands(drawing: PatternDrawing) -> Vec<DisplayCommand> {
        match drawing {
            PatternDrawing::Primitives(list) => list.commands,
            PatternDrawing::Placeholder { .. } => panic!("expected primitives"),
        }
    }

    fn within(point: Point, width: f32, height: f32) -> bool {
        let eps = 1e-3;
        point.x >= -eps && point.y >= -eps && point.x <= width + eps && point.y <= height + eps
    }

    #[test]
    fn table_knows_every_practice_pattern() {
        let table = PatternTable::new();
        assert_eq!(table.ids().count(), 11);
        assert_eq!(table.cell_size("tian-zi-ge"), Some((40.0, 40.0)));
        assert_eq!(table.cell_size("jiu-gong-ge"), Some((60.0, 60.0)));
        assert!(!table.contains("floral-letter"));
    }

    #[test]
    fn unknown_pattern_falls_back_to_placeholder() {
        let drawing = PatternTable::new().paint(&request("no-such-grid", None));
        assert_eq!(drawing, PatternDrawing::placeholder());
        assert!(drawing.is_placeholder());
    }

    #[test]
    fn primitives_stay_inside_requested_area() {
        let table = PatternTable::new();
        for id in table.ids().collect::<Vec<_>>() {
            for command in commands(table.paint(&request(id, None))) {
                match command {
                    DisplayCommand::Line { start, end, .. } => {
                        assert!(within(start, 100.0, 90.0), "{id}: {start:?}");
                        assert!(within(end, 100.0, 90.0), "{id}: {end:?}");
                    }
                    DisplayCommand::Dot { center, .. } => {
                        assert!(within(center, 100.0, 90.0), "{id}: {center:?}")
                    }
                    DisplayCommand::Polygon { points, .. } => {
                        assert!(points.iter().all(|p| within(*p, 100.0, 90.0)))
                    }
                    other => panic!("{id}: unexpected {other:?}"),
                }
            }
        }
    }

    #[test]
    fn custom_colours_replace_default_inks() {
        let colors = PatternColors {
            primary: HexColor::rgb(0xEF, 0x44, 0x44),
            secondary: HexColor::rgb(0x22, 0xC5, 0x5E),
        };
        let drawn = commands(PatternTable::new().paint(&request("tian-zi-ge", Some(colors))));
        let strokes: Vec<HexColor> = drawn
            .iter()
            .filter_map(|command| match command {
                DisplayCommand::Line { stroke, .. } => Some(stroke.color),
                _ => None,
            })
            .collect();
        assert!(strokes.contains(&colors.primary));
        assert!(strokes.contains(&colors.secondary));
        assert!(!strokes.contains(&INK_STRONG));
        assert!(!strokes.contains(&INK_MEDIUM));
    }

    #[test]
    fn default_inks_without_custom_colours() {
        let drawn = commands(PatternTable::new().paint(&request("music-staff", None)));
        assert!(drawn.iter().all(|command| matches!(
            command,
            DisplayCommand::Line { stroke, .. } if stroke.color == INK_STRONG
        )));
    }

    #[test]
    fn dot_grid_places_one_dot_per_cell() {
        let drawn = commands(PatternTable::new().paint(&PatternRequest {
            pattern_id: "dot-grid",
            width_px: 60.0,
            height_px: 40.0,
            colors: None,
        }));
        assert_eq!(drawn.len(), 6);
    }

    #[test]
    fn coordinate_paper_draws_axes_with_arrows() {
        let drawn = commands(PatternTable::new().paint(&request("coordinate-paper", None)));
        let polygons = drawn
            .iter()
            .filter(|command| matches!(command, DisplayCommand::Polygon { .. }))
            .count();
        assert_eq!(polygons, 2);
        assert!(drawn.iter().any(|command| matches!(
            command,
            DisplayCommand::Line { stroke, .. } if stroke.width == AXIS_WIDTH
        )));
    }

    #[test]
    fn diagonal_lines_are_clipped() {
        let (start, end) =
            clip_segment(Point::new(0.0, 0.0), Point::new(40.0, 40.0), 20.0, 30.0).unwrap();
        assert_eq!(start, Point::new(0.0, 0.0));
        assert_eq!(end, Point::new(20.0, 20.0));
        assert!(clip_segment(Point::new(50.0, 0.0), Point::new(60.0, 0.0), 20.0, 30.0).is_none());
    }

    #[test]
    fn empty_area_draws_nothing() {
        let drawing = PatternTable::new().paint(&PatternRequest {
            pattern_id: "math-grid",
            width_px: 0.0,
            height_px: 50.0,
            colors: None,
        });
        assert_eq!(drawing, PatternDrawing::Primitives(DisplayList::new()));
    }
}
