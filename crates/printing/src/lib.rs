//! Print-preview engine: paper sizes, print settings, page layout, colour
//! handling, preview rendering and the simulated print queue.

pub mod color;
pub mod display;
pub mod job;
pub mod layout;
pub mod paper;
pub mod pattern;
pub mod queue;
pub mod raster;
pub mod render;
pub mod schedule;
pub mod settings;
pub mod state;

pub use color::{ColorFilter, HexColor, PatternColors};
pub use display::{DisplayCommand, DisplayList, Point, Stroke, TextRun};
pub use job::{JobStatus, PrintHistoryRecord, PrintJob, PrintJobId, TransitionError};
pub use layout::{
    compute_layout, BandGeometry, Insets, LayoutRequest, PageGeometry, PrintableArea, Rect,
    Rotation, Zoom,
};
pub use paper::{PaperError, PaperSize};
pub use pattern::{PatternDrawing, PatternPainter, PatternRequest, PatternTable};
pub use queue::{
    DiscardHistory, FixedProgress, HistorySink, HistorySinkError, PrintQueue, PrintQueueError,
    PrinterStatus, ProgressSource, QueueNotice, QueueTimings, RandomProgress,
};
pub use render::{
    encode_png, rasterize, DirectoryImageSource, ImageSource, NoImages, PreviewContent,
    PreviewFrame, PreviewRenderer, RenderError,
};
pub use schedule::{Scheduler, Ticket};
pub use settings::{
    Alignment, ColorMode, CustomColorSettings, HeaderFooterBand, HeaderFooterConfig, MarginPreset,
    MarginSide, Orientation, PageMargins, PrintQuality, PrintSettings,
};
pub use state::AppState;
