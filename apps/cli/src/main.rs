use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use papercraft_catalog::{Catalog, InMemoryCatalog, Style, StyleQuery};
use papercraft_printing::{
    compute_layout, encode_png, rasterize, BandGeometry, ColorMode, DirectoryImageSource,
    HeaderFooterBand, HexColor, ImageSource, LayoutRequest, NoImages, Orientation, PageGeometry,
    PageMargins, PaperSize, PatternTable, PreviewFrame, PreviewRenderer, PrintQueue,
    PrintSettings, QueueNotice, RandomProgress, Rect, Rotation, Zoom,
};
use papercraft_settings::{
    DataPaths, FavoritesStore, HistoryStore, PreferencesStore, UserHistorySink, UserId,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Upper bound on simulated ticks before `print` gives up.
const MAX_PRINT_TICKS: usize = 10_000;

#[derive(Parser)]
#[command(
    name = "papercraft-cli",
    about = "Print-preview layout and print simulation for PaperCraft styles",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// 使用者代號。 / User whose favorites and history are used.
    #[arg(long, global = true, value_name = "USER", default_value = UserId::LOCAL)]
    user: String,
    /// 從資料夾載入 categories.json 與 styles.json。 / Load the catalog from a directory instead of the built-in data.
    #[arg(long, global = true, value_name = "DIR")]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 計算預覽頁面的幾何配置。 / Print the page, content and band geometry.
    Layout(LayoutArgs),
    /// 將樣式預覽輸出為 PNG。 / Render a style preview to a PNG file.
    Preview(PreviewArgs),
    /// 瀏覽樣式目錄。 / Browse the style catalog.
    #[command(subcommand)]
    Catalog(CatalogCommand),
    /// 模擬列印一個樣式。 / Simulate printing a style.
    Print(PrintArgs),
    /// 列印紀錄。 / Print history.
    #[command(subcommand)]
    History(HistoryCommand),
    /// 收藏的樣式。 / Favorite styles.
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// 顯示、匯入或匯出偏好設定。 / Show, import or export preferences.
    #[command(subcommand)]
    Preferences(PreferencesCommand),
}

/// Page options shared by `layout` and `preview`.
#[derive(Args)]
struct PageArgs {
    /// 紙張尺寸（A4、Letter 或 `寬x高` 毫米）。 / Paper size id or `WxH` in millimetres.
    #[arg(long)]
    paper: Option<PaperSize>,
    #[arg(long)]
    landscape: bool,
    /// Zoom in percent; snapped to 50..=200 in steps of 25.
    #[arg(long, default_value_t = 100)]
    zoom: u32,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    rotation: i32,
    /// Margins in millimetres as `TOP,RIGHT,BOTTOM,LEFT`.
    #[arg(long, value_name = "T,R,B,L", conflicts_with = "preset")]
    margins: Option<String>,
    /// Margin preset (`none` or `standard`).
    #[arg(long)]
    preset: Option<String>,
    #[arg(long, value_name = "TEXT")]
    header: Option<String>,
    #[arg(long, value_name = "TEXT")]
    footer: Option<String>,
}

#[derive(Args)]
struct LayoutArgs {
    #[command(flatten)]
    page: PageArgs,
    /// Emit the geometry as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PreviewArgs {
    style_id: String,
    #[command(flatten)]
    page: PageArgs,
    /// 輸出檔案；預設為 `<style-id>.png`。 / Output file, `<style-id>.png` by default.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
    #[arg(long, value_name = "MODE")]
    color_mode: Option<ColorMode>,
    #[arg(long, value_name = "HEX")]
    primary: Option<HexColor>,
    #[arg(long, value_name = "HEX")]
    secondary: Option<HexColor>,
    #[arg(long, value_name = "HEX")]
    background: Option<HexColor>,
    /// Directory holding the images of raster styles.
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,
}

#[derive(Subcommand)]
enum CatalogCommand {
    /// List categories.
    Categories,
    /// List styles, optionally filtered.
    Styles(StylesArgs),
    /// Show one style and related styles.
    Show { id: String },
}

#[derive(Args)]
struct StylesArgs {
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long)]
    offset: Option<usize>,
}

#[derive(Args)]
struct PrintArgs {
    style_id: String,
    #[arg(long)]
    paper: Option<PaperSize>,
    #[arg(long)]
    landscape: bool,
    /// Number of copies; clamped to at least one.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    copies: i64,
    #[arg(long, value_name = "MODE")]
    color_mode: Option<ColorMode>,
    /// Seed for the simulated progress steps.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum HistoryCommand {
    List {
        #[arg(long)]
        json: bool,
    },
    Stats,
    Delete {
        id: u64,
    },
    Clear,
}

#[derive(Subcommand)]
enum FavoritesCommand {
    List {
        #[arg(long)]
        category: Option<String>,
    },
    Add {
        style_id: String,
    },
    Remove {
        style_id: String,
    },
    Toggle {
        style_id: String,
    },
    Clear,
}

#[derive(Subcommand)]
enum PreferencesCommand {
    /// 顯示目前的偏好設定。 / Print the current preferences as JSON.
    Show,
    /// 匯出偏好設定。 / Export preferences to a JSON file.
    Export(PreferencesExportArgs),
    /// 匯入偏好設定。 / Import preferences from a JSON file.
    Import(PreferencesImportArgs),
}

#[derive(Args)]
struct PreferencesExportArgs {
    /// 輸出檔案路徑。 / Destination file path.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
}

#[derive(Args)]
struct PreferencesImportArgs {
    /// 輸入檔案路徑。 / Source preferences JSON.
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

/// Resolved global options.
struct Session {
    paths: DataPaths,
    user: UserId,
    catalog_dir: Option<PathBuf>,
}

impl Session {
    fn catalog(&self) -> Result<InMemoryCatalog> {
        match &self.catalog_dir {
            Some(dir) => InMemoryCatalog::load(dir)
                .with_context(|| format!("failed to load catalog from {}", dir.display())),
            None => InMemoryCatalog::builtin().context("failed to load the built-in catalog"),
        }
    }

    fn style(&self, id: &str) -> Result<Style> {
        self.catalog()?
            .style_by_id(id)?
            .ok_or_else(|| anyhow!("unknown style '{id}'"))
    }

    fn preferences(&self) -> Result<PreferencesStore> {
        let path = self.paths.preferences();
        PreferencesStore::load(&path)
            .with_context(|| format!("failed to load preferences from {}", path.display()))
    }

    fn favorites(&self) -> Result<FavoritesStore> {
        let path = self.paths.favorites();
        FavoritesStore::load(&path)
            .with_context(|| format!("failed to load favorites from {}", path.display()))
    }

    fn history(&self) -> Result<HistoryStore> {
        let path = self.paths.history();
        HistoryStore::load(&path)
            .with_context(|| format!("failed to load history from {}", path.display()))
    }
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let Cli {
        workspace,
        user,
        catalog,
        command,
    } = Cli::parse();
    let workspace_root = resolve_workspace(workspace)?;
    let ctx = Session {
        paths: DataPaths::for_workspace(&workspace_root),
        user: UserId::new(user),
        catalog_dir: catalog.map(|dir| resolve_input_path(&dir)).transpose()?,
    };
    debug!(workspace = %workspace_root.display(), user = %ctx.user, "cli context resolved");

    match command {
        Commands::Layout(args) => execute_layout(args, &ctx),
        Commands::Preview(args) => execute_preview(args, &ctx),
        Commands::Catalog(subcommand) => execute_catalog_command(subcommand, &ctx),
        Commands::Print(args) => execute_print(args, &ctx),
        Commands::History(subcommand) => execute_history_command(subcommand, &ctx),
        Commands::Favorites(subcommand) => execute_favorites_command(subcommand, &ctx),
        Commands::Preferences(subcommand) => execute_preferences_command(subcommand, &ctx),
    }
}

/// Builds the session settings: preferences first, then the page flags.
fn session_settings(page: &PageArgs, ctx: &Session) -> Result<(PrintSettings, PaperSize)> {
    let prefs = ctx.preferences()?;
    let mut settings = prefs.preferences().initial_print_settings();
    let paper = page.paper.unwrap_or(prefs.preferences().default_paper_size);
    if page.landscape {
        settings.set_orientation(Orientation::Landscape);
    }
    match (&page.margins, &page.preset) {
        (Some(raw), _) => settings.set_margins(parse_margins(raw)?),
        (None, Some(name)) => {
            if !settings.apply_preset(name) {
                bail!("unknown margin preset '{name}' (expected none or standard)");
            }
        }
        (None, None) => {}
    }
    if let Some(text) = &page.header {
        settings.set_header(HeaderFooterBand::with_text(text.clone()));
    }
    if let Some(text) = &page.footer {
        settings.set_footer(HeaderFooterBand::with_text(text.clone()));
    }
    Ok((settings, paper))
}

fn parse_margins(raw: &str) -> Result<PageMargins> {
    let values = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .with_context(|| format!("invalid margin '{}'", part.trim()))
        })
        .collect::<Result<Vec<_>>>()?;
    match values.as_slice() {
        [all] => Ok(PageMargins::uniform(*all)),
        [top, right, bottom, left] => Ok(PageMargins {
            top: *top,
            right: *right,
            bottom: *bottom,
            left: *left,
        }),
        _ => bail!("--margins expects one value or four values (T,R,B,L), got '{raw}'"),
    }
}

fn execute_layout(args: LayoutArgs, ctx: &Session) -> Result<()> {
    let (settings, paper) = session_settings(&args.page, ctx)?;
    let request = LayoutRequest::from_settings(
        paper,
        &settings,
        Zoom::new(args.page.zoom),
        Rotation::from_degrees(args.page.rotation),
    );
    let geometry = compute_layout(&request);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&geometry)?);
        return Ok(());
    }
    print_geometry(paper, settings.orientation(), &geometry);
    Ok(())
}

fn print_geometry(paper: PaperSize, orientation: Orientation, geometry: &PageGeometry) {
    println!(
        "Paper: {} {} (aspect {:.4})",
        paper.label(),
        orientation,
        geometry.aspect_ratio
    );
    println!(
        "Zoom: {}%  Rotation: {}°",
        geometry.zoom.percent(),
        geometry.rotation.degrees()
    );
    println!("Page:    {}", format_rect(&geometry.page));
    println!("Content: {}", format_rect(&geometry.content));
    let insets = &geometry.margins;
    println!(
        "Margins: top {:.2} right {:.2} bottom {:.2} left {:.2}",
        insets.top, insets.right, insets.bottom, insets.left
    );
    if geometry.is_degenerate() {
        println!("warning: margins leave no printable area");
    }
    for (label, band) in [("Header", &geometry.header), ("Footer", &geometry.footer)] {
        if let Some(band) = band {
            print_band(label, band);
        }
    }
}

fn print_band(label: &str, band: &BandGeometry) {
    println!(
        "{label}:  {} font {:.2} padding {:.2} align {} \"{}\"",
        format_rect(&band.rect),
        band.font_size,
        band.padding,
        band.alignment,
        band.text
    );
}

fn format_rect(rect: &Rect) -> String {
    format!(
        "x {:.2} y {:.2} w {:.2} h {:.2}",
        rect.x, rect.y, rect.width, rect.height
    )
}

fn execute_preview(args: PreviewArgs, ctx: &Session) -> Result<()> {
    let style = ctx.style(&args.style_id)?;
    let (mut settings, paper) = session_settings(&args.page, ctx)?;
    if let Some(mode) = args.color_mode {
        settings.set_color_mode(mode);
    }
    if let Some(color) = args.primary {
        settings.set_primary_color(color);
    }
    if let Some(color) = args.secondary {
        settings.set_secondary_color(color);
    }
    if let Some(color) = args.background {
        settings.set_background_color(color);
    }
    let zoom = Zoom::new(args.page.zoom);
    let rotation = Rotation::from_degrees(args.page.rotation);

    let frame = match &args.images {
        Some(dir) => {
            let images = DirectoryImageSource::new(resolve_input_path(dir)?);
            compose(images, &style, &settings, paper, zoom, rotation)
        }
        None => compose(NoImages, &style, &settings, paper, zoom, rotation),
    };

    let output = match args.output {
        Some(path) => resolve_input_path(&path)?,
        None => resolve_input_path(Path::new(&format!("{}.png", style.id)))?,
    };
    let raster = rasterize(&frame);
    let data = encode_png(&raster)?;
    fs::write(&output, data)
        .with_context(|| format!("failed to write preview to {}", output.display()))?;

    println!(
        "Wrote {} preview of '{}' ({}x{}, filter {}) to {}",
        paper,
        style.id,
        raster.width(),
        raster.height(),
        frame.filter_css(),
        output.display()
    );
    if frame.is_placeholder() {
        println!("note: style image unavailable, a placeholder was drawn");
    }
    Ok(())
}

fn compose<I: ImageSource>(
    images: I,
    style: &Style,
    settings: &PrintSettings,
    paper: PaperSize,
    zoom: Zoom,
    rotation: Rotation,
) -> PreviewFrame {
    PreviewRenderer::with_collaborators(PatternTable::new(), images)
        .compose(style, settings, paper, zoom, rotation)
}

fn execute_catalog_command(command: CatalogCommand, ctx: &Session) -> Result<()> {
    let catalog = ctx.catalog()?;
    match command {
        CatalogCommand::Categories => {
            for category in catalog.list_categories()? {
                println!("{}\t{}", category.id, category.name);
            }
        }
        CatalogCommand::Styles(args) => {
            let query = StyleQuery {
                category: args.category,
                search: args.search,
                limit: args.limit,
                offset: args.offset,
            };
            let page = catalog.list_styles(&query)?;
            for style in &page.styles {
                println!("{}\t{}\t{}", style.id, style.category_id, style.name);
            }
            println!(
                "Showing {} of {} styles{}",
                page.styles.len(),
                page.total,
                if page.has_more { " (more available)" } else { "" }
            );
        }
        CatalogCommand::Show { id } => {
            let style = catalog
                .style_by_id(&id)?
                .ok_or_else(|| anyhow!("unknown style '{id}'"))?;
            println!("{}", serde_json::to_string_pretty(&style)?);
            let favorites = ctx.favorites()?;
            if favorites.is_favorite(&ctx.user, &style.id) {
                println!("Favorite: yes");
            }
            let related = catalog.related_styles(&id, papercraft_catalog::RELATED_LIMIT)?;
            if !related.is_empty() {
                println!("Related:");
                for style in related {
                    println!("  {}\t{}", style.id, style.name);
                }
            }
        }
    }
    Ok(())
}

fn execute_print(args: PrintArgs, ctx: &Session) -> Result<()> {
    let style = ctx.style(&args.style_id)?;
    let prefs = ctx.preferences()?;
    let mut settings = prefs.preferences().initial_print_settings();
    let paper = args.paper.unwrap_or(prefs.preferences().default_paper_size);
    if args.landscape {
        settings.set_orientation(Orientation::Landscape);
    }
    if let Some(mode) = args.color_mode {
        settings.set_color_mode(mode);
    }
    settings.set_copies(args.copies);

    let timings = prefs.preferences().printing.timings();
    let progress = args
        .seed
        .map_or_else(RandomProgress::new, RandomProgress::seeded);
    let sink = UserHistorySink::new(ctx.history()?, ctx.user.clone());
    let mut queue = PrintQueue::new(timings)
        .with_progress(progress)
        .with_history_sink(sink);

    queue.connect();
    queue.advance(timings.connect_delay);
    let id = queue.submit(&style, paper, settings);
    queue.start(id)?;

    let mut failed = false;
    let mut last_progress = None;
    for _ in 0..MAX_PRINT_TICKS {
        queue.advance(timings.tick_interval);
        if let Some(job) = queue.job(id) {
            if last_progress != Some(job.progress()) {
                println!("Progress: {}%", job.progress());
                last_progress = Some(job.progress());
            }
        }
        for notice in queue.drain_notices() {
            match &notice {
                QueueNotice::HistoryWriteFailed { .. } => {
                    failed = true;
                    eprintln!("warning: {notice}");
                }
                QueueNotice::PrintStarted { .. } | QueueNotice::PrintCompleted { .. } => {
                    println!("{notice}");
                }
                _ => {}
            }
        }
        let done = queue
            .job(id)
            .map_or(true, |job| job.status().is_terminal());
        if done {
            if !failed {
                println!("Recorded in history for user {}", ctx.user);
            }
            return Ok(());
        }
    }
    bail!("print job {id} did not finish after {MAX_PRINT_TICKS} ticks")
}

fn execute_history_command(command: HistoryCommand, ctx: &Session) -> Result<()> {
    let mut store = ctx.history()?;
    match command {
        HistoryCommand::List { json } => {
            let entries = store.list(&ctx.user);
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            if entries.is_empty() {
                println!("No print history for {}", ctx.user);
            }
            for (date, group) in store.grouped_by_date(&ctx.user) {
                println!("{date}");
                for entry in group {
                    let record = &entry.record;
                    println!(
                        "  #{}\t{}\t{}\t{}\t{} copies",
                        entry.id,
                        record.created_at.format("%H:%M:%S"),
                        record.reprint_name(),
                        record.paper_size,
                        record.settings.copies()
                    );
                }
            }
        }
        HistoryCommand::Stats => {
            let stats = store.stats(&ctx.user);
            println!("Total prints: {}", stats.total_prints);
            println!("Unique styles: {}", stats.unique_styles);
            println!("Most used paper size: {}", stats.most_used_paper_size);
            for (paper, count) in &stats.paper_size_counts {
                println!("  {paper}: {count}");
            }
            let recent: Vec<String> = store
                .recent_paper_sizes(&ctx.user)
                .iter()
                .map(ToString::to_string)
                .collect();
            if !recent.is_empty() {
                println!("Recent paper sizes: {}", recent.join(", "));
            }
        }
        HistoryCommand::Delete { id } => {
            if !store.delete(&ctx.user, id)? {
                bail!("no history entry #{id} for {}", ctx.user);
            }
            println!("Deleted history entry #{id}");
        }
        HistoryCommand::Clear => {
            let removed = store.clear(&ctx.user)?;
            println!("Cleared {removed} history entries");
        }
    }
    Ok(())
}

fn execute_favorites_command(command: FavoritesCommand, ctx: &Session) -> Result<()> {
    let mut store = ctx.favorites()?;
    match command {
        FavoritesCommand::List { category } => {
            let favorites = match category.as_deref() {
                Some(category) => store.by_category(&ctx.user, category),
                None => store.list(&ctx.user),
            };
            for favorite in &favorites {
                println!(
                    "{}\t{}\t{}",
                    favorite.style_id, favorite.style_category, favorite.style_name
                );
            }
            println!("{} favorites", favorites.len());
        }
        FavoritesCommand::Add { style_id } => {
            let style = ctx.style(&style_id)?;
            if store.add(&ctx.user, &style)? {
                println!("Added '{}' to favorites", style.id);
            } else {
                println!("'{}' is already a favorite", style.id);
            }
        }
        FavoritesCommand::Remove { style_id } => {
            if store.remove(&ctx.user, &style_id)? {
                println!("Removed '{style_id}' from favorites");
            } else {
                println!("'{style_id}' is not a favorite");
            }
        }
        FavoritesCommand::Toggle { style_id } => {
            let style = ctx.style(&style_id)?;
            let now_favorite = store.toggle(&ctx.user, &style)?;
            println!(
                "'{}' {}",
                style.id,
                if now_favorite {
                    "added to favorites"
                } else {
                    "removed from favorites"
                }
            );
        }
        FavoritesCommand::Clear => {
            let removed = store.clear(&ctx.user)?;
            println!("Cleared {removed} favorites");
        }
    }
    Ok(())
}

fn execute_preferences_command(command: PreferencesCommand, ctx: &Session) -> Result<()> {
    match command {
        PreferencesCommand::Show => {
            let store = ctx.preferences()?;
            println!("{}", serde_json::to_string_pretty(store.preferences())?);
            Ok(())
        }
        PreferencesCommand::Export(args) => export_preferences(args, ctx),
        PreferencesCommand::Import(args) => import_preferences(args, ctx),
    }
}

fn export_preferences(args: PreferencesExportArgs, ctx: &Session) -> Result<()> {
    let store = ctx.preferences()?;
    let output = resolve_input_path(&args.output)?;
    store
        .export_to(&output)
        .with_context(|| format!("failed to export preferences to {}", output.display()))?;
    println!("Exported preferences to {}", output.display());
    Ok(())
}

fn import_preferences(args: PreferencesImportArgs, ctx: &Session) -> Result<()> {
    let mut store = ctx.preferences()?;
    let input = resolve_input_path(&args.input)?;
    if !input.exists() {
        bail!("preferences file '{}' does not exist", input.display());
    }
    store
        .import_from(&input)
        .with_context(|| format!("failed to import preferences from {}", input.display()))?;
    println!("Imported preferences from {}", input.display());
    Ok(())
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => resolve_input_path(&path),
        None => std::env::current_dir().context("determine current directory"),
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
