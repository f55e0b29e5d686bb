use std::time::Duration;

use papercraft_catalog::{Catalog, InMemoryCatalog};
use papercraft_printing::{
    AppState, ColorMode, JobStatus, PaperSize, PrintQueue, PrintQueueError, PrintSettings,
    PrinterStatus, QueueNotice, QueueTimings, RandomProgress,
};

fn ready_state(seed: u64) -> AppState {
    let queue = PrintQueue::new(QueueTimings::default()).with_progress(RandomProgress::seeded(seed));
    let mut state = AppState::new(queue);
    state.queue_mut().connect();
    let notices = state.advance(Duration::from_secs(2));
    assert_eq!(notices, vec![QueueNotice::PrinterConnected]);
    state
}

#[test]
fn seeded_job_runs_to_completion_and_is_removed() {
    let catalog = InMemoryCatalog::builtin().expect("builtin catalog");
    let style = catalog
        .style_by_id("calligraphy-large-grid")
        .expect("lookup")
        .expect("style present");
    let mut state = ready_state(42);

    let mut settings = PrintSettings::default();
    settings.set_color_mode(ColorMode::Grayscale);
    settings.set_copies(3);
    let id = state
        .queue_mut()
        .submit(&style, PaperSize::A3, settings.clone());
    state.queue_mut().start(id).expect("start");

    let tick = state.queue().timings().tick_interval;
    let mut last_progress = 0;
    let mut completed = false;
    for _ in 0..1000 {
        let notices = state.advance(tick);
        if notices
            .iter()
            .any(|notice| matches!(notice, QueueNotice::PrintCompleted { job, .. } if *job == id))
        {
            completed = true;
            break;
        }
        let progress = state.queue().job(id).expect("job present").progress();
        assert!(progress >= last_progress, "progress went backwards");
        last_progress = progress;
    }
    assert!(completed, "job never completed");
    assert_eq!(
        state.queue().job(id).expect("still listed").status(),
        JobStatus::Completed
    );

    let record = &state.history()[0];
    assert_eq!(record.job_id, id);
    assert_eq!(record.paper_size, PaperSize::A3);
    assert_eq!(record.settings, settings);

    state.advance(Duration::from_secs(2));
    assert!(state.queue().job(id).is_none());
}

#[test]
fn disconnected_printer_blocks_start_only() {
    let catalog = InMemoryCatalog::builtin().expect("builtin catalog");
    let style = catalog
        .style_by_id("music-staff")
        .expect("lookup")
        .expect("style present");
    let mut state = ready_state(1);
    state.queue_mut().disconnect();
    assert_eq!(state.queue().printer_status(), PrinterStatus::Disconnected);

    let id = state
        .queue_mut()
        .submit(&style, PaperSize::A4, PrintSettings::default());
    assert!(matches!(
        state.queue_mut().start(id),
        Err(PrintQueueError::PrinterNotConnected)
    ));
    assert_eq!(
        state.queue().job(id).expect("job present").status(),
        JobStatus::Pending
    );

    state.queue_mut().delete(id).expect("delete pending");
    assert!(state.queue().is_empty());
}

#[test]
fn reprint_from_session_history() {
    let catalog = InMemoryCatalog::builtin().expect("builtin catalog");
    let style = catalog
        .style_by_id("dot-grid")
        .expect("lookup")
        .expect("style present");
    let mut state = ready_state(7);
    let id = state
        .queue_mut()
        .submit(&style, PaperSize::Letter, PrintSettings::default());
    state.queue_mut().start(id).expect("start");
    for _ in 0..1000 {
        state.advance(Duration::from_millis(500));
        if !state.history().is_empty() {
            break;
        }
    }
    let record = state.history()[0].clone();
    let again = state.queue_mut().reprint(&record);
    let job = state.queue().job(again).expect("reprinted job");
    assert_ne!(again, id);
    assert_eq!(job.style_name, style.name);
    assert_eq!(job.paper_size, PaperSize::Letter);
    assert_eq!(job.status(), JobStatus::Pending);
}
