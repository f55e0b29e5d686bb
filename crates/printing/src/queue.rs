use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use papercraft_catalog::Style;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::job::{JobStatus, PrintHistoryRecord, PrintJob, PrintJobId, TransitionError};
use crate::paper::PaperSize;
use crate::schedule::{Scheduler, Ticket};
use crate::settings::PrintSettings;

/// Delays and progress bounds of the simulated printer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueTimings {
    pub tick_interval: Duration,
    pub completed_removal: Duration,
    pub cancelled_removal: Duration,
    pub connect_delay: Duration,
    /// Upper bound (exclusive) of one progress step, in percent.
    pub max_progress_step: f32,
}

impl Default for QueueTimings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            completed_removal: Duration::from_millis(2000),
            cancelled_removal: Duration::from_millis(1000),
            connect_delay: Duration::from_millis(2000),
            max_progress_step: 20.0,
        }
    }
}

/// Supplies the progress increment applied on each tick.
pub trait ProgressSource {
    fn next_step(&mut self, max_step: f32) -> f32;
}

/// Uniform steps in `[0, max_step)`.
#[derive(Debug, Clone)]
pub struct RandomProgress {
    rng: StdRng,
}

impl RandomProgress {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible sequence of steps.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSource for RandomProgress {
    fn next_step(&mut self, max_step: f32) -> f32 {
        if max_step <= 0.0 {
            return 0.0;
        }
        self.rng.random_range(0.0..max_step)
    }
}

/// Always advances by the same amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedProgress(pub f32);

impl ProgressSource for FixedProgress {
    fn next_step(&mut self, _max_step: f32) -> f32 {
        self.0
    }
}

/// Failure reported by a [`HistorySink`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HistorySinkError(Box<dyn StdError + Send + Sync + 'static>);

impl HistorySinkError {
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self(err.into())
    }
}

/// Receives a record for every job that completes.
pub trait HistorySink {
    fn record(&mut self, record: &PrintHistoryRecord) -> Result<(), HistorySinkError>;
}

/// Sink that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardHistory;

impl HistorySink for DiscardHistory {
    fn record(&mut self, _record: &PrintHistoryRecord) -> Result<(), HistorySinkError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrinterStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Things the queue reports as they happen; drained by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueNotice {
    PrintStarted {
        job: PrintJobId,
        style_name: String,
    },
    PrintCompleted {
        job: PrintJobId,
        record: PrintHistoryRecord,
    },
    PrintCancelled {
        job: PrintJobId,
    },
    JobRemoved {
        job: PrintJobId,
    },
    PrinterConnected,
    PrinterDisconnected,
    HistoryWriteFailed {
        job: PrintJobId,
        message: String,
    },
}

impl fmt::Display for QueueNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueNotice::PrintStarted { style_name, .. } => {
                write!(f, "Printing {style_name}")
            }
            QueueNotice::PrintCompleted { record, .. } => {
                write!(f, "Print completed: {}", record.reprint_name())
            }
            QueueNotice::PrintCancelled { job } => write!(f, "Print cancelled: {job}"),
            QueueNotice::JobRemoved { job } => write!(f, "Removed {job}"),
            QueueNotice::PrinterConnected => f.write_str("Printer connected"),
            QueueNotice::PrinterDisconnected => f.write_str("Printer disconnected"),
            QueueNotice::HistoryWriteFailed { job, message } => {
                write!(f, "Could not save history for {job}: {message}")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PrintQueueError {
    #[error("printer is not connected")]
    PrinterNotConnected,
    #[error("unknown print job {0}")]
    UnknownJob(PrintJobId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum QueueEvent {
    Tick(PrintJobId),
    Remove(PrintJobId),
    PrinterReady,
}

#[derive(Debug)]
struct QueuedJob {
    job: PrintJob,
    ticker: Option<Ticket>,
    removal: Option<Ticket>,
}

/// Print jobs of one session and the simulated printer they go to.
///
/// All timing runs on the queue's own virtual clock; call
/// [`PrintQueue::advance`] to let time pass.
pub struct PrintQueue {
    jobs: Vec<QueuedJob>,
    printer: PrinterStatus,
    connect_ticket: Option<Ticket>,
    scheduler: Scheduler<QueueEvent>,
    timings: QueueTimings,
    progress: Box<dyn ProgressSource>,
    sink: Box<dyn HistorySink>,
    notices: Vec<QueueNotice>,
}

impl fmt::Debug for PrintQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintQueue")
            .field("jobs", &self.jobs)
            .field("printer", &self.printer)
            .field("timings", &self.timings)
            .field("now", &self.scheduler.now())
            .finish_non_exhaustive()
    }
}

impl Default for PrintQueue {
    fn default() -> Self {
        Self::new(QueueTimings::default())
    }
}

impl PrintQueue {
    pub fn new(timings: QueueTimings) -> Self {
        Self {
            jobs: Vec::new(),
            printer: PrinterStatus::Disconnected,
            connect_ticket: None,
            scheduler: Scheduler::new(),
            timings,
            progress: Box::new(RandomProgress::new()),
            sink: Box::new(DiscardHistory),
            notices: Vec::new(),
        }
    }

    pub fn with_progress(mut self, progress: impl ProgressSource + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn with_history_sink(mut self, sink: impl HistorySink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn timings(&self) -> QueueTimings {
        self.timings
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn printer_status(&self) -> PrinterStatus {
        self.printer
    }

    pub fn jobs(&self) -> impl Iterator<Item = &PrintJob> {
        self.jobs.iter().map(|entry| &entry.job)
    }

    pub fn job(&self, id: PrintJobId) -> Option<&PrintJob> {
        self.entry(id).map(|entry| &entry.job)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// True while any job is printing or waiting for removal.
    pub fn has_active_timers(&self) -> bool {
        self.scheduler.pending() > 0
    }

    fn entry(&self, id: PrintJobId) -> Option<&QueuedJob> {
        self.jobs.iter().find(|entry| entry.job.id == id)
    }

    fn entry_mut(&mut self, id: PrintJobId) -> Result<&mut QueuedJob, PrintQueueError> {
        self.jobs
            .iter_mut()
            .find(|entry| entry.job.id == id)
            .ok_or(PrintQueueError::UnknownJob(id))
    }

    /// Begins connecting; the printer is ready after `connect_delay`.
    pub fn connect(&mut self) {
        if self.printer != PrinterStatus::Disconnected {
            return;
        }
        self.printer = PrinterStatus::Connecting;
        self.connect_ticket = Some(
            self.scheduler
                .schedule_once(self.timings.connect_delay, QueueEvent::PrinterReady),
        );
        debug!("printer connecting");
    }

    /// Drops the link at once, abandoning a pending connect. Jobs already
    /// printing keep going.
    pub fn disconnect(&mut self) {
        if let Some(ticket) = self.connect_ticket.take() {
            self.scheduler.cancel(ticket);
        }
        if self.printer != PrinterStatus::Disconnected {
            self.printer = PrinterStatus::Disconnected;
            self.notices.push(QueueNotice::PrinterDisconnected);
            info!("printer disconnected");
        }
    }

    pub fn submit(&mut self, style: &Style, paper: PaperSize, settings: PrintSettings) -> PrintJobId {
        self.enqueue(PrintJob::new(
            style.id.clone(),
            style.name.clone(),
            paper,
            settings,
        ))
    }

    /// Queues a fresh job from a history record.
    pub fn reprint(&mut self, record: &PrintHistoryRecord) -> PrintJobId {
        self.enqueue(PrintJob::new(
            record.style_id.clone(),
            record.reprint_name(),
            record.paper_size,
            record.settings.clone(),
        ))
    }

    fn enqueue(&mut self, job: PrintJob) -> PrintJobId {
        let id = job.id;
        debug!(job = %id, style = %job.style_id, "print job submitted");
        self.jobs.push(QueuedJob {
            job,
            ticker: None,
            removal: None,
        });
        id
    }

    pub fn start(&mut self, id: PrintJobId) -> Result<(), PrintQueueError> {
        if self.entry(id).is_none() {
            return Err(PrintQueueError::UnknownJob(id));
        }
        if self.printer != PrinterStatus::Connected {
            warn!(job = %id, "print requested while printer is not connected");
            return Err(PrintQueueError::PrinterNotConnected);
        }
        let interval = self.timings.tick_interval;
        let entry = self.entry_mut(id)?;
        entry.job.start()?;
        let style_name = entry.job.style_name.clone();
        let ticker = self.scheduler.schedule_every(interval, QueueEvent::Tick(id));
        self.entry_mut(id)?.ticker = Some(ticker);
        info!(job = %id, style = %style_name, "print started");
        self.notices
            .push(QueueNotice::PrintStarted { job: id, style_name });
        Ok(())
    }

    /// Printing → Failed at once; the job is removed after
    /// `cancelled_removal`.
    pub fn cancel(&mut self, id: PrintJobId) -> Result<(), PrintQueueError> {
        let entry = self.entry_mut(id)?;
        entry.job.cancel()?;
        let ticker = entry.ticker.take();
        if let Some(ticket) = ticker {
            self.scheduler.cancel(ticket);
        }
        self.schedule_removal(id, self.timings.cancelled_removal)?;
        info!(job = %id, progress = ?self.job(id).map(PrintJob::progress), "print cancelled");
        self.notices.push(QueueNotice::PrintCancelled { job: id });
        Ok(())
    }

    /// Drops a job that is not printing. Pending jobs are marked failed
    /// first; printing jobs must be cancelled instead.
    pub fn delete(&mut self, id: PrintJobId) -> Result<(), PrintQueueError> {
        let entry = self.entry_mut(id)?;
        // Printing jobs reject `discard`.
        if !entry.job.status().is_terminal() {
            entry.job.discard()?;
        }
        self.remove(id);
        Ok(())
    }

    /// Removes a job and its timers. Missing ids are ignored.
    pub fn remove(&mut self, id: PrintJobId) -> bool {
        let Some(index) = self.jobs.iter().position(|entry| entry.job.id == id) else {
            return false;
        };
        let entry = self.jobs.remove(index);
        for ticket in [entry.ticker, entry.removal].into_iter().flatten() {
            self.scheduler.cancel(ticket);
        }
        debug!(job = %id, status = %entry.job.status(), "print job removed");
        self.notices.push(QueueNotice::JobRemoved { job: id });
        true
    }

    fn schedule_removal(&mut self, id: PrintJobId, delay: Duration) -> Result<(), PrintQueueError> {
        let ticket = self.scheduler.schedule_once(delay, QueueEvent::Remove(id));
        let entry = self.entry_mut(id)?;
        if let Some(previous) = entry.removal.replace(ticket) {
            self.scheduler.cancel(previous);
        }
        Ok(())
    }

    /// Lets `by` of virtual time pass, handling every timer that comes due.
    pub fn advance(&mut self, by: Duration) {
        let until = self.scheduler.now() + by;
        while let Some((ticket, event)) = self.scheduler.fire_next(until) {
            match event {
                QueueEvent::Tick(id) => self.on_tick(id, ticket),
                QueueEvent::Remove(id) => {
                    self.remove(id);
                }
                QueueEvent::PrinterReady => self.on_printer_ready(),
            }
        }
    }

    pub fn drain_notices(&mut self) -> Vec<QueueNotice> {
        std::mem::take(&mut self.notices)
    }

    fn on_printer_ready(&mut self) {
        self.connect_ticket = None;
        self.printer = PrinterStatus::Connected;
        info!("printer connected");
        self.notices.push(QueueNotice::PrinterConnected);
    }

    fn on_tick(&mut self, id: PrintJobId, ticket: Ticket) {
        let max_step = self.timings.max_progress_step;
        let step = self.progress.next_step(max_step);
        let Some(index) = self.jobs.iter().position(|entry| entry.job.id == id) else {
            self.scheduler.cancel(ticket);
            return;
        };
        let entry = &mut self.jobs[index];
        if entry.job.status() != JobStatus::Printing {
            entry.ticker = None;
            self.scheduler.cancel(ticket);
            return;
        }
        let progress = match entry.job.advance(step) {
            Ok(progress) => progress,
            Err(err) => {
                warn!(job = %id, error = %err, "progress tick rejected");
                return;
            }
        };
        debug!(job = %id, progress, "print progress");
        if entry.job.status() != JobStatus::Completed {
            return;
        }

        entry.ticker = None;
        let record = PrintHistoryRecord::from_job(&entry.job);
        self.scheduler.cancel(ticket);
        info!(job = %id, style = %record.style_id, "print completed");
        if let Err(err) = self.sink.record(&record) {
            warn!(job = %id, error = %err, "failed to record print history");
            self.notices.push(QueueNotice::HistoryWriteFailed {
                job: id,
                message: err.to_string(),
            });
        }
        self.notices
            .push(QueueNotice::PrintCompleted { job: id, record });
        let delay = self.timings.completed_removal;
        if let Err(err) = self.schedule_removal(id, delay) {
            warn!(job = %id, error = %err, "could not schedule removal");
        }
    }
}
