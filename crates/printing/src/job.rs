use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paper::PaperSize;
use crate::settings::PrintSettings;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrintJobId(u64);

impl PrintJobId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl Default for PrintJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrintJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "print-job-{}", self.0)
    }
}

impl FromStr for PrintJobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("print-job-")
            .unwrap_or(s)
            .parse::<u64>()
            .map(PrintJobId)
            .map_err(|_| format!("invalid print job id '{s}'"))
    }
}

impl TryFrom<String> for PrintJobId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PrintJobId> for String {
    fn from(id: PrintJobId) -> Self {
        id.to_string()
    }
}

/// Lifecycle of a print job.
///
/// ```text
/// Pending ──start──▶ Printing ──progress 100──▶ Completed
///    │                  │
///    └──discard──▶ Failed ◀──cancel──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Printing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Printing => "printing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Start,
    Advance,
    Cancel,
    Discard,
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            JobAction::Start => "start",
            JobAction::Advance => "advance",
            JobAction::Cancel => "cancel",
            JobAction::Discard => "discard",
        };
        f.write_str(verb)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} job {job} while it is {from}")]
pub struct TransitionError {
    pub job: PrintJobId,
    pub from: JobStatus,
    pub action: JobAction,
}

/// A request to print one style, with a snapshot of the settings in force
/// when it was submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: PrintJobId,
    pub style_id: String,
    pub style_name: String,
    pub paper_size: PaperSize,
    pub settings: PrintSettings,
    status: JobStatus,
    progress: f32,
    pub created_at: DateTime<Utc>,
}

impl PrintJob {
    pub fn new(
        style_id: impl Into<String>,
        style_name: impl Into<String>,
        paper_size: PaperSize,
        settings: PrintSettings,
    ) -> Self {
        Self {
            id: PrintJobId::new(),
            style_id: style_id.into(),
            style_name: style_name.into(),
            paper_size,
            settings,
            status: JobStatus::Pending,
            progress: 0.0,
            created_at: Utc::now(),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Progress in whole percent, floored.
    pub fn progress(&self) -> u8 {
        self.progress.floor().clamp(0.0, 100.0) as u8
    }

    fn reject(&self, action: JobAction) -> TransitionError {
        TransitionError {
            job: self.id,
            from: self.status,
            action,
        }
    }

    /// Pending → Printing, progress reset to zero.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        if self.status != JobStatus::Pending {
            return Err(self.reject(JobAction::Start));
        }
        self.status = JobStatus::Printing;
        self.progress = 0.0;
        Ok(())
    }

    /// Adds `step` percent. Reaching 100 completes the job. Returns the
    /// floored progress.
    pub fn advance(&mut self, step: f32) -> Result<u8, TransitionError> {
        if self.status != JobStatus::Printing {
            return Err(self.reject(JobAction::Advance));
        }
        let step = if step.is_finite() { step.max(0.0) } else { 0.0 };
        self.progress += step;
        if self.progress >= 100.0 {
            self.progress = 100.0;
            self.status = JobStatus::Completed;
        }
        Ok(self.progress())
    }

    /// Printing → Failed. Progress stays where it was.
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        if self.status != JobStatus::Printing {
            return Err(self.reject(JobAction::Cancel));
        }
        self.status = JobStatus::Failed;
        Ok(())
    }

    /// Pending → Failed, for jobs dropped before they ever printed.
    pub fn discard(&mut self) -> Result<(), TransitionError> {
        if self.status != JobStatus::Pending {
            return Err(self.reject(JobAction::Discard));
        }
        self.status = JobStatus::Failed;
        Ok(())
    }
}

/// Persisted summary of a finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintHistoryRecord {
    pub job_id: PrintJobId,
    pub style_id: String,
    #[serde(default)]
    pub style_name: Option<String>,
    pub paper_size: PaperSize,
    pub settings: PrintSettings,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl PrintHistoryRecord {
    pub fn from_job(job: &PrintJob) -> Self {
        Self {
            job_id: job.id,
            style_id: job.style_id.clone(),
            style_name: Some(job.style_name.clone()),
            paper_size: job.paper_size,
            settings: job.settings.clone(),
            status: job.status,
            created_at: Utc::now(),
        }
    }

    /// Name shown when the record is printed again.
    pub fn reprint_name(&self) -> String {
        match &self.style_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Reprint - {}", self.style_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> PrintJob {
        PrintJob::new("tian-zi-ge", "田字格", PaperSize::A4, PrintSettings::default())
    }

    #[test]
    fn job_ids_are_unique_and_display_with_prefix() {
        let a = PrintJobId::new();
        let b = PrintJobId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("print-job-"));
        assert_eq!(a.to_string().parse::<PrintJobId>().unwrap(), a);
    }

    #[test]
    fn completes_only_through_printing() {
        let mut job = job();
        assert!(job.advance(100.0).is_err());
        assert_eq!(job.status(), JobStatus::Pending);

        job.start().unwrap();
        assert_eq!(job.advance(40.0).unwrap(), 40);
        assert_eq!(job.advance(70.0).unwrap(), 100);
        assert_eq!(job.status(), JobStatus::Completed);
        assert!(job.status().is_terminal());
    }

    #[test]
    fn fractional_progress_is_floored() {
        let mut job = job();
        job.start().unwrap();
        assert_eq!(job.advance(12.7).unwrap(), 12);
        assert_eq!(job.advance(0.4).unwrap(), 13);
        assert_eq!(job.advance(f32::NAN).unwrap(), 13);
    }

    #[test]
    fn cancel_freezes_progress() {
        let mut job = job();
        job.start().unwrap();
        job.advance(35.0).unwrap();
        job.cancel().unwrap();
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.progress(), 35);
        assert!(job.advance(10.0).is_err());
        assert_eq!(job.progress(), 35);
    }

    #[test]
    fn pending_may_be_discarded_but_not_cancelled() {
        let mut job = job();
        let err = job.cancel().unwrap_err();
        assert_eq!(err.from, JobStatus::Pending);
        assert_eq!(err.action, JobAction::Cancel);
        job.discard().unwrap();
        assert_eq!(job.status(), JobStatus::Failed);
        assert!(job.start().is_err());
        assert!(job.discard().is_err());
    }

    #[test]
    fn history_record_round_trips_through_json() {
        let mut job = job();
        job.start().unwrap();
        job.advance(100.0).unwrap();
        let record = PrintHistoryRecord::from_job(&job);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"status\":\"completed\""));
        let back: PrintHistoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn reprint_name_falls_back_to_style_id() {
        let mut record = PrintHistoryRecord::from_job(&job());
        assert_eq!(record.reprint_name(), "田字格");
        record.style_name = None;
        assert_eq!(record.reprint_name(), "Reprint - tian-zi-ge");
    }
}
