//! # Sync Run State Machine
//!
//! Lifecycle of one pass of the sync engine with validated transitions.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Running → Completed
//!    ↓          ↓
//!    └───────→ Cancelled
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncRun, SyncStatus};
//!
//! let run = SyncRun::new(clock.now()).start(clock.now())?;
//! let run = run.complete(clock.now())?;
//! let report = run.into_report();
//! assert_eq!(report.status, SyncStatus::Completed);
//! ```

use crate::outcome::SyncOutcome;
use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncRunId(Uuid);

impl SyncRunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a run ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidRunId(e.to_string()))?,
        ))
    }
}

impl Default for SyncRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Created, walk not started
    Pending,
    Running,
    /// Every layer was visited
    Completed,
    /// Stopped by the cancellation signal
    Cancelled,
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Completed | SyncStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Running => "running",
            SyncStatus::Completed => "completed",
            SyncStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncStatus::Pending),
            "running" => Ok(SyncStatus::Running),
            "completed" => Ok(SyncStatus::Completed),
            "cancelled" => Ok(SyncStatus::Cancelled),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One pass of the sync engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRun {
    pub id: SyncRunId,
    pub status: SyncStatus,
    pub outcome: SyncOutcome,
    /// Layers reached by the walk, groups and inert layers included
    pub layers_visited: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncRun {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: SyncRunId::new(),
            status: SyncStatus::Pending,
            outcome: SyncOutcome::default(),
            layers_visited: 0,
            created_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the run is not `Pending`
    pub fn start(mut self, now: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(SyncStatus::Running)?;
        self.status = SyncStatus::Running;
        self.started_at = Some(now);
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns an error if the run is not `Running`
    pub fn complete(mut self, now: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(SyncStatus::Completed)?;
        self.status = SyncStatus::Completed;
        self.finished_at = Some(now);
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns an error if the run already finished
    pub fn cancel(mut self, now: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(SyncStatus::Cancelled)?;
        self.status = SyncStatus::Cancelled;
        self.finished_at = Some(now);
        Ok(self)
    }

    /// Time between start and finish; zero while either is unset
    pub fn duration(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }

    pub fn into_report(self) -> SyncReport {
        SyncReport {
            run_id: self.id,
            status: self.status,
            summary: self.outcome.summary(),
            duration: self.duration(),
            outcome: self.outcome,
            layers_visited: self.layers_visited,
        }
    }

    fn validate_transition(&self, to: SyncStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (SyncStatus::Pending, SyncStatus::Running)
                | (SyncStatus::Pending, SyncStatus::Cancelled)
                | (SyncStatus::Running, SyncStatus::Completed)
                | (SyncStatus::Running, SyncStatus::Cancelled)
        );

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

/// What a finished run reports to its caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: SyncRunId,
    pub status: SyncStatus,
    pub outcome: SyncOutcome,
    /// Non-zero counters, one per line; empty on a clean run
    pub summary: String,
    pub layers_visited: usize,
    pub duration: Duration,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Completed && !self.outcome.has_errors()
    }

    pub fn was_cancelled(&self) -> bool {
        self.status == SyncStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(SyncRunId::new(), SyncRunId::new());
    }

    #[test]
    fn test_run_id_from_string() {
        let raw = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(SyncRunId::from_string(raw).unwrap().to_string(), raw);
        assert!(matches!(
            SyncRunId::from_string("not-a-uuid"),
            Err(SyncError::InvalidRunId(_))
        ));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Cancelled".parse::<SyncStatus>().unwrap(), SyncStatus::Cancelled);
        assert!("failed".parse::<SyncStatus>().is_err());
        assert!(SyncStatus::Completed.is_terminal());
        assert!(!SyncStatus::Running.is_terminal());
    }

    #[test]
    fn test_complete_lifecycle() {
        let run = SyncRun::new(at(0)).start(at(1)).unwrap();
        assert_eq!(run.status, SyncStatus::Running);

        let run = run.complete(at(4)).unwrap();
        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.duration(), Duration::from_secs(3));
    }

    #[test]
    fn test_cancel_from_pending_and_running() {
        assert!(SyncRun::new(at(0)).cancel(at(0)).is_ok());

        let run = SyncRun::new(at(0)).start(at(0)).unwrap();
        assert_eq!(run.cancel(at(2)).unwrap().status, SyncStatus::Cancelled);
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(SyncRun::new(at(0)).complete(at(0)).is_err());

        let done = SyncRun::new(at(0))
            .start(at(0))
            .unwrap()
            .complete(at(1))
            .unwrap();
        assert!(done.clone().start(at(2)).is_err());
        assert!(done.clone().cancel(at(2)).is_err());
        assert!(done.complete(at(2)).is_err());
    }

    #[test]
    fn test_report() {
        let mut run = SyncRun::new(at(0)).start(at(0)).unwrap();
        run.outcome.inserted_count = 2;
        run.layers_visited = 3;

        let report = run.complete(at(1)).unwrap().into_report();
        assert!(report.is_success());
        assert_eq!(report.summary, "Inserted: 2");
        assert_eq!(report.layers_visited, 3);
    }
}
