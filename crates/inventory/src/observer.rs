//! Progress hooks for export runs.
//!
//! The orchestrator reports what it is doing through an [`ExportObserver`]
//! handed to it at construction. Every hook has an empty default.

use crate::config::InventoryConfig;
use crate::types::{ContentType, ExportReport, JobState};

/// Receives progress notifications from an export run.
///
/// Observers are shared between jobs in concurrent mode, hence `Send + Sync`.
pub trait ExportObserver: Send + Sync {
    /// Called once before the first submission.
    fn on_run_started(&self, _config: &InventoryConfig) {}

    /// Called whenever a job moves to a new state.
    fn on_state_change(&self, _content_type: ContentType, _state: JobState) {}

    /// Called after each status poll.
    ///
    /// # Arguments
    /// * `content_type` - Job being polled
    /// * `operation` - Operation name
    /// * `attempt` - Poll number (1-indexed)
    fn on_poll(&self, _content_type: ContentType, _operation: &str, _attempt: u32) {}

    /// Called once after every job has finished.
    fn on_run_finished(&self, _report: &ExportReport) {}
}

/// Observer that does nothing.
pub struct NoopObserver;

impl ExportObserver for NoopObserver {}

/// Observer that forwards progress to the `log` facade.
pub struct LogObserver;

impl ExportObserver for LogObserver {
    fn on_run_started(&self, config: &InventoryConfig) {
        log::info!(
            "Exporting {} to gs://{}",
            config.parent(),
            config.bucket()
        );
    }

    fn on_state_change(&self, content_type: ContentType, state: JobState) {
        match state {
            JobState::Failed => log::warn!("{content_type} export {state}"),
            _ => log::info!("{content_type} export {state}"),
        }
    }

    fn on_poll(&self, content_type: ContentType, operation: &str, attempt: u32) {
        log::debug!("{content_type}: poll #{attempt} of {operation}");
    }

    fn on_run_finished(&self, report: &ExportReport) {
        let failed = report.failures().count();
        if failed == 0 {
            log::info!("All {} exports finished", report.jobs.len());
        } else {
            log::warn!("{failed} of {} exports failed", report.jobs.len());
        }
    }
}
