//! Progress indicators for the cai-export CLI.

use crate::ui;
use indicatif::{ProgressBar, ProgressStyle};
use inventory::{ContentType, ExportObserver, ExportReport, InventoryConfig, JobState, LogObserver};
use std::time::Duration;

/// Create a spinner with a message. Hidden when `quiet` is set.
pub fn spinner(msg: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Stop a spinner and print a success line.
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    ui::success(msg);
}

/// Stop a spinner and print an error line.
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    ui::error(msg);
}

/// Observer that keeps the spinner message current and routes log output
/// around the spinner so lines don't tear.
pub struct SpinnerObserver {
    pb: ProgressBar,
    prefix: String,
    log: LogObserver,
}

impl SpinnerObserver {
    pub fn new(pb: ProgressBar, prefix: impl Into<String>) -> Self {
        Self {
            pb,
            prefix: prefix.into(),
            log: LogObserver,
        }
    }
}

impl ExportObserver for SpinnerObserver {
    fn on_run_started(&self, config: &InventoryConfig) {
        self.pb.suspend(|| self.log.on_run_started(config));
    }

    fn on_state_change(&self, content_type: ContentType, state: JobState) {
        self.pb
            .set_message(format!("{} {} {}", self.prefix, content_type, state));
        self.pb.suspend(|| self.log.on_state_change(content_type, state));
    }

    fn on_poll(&self, content_type: ContentType, operation: &str, attempt: u32) {
        self.pb.set_message(format!(
            "{} {} running (poll #{})",
            self.prefix, content_type, attempt
        ));
        self.pb
            .suspend(|| self.log.on_poll(content_type, operation, attempt));
    }

    fn on_run_finished(&self, report: &ExportReport) {
        self.pb.suspend(|| self.log.on_run_finished(report));
    }
}
