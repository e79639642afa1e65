//! # inventory
//!
//! Export Cloud Asset Inventory snapshots to a GCS bucket.
//!
//! One export run writes two objects into the destination bucket:
//!
//! | Content type | Object                    |
//! |--------------|---------------------------|
//! | `RESOURCE`   | `resource_inventory.json` |
//! | `IAM_POLICY` | `iam_inventory.json`      |
//!
//! Each export is a long-running operation on the service side. The
//! [`Client`] submits both, waits for them, and reports every failure rather
//! than just the last one.
//!
//! ## Example
//!
//! ```no_run
//! use inventory::auth::GcloudToken;
//! use inventory::backend::asset_api::AssetApiBackend;
//! use inventory::{CancellationToken, Client, InventoryConfig, InventoryOptions};
//!
//! let config = InventoryConfig::new(
//!     InventoryOptions::new("my-bucket").organization("123456789"),
//! ).expect("invalid configuration");
//!
//! let backend = AssetApiBackend::new(Box::new(GcloudToken::new()))
//!     .billing_project(config.billing_project().map(String::from));
//!
//! let client = Client::new(Box::new(backend));
//! let report = client.export(&config, &CancellationToken::new())
//!     .expect("export failed");
//!
//! for job in &report.jobs {
//!     println!("{} -> {}", job.content_type, job.destination);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod observer;
pub mod types;
pub mod wait;

pub use config::{InventoryConfig, InventoryOptions, InventoryScope};
pub use error::{Error, ErrorCategory, ExportFailures, JobFailure, Result};
pub use observer::{ExportObserver, LogObserver, NoopObserver};
pub use types::{
    CancellationToken, ContentType, ExecutionMode, ExportOperation, ExportReport, ExportRequest,
    JobReport, JobState, MIN_POLL_INTERVAL, OperationStatus, WaitOptions,
};

use backend::Backend;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Export orchestrator.
///
/// Submits one export per [`ContentType`], waits for each operation, and
/// aggregates the outcomes.
///
/// # Example
///
/// ```
/// use inventory::backend::MockBackend;
/// use inventory::{CancellationToken, Client, InventoryConfig, InventoryOptions};
///
/// let mock = MockBackend::new();
/// let client = Client::new(Box::new(mock.clone()));
/// let config = InventoryConfig::new(
///     InventoryOptions::new("bkt").target_project("proj"),
/// ).unwrap();
///
/// let report = client.export(&config, &CancellationToken::new()).unwrap();
/// assert!(report.is_success());
/// assert_eq!(mock.submissions().len(), 2);
/// ```
pub struct Client {
    backend: Box<dyn Backend>,
    observer: Arc<dyn ExportObserver>,
    wait: WaitOptions,
    mode: ExecutionMode,
}

/// Result of one job before aggregation.
struct JobOutcome {
    report: JobReport,
    error: Option<Error>,
}

impl Client {
    /// Create a client over a backend, logging progress through `log`.
    #[must_use]
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            observer: Arc::new(LogObserver),
            wait: WaitOptions::default(),
            mode: ExecutionMode::default(),
        }
    }

    /// Report progress to a different observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ExportObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Set how operations are polled.
    #[must_use]
    pub fn wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Run jobs sequentially (default) or concurrently.
    #[must_use]
    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Export every content type and return the run report.
    ///
    /// Every content type is attempted even if an earlier one failed;
    /// failures are recorded in each [`JobReport`]. Jobs not yet submitted
    /// when `cancel` fires are not submitted.
    pub fn run(&self, config: &InventoryConfig, cancel: &CancellationToken) -> ExportReport {
        ExportReport {
            jobs: self
                .run_jobs(config, cancel)
                .into_iter()
                .map(|outcome| outcome.report)
                .collect(),
        }
    }

    /// Export every content type and wait for all of them.
    ///
    /// Returns the run report when all jobs succeed, otherwise
    /// [`Error::Export`] listing each failed job alongside the full report.
    pub fn export(&self, config: &InventoryConfig, cancel: &CancellationToken) -> Result<ExportReport> {
        let mut report = ExportReport::default();
        let mut failures = Vec::new();
        for outcome in self.run_jobs(config, cancel) {
            if let Some(error) = outcome.error {
                failures.push(JobFailure {
                    content_type: outcome.report.content_type,
                    destination: outcome.report.destination.clone(),
                    error,
                });
            }
            report.jobs.push(outcome.report);
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(Error::Export(ExportFailures { failures, report }))
        }
    }

    fn run_jobs(&self, config: &InventoryConfig, cancel: &CancellationToken) -> Vec<JobOutcome> {
        self.observer.on_run_started(config);

        let outcomes: Vec<JobOutcome> = match self.mode {
            ExecutionMode::Sequential => ContentType::all()
                .iter()
                .map(|&content_type| self.run_job(config, content_type, cancel))
                .collect(),
            ExecutionMode::Concurrent => ContentType::all()
                .par_iter()
                .map(|&content_type| self.run_job(config, content_type, cancel))
                .collect(),
        };

        let report = ExportReport {
            jobs: outcomes.iter().map(|o| o.report.clone()).collect(),
        };
        self.observer.on_run_finished(&report);
        outcomes
    }

    /// Submit one export and wait for it.
    fn run_job(
        &self,
        config: &InventoryConfig,
        content_type: ContentType,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        let request = config.request(content_type);
        self.observer.on_state_change(content_type, JobState::Built);

        let started = Instant::now();
        let mut report = JobReport {
            content_type,
            destination: request.destination_uri.clone(),
            operation: None,
            state: JobState::Built,
            polls: 0,
            elapsed: Default::default(),
            error: None,
        };

        let result = self.submit_and_wait(&request, &mut report, cancel);
        report.elapsed = started.elapsed();
        report.state = match &result {
            Ok(()) => JobState::Succeeded,
            Err(_) => JobState::Failed,
        };
        report.error = result.as_ref().err().map(ToString::to_string);
        self.observer.on_state_change(content_type, report.state);

        JobOutcome {
            report,
            error: result.err(),
        }
    }

    fn submit_and_wait(
        &self,
        request: &ExportRequest,
        report: &mut JobReport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                operation: format!("{} export (not submitted)", request.content_type),
            });
        }

        let operation = self
            .backend
            .submit(request)
            .map_err(|e| Error::submission(&request.destination_uri, e))?;

        log::debug!(
            "{} export submitted as {}",
            request.content_type,
            operation.name
        );
        report.operation = Some(operation.name.clone());
        self.observer
            .on_state_change(request.content_type, JobState::Submitted);

        report.state = JobState::Running;
        self.observer
            .on_state_change(request.content_type, JobState::Running);

        wait::wait_for_operation(
            self.backend.as_ref(),
            &operation,
            &self.wait,
            cancel,
            self.observer.as_ref(),
            &mut report.polls,
        )
    }
}
