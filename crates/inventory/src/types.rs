//! Core types for inventory export.
//!
//! This module contains the content-type table, the per-submission request
//! and operation handle, the job state machine, run reports, and the knobs
//! that control how the orchestrator waits.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Category of exported inventory.
///
/// The set is closed: every run exports exactly these two, in the order
/// returned by [`ContentType::all`].
///
/// # Example
///
/// ```
/// use inventory::ContentType;
///
/// assert_eq!(ContentType::Resource.object_name(), "resource_inventory.json");
/// assert_eq!(ContentType::IamPolicy.api_name(), "IAM_POLICY");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    /// Resource metadata.
    Resource,
    /// IAM policy bindings.
    IamPolicy,
}

impl ContentType {
    /// Lowercase identifier used in logs and display output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::IamPolicy => "iam_policy",
        }
    }

    /// Value of the `contentType` field in the export request.
    #[must_use]
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Resource => "RESOURCE",
            Self::IamPolicy => "IAM_POLICY",
        }
    }

    /// Object name the export is written to inside the bucket.
    #[must_use]
    pub fn object_name(&self) -> &'static str {
        match self {
            Self::Resource => "resource_inventory.json",
            Self::IamPolicy => "iam_inventory.json",
        }
    }

    /// All content types, in submission order.
    #[must_use]
    pub fn all() -> &'static [ContentType] {
        &[ContentType::Resource, ContentType::IamPolicy]
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single export submission.
///
/// Built fresh for every submission and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    /// Scope path, e.g. `projects/my-proj` or `organizations/123`.
    pub parent: String,
    /// What to export.
    pub content_type: ContentType,
    /// Destination object URI, e.g. `gs://bucket/resource_inventory.json`.
    pub destination_uri: String,
}

/// Handle to a remote long-running export operation.
///
/// The operation itself is owned by the service; this is only the name
/// needed to poll it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOperation {
    /// Operation resource name returned by the service.
    pub name: String,
    /// Content type the operation is exporting.
    pub content_type: ContentType,
}

/// Result of polling an operation once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    /// Still running.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed {
        /// RPC status code, if reported.
        code: Option<i32>,
        /// Error message.
        message: String,
    },
}

impl OperationStatus {
    /// Whether polling can stop.
    #[must_use]
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Lifecycle of one export job.
///
/// `Built → Submitted → Running → {Succeeded | Failed}`. There is no
/// cancelled state: once submitted, the job belongs to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Request built, not sent.
    Built,
    /// Accepted by the service.
    Submitted,
    /// Being polled until it finishes.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Rejected, failed remotely, or abandoned by the wait.
    Failed,
}

impl JobState {
    /// Whether this is a final state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Built => "built",
            Self::Submitted => "submitted",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one export job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    /// Content type exported.
    pub content_type: ContentType,
    /// Destination object URI.
    pub destination: String,
    /// Operation name, if the submission was accepted.
    pub operation: Option<String>,
    /// Final state.
    pub state: JobState,
    /// Status polls made while waiting on the operation.
    pub polls: u32,
    /// Wall time from submission to the end of the wait.
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Failure message, if the job failed.
    pub error: Option<String>,
}

impl JobReport {
    /// Whether the job succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == JobState::Succeeded
    }
}

/// Outcome of a whole export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// One entry per content type, in submission order.
    pub jobs: Vec<JobReport>,
}

impl ExportReport {
    /// Whether every job succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.jobs.is_empty() && self.jobs.iter().all(JobReport::is_success)
    }

    /// Jobs that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|j| !j.is_success())
    }

    /// Report for a content type.
    #[must_use]
    pub fn job(&self, content_type: ContentType) -> Option<&JobReport> {
        self.jobs.iter().find(|j| j.content_type == content_type)
    }
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Shortest delay between two polls of the same operation.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How the orchestrator waits on each operation.
///
/// The first poll is immediate. The delay after poll `n` (0-indexed) is
/// `poll_interval * backoff_factor^n`, capped at `max_poll_interval` and at
/// the time left before `timeout`.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOptions {
    /// Delay after the first poll.
    pub poll_interval: Duration,
    /// Upper bound on the delay between polls.
    pub max_poll_interval: Duration,
    /// Multiplier applied after each poll.
    pub backoff_factor: f64,
    /// Give up after this long; `None` waits until the operation finishes
    /// or the token is cancelled.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_poll_interval: Duration::from_secs(30),
            backoff_factor: 1.5,
            timeout: None,
        }
    }
}

impl WaitOptions {
    /// Create wait options with default backoff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay after the first poll.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the maximum delay between polls.
    pub fn max_poll_interval(mut self, interval: Duration) -> Self {
        self.max_poll_interval = interval;
        self
    }

    /// Set the backoff multiplier.
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Set a deadline for each wait.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Calculate the delay after the given poll (0-indexed).
    ///
    /// Never shorter than [`MIN_POLL_INTERVAL`].
    pub fn delay_for_poll(&self, poll: u32) -> Duration {
        let exponent = i32::try_from(poll).unwrap_or(i32::MAX);
        let delay = self.poll_interval.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = delay.min(self.max_poll_interval.as_secs_f64()).max(0.0);
        Duration::try_from_secs_f64(capped)
            .unwrap_or(self.max_poll_interval)
            .max(MIN_POLL_INTERVAL)
    }
}

/// Whether jobs run one after another or side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Submit the next job only after the previous wait ends.
    #[default]
    Sequential,
    /// Submit and wait on both jobs concurrently.
    Concurrent,
}

/// Cooperative cancellation for operation waits.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_order() {
        assert_eq!(
            ContentType::all(),
            &[ContentType::Resource, ContentType::IamPolicy]
        );
    }

    #[test]
    fn test_content_type_names() {
        assert_eq!(ContentType::Resource.api_name(), "RESOURCE");
        assert_eq!(ContentType::IamPolicy.api_name(), "IAM_POLICY");
        assert_eq!(ContentType::Resource.object_name(), "resource_inventory.json");
        assert_eq!(ContentType::IamPolicy.object_name(), "iam_inventory.json");
        assert_eq!(ContentType::IamPolicy.to_string(), "iam_policy");
    }

    #[test]
    fn test_content_type_serde() {
        let json = serde_json::to_string(&ContentType::IamPolicy).unwrap();
        assert_eq!(json, "\"IAM_POLICY\"");
        let parsed: ContentType = serde_json::from_str("\"RESOURCE\"").unwrap();
        assert_eq!(parsed, ContentType::Resource);
    }

    #[test]
    fn test_job_state_terminal() {
        assert!(!JobState::Built.is_terminal());
        assert!(!JobState::Submitted.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn test_operation_status_done() {
        assert!(!OperationStatus::Running.is_done());
        assert!(OperationStatus::Succeeded.is_done());
        assert!(
            OperationStatus::Failed {
                code: None,
                message: String::new()
            }
            .is_done()
        );
    }

    #[test]
    fn test_delay_for_poll_backoff() {
        let options = WaitOptions::new()
            .poll_interval(Duration::from_secs(2))
            .backoff_factor(2.0)
            .max_poll_interval(Duration::from_secs(10));

        assert_eq!(options.delay_for_poll(0), Duration::from_secs(2));
        assert_eq!(options.delay_for_poll(1), Duration::from_secs(4));
        assert_eq!(options.delay_for_poll(2), Duration::from_secs(8));
        assert_eq!(options.delay_for_poll(3), Duration::from_secs(10));
        assert_eq!(options.delay_for_poll(10), Duration::from_secs(10));
    }

    #[test]
    fn test_delay_for_poll_has_floor() {
        let options = WaitOptions::new()
            .poll_interval(Duration::ZERO)
            .max_poll_interval(Duration::ZERO);
        for poll in [0, 1, 5] {
            assert_eq!(options.delay_for_poll(poll), MIN_POLL_INTERVAL);
        }
    }

    #[test]
    fn test_delay_for_poll_saturates() {
        let options = WaitOptions::new()
            .poll_interval(Duration::from_secs(u64::MAX))
            .max_poll_interval(Duration::from_secs(u64::MAX));
        assert_eq!(options.delay_for_poll(0), Duration::from_secs(u64::MAX));
        assert_eq!(options.delay_for_poll(u32::MAX), Duration::from_secs(u64::MAX));

        let capped = WaitOptions::new().max_poll_interval(Duration::from_secs(30));
        assert_eq!(capped.delay_for_poll(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_report_success() {
        let job = |state| JobReport {
            content_type: ContentType::Resource,
            destination: "gs://b/resource_inventory.json".to_string(),
            operation: Some("operations/1".to_string()),
            state,
            polls: 1,
            elapsed: Duration::from_millis(1500),
            error: None,
        };

        let ok = ExportReport {
            jobs: vec![job(JobState::Succeeded)],
        };
        assert!(ok.is_success());
        assert_eq!(ok.failures().count(), 0);

        let failed = ExportReport {
            jobs: vec![job(JobState::Succeeded), job(JobState::Failed)],
        };
        assert!(!failed.is_success());
        assert_eq!(failed.failures().count(), 1);

        assert!(!ExportReport::default().is_success());
    }

    #[test]
    fn test_report_json_uses_millis() {
        let report = ExportReport {
            jobs: vec![JobReport {
                content_type: ContentType::IamPolicy,
                destination: "gs://b/iam_inventory.json".to_string(),
                operation: None,
                state: JobState::Failed,
                polls: 0,
                elapsed: Duration::from_millis(250),
                error: Some("rejected".to_string()),
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["jobs"][0]["elapsed_ms"], 250);
        assert_eq!(value["jobs"][0]["content_type"], "IAM_POLICY");
        assert_eq!(value["jobs"][0]["state"], "failed");
        assert_eq!(value["jobs"][0]["polls"], 0);
    }

    #[test]
    fn test_cancellation_token_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
