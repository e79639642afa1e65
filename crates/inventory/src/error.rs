//! Error types for inventory export operations.
//!
//! Errors are categorized so the CLI can give appropriate user feedback.
//! Nothing in this crate retries automatically; the category only drives
//! presentation.

use std::fmt;
use std::io;
use std::time::Duration;

use crate::types::{ContentType, ExportReport};

/// Result type alias for inventory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of inventory errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid scope, bucket or identifier (nothing was sent).
    Configuration,
    /// The service refused to accept an export request.
    Submission,
    /// The export job was accepted but failed remotely.
    Operation,
    /// The caller's deadline expired while waiting.
    Timeout,
    /// The caller cancelled the wait.
    Cancelled,
    /// Missing or rejected credentials.
    Auth,
    /// Transport-level failure talking to the service.
    Network,
    /// Unparseable response from the service.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Invalid inventory configuration",
            Self::Submission => "Export request rejected",
            Self::Operation => "Export job failed",
            Self::Timeout => "Timed out waiting for export",
            Self::Cancelled => "Export wait cancelled",
            Self::Auth => "Authentication failed",
            Self::Network => "Network connectivity issue",
            Self::Format => "Unexpected API response",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => "Pass --bucket and one of --project or --organization",
            Self::Submission => {
                "Check that the Cloud Asset API is enabled and the caller can export the scope"
            }
            Self::Operation => "Check that the service agent can write to the destination bucket",
            Self::Timeout => "The job may still finish remotely; raise --timeout to wait longer",
            Self::Cancelled => "The job may still finish remotely; rerun to export again",
            Self::Auth => "Run `gcloud auth login` or pass --access-token",
            Self::Network => "Check your internet connection and try again",
            Self::Format => "The API endpoint may be wrong; check --endpoint",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during inventory export.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration rejected at construction time.
    #[error("invalid inventory configuration: {0}")]
    InvalidConfig(String),

    /// The service did not accept an export request.
    #[error("export submission failed (destination = {destination}): {source}")]
    Submission {
        /// Destination URI of the rejected request.
        destination: String,
        /// Underlying backend error.
        #[source]
        source: Box<Error>,
    },

    /// The remote long-running operation finished with an error.
    #[error("export operation {operation} failed: {message}")]
    Operation {
        /// Operation name.
        operation: String,
        /// RPC status code reported by the service, if any.
        code: Option<i32>,
        /// Error message reported by the service.
        message: String,
    },

    /// The wait deadline expired before the operation finished.
    #[error("timed out after {elapsed:?} waiting for operation {operation}")]
    Timeout {
        /// Operation name.
        operation: String,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// The wait was cancelled by the caller.
    #[error("cancelled while waiting for operation {operation}")]
    Cancelled {
        /// Operation name.
        operation: String,
    },

    /// Credentials missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// One or more export jobs failed.
    #[error("{0}")]
    Export(ExportFailures),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Wrap a backend error with the destination it was submitted for.
    pub fn submission(destination: impl Into<String>, source: Error) -> Self {
        Self::Submission {
            destination: destination.into(),
            source: Box::new(source),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidConfig(_) => ErrorCategory::Configuration,
            Error::Submission { source, .. } => match source.category() {
                ErrorCategory::Auth => ErrorCategory::Auth,
                ErrorCategory::Network => ErrorCategory::Network,
                _ => ErrorCategory::Submission,
            },
            Error::Operation { .. } => ErrorCategory::Operation,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::Cancelled { .. } => ErrorCategory::Cancelled,
            Error::Auth(_) => ErrorCategory::Auth,
            Error::Http { status: None, .. } => ErrorCategory::Network,
            Error::Http { status: Some(_), .. } => ErrorCategory::Submission,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Io(_) => ErrorCategory::Other,
            Error::Export(failures) => failures.category(),
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {}", code),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// A single export job that did not succeed.
#[derive(Debug)]
pub struct JobFailure {
    /// Content type of the failed job.
    pub content_type: ContentType,
    /// Destination URI the job was writing to.
    pub destination: String,
    /// What went wrong.
    pub error: Error,
}

/// Every failed job from one export run.
///
/// Failures appear in submission order. The full run report is kept so
/// callers can still show what succeeded.
#[derive(Debug)]
pub struct ExportFailures {
    /// Failed jobs, in submission order.
    pub failures: Vec<JobFailure>,
    /// Report for the whole run, successes included.
    pub report: ExportReport,
}

impl ExportFailures {
    /// Content types whose export failed.
    #[must_use]
    pub fn failed_content_types(&self) -> Vec<ContentType> {
        self.failures.iter().map(|f| f.content_type).collect()
    }

    /// Whether the given content type failed.
    #[must_use]
    pub fn failed(&self, content_type: ContentType) -> bool {
        self.failures.iter().any(|f| f.content_type == content_type)
    }

    /// Category of the first failure; `Other` when empty.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.failures
            .first()
            .map_or(ErrorCategory::Other, |f| f.error.category())
    }
}

impl fmt::Display for ExportFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} inventory exports failed",
            self.failures.len(),
            self.report.jobs.len()
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", failure.content_type, failure.error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobReport, JobState};

    fn failed_job(content_type: ContentType) -> JobReport {
        JobReport {
            content_type,
            destination: format!("gs://bkt/{}", content_type.object_name()),
            operation: None,
            state: JobState::Failed,
            polls: 0,
            elapsed: Duration::ZERO,
            error: Some("boom".to_string()),
        }
    }

    #[test]
    fn test_error_category_description() {
        assert!(!ErrorCategory::Configuration.description().is_empty());
        assert!(!ErrorCategory::Submission.description().is_empty());
        assert!(!ErrorCategory::Operation.description().is_empty());
    }

    #[test]
    fn test_error_category_advice() {
        assert!(ErrorCategory::Auth.advice().contains("gcloud"));
        assert!(ErrorCategory::Timeout.advice().contains("--timeout"));
    }

    #[test]
    fn test_error_category_display() {
        let display = format!("{}", ErrorCategory::Network);
        assert!(display.contains("Network"));
    }

    #[test]
    fn test_submission_keeps_destination() {
        let err = Error::submission(
            "gs://bkt/resource_inventory.json",
            Error::http("HTTP 400: bad request", Some(400)),
        );
        let display = err.to_string();
        assert!(display.contains("destination = gs://bkt/resource_inventory.json"));
        assert!(display.contains("bad request"));
        assert_eq!(err.category(), ErrorCategory::Submission);
    }

    #[test]
    fn test_submission_category_follows_auth_source() {
        let err = Error::submission("gs://bkt/x", Error::Auth("expired".to_string()));
        assert_eq!(err.category(), ErrorCategory::Auth);
    }

    #[test]
    fn test_http_category_without_status_is_network() {
        let err = Error::http("connection reset", None);
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_operation_category() {
        let err = Error::Operation {
            operation: "operations/1".to_string(),
            code: Some(7),
            message: "permission denied on bucket".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Operation);
        assert!(err.to_string().contains("operations/1"));
    }

    #[test]
    fn test_export_failures_lists_every_job() {
        let failures = ExportFailures {
            failures: vec![
                JobFailure {
                    content_type: ContentType::Resource,
                    destination: "gs://bkt/resource_inventory.json".to_string(),
                    error: Error::InvalidResponse("first".to_string()),
                },
                JobFailure {
                    content_type: ContentType::IamPolicy,
                    destination: "gs://bkt/iam_inventory.json".to_string(),
                    error: Error::InvalidResponse("second".to_string()),
                },
            ],
            report: ExportReport {
                jobs: vec![
                    failed_job(ContentType::Resource),
                    failed_job(ContentType::IamPolicy),
                ],
            },
        };

        let display = failures.to_string();
        assert!(display.starts_with("2 of 2 inventory exports failed"));
        assert!(display.contains("first"));
        assert!(display.contains("second"));
        assert!(failures.failed(ContentType::Resource));
        assert!(failures.failed(ContentType::IamPolicy));
        assert_eq!(failures.category(), ErrorCategory::Format);
    }
}
