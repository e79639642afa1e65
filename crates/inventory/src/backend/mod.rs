//! Backend trait and implementations for talking to the inventory service.
//!
//! This module provides the [`Backend`] trait and implementations for
//! different service endpoints. The primary implementation is
//! [`asset_api::AssetApiBackend`] for the Cloud Asset REST API.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use inventory::backend::{Backend, MockBackend};
//! use inventory::{ContentType, ExportRequest, OperationStatus};
//!
//! let mock = MockBackend::new();
//! let op = mock.submit(&ExportRequest {
//!     parent: "projects/p".to_string(),
//!     content_type: ContentType::Resource,
//!     destination_uri: "gs://b/resource_inventory.json".to_string(),
//! }).unwrap();
//!
//! assert_eq!(mock.poll(&op).unwrap(), OperationStatus::Succeeded);
//! assert_eq!(mock.submissions().len(), 1);
//! ```

pub mod asset_api;

use crate::error::{Error, Result};
use crate::types::{ContentType, ExportOperation, ExportRequest, OperationStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Backend trait for the inventory service.
///
/// This abstraction keeps the orchestrator independent of transport and
/// authentication, and enables testing.
pub trait Backend: Send + Sync {
    /// Submit an export request.
    ///
    /// Returns a handle to the long-running operation the service started.
    fn submit(&self, request: &ExportRequest) -> Result<ExportOperation>;

    /// Poll an operation once.
    fn poll(&self, operation: &ExportOperation) -> Result<OperationStatus>;
}

#[derive(Debug, Default)]
struct MockState {
    submissions: Vec<ExportRequest>,
    polls: HashMap<String, u32>,
    submit_failures: HashMap<ContentType, String>,
    operation_failures: HashMap<ContentType, String>,
    running_polls: u32,
}

/// Mock backend for testing without network access.
///
/// Records every submission and poll. Each content type can be scripted to
/// fail at submission or at completion, and every operation can be made to
/// report `Running` for a number of polls before finishing.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a mock where every export succeeds on the first poll.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make submissions for a content type fail.
    pub fn fail_submission(&self, content_type: ContentType, message: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.submit_failures.insert(content_type, message.into());
    }

    /// Make operations for a content type finish with an error.
    pub fn fail_operation(&self, content_type: ContentType, message: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.operation_failures.insert(content_type, message.into());
    }

    /// Report `Running` for this many polls before finishing.
    ///
    /// `u32::MAX` keeps operations running forever.
    pub fn set_running_polls(&self, polls: u32) {
        let mut state = self.state.lock().unwrap();
        state.running_polls = polls;
    }

    /// Requests submitted so far, rejected ones included, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<ExportRequest> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// Number of polls made for an operation.
    #[must_use]
    pub fn poll_count(&self, operation: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.polls.get(operation).copied().unwrap_or(0)
    }

    /// Number of polls made across all operations.
    #[must_use]
    pub fn total_polls(&self) -> u32 {
        self.state.lock().unwrap().polls.values().sum()
    }
}

impl Backend for MockBackend {
    fn submit(&self, request: &ExportRequest) -> Result<ExportOperation> {
        let mut state = self.state.lock().unwrap();
        state.submissions.push(request.clone());

        if let Some(message) = state.submit_failures.get(&request.content_type) {
            return Err(Error::http(message.clone(), Some(400)));
        }

        let name = format!(
            "{}/operations/ExportAssets/{}/{}",
            request.parent,
            request.content_type.api_name(),
            state.submissions.len()
        );
        state.polls.insert(name.clone(), 0);

        Ok(ExportOperation {
            name,
            content_type: request.content_type,
        })
    }

    fn poll(&self, operation: &ExportOperation) -> Result<OperationStatus> {
        let mut state = self.state.lock().unwrap();
        let running_polls = state.running_polls;

        let count = state.polls.get_mut(&operation.name).ok_or_else(|| {
            Error::InvalidResponse(format!("unknown operation: {}", operation.name))
        })?;
        *count += 1;
        if *count <= running_polls {
            return Ok(OperationStatus::Running);
        }

        match state.operation_failures.get(&operation.content_type) {
            Some(message) => Ok(OperationStatus::Failed {
                code: Some(7),
                message: message.clone(),
            }),
            None => Ok(OperationStatus::Succeeded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content_type: ContentType) -> ExportRequest {
        ExportRequest {
            parent: "projects/p".to_string(),
            content_type,
            destination_uri: format!("gs://b/{}", content_type.object_name()),
        }
    }

    #[test]
    fn test_mock_backend_records_submissions() {
        let mock = MockBackend::new();
        mock.submit(&request(ContentType::Resource)).unwrap();
        mock.submit(&request(ContentType::IamPolicy)).unwrap();

        let submitted = mock.submissions();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].content_type, ContentType::Resource);
        assert_eq!(submitted[1].content_type, ContentType::IamPolicy);
    }

    #[test]
    fn test_mock_backend_operation_name() {
        let mock = MockBackend::new();
        let op = mock.submit(&request(ContentType::IamPolicy)).unwrap();
        assert_eq!(op.name, "projects/p/operations/ExportAssets/IAM_POLICY/1");
        assert_eq!(op.content_type, ContentType::IamPolicy);
    }

    #[test]
    fn test_mock_backend_submission_failure() {
        let mock = MockBackend::new();
        mock.fail_submission(ContentType::Resource, "permission denied");

        let result = mock.submit(&request(ContentType::Resource));
        assert!(matches!(result, Err(Error::Http { status: Some(400), .. })));
        // Rejected submissions are still recorded
        assert_eq!(mock.submissions().len(), 1);

        assert!(mock.submit(&request(ContentType::IamPolicy)).is_ok());
    }

    #[test]
    fn test_mock_backend_clones_share_state() {
        let mock = MockBackend::new();
        let handle = mock.clone();
        handle.fail_submission(ContentType::IamPolicy, "quota exceeded");

        assert!(mock.submit(&request(ContentType::IamPolicy)).is_err());
        assert_eq!(handle.submissions().len(), 1);
    }

    #[test]
    fn test_mock_backend_running_polls() {
        let mock = MockBackend::new();
        mock.set_running_polls(2);

        let op = mock.submit(&request(ContentType::Resource)).unwrap();
        assert_eq!(mock.poll(&op).unwrap(), OperationStatus::Running);
        assert_eq!(mock.poll(&op).unwrap(), OperationStatus::Running);
        assert_eq!(mock.poll(&op).unwrap(), OperationStatus::Succeeded);
        assert_eq!(mock.poll_count(&op.name), 3);
    }

    #[test]
    fn test_mock_backend_operation_failure() {
        let mock = MockBackend::new();
        mock.fail_operation(ContentType::IamPolicy, "bucket not writable");

        let op = mock.submit(&request(ContentType::IamPolicy)).unwrap();
        match mock.poll(&op).unwrap() {
            OperationStatus::Failed { message, .. } => {
                assert_eq!(message, "bucket not writable");
            }
            other => panic!("Expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_mock_backend_unknown_operation() {
        let mock = MockBackend::new();
        let op = ExportOperation {
            name: "operations/missing".to_string(),
            content_type: ContentType::Resource,
        };
        assert!(mock.poll(&op).is_err());
    }
}
