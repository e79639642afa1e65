//! Cloud Asset REST API backend.
//!
//! This module provides the [`AssetApiBackend`] implementation, which calls
//! `exportAssets` on the Cloud Asset API v1 and polls the returned
//! long-running operation.
//!
//! # Billing
//!
//! When a billing project is set, requests carry `X-Goog-User-Project` so
//! quota and billing are charged to it rather than to the credentials'
//! default project.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::TokenSource;
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{ExportOperation, ExportRequest, OperationStatus};

/// Production API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://cloudasset.googleapis.com";

/// Per-request timeout. Operation waits are bounded separately.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("inventory-rs/", env!("CARGO_PKG_VERSION"));

/// Cloud Asset API backend.
///
/// # Example
///
/// ```no_run
/// use inventory::auth::GcloudToken;
/// use inventory::backend::asset_api::AssetApiBackend;
///
/// let backend = AssetApiBackend::new(Box::new(GcloudToken::new()))
///     .billing_project(Some("my-control-project".to_string()));
/// ```
pub struct AssetApiBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL.
    endpoint: String,
    /// Bearer token provider.
    tokens: Box<dyn TokenSource>,
    /// Project charged for requests.
    billing_project: Option<String>,
}

impl AssetApiBackend {
    /// Create a backend against the production endpoint.
    #[must_use]
    pub fn new(tokens: Box<dyn TokenSource>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            tokens,
            billing_project: None,
        }
    }

    /// Use a different API base URL (for testing or private endpoints).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Charge requests to this project.
    pub fn billing_project(mut self, project: Option<String>) -> Self {
        self.billing_project = project;
        self
    }

    /// Get the current API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.endpoint
    }

    /// Build the `exportAssets` URL for a parent.
    fn export_url(&self, parent: &str) -> String {
        format!("{}/v1/{}:exportAssets", self.endpoint, parent)
    }

    /// Build the URL of an operation.
    fn operation_url(&self, name: &str) -> String {
        format!("{}/v1/{}", self.endpoint, name)
    }

    /// Headers sent with every request.
    fn headers(&self) -> Result<Vec<(&'static str, String)>> {
        let mut headers = vec![
            ("Authorization", format!("Bearer {}", self.tokens.token()?)),
            ("User-Agent", USER_AGENT.to_string()),
        ];
        if let Some(project) = &self.billing_project {
            headers.push(("X-Goog-User-Project", project.clone()));
        }
        Ok(headers)
    }

    fn authorize<B>(&self, mut builder: ureq::RequestBuilder<B>) -> Result<ureq::RequestBuilder<B>> {
        for (name, value) in self.headers()? {
            builder = builder.header(name, value);
        }
        Ok(builder)
    }
}

impl Backend for AssetApiBackend {
    fn submit(&self, request: &ExportRequest) -> Result<ExportOperation> {
        let url = self.export_url(&request.parent);
        log::debug!("POST {url} ({})", request.destination_uri);

        let mut response = self
            .authorize(self.agent.post(&url))?
            .send_json(ExportAssetsBody::from(request))?;
        let operation: OperationResponse = read_json(&mut response)?;

        if operation.name.is_empty() {
            return Err(Error::InvalidResponse(
                "exportAssets returned an operation without a name".to_string(),
            ));
        }

        Ok(ExportOperation {
            name: operation.name,
            content_type: request.content_type,
        })
    }

    fn poll(&self, operation: &ExportOperation) -> Result<OperationStatus> {
        let url = self.operation_url(&operation.name);

        let mut response = self.authorize(self.agent.get(&url))?.call()?;
        let body: OperationResponse = read_json(&mut response)?;
        Ok(body.into())
    }
}

/// Decode a 2xx body, or turn an error response into an [`Error`].
fn read_json<T: DeserializeOwned>(response: &mut ureq::http::Response<ureq::Body>) -> Result<T> {
    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string()?;

    if (200..300).contains(&status) {
        Ok(serde_json::from_str(&body)?)
    } else {
        Err(error_from_response(status, &body))
    }
}

fn error_from_response(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| match envelope.error.status {
            Some(code) => format!("{code}: {}", envelope.error.message),
            None => envelope.error.message,
        })
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        401 | 403 => Error::Auth(message),
        _ => Error::http(format!("HTTP {status}: {message}"), Some(status)),
    }
}

// =============================================================================
// Cloud Asset API wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportAssetsBody<'a> {
    content_type: &'static str,
    output_config: OutputConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputConfig<'a> {
    gcs_destination: GcsDestination<'a>,
}

#[derive(Debug, Serialize)]
struct GcsDestination<'a> {
    uri: &'a str,
}

impl<'a> From<&'a ExportRequest> for ExportAssetsBody<'a> {
    fn from(request: &'a ExportRequest) -> Self {
        Self {
            content_type: request.content_type.api_name(),
            output_config: OutputConfig {
                gcs_destination: GcsDestination {
                    uri: &request.destination_uri,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<RpcStatus>,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    code: Option<i32>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

impl From<OperationResponse> for OperationStatus {
    fn from(op: OperationResponse) -> Self {
        match (op.done, op.error) {
            (false, _) => Self::Running,
            (true, Some(status)) => Self::Failed {
                code: status.code,
                message: status.message,
            },
            (true, None) => Self::Succeeded,
        }
    }
}
