//! Inventory configuration: which scope to export and where to write it.

use std::fmt;

use crate::error::{Error, Result};
use crate::types::{ContentType, ExportRequest};

/// Scheme prefix of destination URIs.
const GCS_SCHEME: &str = "gs";

/// The boundary an inventory is taken over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryScope {
    /// A single project.
    Project(String),
    /// A whole organization.
    Organization(String),
}

impl InventoryScope {
    /// Resource path of the scope, used as the request parent.
    #[must_use]
    pub fn parent(&self) -> String {
        match self {
            Self::Project(id) => format!("projects/{id}"),
            Self::Organization(id) => format!("organizations/{id}"),
        }
    }
}

impl fmt::Display for InventoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parent())
    }
}

/// Every recognised configuration field.
///
/// | Field             | Default                       |
/// |-------------------|-------------------------------|
/// | `control_project` | the target project            |
/// | `target_project`  | the control project           |
/// | `organization`    | none; wins over the project   |
/// | `bucket`          | required                      |
///
/// # Example
///
/// ```
/// use inventory::{InventoryConfig, InventoryOptions};
///
/// let config = InventoryConfig::new(
///     InventoryOptions::new("bkt-1").target_project("proj-1"),
/// ).unwrap();
/// assert_eq!(config.parent(), "projects/proj-1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryOptions {
    /// Project billed for the export requests.
    pub control_project: Option<String>,
    /// Project to export.
    pub target_project: Option<String>,
    /// Organization to export.
    pub organization: Option<String>,
    /// Destination bucket name, without scheme.
    pub bucket: String,
}

impl InventoryOptions {
    /// Options writing to the given bucket, with no scope yet.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set the control (billing) project.
    pub fn control_project(mut self, project: impl Into<String>) -> Self {
        self.control_project = Some(project.into());
        self
    }

    /// Set the project to export.
    pub fn target_project(mut self, project: impl Into<String>) -> Self {
        self.target_project = Some(project.into());
        self
    }

    /// Set the organization to export.
    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Set the destination bucket.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }
}

/// Validated, immutable configuration for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    scope: InventoryScope,
    control_project: Option<String>,
    bucket: String,
}

impl InventoryConfig {
    /// Validate options and build a configuration.
    ///
    /// Fails when the bucket is empty or malformed, an identifier is
    /// malformed, or no scope can be resolved.
    pub fn new(options: InventoryOptions) -> Result<Self> {
        let bucket = options.bucket.trim().to_string();
        if bucket.is_empty() {
            return Err(Error::InvalidConfig(
                "destination bucket must not be empty".to_string(),
            ));
        }
        if bucket.contains("://") || bucket.contains('/') {
            return Err(Error::InvalidConfig(format!(
                "destination bucket must be a bare bucket name, got '{bucket}'"
            )));
        }

        let control_project = normalize("control project", options.control_project)?;
        let target_project = normalize("target project", options.target_project)?;
        let organization = normalize("organization", options.organization)?;

        let scope = match (organization, target_project.or(control_project.clone())) {
            (Some(org), _) => InventoryScope::Organization(org),
            (None, Some(project)) => InventoryScope::Project(project),
            (None, None) => {
                return Err(Error::InvalidConfig(
                    "one of project or organization must be set".to_string(),
                ));
            }
        };

        let config = Self {
            scope,
            control_project,
            bucket,
        };

        log::debug!(
            "Initializing inventory: target={} control={}",
            config.parent(),
            config.billing_project().unwrap_or("<credentials default>")
        );

        Ok(config)
    }

    /// The resolved scope.
    #[must_use]
    pub fn scope(&self) -> &InventoryScope {
        &self.scope
    }

    /// Destination bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Request parent path: `organizations/{org}` when an organization is
    /// set, otherwise `projects/{project}`.
    #[must_use]
    pub fn parent(&self) -> String {
        self.scope.parent()
    }

    /// Project billed for requests: the control project, falling back to
    /// the target project. `None` for organization scopes without a control
    /// project, leaving the choice to the credentials.
    #[must_use]
    pub fn billing_project(&self) -> Option<&str> {
        match (&self.control_project, &self.scope) {
            (Some(control), _) => Some(control),
            (None, InventoryScope::Project(project)) => Some(project),
            (None, InventoryScope::Organization(_)) => None,
        }
    }

    /// Destination object URI for a content type.
    #[must_use]
    pub fn destination_uri(&self, content_type: ContentType) -> String {
        format!(
            "{GCS_SCHEME}://{}/{}",
            self.bucket,
            content_type.object_name()
        )
    }

    /// Build the export request for a content type.
    #[must_use]
    pub fn request(&self, content_type: ContentType) -> ExportRequest {
        ExportRequest {
            parent: self.parent(),
            content_type,
            destination_uri: self.destination_uri(content_type),
        }
    }
}

/// Trim an optional identifier; blank becomes unset.
fn normalize(field: &str, value: Option<String>) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.contains('/') || value.chars().any(char::is_whitespace) {
        return Err(Error::InvalidConfig(format!(
            "{field} '{value}' must not contain '/' or whitespace"
        )));
    }
    Ok(Some(value.to_string()))
}
