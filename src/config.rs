use anyhow::{Context, Result};
use inventory::backend::asset_api::DEFAULT_ENDPOINT;
use inventory::{InventoryOptions, MIN_POLL_INTERVAL, WaitOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("cai-export"))
}

// ============================================================================
// Settings File
// ============================================================================

/// Contents of config.toml. Every field is optional.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub inventory: InventorySettings,

    #[serde(default)]
    pub wait: WaitSettings,

    #[serde(default)]
    pub api: ApiSettings,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventorySettings {
    #[serde(default)]
    pub control_project: Option<String>,
    #[serde(default)]
    pub target_project: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WaitSettings {
    pub poll_interval_secs: u64,
    pub max_poll_interval_secs: u64,
    pub backoff_factor: f64,
    pub timeout_secs: Option<u64>,
}

impl Default for WaitSettings {
    fn default() -> Self {
        let defaults = WaitOptions::default();
        Self {
            poll_interval_secs: defaults.poll_interval.as_secs(),
            max_poll_interval_secs: defaults.max_poll_interval.as_secs(),
            backoff_factor: defaults.backoff_factor,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiSettings {
    pub endpoint: String,
    pub concurrent: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            concurrent: false,
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, or from the default location.
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
                Self::load_from(Path::new(&expanded))
            }
            None => {
                let path = config_dir()?.join("config.toml");
                if !path.exists() {
                    log::debug!("No settings file at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                Self::load_from(&path)
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read settings file: {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Self::from_toml(&content)
            .with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML format in settings")
    }
}

impl InventorySettings {
    /// Overlay values from `other`; set fields in `other` win.
    pub fn merge(&mut self, other: InventorySettings) {
        if other.control_project.is_some() {
            self.control_project = other.control_project;
        }
        if other.target_project.is_some() {
            self.target_project = other.target_project;
        }
        if other.organization.is_some() {
            self.organization = other.organization;
        }
        if other.bucket.is_some() {
            self.bucket = other.bucket;
        }
    }

    pub fn to_options(&self) -> InventoryOptions {
        InventoryOptions {
            control_project: self.control_project.clone(),
            target_project: self.target_project.clone(),
            organization: self.organization.clone(),
            bucket: self.bucket.clone().unwrap_or_default(),
        }
    }
}

impl WaitSettings {
    pub fn to_options(&self) -> WaitOptions {
        let poll_interval = Duration::from_secs(self.poll_interval_secs).max(MIN_POLL_INTERVAL);
        WaitOptions::new()
            .poll_interval(poll_interval)
            .max_poll_interval(Duration::from_secs(
                self.max_poll_interval_secs.max(self.poll_interval_secs),
            ))
            .backoff_factor(self.backoff_factor.max(1.0))
            .timeout(self.timeout_secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_settings_are_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.api.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.wait.to_options(), WaitOptions::default());
    }

    #[test]
    fn test_full_settings() {
        let settings = Settings::from_toml(
            r#"
            [inventory]
            control_project = "ctl"
            organization = "123"
            bucket = "bkt"

            [wait]
            poll_interval_secs = 5
            timeout_secs = 3600

            [api]
            concurrent = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.inventory.control_project.as_deref(), Some("ctl"));
        assert_eq!(settings.inventory.organization.as_deref(), Some("123"));
        assert_eq!(settings.inventory.bucket.as_deref(), Some("bkt"));
        assert!(settings.api.concurrent);

        let wait = settings.wait.to_options();
        assert_eq!(wait.poll_interval, Duration::from_secs(5));
        assert_eq!(wait.max_poll_interval, Duration::from_secs(30));
        assert_eq!(wait.timeout, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Settings::from_toml("[inventory\nbucket = ").is_err());
    }

    #[test]
    fn test_merge_overrides_set_fields_only() {
        let mut base = InventorySettings {
            control_project: Some("ctl".to_string()),
            target_project: Some("file-proj".to_string()),
            organization: None,
            bucket: Some("file-bkt".to_string()),
        };
        base.merge(InventorySettings {
            target_project: Some("flag-proj".to_string()),
            ..Default::default()
        });

        assert_eq!(base.control_project.as_deref(), Some("ctl"));
        assert_eq!(base.target_project.as_deref(), Some("flag-proj"));
        assert_eq!(base.bucket.as_deref(), Some("file-bkt"));
    }

    #[test]
    fn test_to_options_without_bucket_is_empty() {
        let options = InventorySettings::default().to_options();
        assert!(options.bucket.is_empty());
    }

    #[test]
    fn test_max_poll_interval_never_below_poll_interval() {
        let wait = WaitSettings {
            poll_interval_secs: 60,
            max_poll_interval_secs: 10,
            ..Default::default()
        };
        let options = wait.to_options();
        assert_eq!(options.max_poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_poll_interval_is_floored() {
        let wait = WaitSettings {
            poll_interval_secs: 0,
            max_poll_interval_secs: 0,
            ..Default::default()
        };
        let options = wait.to_options();
        assert_eq!(options.poll_interval, MIN_POLL_INTERVAL);
        for poll in 0..5 {
            assert!(options.delay_for_poll(poll) >= MIN_POLL_INTERVAL);
        }
    }

    #[test]
    fn test_huge_wait_settings_do_not_overflow() {
        let wait = WaitSettings {
            poll_interval_secs: u64::MAX,
            max_poll_interval_secs: u64::MAX,
            timeout_secs: Some(u64::MAX),
            ..Default::default()
        };
        let options = wait.to_options();
        assert_eq!(options.delay_for_poll(3), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[inventory]\ntarget_project = \"p\"\nbucket = \"b\"").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.inventory.target_project.as_deref(), Some("p"));
        assert_eq!(settings.inventory.bucket.as_deref(), Some("b"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let result = Settings::load(Some(missing.as_path()));
        assert!(result.is_err());
    }
}
