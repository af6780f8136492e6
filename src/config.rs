//! YAML configuration
//!
//! Every key is optional; defaults describe the portfolio site this engine
//! was built for.

use crate::gate::GateSettings;
use crate::taxonomy::{CanonicalSchema, GroupName};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CANONICAL_GROUP: &str = "portfolio_category";
pub const DEFAULT_LEGACY_GROUPS: &[&str] = &["murals_category", "design_category", "fine_art_category"];
pub const DEFAULT_REFRESH_GUARD_SECS: u64 = 3600;
pub const MAX_REFRESH_GUARD_SECS: u64 = 30 * 24 * 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolioConfig {
    /// Running version; any difference from the installed marker
    /// triggers convergence
    pub version: String,
    pub canonical_group: String,
    pub canonical_label: String,
    pub rewrite_slug: String,
    /// Processed in this order on every run
    pub legacy_groups: Vec<String>,
    pub refresh_guard_secs: u64,
    pub version_marker_key: String,
    pub refresh_guard_key: String,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            version: crate::VERSION.to_string(),
            canonical_group: DEFAULT_CANONICAL_GROUP.to_string(),
            canonical_label: "Portfolio Categories".to_string(),
            rewrite_slug: "portfolio-category".to_string(),
            legacy_groups: DEFAULT_LEGACY_GROUPS.iter().map(|g| g.to_string()).collect(),
            refresh_guard_secs: DEFAULT_REFRESH_GUARD_SECS,
            version_marker_key: "folio_version".to_string(),
            refresh_guard_key: "folio_flush_routes".to_string(),
        }
    }
}

impl FolioConfig {
    /// Load from `path`, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::Invalid("version must not be empty".to_string()));
        }
        if self.canonical_group.trim().is_empty() {
            return Err(ConfigError::Invalid("canonical_group must not be empty".to_string()));
        }
        if self.rewrite_slug.trim().is_empty() {
            return Err(ConfigError::Invalid("rewrite_slug must not be empty".to_string()));
        }
        if self.refresh_guard_secs == 0 || self.refresh_guard_secs > MAX_REFRESH_GUARD_SECS {
            return Err(ConfigError::Invalid(format!(
                "refresh_guard_secs must be between 1 and {}",
                MAX_REFRESH_GUARD_SECS
            )));
        }
        if self.version_marker_key == self.refresh_guard_key {
            return Err(ConfigError::Invalid(
                "version_marker_key and refresh_guard_key must differ".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for group in &self.legacy_groups {
            if group.trim().is_empty() {
                return Err(ConfigError::Invalid("legacy group names must not be empty".to_string()));
            }
            if group == &self.canonical_group {
                return Err(ConfigError::Invalid(format!(
                    "canonical group {} cannot also be a legacy group",
                    group
                )));
            }
            if !seen.insert(group.as_str()) {
                return Err(ConfigError::Invalid(format!("legacy group {} listed twice", group)));
            }
        }
        Ok(())
    }

    pub fn schema(&self) -> CanonicalSchema {
        CanonicalSchema::new(
            GroupName::new(self.canonical_group.clone()),
            self.canonical_label.clone(),
            self.rewrite_slug.clone(),
        )
    }

    pub fn legacy_groups(&self) -> Vec<GroupName> {
        self.legacy_groups.iter().cloned().map(GroupName::new).collect()
    }

    pub fn gate_settings(&self) -> GateSettings {
        let secs = self.refresh_guard_secs.min(MAX_REFRESH_GUARD_SECS) as i64;
        GateSettings {
            version: self.version.clone(),
            version_marker_key: self.version_marker_key.clone(),
            refresh_guard_key: self.refresh_guard_key.clone(),
            refresh_window: Duration::seconds(secs),
            schema: self.schema(),
            legacy_groups: self.legacy_groups(),
        }
    }
}
