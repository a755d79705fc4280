//! Behaviour switches for registry parameters, loadable from JSON.

use crate::error::{ParameterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_POLICY_PROGRAM: &str = "gpupdate.exe";
pub const DEFAULT_POLICY_ARGS: &[&str] = &["/force"];

/// Registry root a parameter's path is resolved against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hive {
    #[default]
    CurrentUser,
    LocalMachine,
    ClassesRoot,
    Users,
    CurrentConfig,
}

impl Hive {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentUser => "HKCU",
            Self::LocalMachine => "HKLM",
            Self::ClassesRoot => "HKCR",
            Self::Users => "HKU",
            Self::CurrentConfig => "HKCC",
        }
    }

    /// Writes under these roots need an elevated process.
    #[must_use]
    pub const fn is_machine_wide(&self) -> bool {
        matches!(self, Self::LocalMachine | Self::ClassesRoot | Self::Users)
    }
}

/// Which WOW64 view of the registry to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryView {
    #[default]
    Default,
    Registry32,
    Registry64,
}

/// What a refresh of the additions list does with the entries already held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionsRefresh {
    /// Append every enumerated value; repeated reads accumulate duplicates.
    #[default]
    Append,
    /// Discard the current list and keep only what was just enumerated.
    Replace,
}

/// How `set_*` operations treat a key that does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeyPolicy {
    /// Report `NotFound` and write nothing.
    #[default]
    Fail,
    /// Create the key, as the `create_*` operations do.
    Create,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRefreshConfig {
    pub enabled: bool,
    pub program: String,
    pub args: Vec<String>,
}

impl Default for PolicyRefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: DEFAULT_POLICY_PROGRAM.to_string(),
            args: DEFAULT_POLICY_ARGS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterConfig {
    pub hive: Hive,
    pub view: RegistryView,
    pub policy_refresh: PolicyRefreshConfig,
    pub additions_refresh: AdditionsRefresh,
    pub missing_key: MissingKeyPolicy,
}

impl ParameterConfig {
    /// # Errors
    ///
    /// Returns `Config` if the text is not a valid configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ParameterError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    #[must_use]
    pub fn without_policy_refresh(mut self) -> Self {
        self.policy_refresh.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_gpupdate_on_current_user() {
        let config = ParameterConfig::default();
        assert_eq!(config.hive, Hive::CurrentUser);
        assert_eq!(config.view, RegistryView::Default);
        assert!(config.policy_refresh.enabled);
        assert_eq!(config.policy_refresh.program, "gpupdate.exe");
        assert_eq!(config.policy_refresh.args, vec!["/force".to_string()]);
        assert_eq!(config.additions_refresh, AdditionsRefresh::Append);
        assert_eq!(config.missing_key, MissingKeyPolicy::Fail);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ParameterConfig::from_json(
            r#"{ "hive": "local_machine", "additions_refresh": "replace",
                 "policy_refresh": { "enabled": false } }"#,
        )
        .unwrap();
        assert_eq!(config.hive, Hive::LocalMachine);
        assert_eq!(config.additions_refresh, AdditionsRefresh::Replace);
        assert!(!config.policy_refresh.enabled);
        assert_eq!(config.policy_refresh.program, "gpupdate.exe");
        assert_eq!(config.missing_key, MissingKeyPolicy::Fail);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = ParameterConfig::from_json("{ hive: ").unwrap_err();
        assert!(matches!(err, ParameterError::Config(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = ParameterConfig::load(Path::new("does-not-exist.json")).unwrap_err();
        assert!(matches!(err, ParameterError::Config(_)));
    }
}
