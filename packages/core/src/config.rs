//! Engine configuration
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Upper bound for `max_key_length`; keeps paths of deep trees indexable
const MAX_SUPPORTED_KEY_LENGTH: usize = 256;

/// What happens to the children of a deleted node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Delete the node together with its whole subtree
    #[default]
    Cascade,
    /// Attach the node's children to its parent (or make them roots)
    Reparent,
    /// Refuse to delete a node that still has children
    Forbid,
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(Self::Cascade),
            "reparent" => Ok(Self::Reparent),
            "forbid" => Ok(Self::Forbid),
            other => Err(format!(
                "unknown delete policy '{}' (expected cascade, reparent or forbid)",
                other
            )),
        }
    }
}

/// Configuration for the tree engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Database file location
    pub database_path: PathBuf,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,

    /// Maximum key length in characters
    pub max_key_length: usize,

    /// Child handling on delete
    pub delete_policy: DeletePolicy,

    /// Buffered domain events per subscriber
    pub event_channel_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("nodepath.db"),
            busy_timeout_ms: 5000,
            max_key_length: 32,
            delete_policy: DeletePolicy::Cascade,
            event_channel_capacity: 128,
        }
    }
}

impl TreeConfig {
    /// Configuration for a database at `database_path`, defaults elsewhere
    pub fn with_database_path(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `NODEPATH_*` environment variables
    ///
    /// - `NODEPATH_DB_PATH`
    /// - `NODEPATH_BUSY_TIMEOUT_MS`
    /// - `NODEPATH_MAX_KEY_LENGTH`
    /// - `NODEPATH_DELETE_POLICY` (`cascade`, `reparent`, `forbid`)
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(path) = lookup("NODEPATH_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(timeout) = lookup("NODEPATH_BUSY_TIMEOUT_MS") {
            config.busy_timeout_ms = timeout
                .parse()
                .map_err(|e| format!("NODEPATH_BUSY_TIMEOUT_MS: {}", e))?;
        }
        if let Some(len) = lookup("NODEPATH_MAX_KEY_LENGTH") {
            config.max_key_length = len
                .parse()
                .map_err(|e| format!("NODEPATH_MAX_KEY_LENGTH: {}", e))?;
        }
        if let Some(policy) = lookup("NODEPATH_DELETE_POLICY") {
            config.delete_policy = policy.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path cannot be empty".to_string());
        }

        if self.max_key_length == 0 {
            return Err("max_key_length must be greater than 0".to_string());
        }

        if self.max_key_length > MAX_SUPPORTED_KEY_LENGTH {
            return Err(format!(
                "max_key_length cannot exceed {}",
                MAX_SUPPORTED_KEY_LENGTH
            ));
        }

        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TreeConfig::default();
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.max_key_length, 32);
        assert_eq!(config.delete_policy, DeletePolicy::Cascade);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TreeConfig::default();

        config.max_key_length = 0;
        assert!(config.validate().is_err());

        config.max_key_length = MAX_SUPPORTED_KEY_LENGTH + 1;
        assert!(config.validate().is_err());

        config.max_key_length = 64;
        config.event_channel_capacity = 0;
        assert!(config.validate().is_err());

        config.event_channel_capacity = 16;
        config.database_path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("NODEPATH_DB_PATH", "/tmp/categories.db"),
            ("NODEPATH_MAX_KEY_LENGTH", "64"),
            ("NODEPATH_DELETE_POLICY", "Reparent"),
        ]
        .into_iter()
        .collect();

        let config = TreeConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/categories.db"));
        assert_eq!(config.max_key_length, 64);
        assert_eq!(config.delete_policy, DeletePolicy::Reparent);
        assert_eq!(config.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_env_overlay_rejects_bad_values() {
        let bad_policy = TreeConfig::from_lookup(|k| {
            (k == "NODEPATH_DELETE_POLICY").then(|| "orphan".to_string())
        });
        assert!(bad_policy.is_err());

        let bad_timeout = TreeConfig::from_lookup(|k| {
            (k == "NODEPATH_BUSY_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert!(bad_timeout.is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: TreeConfig =
            serde_json::from_str(r#"{"delete_policy": "forbid", "max_key_length": 16}"#).unwrap();
        assert_eq!(config.delete_policy, DeletePolicy::Forbid);
        assert_eq!(config.max_key_length, 16);
        assert_eq!(config.event_channel_capacity, 128);
    }
}
