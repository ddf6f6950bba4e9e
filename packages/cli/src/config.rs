use outliner_editor::{Command, SessionConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "outliner.config.json";

/// Outliner configuration file format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Document id used for link transforms when `--doc-id` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,

    /// Re-validate after every edit
    #[serde(default)]
    pub validate_on_commit: bool,

    /// How long `probe` waits for the persistence check before reporting it
    /// disabled
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,

    /// Directory for local replica caches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_dir: Option<String>,

    /// Key chord → command overrides
    #[serde(default)]
    pub keymap: HashMap<String, Command>,
}

fn default_readiness_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// `--doc-id` if given, else the configured id
    pub fn resolve_doc_id(&self, flag: Option<String>) -> anyhow::Result<String> {
        flag.or_else(|| self.doc_id.clone()).ok_or_else(|| {
            anyhow::anyhow!("No document id: pass --doc-id or set docId in {DEFAULT_CONFIG_NAME}")
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            keymap: self.keymap.clone(),
            validate_on_commit: self.validate_on_commit,
        }
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    /// Absolute persistence directory, if configured
    pub fn get_persistence_dir(&self, cwd: &str) -> Option<PathBuf> {
        self.persistence_dir
            .as_ref()
            .map(|dir| PathBuf::from(cwd).join(dir))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            doc_id: None,
            validate_on_commit: false,
            readiness_timeout_ms: default_readiness_timeout_ms(),
            persistence_dir: None,
            keymap: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "docId": "journal",
            "validateOnCommit": true,
            "readinessTimeoutMs": 250,
            "persistenceDir": ".outliner",
            "keymap": { "Ctrl+ArrowDown": "extend-selection-down" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.doc_id.as_deref(), Some("journal"));
        assert!(config.validate_on_commit);
        assert_eq!(config.readiness_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.get_persistence_dir("/work"),
            Some(PathBuf::from("/work/.outliner"))
        );
        assert_eq!(
            config.keymap.get("Ctrl+ArrowDown"),
            Some(&Command::ExtendSelectionDown)
        );
        assert!(config.session_config().validate_on_commit);
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.readiness_timeout_ms, 5000);
        assert!(config.resolve_doc_id(None).is_err());
        assert_eq!(
            config.resolve_doc_id(Some("doc-1".into())).unwrap(),
            "doc-1"
        );
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::load(&temp.path().display().to_string()).unwrap();
        assert_eq!(config, Config::default());
    }
}
