//! vigil.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_FILTER: &str = "info,vigil=debug";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub store: StoreConfig,
    pub bootstrap: Option<BootstrapConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Catalog database file. When absent the catalog lives in memory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Folder holding `triggers.data`, `conditions.data`, `dampening.data`, `actions.data`.
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: Option<String>,
}

impl VigilConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VigilConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Tracing filter directive, falling back to [`DEFAULT_LOG_FILTER`].
    pub fn log_filter(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.filter.as_deref())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Scaffold a vigil.toml rooted at `data_dir`.
    pub fn scaffold(data_dir: &Path) -> Self {
        VigilConfig {
            store: StoreConfig {
                path: Some(data_dir.join("catalog.redb")),
            },
            bootstrap: Some(BootstrapConfig {
                data_dir: data_dir.join("seed"),
            }),
            logging: Some(LoggingConfig {
                filter: Some(DEFAULT_LOG_FILTER.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold() {
        let config = VigilConfig::scaffold(Path::new("/var/lib/vigil"));
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("catalog.redb"));
        assert!(toml_str.contains("seed"));
    }

    #[test]
    fn test_parse_minimal() {
        let config: VigilConfig = toml::from_str("").unwrap();
        assert!(config.store.path.is_none());
        assert!(config.bootstrap.is_none());
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[store]
path = "/tmp/catalog.redb"

[bootstrap]
data_dir = "/etc/vigil/seed"

[logging]
filter = "warn"
"#;
        let config: VigilConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.path.as_deref(), Some(Path::new("/tmp/catalog.redb")));
        assert_eq!(
            config.bootstrap.as_ref().unwrap().data_dir,
            PathBuf::from("/etc/vigil/seed")
        );
        assert_eq!(config.log_filter(), "warn");
    }
}
