use std::path::Path;

use tracing::{debug, warn};
use vigil_core::VigilConfig;
use vigil_definitions::Definitions;
use vigil_store::RedbSession;

pub mod import;
pub mod init;
pub mod inspect;

const DEFAULT_CONFIG: &str = "vigil.toml";

/// Explicit `--config`, else `./vigil.toml` when present, else defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<VigilConfig> {
    match path {
        Some(path) => VigilConfig::from_file(path),
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            VigilConfig::from_file(Path::new(DEFAULT_CONFIG))
        }
        None => Ok(VigilConfig::default()),
    }
}

pub fn open_catalog(config: &VigilConfig) -> anyhow::Result<Definitions<RedbSession>> {
    let session = match &config.store.path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            debug!(path = %path.display(), "opening catalog");
            RedbSession::open(path)?
        }
        None => {
            warn!("no [store].path configured, using an in-memory catalog");
            RedbSession::open_in_memory()?
        }
    };
    Ok(Definitions::new(session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.toml");
        std::fs::write(&path, "[store]\npath = \"/tmp/x.redb\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.store.path.as_deref(), Some(Path::new("/tmp/x.redb")));
    }

    #[test]
    fn missing_explicit_config_fails() {
        assert!(load_config(Some(Path::new("/nonexistent/vigil.toml"))).is_err());
    }

    #[test]
    fn catalog_opens_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = VigilConfig::scaffold(dir.path());
        let catalog = open_catalog(&config).unwrap();
        assert!(!catalog.is_initialized());
        assert!(dir.path().join("catalog.redb").exists());
    }
}
