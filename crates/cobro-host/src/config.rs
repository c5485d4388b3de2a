use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk host configuration. Every field is optional; command-line flags
/// and environment variables take precedence over it.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub bridge: BridgeSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreSection {
    /// Directory holding the store file. Defaults to the user data dir.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BridgeSection {
    /// Socket path the bridge listens on.
    pub socket: Option<PathBuf>,
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn read_config(path: &Path) -> anyhow::Result<HostConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("cobro"));
        }
    }
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home).join(".config").join("cobro"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_parses() {
        let config: HostConfig = toml::from_str("").unwrap();
        assert!(config.store.data_dir.is_none());
        assert!(config.bridge.socket.is_none());
    }

    #[test]
    fn test_sections_parse() {
        let config: HostConfig = toml::from_str(
            r#"
            [store]
            data_dir = "/var/lib/cobro"

            [bridge]
            socket = "/run/cobro/cobro.sock"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.data_dir, Some(PathBuf::from("/var/lib/cobro")));
        assert_eq!(
            config.bridge.socket,
            Some(PathBuf::from("/run/cobro/cobro.sock"))
        );
    }
}
