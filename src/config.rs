use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    #[serde(default)]
    pub media: MediaConfig,
    pub database: Database,
    pub http: HttpConfig,
    pub auth: AuthConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize)]
pub struct MediaConfig {
    /// Directory that library paths and uploads are resolved against.
    /// A relative value is taken from the process working directory.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("Media")
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Directory with the prebuilt frontend. Static serving is disabled
    /// when unset.
    pub assets_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub in_memory: bool,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
}

fn default_token_ttl() -> i64 {
    24 * 60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_config_toml() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[media]
base_dir = "/srv/media"

[database]
in_memory = true

[http]
bind_addr = "127.0.0.1"
port = 8080
assets_dir = "frontend/dist"

[auth]
jwt_secret = "not-a-real-secret"
token_ttl_secs = 3600
"#;

        // Deserialize TOML into Config
        let cfg: Config = toml::from_str(toml_str)?;

        // Check version
        assert_eq!(cfg.version, 1);

        // Check media section
        assert_eq!(cfg.media.base_dir, PathBuf::from("/srv/media"));

        // Check database variant
        assert!(cfg.database.in_memory);

        // Check http section
        assert_eq!(cfg.http.bind_addr, "127.0.0.1");
        assert_eq!(cfg.http.assets_dir, Some(PathBuf::from("frontend/dist")));

        // Check auth section
        assert_eq!(cfg.auth.token_ttl_secs, 3600);

        Ok(())
    }

    #[test]
    fn test_parse_file_database_config() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[database]
in_memory = false
path = "/tmp/mediarack.db"

[http]
bind_addr = "127.0.0.1"
port = 8080

[auth]
jwt_secret = "not-a-real-secret"
"#;

        let cfg: Config = toml::from_str(toml_str)?;

        // Check database variant
        assert!(!cfg.database.in_memory);
        assert_eq!(cfg.database.path, Some(PathBuf::from("/tmp/mediarack.db")));

        // Omitted sections and fields fall back to defaults
        assert_eq!(cfg.media.base_dir, PathBuf::from("Media"));
        assert_eq!(cfg.http.assets_dir, None);
        assert_eq!(cfg.auth.token_ttl_secs, 24 * 60 * 60);

        Ok(())
    }
}
