//! Application configuration for jbook-nav.
//!
//! User config lives at `~/.jbooknav/jbooknav.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{NavError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "jbooknav.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".jbooknav";

// ---------------------------------------------------------------------------
// Config structs (matching jbooknav.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Jupyter server connection.
    #[serde(default)]
    pub server: ServerConfig,

    /// Server extension and book layout.
    #[serde(default)]
    pub extension: ExtensionConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the Jupyter server, with trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the server token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8888/".into()
}
fn default_token_env() -> String {
    "JUPYTER_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[extension]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// URL namespace of the companion server extension.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Book config file name, relative to the book root.
    #[serde(default = "default_config_file")]
    pub config_file: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            config_file: default_config_file(),
        }
    }
}

fn default_namespace() -> String {
    "jupyterlab-jupyterbook-navigation".into()
}
fn default_config_file() -> String {
    "_config.yml".into()
}

// ---------------------------------------------------------------------------
// Server settings (runtime, merged from config + CLI flags + env)
// ---------------------------------------------------------------------------

/// Connection settings used for every request to the Jupyter server.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Base URL, always ending in `/`.
    pub base_url: Url,
    /// Server token, sent as `Authorization: token <t>` when present.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Server extension namespace.
    pub namespace: String,
}

impl ServerSettings {
    /// Build settings for `base_url` with no token and default timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            token: None,
            timeout: Duration::from_secs(default_timeout_secs()),
            namespace: default_namespace(),
        })
    }

    /// Set the server token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Merge the config file with an optional base URL override.
    ///
    /// The token is read from the env var named by `server.token_env`;
    /// an unset or empty variable means no token.
    pub fn from_config(config: &AppConfig, base_url_override: Option<&str>) -> Result<Self> {
        let base = base_url_override.unwrap_or(&config.server.base_url);
        let token = std::env::var(&config.server.token_env)
            .ok()
            .filter(|t| !t.is_empty());

        Ok(Self {
            base_url: parse_base_url(base)?,
            token,
            timeout: Duration::from_secs(config.server.timeout_secs),
            namespace: config.extension.namespace.clone(),
        })
    }
}

/// Parse a base URL, appending the trailing slash `Url::join` relies on.
fn parse_base_url(raw: &str) -> Result<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| NavError::config(format!("invalid base URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(NavError::config(format!(
            "unsupported scheme '{other}' in base URL '{raw}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.jbooknav/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| NavError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.jbooknav/jbooknav.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NavError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| NavError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NavError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| NavError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NavError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("JUPYTER_TOKEN"));
        assert!(toml_str.contains("_config.yml"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[server]
base_url = "http://127.0.0.1:9999/lab-base/"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.server.base_url, "http://127.0.0.1:9999/lab-base/");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.extension.namespace, "jupyterlab-jupyterbook-navigation");
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let settings = ServerSettings::new("http://localhost:8888/user/me").expect("settings");
        assert_eq!(settings.base_url.as_str(), "http://localhost:8888/user/me/");
        assert!(settings.token.is_none());
    }

    #[test]
    fn base_url_rejects_non_http() {
        let err = ServerSettings::new("file:///tmp").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn settings_from_config_with_override() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.server.token_env = "JBN_TEST_NONEXISTENT_TOKEN_12345".into();
        config.server.timeout_secs = 5;

        let settings =
            ServerSettings::from_config(&config, Some("http://example.test:1234")).expect("settings");
        assert_eq!(settings.base_url.as_str(), "http://example.test:1234/");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(settings.token.is_none());
    }
}
