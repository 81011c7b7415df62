// Client configuration
// Defaults, optional JSON file, then environment overrides

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Holds `session.json` and the `cache/` directory
    pub state_dir: PathBuf,
}

/// On-disk shape of the config file; every field is optional
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_url: Option<String>,
    poll_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    state_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            state_dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".algolab")
}

impl ClientConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load a JSON config file (if it exists), then apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::load`] with overrides read from `lookup`
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let file: ConfigFile =
                serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            config.apply_file(file);
        }
        config.apply_env(lookup)?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(url) = file.api_url {
            self.api_url = url;
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.request_timeout_ms {
            self.request_timeout = Duration::from_millis(ms);
        }
        if let Some(dir) = file.state_dir {
            self.state_dir = dir;
        }
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ALGOLAB_API_URL") {
            self.api_url = url;
        }
        if let Some(value) = lookup("ALGOLAB_POLL_INTERVAL_MS") {
            self.poll_interval = parse_millis("ALGOLAB_POLL_INTERVAL_MS", value)?;
        }
        if let Some(value) = lookup("ALGOLAB_REQUEST_TIMEOUT_MS") {
            self.request_timeout = parse_millis("ALGOLAB_REQUEST_TIMEOUT_MS", value)?;
        }
        if let Some(dir) = lookup("ALGOLAB_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn session_path(&self) -> PathBuf {
        self.state_dir.join("session.json")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.state_dir.join("cache")
    }
}

fn parse_millis(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert!(config.session_path().ends_with(".algolab/session.json"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ClientConfig::default();
        config
            .apply_env(lookup_from(&[
                ("ALGOLAB_API_URL", "https://api.example.test"),
                ("ALGOLAB_POLL_INTERVAL_MS", "250"),
                ("ALGOLAB_STATE_DIR", "/tmp/algolab-test"),
            ]))
            .unwrap();

        assert_eq!(config.api_url, "https://api.example.test");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/algolab-test/cache"));
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_env(lookup_from(&[("ALGOLAB_POLL_INTERVAL_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "ALGOLAB_POLL_INTERVAL_MS", .. }));

        let err = config
            .apply_env(lookup_from(&[("ALGOLAB_POLL_INTERVAL_MS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_file_fields_are_optional() {
        let file: ConfigFile = serde_json::from_str(r#"{"poll_interval_ms": 500}"#).unwrap();
        let mut config = ClientConfig::default();
        config.apply_file(file);

        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_load_file_then_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"api_url": "https://grader.example.test", "poll_interval_ms": 500}"#,
        )
        .unwrap();

        let config = ClientConfig::load_with(&path, lookup_from(&[])).unwrap();
        assert_eq!(config.api_url, "https://grader.example.test");
        assert_eq!(config.poll_interval, Duration::from_millis(500));

        let config = ClientConfig::load_with(
            &path,
            lookup_from(&[("ALGOLAB_POLL_INTERVAL_MS", "250")]),
        )
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.api_url, "https://grader.example.test");
        assert_eq!(config.request_timeout, Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ClientConfig::load_with(&dir.path().join("absent.json"), lookup_from(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = ClientConfig::load_with(&path, lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.json"));
    }
}
