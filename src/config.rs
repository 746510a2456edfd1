use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Poll intervals below this are raised to it.
const MIN_INTERVAL_MS: u64 = 200;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Base URL of the dashboard backend.
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub auth: AuthConfig,
    pub polling: PollingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 10,
            auth: AuthConfig::default(),
            polling: PollingConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// How to obtain a bearer token. First match wins: `token`,
/// `token_command`, then a login with `username` and a password.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub token: Option<String>,
    /// Shell command whose stdout is the token (e.g. "pass pollchat/token").
    pub token_command: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_command: Option<String>,
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    /// Global message log poll period.
    pub log_interval_ms: u64,
    /// Log entries requested per poll.
    pub log_limit: usize,
    /// Open-thread history poll period.
    pub thread_interval_ms: u64,
    /// History entries requested per poll.
    pub history_limit: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            log_interval_ms: 3000,
            log_limit: 100,
            thread_interval_ms: 1000,
            history_limit: 50,
        }
    }
}

impl PollingConfig {
    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }

    pub fn thread_interval(&self) -> Duration {
        Duration::from_millis(self.thread_interval_ms)
    }

    /// Raise out-of-range values to their floors.
    fn clamp(&mut self) {
        self.log_interval_ms = self.log_interval_ms.max(MIN_INTERVAL_MS);
        self.thread_interval_ms = self.thread_interval_ms.max(MIN_INTERVAL_MS);
        self.log_limit = self.log_limit.max(1);
        self.history_limit = self.history_limit.max(1);
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Load the configuration.
    ///
    /// An explicit path must exist. Otherwise the first existing file of:
    ///
    /// 1. `$POLLCHAT_CONFIG`
    /// 2. `$XDG_CONFIG_HOME/pollchat/config.toml`
    /// 3. `~/.config/pollchat/config.toml`
    ///
    /// is used, and if none exists the defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Self::locate(),
        };
        match path {
            Some(path) => Self::from_file(&path),
            None => Ok(Config::default()),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        config.polling.clamp();
        Ok(config)
    }

    /// Return the first config path that actually exists on disk, or `None`.
    fn locate() -> Option<PathBuf> {
        let candidates = Self::candidate_paths();
        candidates.into_iter().find(|p| p.is_file())
    }

    /// Ordered list of paths we check for a config file.
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(p) = std::env::var("POLLCHAT_CONFIG") {
            paths.push(PathBuf::from(p));
        }

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("pollchat").join("config.toml"));
        }

        if let Ok(home) = std::env::var("HOME") {
            paths.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("pollchat")
                    .join("config.toml"),
            );
        }

        paths
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.server_url, "http://localhost:8000");
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert!(cfg.auth.token.is_none());
        assert_eq!(cfg.polling.log_interval(), Duration::from_secs(3));
        assert_eq!(cfg.polling.thread_interval(), Duration::from_secs(1));
        assert_eq!(cfg.polling.log_limit, 100);
        assert_eq!(cfg.polling.history_limit, 50);
    }

    #[test]
    fn parse_minimal_toml() {
        let cfg = Config::parse(r#"server_url = "https://bot.example.com""#).unwrap();
        assert_eq!(cfg.server_url, "https://bot.example.com");
        assert_eq!(cfg.polling.log_interval_ms, 3000);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
            server_url = "http://10.0.0.2:8000"
            request_timeout_secs = 5

            [auth]
            username = "admin"
            password_command = "pass bot/admin"

            [polling]
            log_interval_ms = 5000
            log_limit = 200
            thread_interval_ms = 750
            history_limit = 80
        "#;
        let cfg = Config::parse(toml_str).unwrap();
        assert_eq!(cfg.request_timeout_secs, 5);
        assert_eq!(cfg.auth.username.as_deref(), Some("admin"));
        assert_eq!(cfg.auth.password_command.as_deref(), Some("pass bot/admin"));
        assert!(cfg.auth.password.is_none());
        assert_eq!(cfg.polling.log_interval_ms, 5000);
        assert_eq!(cfg.polling.log_limit, 200);
        assert_eq!(cfg.polling.thread_interval_ms, 750);
        assert_eq!(cfg.polling.history_limit, 80);
    }

    #[test]
    fn polling_values_are_clamped() {
        let toml_str = r#"
            [polling]
            log_interval_ms = 0
            log_limit = 0
            thread_interval_ms = 10
            history_limit = 0
        "#;
        let cfg = Config::parse(toml_str).unwrap();
        assert_eq!(cfg.polling.log_interval_ms, MIN_INTERVAL_MS);
        assert_eq!(cfg.polling.thread_interval_ms, MIN_INTERVAL_MS);
        assert_eq!(cfg.polling.log_limit, 1);
        assert_eq!(cfg.polling.history_limit, 1);
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(Config::parse("server_url = 3").is_err());
    }

    #[test]
    fn load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[auth]\ntoken = \"abc\"").unwrap();
        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.auth.token.as_deref(), Some("abc"));
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
