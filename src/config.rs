//! Configuration loading and validation.
//!
//! `~/.superexpat/config.toml` is optional; every section has defaults.
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

use crate::providers::openrouter::{DEFAULT_MODEL, OPENROUTER_API_BASE};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion endpoint and model settings.
    pub assistant: AssistantConfig,
    /// Where onboarding answers are kept.
    pub storage: StorageConfig,
    /// Log verbosity.
    pub logging: LoggingConfig,
}

/// Completion endpoint and model settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Model identifier sent in the request body.
    pub model: String,
    /// Full URL of the `/chat/completions` endpoint.
    pub base_url: String,
    /// Upper bound on one exchange, in seconds.
    pub timeout_secs: u64,
    /// Optional cap on reply length.
    pub max_tokens: Option<u32>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            base_url: OPENROUTER_API_BASE.to_owned(),
            timeout_secs: default_timeout_secs(),
            max_tokens: None,
        }
    }
}

impl AssistantConfig {
    /// Exchange timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Profile store location.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON state file; defaults to `~/.superexpat/state.json`.
    pub state_file: Option<PathBuf>,
}

/// Log verbosity used when `RUST_LOG` is unset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `superexpat=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Apply environment overrides (env > config > defaults).
    ///
    /// Takes a resolver so tests need not touch the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("SUPEREXPAT_MODEL") {
            self.assistant.model = v;
        }
        if let Some(v) = env("SUPEREXPAT_BASE_URL") {
            self.assistant.base_url = v;
        }
        if let Some(v) = env("SUPEREXPAT_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.assistant.timeout_secs = n,
                Err(_) => warn!(
                    var = "SUPEREXPAT_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("SUPEREXPAT_STATE_FILE") {
            self.storage.state_file = Some(PathBuf::from(v));
        }
        if let Some(v) = env("SUPEREXPAT_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Check values that would otherwise fail at request time.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty model, a zero timeout, or a base URL
    /// that is not absolute `http`/`https`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.assistant.model.trim().is_empty() {
            anyhow::bail!("assistant.model must not be empty");
        }
        if self.assistant.timeout_secs == 0 {
            anyhow::bail!("assistant.timeout_secs must be greater than zero");
        }
        let url = url::Url::parse(&self.assistant.base_url).with_context(|| {
            format!("assistant.base_url is not a valid URL: {}", self.assistant.base_url)
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!(
                "assistant.base_url must use http or https, got {}",
                url.scheme()
            );
        }
        Ok(())
    }

    /// Resolved state file path.
    pub fn state_file(&self, paths: &RuntimePaths) -> PathBuf {
        self.storage
            .state_file
            .clone()
            .unwrap_or_else(|| paths.state_file.clone())
    }
}

/// Load config from `path`, falling back to defaults if the file is absent,
/// then apply process env overrides and validate.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or validation fails.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => {
            info!(path = %path.display(), "loading config from file");
            toml::from_str(&contents)
                .with_context(|| format!("failed to parse config at {}", path.display()))?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("no config file found, using defaults");
            Config::default()
        }
        Err(e) => {
            return Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            ))
        }
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Runtime paths
// ---------------------------------------------------------------------------

/// Well-known files under the runtime directory.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    /// `~/.superexpat`
    pub root: PathBuf,
    /// `~/.superexpat/config.toml`
    pub config_toml: PathBuf,
    /// `~/.superexpat/.env`
    pub env_file: PathBuf,
    /// `~/.superexpat/state.json`
    pub state_file: PathBuf,
    /// `~/.superexpat/logs`
    pub logs_dir: PathBuf,
}

impl RuntimePaths {
    /// Paths rooted at `root`.
    pub fn under(root: PathBuf) -> Self {
        Self {
            config_toml: root.join("config.toml"),
            env_file: root.join(".env"),
            state_file: root.join("state.json"),
            logs_dir: root.join("logs"),
            root,
        }
    }
}

/// Resolve the default config directory (`~/.superexpat/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".superexpat"))
}

/// Resolve all runtime paths under [`config_dir`].
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> anyhow::Result<RuntimePaths> {
    Ok(RuntimePaths::under(config_dir()?))
}
