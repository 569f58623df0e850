//! Shared configuration for the Digitall CLI.
//!
//! TOML file + `DIGITALL_` environment overrides, the persisted theme
//! preference, and translation to `digitall_core::ResolverConfig` /
//! `SessionConfig`. The CLI layers its `GlobalOpts` on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

use digitall_core::{DEFAULT_API_ROOT, Locale, ResolverConfig, SessionConfig};

/// Environment prefix for overrides, e.g. `DIGITALL_API_BASE`,
/// `DIGITALL_DEFAULTS__OUTPUT`.
pub const ENV_PREFIX: &str = "DIGITALL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Theme ───────────────────────────────────────────────────────────

/// The one persisted user preference.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Theme {
    Light,
    Dark,
    /// Follow the terminal.
    #[default]
    System,
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Root for token-derived account URLs.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Message language; unset follows `LC_ALL` / `LANG`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Locale>,

    #[serde(default)]
    pub theme: Theme,

    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            language: None,
            theme: Theme::default(),
            defaults: Defaults::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Navigation poll period for `watch`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Forced reload period for `watch`; 0 disables it.
    #[serde(default)]
    pub refresh_interval_secs: u64,

    /// Whole-request HTTP backstop timeout.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            poll_interval_secs: default_poll_interval(),
            refresh_interval_secs: 0,
            timeout: default_timeout(),
        }
    }
}

fn default_api_base() -> String {
    option_env!("DIGITALL_API_BASE")
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_API_ROOT)
        .to_owned()
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_poll_interval() -> u64 {
    2
}
fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Reject values that would only fail later at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.api_base).map_err(|e| ConfigError::Validation {
            field: "api_base".into(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "api_base".into(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if self.defaults.poll_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.poll_interval_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn locale(&self) -> Locale {
        self.language.unwrap_or_else(Locale::from_env)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            api_root: self.api_base.clone(),
            locale: self.locale(),
            ..ResolverConfig::default()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::from_secs(self.defaults.poll_interval_secs.max(1)),
            refresh_interval: (self.defaults.refresh_interval_secs > 0)
                .then(|| Duration::from_secs(self.defaults.refresh_interval_secs)),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "digitall", "digitall").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("digitall");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file (missing file = defaults) + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.theme, Theme::System);
        assert_eq!(cfg.defaults.poll_interval_secs, 2);
        assert_eq!(cfg.session_config().refresh_interval, None);
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = Config {
            api_base: "https://api.example.net".into(),
            language: Some(Locale::Fa),
            theme: Theme::Dark,
            defaults: Defaults {
                refresh_interval_secs: 60,
                ..Defaults::default()
            },
        };
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.api_base, cfg.api_base);
        assert_eq!(loaded.theme, Theme::Dark);
        assert_eq!(loaded.locale(), Locale::Fa);
        assert_eq!(
            loaded.session_config().refresh_interval,
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "theme = \"light\"\n").unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.theme, Theme::Light);
        assert_eq!(loaded.defaults.output, "table");
    }

    #[test]
    fn rejects_bad_api_base() {
        let cfg = Config {
            api_base: "ftp://api.example.net".into(),
            ..Config::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "api_base"
        ));
    }

    #[test]
    fn resolver_config_uses_api_base() {
        let cfg = Config {
            api_base: "https://api.example.net".into(),
            language: Some(Locale::En),
            ..Config::default()
        };
        let rc = cfg.resolver_config();
        assert_eq!(rc.api_root, "https://api.example.net");
        assert_eq!(rc.locale, Locale::En);
        assert_eq!(rc.info.attempts, 3);
    }
}
