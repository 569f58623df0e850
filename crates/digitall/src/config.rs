//! CLI configuration: thin wrapper around `digitall_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (`--api-base`, `--lang`, `--timeout`, `--output`, `--color`).

use std::time::Duration;

use clap::ValueEnum;

use digitall_api::{HttpClient, TransportConfig};
use digitall_core::{AccountResolver, Locale};

use crate::cli::{ColorMode, GlobalOpts, LangArg, OutputFormat, ThemeArg};
use crate::error::CliError;

pub use digitall_config::{
    Config, Theme, config_path, load_config, load_config_or_default, save_config,
};

impl From<LangArg> for Locale {
    fn from(lang: LangArg) -> Self {
        match lang {
            LangArg::En => Self::En,
            LangArg::Fa => Self::Fa,
        }
    }
}

impl From<ThemeArg> for Theme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Light => Self::Light,
            ThemeArg::Dark => Self::Dark,
            ThemeArg::System => Self::System,
        }
    }
}

/// Load the config file and apply flag overrides on top.
pub fn effective_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config()?;
    if let Some(ref api) = global.api_base {
        cfg.api_base.clone_from(api);
    }
    if let Some(lang) = global.lang {
        cfg.language = Some(lang.into());
    }
    if let Some(timeout) = global.timeout {
        cfg.defaults.timeout = timeout;
    }
    if let Some(format) = global.output {
        cfg.defaults.output = value_name(format);
    }
    if let Some(mode) = global.color {
        cfg.defaults.color = value_name(mode);
    }
    cfg.validate()?;
    parse_value::<OutputFormat>("defaults.output", &cfg.defaults.output)?;
    parse_value::<ColorMode>("defaults.color", &cfg.defaults.color)?;
    Ok(cfg)
}

/// Output format after flag and config resolution.
pub fn output_format(cfg: &Config) -> OutputFormat {
    parse_value("defaults.output", &cfg.defaults.output).unwrap_or(OutputFormat::Table)
}

/// Color mode after flag and config resolution.
pub fn color_mode(cfg: &Config) -> ColorMode {
    parse_value("defaults.color", &cfg.defaults.color).unwrap_or(ColorMode::Auto)
}

fn value_name<T: ValueEnum>(value: T) -> String {
    value
        .to_possible_value()
        .map(|v| v.get_name().to_owned())
        .unwrap_or_default()
}

fn parse_value<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    <T as ValueEnum>::from_str(raw, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

/// Build a resolver from the effective configuration.
pub fn build_resolver(cfg: &Config) -> Result<AccountResolver, CliError> {
    let transport = TransportConfig {
        timeout: Duration::from_secs(cfg.defaults.timeout.max(1)),
    };
    let http = HttpClient::new(&transport).map_err(|e| CliError::Validation {
        field: "transport".into(),
        reason: e.to_string(),
    })?;
    Ok(AccountResolver::new(http, cfg.resolver_config()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_pick_format_and_color() {
        let mut cfg = Config::default();
        assert_eq!(output_format(&cfg), OutputFormat::Table);
        assert_eq!(color_mode(&cfg), ColorMode::Auto);

        cfg.defaults.output = "json-compact".into();
        cfg.defaults.color = "Never".into();
        assert_eq!(output_format(&cfg), OutputFormat::JsonCompact);
        assert_eq!(color_mode(&cfg), ColorMode::Never);
    }

    #[test]
    fn flag_values_use_cli_names() {
        assert_eq!(value_name(OutputFormat::JsonCompact), "json-compact");
        assert_eq!(value_name(ColorMode::Always), "always");
        assert!(parse_value::<OutputFormat>("defaults.output", "xml").is_err());
    }
}
