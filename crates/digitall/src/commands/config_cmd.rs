//! Config subcommand handlers.

use dialoguer::{Input, Select};

use digitall_core::Locale;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Theme};
use crate::error::CliError;
use crate::output;

/// Format config for display as TOML-ish text.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "api_base = \"{}\"", cfg.api_base);
    match cfg.language {
        Some(lang) => {
            let _ = writeln!(out, "language = \"{lang}\"");
        }
        None => {
            let _ = writeln!(out, "# language = (from LANG: {})", Locale::from_env());
        }
    }
    let _ = writeln!(out, "theme = \"{}\"", cfg.theme);
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "poll_interval_secs = {}", cfg.defaults.poll_interval_secs);
    let _ = writeln!(out, "refresh_interval_secs = {}", cfg.defaults.refresh_interval_secs);
    let _ = write!(out, "timeout = {}", cfg.defaults.timeout);

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn init_wizard(current: Config) -> Result<Config, CliError> {
    let api_base: String = Input::new()
        .with_prompt("API base URL")
        .default(current.api_base.clone())
        .validate_with(|s: &String| -> Result<(), String> {
            url::Url::parse(s)
                .map_err(|e| e.to_string())
                .and_then(|u| {
                    if matches!(u.scheme(), "http" | "https") {
                        Ok(())
                    } else {
                        Err("must be http(s)".into())
                    }
                })
        })
        .interact_text()
        .map_err(prompt_err)?;

    let languages = ["follow LANG", "en", "fa"];
    let lang_idx = Select::new()
        .with_prompt("Language")
        .items(&languages)
        .default(match current.language {
            None => 0,
            Some(Locale::En) => 1,
            Some(Locale::Fa) => 2,
        })
        .interact()
        .map_err(prompt_err)?;
    let language = match lang_idx {
        1 => Some(Locale::En),
        2 => Some(Locale::Fa),
        _ => None,
    };

    let themes = [Theme::System, Theme::Light, Theme::Dark];
    let labels: Vec<String> = themes.iter().map(ToString::to_string).collect();
    let theme_idx = Select::new()
        .with_prompt("Color theme")
        .items(&labels)
        .default(themes.iter().position(|t| *t == current.theme).unwrap_or(0))
        .interact()
        .map_err(prompt_err)?;

    Ok(Config {
        api_base,
        language,
        theme: themes.get(theme_idx).copied().unwrap_or_default(),
        ..current
    })
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => {
            let cfg = init_wizard(config::load_config_or_default())?;
            let path = config::save_config(&cfg)?;
            output::print_output(&format!("Wrote {}", path.display()), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::effective_config(global)?;
            let out = output::render_single(config::output_format(&cfg), &cfg, format_config, |c| {
                c.api_base.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetTheme { theme } => {
            let mut cfg = config::load_config()?;
            cfg.theme = theme.into();
            let path = config::save_config(&cfg)?;
            tracing::info!(theme = %cfg.theme, path = %path.display(), "theme saved");
            output::print_output(&format!("theme = \"{}\"", cfg.theme), global.quiet);
            Ok(())
        }
    }
}
