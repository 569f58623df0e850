//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one value per line. Colors come
//! from the persisted theme.

use std::io::{self, IsTerminal, Write};

use owo_colors::{OwoColorize, Rgb};
use tabled::{Table, Tabled, settings::Style};

use digitall_config::Theme;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Palette ──────────────────────────────────────────────────────────

/// Semantic colors for terminal output.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub heading: Rgb,
    pub accent: Rgb,
    pub ok: Rgb,
    pub warn: Rgb,
    pub danger: Rgb,
}

const LIGHT: Palette = Palette {
    heading: Rgb(0x6A, 0x2C, 0x70),
    accent: Rgb(0xB8, 0x3B, 0x5E),
    ok: Rgb(0x16, 0xA3, 0x4A),
    warn: Rgb(0xF5, 0x9E, 0x0B),
    danger: Rgb(0xDC, 0x26, 0x26),
};

const DARK: Palette = Palette {
    heading: Rgb(0xF9, 0xED, 0x69),
    accent: Rgb(0xF0, 0x8A, 0x5D),
    ok: Rgb(0x22, 0xC5, 0x5E),
    warn: Rgb(0xFB, 0xBF, 0x24),
    danger: Rgb(0xF8, 0x71, 0x71),
};

/// Semantic role of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Heading,
    Accent,
    Ok,
    Warn,
    Danger,
}

/// Applies the theme palette, or nothing when color is off or the theme
/// defers to the terminal.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    palette: Option<Palette>,
}

impl Painter {
    pub fn new(theme: Theme, mode: ColorMode) -> Self {
        if !should_color(mode) {
            return Self::plain();
        }
        let palette = match theme {
            Theme::Light => Some(LIGHT),
            Theme::Dark => Some(DARK),
            Theme::System => None,
        };
        Self { palette }
    }

    pub fn plain() -> Self {
        Self { palette: None }
    }

    pub fn paint(&self, text: &str, tone: Tone) -> String {
        let Some(p) = self.palette else {
            return text.to_owned();
        };
        let rgb = match tone {
            Tone::Heading => p.heading,
            Tone::Accent => p.accent,
            Tone::Ok => p.ok,
            Tone::Warn => p.warn,
            Tone::Danger => p.danger,
        };
        text.color(rgb).to_string()
    }
}

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, which returns a pre-formatted string.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

/// Left-aligned `label: value` block, labels padded to the widest one.
pub fn key_values(rows: &[(&str, String)]) -> String {
    let width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0) + 1;
    rows.iter()
        .map(|(k, v)| format!("{:<width$} {v}", format!("{k}:")))
        .collect::<Vec<_>>()
        .join("\n")
}
