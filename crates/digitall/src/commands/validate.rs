//! `digitall validate` -- structural check of a remote or local profile.

use serde::Serialize;
use tabled::Tabled;

use digitall_core::{IssueCode, Locale, ValidationResult, validate};

use crate::cli::{GlobalOpts, OutputFormat, ValidateArgs};
use crate::config;
use crate::error::{CliError, describe_issues};
use crate::output::{self, Painter, Tone};

use super::util;

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Problem")]
    problem: String,
}

#[derive(Serialize)]
struct IssueEntry {
    code: IssueCode,
    description: &'static str,
}

pub async fn handle(args: ValidateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::effective_config(global)?;
    let locale = cfg.locale();

    let result = match (args.file, args.url) {
        (Some(path), _) => validate(&std::fs::read_to_string(path)?),
        (None, Some(url)) => {
            let resolver = config::build_resolver(&cfg)?;
            let params = util::target_params(&url)?;
            let snapshot = util::resolve_once(&resolver, &params, &cfg, global.quiet).await?;
            validate(snapshot.profile_text())
        }
        (None, None) => {
            return Err(CliError::Validation {
                field: "url".into(),
                reason: "a URL, token or --file is required".into(),
            });
        }
    };

    let painter = Painter::new(cfg.theme, config::color_mode(&cfg));
    let out = render(&result, config::output_format(&cfg), locale, &painter)?;
    output::print_output(&out, global.quiet);

    if result.valid {
        Ok(())
    } else {
        Err(CliError::InvalidProfile {
            count: result.issues.len(),
            details: describe_issues(&result.issues, locale),
        })
    }
}

fn render(
    result: &ValidationResult,
    format: OutputFormat,
    locale: Locale,
    painter: &Painter,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table if result.valid => Ok(painter.paint("Profile is valid", Tone::Ok)),
        OutputFormat::Table | OutputFormat::Plain => {
            let entries: Vec<IssueEntry> = result
                .issues
                .iter()
                .map(|&code| IssueEntry {
                    code,
                    description: locale.issue_description(code),
                })
                .collect();
            output::render_list(
                format,
                &entries,
                |e| IssueRow {
                    code: e.code.to_string(),
                    problem: painter.paint(e.description, Tone::Danger),
                },
                |e| e.code.to_string(),
            )
        }
        _ => output::render_single(format, result, |_| String::new(), |_| String::new()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plain_lists_issue_codes() {
        let result = validate("[Interface]\nPrivateKey = <placeholder>\n");
        let out = render(&result, OutputFormat::Plain, Locale::En, &Painter::plain()).unwrap();
        assert_eq!(out, "issue_private_invalid\nissue_public_missing");
    }

    #[test]
    fn json_is_the_raw_result() {
        let result = validate("");
        let out = render(&result, OutputFormat::JsonCompact, Locale::En, &Painter::plain()).unwrap();
        assert_eq!(
            out,
            r#"{"valid":false,"issues":["issue_private_missing","issue_public_missing"]}"#
        );
    }
}
