//! `digitall status` -- one resolution, rendered as a summary.

use chrono::Utc;
use serde::Serialize;

use digitall_core::{
    AccountSnapshot, AccountStatus, AccountSummary, Locale, TimeStatus, ValidationResult, validate,
};

use crate::cli::{GlobalOpts, TargetArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output::{self, Painter, Tone};

use super::util;

/// Structured form for json/yaml output.
#[derive(Debug, Serialize)]
pub(crate) struct StatusReport<'a> {
    summary: AccountSummary,
    validation: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscribe_link: Option<&'a str>,
}

impl<'a> StatusReport<'a> {
    pub(crate) fn new(snapshot: &'a AccountSnapshot) -> Self {
        Self {
            summary: AccountSummary::from_snapshot(snapshot, Utc::now()),
            validation: validate(snapshot.profile_text()),
            subscribe_link: snapshot.subscribe_link.as_deref(),
        }
    }
}

pub async fn handle(args: TargetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::effective_config(global)?;
    let resolver = config::build_resolver(&cfg)?;
    let params = util::target_params(&args.url)?;

    let snapshot = util::resolve_once(&resolver, &params, &cfg, global.quiet).await?;
    let report = StatusReport::new(&snapshot);

    let painter = Painter::new(cfg.theme, config::color_mode(&cfg));
    let out = output::render_single(
        config::output_format(&cfg),
        &report,
        |r| detail(r, &cfg, &painter),
        |r| r.summary.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn status_tone(status: AccountStatus) -> Tone {
    match status {
        AccountStatus::Active => Tone::Ok,
        AccountStatus::OnHold => Tone::Warn,
        AccountStatus::Inactive => Tone::Danger,
        AccountStatus::Unknown => Tone::Accent,
    }
}

fn time_tone(status: TimeStatus) -> Tone {
    match status {
        TimeStatus::Unlimited => Tone::Ok,
        TimeStatus::Expired => Tone::Danger,
        TimeStatus::DaysLeft(d) if d <= 3 => Tone::Warn,
        TimeStatus::DaysLeft(_) => Tone::Accent,
    }
}

fn usage_tone(s: &AccountSummary) -> Tone {
    if s.over_quota {
        Tone::Danger
    } else if s.usage_ratio >= 0.9 {
        Tone::Warn
    } else {
        Tone::Ok
    }
}

pub(crate) fn detail(r: &StatusReport<'_>, cfg: &Config, painter: &Painter) -> String {
    let locale = cfg.locale();
    let s = &r.summary;

    let mut rows = vec![
        ("Name", painter.paint(&s.name, Tone::Heading)),
        (
            "Status",
            painter.paint(
                locale.status_label(s.effective_status),
                status_tone(s.effective_status),
            ),
        ),
        (
            "Usage",
            painter.paint(
                &format!("{} ({})", s.usage_label(locale), s.usage_percent_label(locale)),
                usage_tone(s),
            ),
        ),
        (
            "Expiry",
            painter.paint(&s.time_status.label(locale), time_tone(s.time_status)),
        ),
    ];
    if s.expires_at.is_some() {
        rows.push(("Expires", util::date_label(s.expires_at, cfg)));
    }
    rows.push(("Created", util::date_label(s.created_at, cfg)));
    rows.push(("Handshake", handshake_label(s, locale)));
    rows.push(("Profile", profile_label(&r.validation, painter)));
    if let Some(link) = r.subscribe_link {
        rows.push(("Link", link.to_owned()));
    }
    output::key_values(&rows)
}

fn handshake_label(s: &AccountSummary, locale: Locale) -> String {
    s.last_handshake.map_or_else(
        || locale.never_connected().to_owned(),
        |t| locale.localize_digits(&t.format("%Y-%m-%d %H:%M UTC").to_string()),
    )
}

fn profile_label(v: &ValidationResult, painter: &Painter) -> String {
    if v.valid {
        painter.paint("valid", Tone::Ok)
    } else {
        painter.paint(&format!("{} issue(s)", v.issues.len()), Tone::Danger)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn detail_lists_core_facts() {
        let snap = AccountSnapshot::from_value(json!({
            "name": "home",
            "status": "OnHold",
            "dataLimit": 1_073_741_824_u64,
            "totalTraffic": 536_870_912_u64,
            "expireTime": 0,
            "lastHandshake": 1_700_000_000,
        }))
        .unwrap();
        let cfg = Config {
            language: Some(Locale::En),
            ..Config::default()
        };

        let text = detail(&StatusReport::new(&snap), &cfg, &Painter::plain());
        assert!(text.contains("Name:      home"), "{text}");
        assert!(text.contains("Status:    Active"), "{text}");
        assert!(text.contains("512 MB / 1 GB (50.0%)"), "{text}");
        assert!(text.contains("Expiry:    Unlimited"), "{text}");
        assert!(text.contains("Handshake: 2023-11-14"), "{text}");
        assert!(text.contains("Profile:   2 issue(s)"), "{text}");
        assert!(!text.contains("Expires:"));
    }
}
