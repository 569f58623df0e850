//! `digitall watch` -- live session, one frame per state change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use digitall_api::HttpClient;
use digitall_core::{
    AccountSession, AccountSummary, NavigationContext, ResolverState, UrlNavigation,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output::{self, Painter, Tone};

use super::status::{self, StatusReport};
use super::util::{self, FileNavigation};

/// One rendered state, also the json/yaml record.
#[derive(Debug, Serialize)]
struct Frame {
    at: DateTime<Utc>,
    loading: bool,
    refreshing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<AccountSummary>,
}

impl Frame {
    fn new(state: &ResolverState, at: DateTime<Utc>) -> Self {
        Self {
            at,
            loading: state.loading,
            refreshing: state.refreshing,
            error: state.error.clone(),
            summary: state
                .data
                .as_deref()
                .map(|d| AccountSummary::from_snapshot(d, at)),
        }
    }
}

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::effective_config(global)?;
    if let Some(poll) = args.poll {
        cfg.defaults.poll_interval_secs = poll.max(1);
    }
    if let Some(refresh) = args.refresh {
        cfg.defaults.refresh_interval_secs = refresh;
    }
    let resolver = config::build_resolver(&cfg)?;

    let session = match (args.follow, args.url) {
        (Some(path), _) => {
            debug!(path = %path.display(), "following navigation file");
            start(resolver, Arc::new(FileNavigation::new(path)), &cfg)
        }
        (None, Some(url)) => {
            let nav = UrlNavigation::new(util::target_url(&url)?);
            start(resolver, Arc::new(nav), &cfg)
        }
        (None, None) => {
            return Err(CliError::Validation {
                field: "url".into(),
                reason: "a URL, token or --follow is required".into(),
            });
        }
    };

    let painter = Painter::new(cfg.theme, config::color_mode(&cfg));
    let format = config::output_format(&cfg);
    let mut rx = session.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let state = rx.borrow_and_update().clone();
        let out = render(&state, Utc::now(), format, &cfg, &painter)?;
        output::print_output(&out, global.quiet);

        tokio::select! {
            biased;
            _ = &mut ctrl_c => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

fn start<N: NavigationContext>(
    resolver: digitall_core::AccountResolver<HttpClient>,
    nav: Arc<N>,
    cfg: &Config,
) -> AccountSession<HttpClient> {
    AccountSession::start(resolver, nav, cfg.session_config())
}

fn render(
    state: &ResolverState,
    at: DateTime<Utc>,
    format: OutputFormat,
    cfg: &Config,
    painter: &Painter,
) -> Result<String, CliError> {
    let frame = Frame::new(state, at);
    match format {
        // One record per line so the stream stays parseable.
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(&frame)?),
        OutputFormat::Yaml => Ok(format!("---\n{}", serde_yaml::to_string(&frame)?)),
        OutputFormat::Plain => Ok(plain_line(&frame)),
        OutputFormat::Table => Ok(table_frame(state, &frame, cfg, painter)),
    }
}

fn plain_line(frame: &Frame) -> String {
    let at = frame.at.format("%H:%M:%S");
    if let Some(ref err) = frame.error {
        return format!("{at} error {err}");
    }
    match frame.summary {
        Some(ref s) => format!(
            "{at} {} {} {}",
            s.effective_status,
            s.used,
            if frame.refreshing { "refreshing" } else { "ok" }
        ),
        None if frame.loading => format!("{at} loading"),
        None => format!("{at} idle"),
    }
}

fn table_frame(state: &ResolverState, frame: &Frame, cfg: &Config, painter: &Painter) -> String {
    let mut header = format!("── {} ──", frame.at.format("%Y-%m-%d %H:%M:%S UTC"));
    if frame.refreshing {
        header.push_str(" refreshing…");
    }
    let header = painter.paint(&header, Tone::Accent);

    if let Some(ref err) = frame.error {
        return format!("{header}\n{}", painter.paint(err, Tone::Danger));
    }
    match state.data.as_deref() {
        Some(snapshot) => {
            let report = StatusReport::new(snapshot);
            format!("{header}\n{}", status::detail(&report, cfg, painter))
        }
        None if frame.loading => format!("{header}\nLoading…"),
        None => format!("{header}\n{}", painter.paint("Waiting for a subscription token", Tone::Warn)),
    }
}
