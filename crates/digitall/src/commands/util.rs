//! Shared helpers for command handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use url::Url;

use digitall_core::{
    AccountResolver, AccountSnapshot, LocatorParams, NavigationContext, ResolveOutcome,
    UrlNavigation, locate,
};

use crate::config::Config;
use crate::error::CliError;

/// Origin used to wrap bare tokens into a navigation URL.
const LOCAL_ORIGIN: &str = "http://localhost/";

/// Accept a full panel URL or a bare token (wrapped as `?sub=<token>`).
pub fn target_url(input: &str) -> Result<Url, CliError> {
    let input = input.trim();
    if let Ok(url) = Url::parse(input) {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(url);
        }
    }

    if input.is_empty() || input.chars().any(|c| c.is_whitespace() || "/?#&=".contains(c)) {
        return Err(CliError::Validation {
            field: "url".into(),
            reason: format!("'{input}' is neither an http(s) URL nor a token"),
        });
    }

    let mut url = Url::parse(LOCAL_ORIGIN).map_err(|e| CliError::Validation {
        field: "url".into(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut().append_pair("sub", input);
    Ok(url)
}

/// Locator parameters for a one-shot command.
pub fn target_params(input: &str) -> Result<LocatorParams, CliError> {
    let nav = UrlNavigation::new(target_url(input)?);
    Ok(locate(&nav))
}

/// Spinner on stderr while `fut` runs; hidden in quiet mode or off a TTY.
pub async fn with_spinner<F: Future>(message: &str, quiet: bool, fut: F) -> F::Output {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_owned());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };
    let out = fut.await;
    pb.finish_and_clear();
    out
}

/// Resolve once; any outcome other than a snapshot becomes a `CliError`.
pub async fn resolve_once(
    resolver: &AccountResolver,
    params: &LocatorParams,
    cfg: &Config,
    quiet: bool,
) -> Result<Arc<AccountSnapshot>, CliError> {
    let outcome = with_spinner("Fetching subscription…", quiet, resolver.resolve(params, false)).await;
    match outcome {
        ResolveOutcome::Resolved(snapshot) => Ok(snapshot),
        ResolveOutcome::Failed(err) => Err(CliError::from_core(err, cfg.locale(), &cfg.api_base)),
        ResolveOutcome::Cancelled | ResolveOutcome::Superseded | ResolveOutcome::Skipped => {
            Err(CliError::Interrupted)
        }
    }
}

/// Localized short date, or `-`.
pub fn date_label(at: Option<DateTime<Utc>>, cfg: &Config) -> String {
    at.map_or_else(
        || "-".into(),
        |t| cfg.locale().localize_digits(&t.format("%Y-%m-%d").to_string()),
    )
}

// ── File-backed navigation ──────────────────────────────────────────

/// Navigation whose current URL is the first non-empty line of a file.
///
/// Re-read on every access; change notifications never fire, so the
/// locator watcher relies on polling.
#[derive(Debug)]
pub struct FileNavigation {
    path: PathBuf,
    changes: watch::Sender<u64>,
}

impl FileNavigation {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            changes: watch::channel(0).0,
        }
    }

    fn current(&self) -> Option<Url> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
        target_url(line).ok()
    }
}

impl NavigationContext for FileNavigation {
    fn current_search(&self) -> String {
        self.current()
            .and_then(|u| u.query().map(|q| format!("?{q}")))
            .unwrap_or_default()
    }

    fn current_path(&self) -> String {
        self.current().map(|u| u.path().to_owned()).unwrap_or_default()
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}
