// ── Account locator ──
//
// Derives `{ token, api_url }` from an injected navigation context and
// watches it for query-string changes. There is no portable "query changed"
// event, so the watcher polls on a fixed interval and additionally re-checks
// whenever the context pushes a change notification.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Query parameter carrying the subscription token.
pub const TOKEN_PARAM: &str = "sub";
/// Query parameter carrying an explicit API base URL.
pub const API_PARAM: &str = "api";
/// Default poll interval for [`LocatorWatcher`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

// ── NavigationContext ────────────────────────────────────────────────

/// Read-only view of "where the user is": a search string and a path,
/// plus a change-notification channel (the back/forward analogue).
pub trait NavigationContext: Send + Sync + 'static {
    /// Query string including the leading `?`, or empty.
    fn current_search(&self) -> String;

    /// Path component, e.g. `/sub/abc123`.
    fn current_path(&self) -> String;

    /// Receiver that ticks on explicit navigation. Contexts that can only be
    /// polled may return a receiver that never fires.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

/// In-memory navigation backed by a single URL.
///
/// [`navigate`](Self::navigate) swaps the URL and notifies subscribers.
pub struct UrlNavigation {
    current: ArcSwap<Url>,
    changes: watch::Sender<u64>,
}

impl UrlNavigation {
    pub fn new(url: Url) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            current: ArcSwap::from_pointee(url),
            changes,
        }
    }

    pub fn url(&self) -> Arc<Url> {
        self.current.load_full()
    }

    pub fn navigate(&self, url: Url) {
        debug!(%url, "navigate");
        self.current.store(Arc::new(url));
        self.changes.send_modify(|n| *n = n.wrapping_add(1));
    }
}

impl fmt::Debug for UrlNavigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlNavigation")
            .field("url", &self.current.load().as_str())
            .finish_non_exhaustive()
    }
}

impl NavigationContext for UrlNavigation {
    fn current_search(&self) -> String {
        self.current
            .load()
            .query()
            .map(|q| format!("?{q}"))
            .unwrap_or_default()
    }

    fn current_path(&self) -> String {
        self.current.load().path().to_owned()
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

// ── LocatorParams ────────────────────────────────────────────────────

/// Identity parameters that drive account resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LocatorParams {
    pub token: Option<String>,
    pub api_url: Option<String>,
}

impl LocatorParams {
    pub fn key(&self) -> ResolutionKey {
        ResolutionKey {
            api_url: self.api_url.clone(),
            token: self.token.clone(),
        }
    }
}

/// De-duplication key of a resolution: the `(api_url, token)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionKey {
    api_url: Option<String>,
    token: Option<String>,
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}",
            self.api_url.as_deref().unwrap_or_default(),
            self.token.as_deref().unwrap_or_default()
        )
    }
}

/// First non-empty value of `name` in a search string (leading `?` optional).
pub fn query_param(search: &str, name: &str) -> Option<String> {
    let query = search.strip_prefix('?').unwrap_or(search);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Segment right after a literal `sub` segment (ASCII case-insensitive).
pub fn token_from_path(path: &str) -> Option<String> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    segments
        .by_ref()
        .find(|s| s.eq_ignore_ascii_case(TOKEN_PARAM))?;
    segments.next().map(str::to_owned)
}

/// Derive parameters from scratch: token from `?sub=`, else `/sub/<token>`;
/// API base from `?api=`.
pub fn locate(nav: &dyn NavigationContext) -> LocatorParams {
    let search = nav.current_search();
    LocatorParams {
        token: query_param(&search, TOKEN_PARAM).or_else(|| token_from_path(&nav.current_path())),
        api_url: query_param(&search, API_PARAM),
    }
}

/// Fold a new search string into existing parameters. A parameter missing
/// from `search` keeps its previous value; only explicit values override.
pub fn apply_search_change(prev: &LocatorParams, search: &str) -> LocatorParams {
    LocatorParams {
        token: query_param(search, TOKEN_PARAM).or_else(|| prev.token.clone()),
        api_url: query_param(search, API_PARAM).or_else(|| prev.api_url.clone()),
    }
}

// ── LocatorWatcher ───────────────────────────────────────────────────

/// Background task keeping a `watch` channel of [`LocatorParams`] in sync
/// with a [`NavigationContext`].
#[derive(Debug)]
pub struct LocatorWatcher {
    params: watch::Receiver<LocatorParams>,
    handle: JoinHandle<()>,
}

impl LocatorWatcher {
    /// Derive the initial parameters and start watching.
    pub fn spawn<N: NavigationContext>(
        nav: Arc<N>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let last_search = nav.current_search();
        let (tx, params) = watch::channel(locate(nav.as_ref()));
        let handle = tokio::spawn(watch_task(nav, tx, last_search, poll_interval, cancel));
        Self { params, handle }
    }

    /// Fresh receiver; the current value is marked as seen.
    pub fn params(&self) -> watch::Receiver<LocatorParams> {
        let mut rx = self.params.clone();
        rx.mark_unchanged();
        rx
    }

    pub fn current(&self) -> LocatorParams {
        self.params.borrow().clone()
    }

    /// Wait for the task to exit after its token was cancelled.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

async fn watch_task<N: NavigationContext>(
    nav: Arc<N>,
    tx: watch::Sender<LocatorParams>,
    mut last_search: String,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let mut notifications = nav.subscribe();
    let mut notify_open = true;

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            res = notifications.changed(), if notify_open => {
                if res.is_err() {
                    notify_open = false;
                    continue;
                }
            }
            _ = ticker.tick() => {}
        }

        let search = nav.current_search();
        if search == last_search {
            continue;
        }
        last_search = search;

        tx.send_if_modified(|params| {
            let next = apply_search_change(params, &last_search);
            if next == *params {
                return false;
            }
            info!(key = %next.key(), "navigation parameters changed");
            *params = next;
            true
        });
    }

    debug!("locator watcher stopped");
}
