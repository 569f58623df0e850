// ── Account resolver ──
//
// Turns `LocatorParams` into an `AccountSnapshot` via the `/info` endpoint
// and the base endpoint, and publishes loading/refreshing/error state on a
// watch channel. At most one resolution per key is in flight; starting a
// resolution cancels the previous one, and a generation counter keeps a
// superseded resolution from touching state when it finally settles.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use digitall_api::{HttpClient, HttpSend, RetryOptions, fetch_with_retry};

use crate::error::CoreError;
use crate::i18n::Locale;
use crate::locator::{LocatorParams, ResolutionKey};
use crate::model::AccountSnapshot;

/// Root used when neither config nor build environment supplies one.
pub const DEFAULT_API_ROOT: &str = "https://api.samanii.com";

const INFO_SUFFIX: &str = "/info";

/// Substrings that mark an error as connectivity trouble (timeouts, DNS,
/// blocking) rather than a server-side answer.
const NETWORK_KEYWORDS: [&str; 6] = ["timeout", "failed", "network", "dns", "cors", "blocked"];

// ── Configuration ────────────────────────────────────────────────────

/// Attempt budget for one endpoint call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointPolicy {
    pub attempts: u32,
    pub timeout: Duration,
}

impl EndpointPolicy {
    pub const fn new(attempts: u32, timeout_ms: u64) -> Self {
        Self {
            attempts,
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Root for token-derived URLs: `<api_root>/sub/<token>`.
    pub api_root: String,
    /// Language of user-facing error messages.
    pub locale: Locale,
    /// `GET <base>/info`.
    pub info: EndpointPolicy,
    /// `GET <base>` when `/info` failed: sole source.
    pub fallback: EndpointPolicy,
    /// `GET <base>` when `/info` succeeded: enrichment only.
    pub enrich: EndpointPolicy,
    /// Backoff before the second attempt of any endpoint.
    pub retry_base_delay: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_owned(),
            locale: Locale::default(),
            info: EndpointPolicy::new(3, 6000),
            fallback: EndpointPolicy::new(3, 6000),
            enrich: EndpointPolicy::new(2, 5000),
            retry_base_delay: Duration::from_millis(400),
        }
    }
}

// ── State ────────────────────────────────────────────────────────────

/// What consumers render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverState {
    pub data: Option<Arc<AccountSnapshot>>,
    /// A resolution is running and there is nothing to show yet.
    pub loading: bool,
    /// A resolution is running while stale data is still shown.
    pub refreshing: bool,
    /// Locale-aware message of the last failed resolution.
    pub error: Option<String>,
}

/// How a call to [`AccountResolver::resolve`] ended.
#[derive(Debug)]
pub enum ResolveOutcome {
    /// Same key as the last resolution and not forced; nothing was fetched.
    Skipped,
    /// New data was published.
    Resolved(Arc<AccountSnapshot>),
    /// The error message was published and data cleared.
    Failed(CoreError),
    /// Cancelled; no error is recorded and data is kept.
    Cancelled,
    /// A newer resolution started meanwhile; the result was dropped.
    Superseded,
}

#[derive(Default)]
struct Flight {
    last_key: Option<ResolutionKey>,
    last_params: Option<LocatorParams>,
    generation: u64,
    cancel: Option<CancellationToken>,
}

// ── AccountResolver ──────────────────────────────────────────────────

/// Cheaply cloneable handle; clones share state and in-flight tracking.
pub struct AccountResolver<H = HttpClient> {
    inner: Arc<ResolverInner<H>>,
}

struct ResolverInner<H> {
    http: H,
    config: ResolverConfig,
    state: watch::Sender<ResolverState>,
    flight: Mutex<Flight>,
}

impl<H> Clone for AccountResolver<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: HttpSend> AccountResolver<H> {
    pub fn new(http: H, config: ResolverConfig) -> Self {
        let (state, _) = watch::channel(ResolverState::default());
        Self {
            inner: Arc::new(ResolverInner {
                http,
                config,
                state,
                flight: Mutex::new(Flight::default()),
            }),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.inner.config
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ResolverState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolverState> {
        self.inner.state.subscribe()
    }

    /// Parameters of the most recent resolution, if any.
    pub fn last_params(&self) -> Option<LocatorParams> {
        self.flight().last_params.clone()
    }

    /// Cancel whatever is in flight. State is left as it is.
    pub fn cancel(&self) {
        if let Some(token) = self.flight().cancel.take() {
            token.cancel();
        }
    }

    /// Forced resolution of the last parameters (empty if none yet).
    pub async fn reload(&self) -> ResolveOutcome {
        let params = self.last_params().unwrap_or_default();
        self.resolve(&params, true).await
    }

    /// Resolve `params` and publish the result.
    ///
    /// Without `force`, a key equal to the last resolved one is skipped.
    /// Any in-flight resolution is cancelled first.
    pub async fn resolve(&self, params: &LocatorParams, force: bool) -> ResolveOutcome {
        let key = params.key();
        let (generation, cancel) = {
            let mut flight = self.flight();
            if !force && flight.last_key.as_ref() == Some(&key) {
                debug!(%key, "resolution skipped: key unchanged");
                return ResolveOutcome::Skipped;
            }
            if let Some(prev) = flight.cancel.take() {
                debug!("cancelling in-flight resolution");
                prev.cancel();
            }
            flight.last_key = Some(key.clone());
            flight.last_params = Some(params.clone());
            flight.generation += 1;
            let token = CancellationToken::new();
            flight.cancel = Some(token.clone());

            self.inner.state.send_modify(|s| {
                s.loading = s.data.is_none();
                s.refreshing = s.data.is_some();
                s.error = None;
            });
            (flight.generation, token)
        };

        info!(%key, force, "resolving account");
        let result = self.fetch_snapshot(params, &cancel).await;

        let mut flight = self.flight();
        if flight.generation != generation {
            debug!(%key, "resolution superseded, dropping result");
            return ResolveOutcome::Superseded;
        }
        flight.cancel = None;

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                info!(%key, name = %snapshot.name, "account resolved");
                self.inner.state.send_modify(|s| {
                    s.data = Some(Arc::clone(&snapshot));
                    s.loading = false;
                    s.refreshing = false;
                    s.error = None;
                });
                ResolveOutcome::Resolved(snapshot)
            }
            Err(e) if e.is_cancelled() => {
                debug!(%key, "resolution cancelled");
                self.inner.state.send_modify(|s| {
                    s.loading = false;
                    s.refreshing = false;
                });
                ResolveOutcome::Cancelled
            }
            Err(e) => {
                warn!(%key, error = %e, "account resolution failed");
                let message = friendly_message(&e, self.inner.config.locale);
                self.inner.state.send_modify(|s| {
                    s.data = None;
                    s.loading = false;
                    s.refreshing = false;
                    s.error = Some(message);
                });
                ResolveOutcome::Failed(e)
            }
        }
    }

    /// One end-to-end fetch without touching published state.
    pub async fn fetch_snapshot(
        &self,
        params: &LocatorParams,
        cancel: &CancellationToken,
    ) -> Result<AccountSnapshot, CoreError> {
        let config = &self.inner.config;
        let http = &self.inner.http;

        let base = base_url(params, &config.api_root)?;
        let base_target = parse_target(&base)?;
        let info_target = parse_target(&format!("{base}{INFO_SUFFIX}"))?;

        let info = match fetch_with_retry(http, &info_target, &self.retry(config.info, "info", cancel)).await {
            Ok(resp) if resp.is_success() => match resp.json::<Value>() {
                Ok(body) => Some(body),
                Err(e) => {
                    debug!(error = %e, "info body unreadable, using base endpoint");
                    None
                }
            },
            Ok(resp) => {
                debug!(status = resp.status, "info endpoint declined, using base endpoint");
                None
            }
            Err(e) if e.is_cancelled() => return Err(CoreError::Cancelled),
            Err(e) => {
                debug!(error = %e, "info endpoint failed, using base endpoint");
                None
            }
        };

        let payload = match info {
            None => {
                let resp =
                    fetch_with_retry(http, &base_target, &self.retry(config.fallback, "base", cancel)).await?;
                if !resp.is_success() {
                    return Err(CoreError::Http {
                        status: resp.status,
                    });
                }
                resp.json::<Value>()?
            }
            Some(info) => {
                match fetch_with_retry(http, &base_target, &self.retry(config.enrich, "enrich", cancel)).await {
                    Ok(resp) if resp.is_success() => match resp.json::<Value>() {
                        Ok(base) => merge_payloads(base, info),
                        Err(_) => info,
                    },
                    Ok(_) => info,
                    Err(e) if e.is_cancelled() => return Err(CoreError::Cancelled),
                    Err(e) => {
                        debug!(error = %e, "enrichment skipped");
                        info
                    }
                }
            }
        };

        if payload.is_null() {
            return Err(CoreError::NoData);
        }
        AccountSnapshot::from_value(payload).map_err(|e| CoreError::Deserialization {
            message: e.to_string(),
        })
    }

    fn retry(&self, policy: EndpointPolicy, endpoint: &'static str, cancel: &CancellationToken) -> RetryOptions {
        RetryOptions::default()
            .attempts(policy.attempts)
            .timeout(policy.timeout)
            .base_delay(self.inner.config.retry_base_delay)
            .cancel_on(cancel.clone())
            .on_attempt(move |attempt, prev| {
                if let Some(err) = prev {
                    debug!(endpoint, attempt, previous = %err, "retrying");
                }
            })
    }

    fn flight(&self) -> MutexGuard<'_, Flight> {
        self.inner.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// `<api_url minus trailing /info>` or `<api_root>/sub/<token>`.
pub fn base_url(params: &LocatorParams, api_root: &str) -> Result<String, CoreError> {
    if let Some(api) = params.api_url.as_deref() {
        return Ok(api.strip_suffix(INFO_SUFFIX).unwrap_or(api).to_owned());
    }
    let token = params.token.as_deref().ok_or(CoreError::MissingToken)?;
    Ok(format!("{}/sub/{token}", api_root.trim_end_matches('/')))
}

fn parse_target(raw: &str) -> Result<Url, CoreError> {
    Url::parse(raw).map_err(|e| CoreError::Config {
        message: format!("invalid API URL {raw:?}: {e}"),
    })
}

/// Shallow merge where `info` wins on conflicting keys.
pub fn merge_payloads(base: Value, info: Value) -> Value {
    match (base, info) {
        (Value::Object(mut merged), Value::Object(info)) => {
            merged.extend(info);
            Value::Object(merged)
        }
        (base @ Value::Object(_), Value::Null) => base,
        (_, info) => info,
    }
}

/// User-facing text for a failed resolution: connectivity-looking errors
/// get the localized "may be blocking" message, anything else its own text.
pub fn friendly_message(err: &CoreError, locale: Locale) -> String {
    let raw = err.to_string();
    let lower = raw.to_lowercase();
    if NETWORK_KEYWORDS.iter().any(|k| lower.contains(k)) {
        locale.network_error().to_owned()
    } else if raw.is_empty() {
        "Fetch failed".to_owned()
    } else {
        raw
    }
}
