//! Retrying GET with exponential backoff, per-attempt timeouts and
//! cooperative cancellation.
//!
//! [`fetch_with_retry`] runs strictly sequential attempts against an
//! [`HttpSend`]. Each attempt owns an [`AttemptScope`]: a child of the
//! caller's [`CancellationToken`] plus a timer task that cancels it after
//! the per-attempt timeout. Dropping the scope aborts the timer, so no
//! pending timer outlives its attempt on any exit path.
//!
//! Outcome contract:
//!
//! | Attempt result                         | Action                           |
//! |----------------------------------------|----------------------------------|
//! | 2xx                                    | return `Ok(response)`            |
//! | non-2xx outside the retryable set      | return `Ok(response)` untouched  |
//! | retryable status (408, 429, 5xx)       | retry, `Err(Http)` when exhausted|
//! | per-attempt timeout / transport error  | retry, last error when exhausted |
//! | caller cancellation                    | `Err(Cancelled)` immediately     |

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::http::{HttpResponse, HttpSend};

/// Upper bound (exclusive) of the random jitter added to each backoff wait.
const JITTER_MAX_MS: u64 = 250;

/// Observability hook: `(attempt_number, previous_attempt_error)`.
///
/// Invoked before every attempt; the error is `None` for the first one.
pub type AttemptHook = Arc<dyn Fn(u32, Option<&Error>) + Send + Sync>;

// ── RetryOptions ─────────────────────────────────────────────────────

/// Tuning for a single [`fetch_with_retry`] call.
#[derive(Clone)]
pub struct RetryOptions {
    /// Total attempts including the first. Must be at least 1.
    pub attempts: u32,
    /// Backoff before the second attempt; doubles for each later one.
    pub base_delay: Duration,
    /// Cap on the exponential part of the backoff.
    pub max_delay: Duration,
    /// Budget for one attempt (request + body).
    pub timeout: Duration,
    /// Called before each attempt.
    pub on_attempt: Option<AttemptHook>,
    /// Caller-owned cancellation for the whole operation.
    pub cancel: Option<CancellationToken>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(400),
            max_delay: Duration::from_millis(4000),
            timeout: Duration::from_millis(8000),
            on_attempt: None,
            cancel: None,
        }
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("attempts", &self.attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("timeout", &self.timeout)
            .field("on_attempt", &self.on_attempt.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl RetryOptions {
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn on_attempt(mut self, hook: impl Fn(u32, Option<&Error>) + Send + Sync + 'static) -> Self {
        self.on_attempt = Some(Arc::new(hook));
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn external_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Statuses worth another attempt: 408, 429 and the whole 5xx band.
pub fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

/// Deterministic part of the wait after `attempt` (1-based) failed:
/// `min(max_delay, base_delay * 2^(attempt-1))`.
pub fn backoff_delay(attempt: u32, base_delay: Duration, max_delay: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base_delay
        .checked_mul(1u32 << exponent)
        .unwrap_or(max_delay)
        .min(max_delay)
}

fn jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..JITTER_MAX_MS))
}

// ── AttemptScope ─────────────────────────────────────────────────────

/// Scoped per-attempt cancellation.
///
/// The token fires when either the caller's token fires or the timeout
/// elapses. The timer task is aborted on drop.
struct AttemptScope {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl AttemptScope {
    fn start(external: Option<&CancellationToken>, timeout: Duration) -> Self {
        let token = external.map_or_else(CancellationToken::new, CancellationToken::child_token);
        let timer_token = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            timer_token.cancel();
        });
        Self { token, timer }
    }

    fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for AttemptScope {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

// ── Attempt state ────────────────────────────────────────────────────

/// Ephemeral bookkeeping for one `fetch_with_retry` call.
#[derive(Debug, Default)]
struct AttemptState {
    attempt: u32,
    last_error: Option<Error>,
    next_delay: Option<Duration>,
}

enum AttemptOutcome {
    /// Hand this response to the caller.
    Done(HttpResponse),
    /// Record and maybe try again.
    Retry(Error),
    /// Stop immediately.
    Abort(Error),
}

fn classify(
    result: Result<HttpResponse, Error>,
    opts: &RetryOptions,
    attempt: u32,
) -> AttemptOutcome {
    match result {
        Ok(resp) if resp.is_success() => AttemptOutcome::Done(resp),
        Ok(resp) if !is_retryable_status(resp.status) => {
            debug!(status = resp.status, attempt, "non-retryable status, returning response");
            AttemptOutcome::Done(resp)
        }
        Ok(resp) => AttemptOutcome::Retry(Error::Http {
            status: resp.status,
        }),
        Err(Error::Cancelled) if opts.external_cancelled() => AttemptOutcome::Abort(Error::Cancelled),
        Err(Error::Cancelled) => AttemptOutcome::Retry(Error::Timeout {
            timeout_ms: duration_ms(opts.timeout),
        }),
        Err(e) => AttemptOutcome::Retry(e),
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── fetch_with_retry ─────────────────────────────────────────────────

/// GET `url` with bounded attempts, per-attempt timeout and backoff.
///
/// Returns the response for 2xx and for any non-retryable status; fails
/// with the last recorded error once every attempt has been spent, or with
/// [`Error::Cancelled`] as soon as the caller's token fires.
pub async fn fetch_with_retry<S>(http: &S, url: &Url, opts: &RetryOptions) -> Result<HttpResponse, Error>
where
    S: HttpSend + ?Sized,
{
    if opts.attempts < 1 {
        return Err(Error::InvalidConfig("attempts must be >= 1".into()));
    }

    let mut state = AttemptState::default();

    while state.attempt < opts.attempts {
        state.attempt += 1;
        let attempt = state.attempt;

        if opts.external_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Some(ref hook) = opts.on_attempt {
            hook(attempt, state.last_error.as_ref());
        }

        let scope = AttemptScope::start(opts.cancel.as_ref(), opts.timeout);
        let result = tokio::select! {
            biased;
            () = scope.token().cancelled() => Err(Error::Cancelled),
            res = http.get(url) => res,
        };
        drop(scope);

        let err = match classify(result, opts, attempt) {
            AttemptOutcome::Done(resp) => {
                debug!(%url, attempt, status = resp.status, "fetch completed");
                return Ok(resp);
            }
            AttemptOutcome::Abort(e) => return Err(e),
            AttemptOutcome::Retry(e) => e,
        };

        if attempt >= opts.attempts {
            warn!(%url, attempt, error = %err, "attempts exhausted");
            state.last_error = Some(err);
            break;
        }

        let delay = backoff_delay(attempt, opts.base_delay, opts.max_delay) + jitter();
        warn!(
            %url,
            attempt,
            error = %err,
            delay_ms = duration_ms(delay),
            "attempt failed, backing off"
        );
        state.last_error = Some(err);
        state.next_delay = Some(delay);

        match opts.cancel {
            Some(ref cancel) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }

    Err(state
        .last_error
        .unwrap_or_else(|| Error::InvalidConfig("fetch_with_retry made no attempts".into())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// What one scripted call does.
    enum Step {
        Status(u16),
        Fail,
        Hang,
    }

    /// `HttpSend` that replays a script and counts calls.
    struct Scripted {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into_iter().collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpSend for Scripted {
        async fn get(&self, _url: &Url) -> Result<HttpResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Status(status)) => Ok(HttpResponse::new(status, "{}")),
                Some(Step::Fail) => Err(Error::Tls("connection reset".into())),
                Some(Step::Hang) | None => std::future::pending().await,
            }
        }
    }

    fn url() -> Url {
        Url::parse("https://example.test/data").unwrap()
    }

    fn fast() -> RetryOptions {
        RetryOptions::default()
            .base_delay(Duration::from_millis(10))
            .timeout(Duration::from_millis(500))
    }

    #[test]
    fn retryable_statuses() {
        for s in [408, 429, 500, 503, 599] {
            assert!(is_retryable_status(s), "{s} should be retryable");
        }
        for s in [200, 301, 400, 401, 404, 600] {
            assert!(!is_retryable_status(s), "{s} should not be retryable");
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(400);
        let max = Duration::from_millis(4000);
        assert_eq!(backoff_delay(1, base, max), Duration::from_millis(400));
        assert_eq!(backoff_delay(2, base, max), Duration::from_millis(800));
        assert_eq!(backoff_delay(3, base, max), Duration::from_millis(1600));
        assert_eq!(backoff_delay(5, base, max), max);
        assert_eq!(backoff_delay(64, base, max), max);
    }

    #[test]
    fn jitter_stays_in_band() {
        for _ in 0..100 {
            assert!(jitter() < Duration::from_millis(JITTER_MAX_MS));
        }
    }

    #[tokio::test]
    async fn zero_attempts_is_a_config_error() {
        let http = Scripted::new([Step::Status(200)]);
        let err = fetch_with_retry(&http, &url(), &RetryOptions::default().attempts(0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(http.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let http = Scripted::new([Step::Status(500), Step::Status(500), Step::Status(200)]);
        let resp = fetch_with_retry(&http, &url(), &fast().attempts(4)).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(http.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_status_is_returned() {
        let http = Scripted::new([Step::Status(404)]);
        let resp = fetch_with_retry(&http, &url(), &fast().attempts(5)).await.unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(http.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retryable_status_fails_with_http_error() {
        let http = Scripted::new([Step::Status(500), Step::Status(500)]);
        let err = fetch_with_retry(&http, &url(), &fast().attempts(2)).await.unwrap_err();
        assert!(matches!(err, Error::Http { status: 500 }));
        assert_eq!(http.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_timeout_is_retried() {
        let http = Scripted::new([Step::Hang, Step::Status(200)]);
        let resp = fetch_with_retry(&http, &url(), &fast().attempts(2)).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(http.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn last_timeout_is_reported() {
        let http = Scripted::new([Step::Hang, Step::Hang]);
        let err = fetch_with_retry(&http, &url(), &fast().attempts(2)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout_ms: 500 }));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_retried() {
        let http = Scripted::new([Step::Fail, Step::Status(200)]);
        let resp = fetch_with_retry(&http, &url(), &fast()).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(http.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_transport_errors_surface_last_error() {
        let http = Scripted::new([Step::Fail, Step::Fail]);
        let err = fetch_with_retry(&http, &url(), &fast().attempts(2)).await.unwrap_err();
        assert!(matches!(err, Error::Tls(_)));
        assert_eq!(http.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_makes_no_call() {
        let http = Scripted::new([Step::Status(200)]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fetch_with_retry(&http, &url(), &fast().cancel_on(cancel))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(http.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn external_cancel_mid_attempt_is_not_retried() {
        let http = Arc::new(Scripted::new([Step::Hang, Step::Status(200)]));
        let cancel = CancellationToken::new();
        let opts = fast().attempts(3).timeout(Duration::from_secs(60)).cancel_on(cancel.clone());

        let task = {
            let http = Arc::clone(&http);
            tokio::spawn(async move { fetch_with_retry(&*http, &url(), &opts).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(http.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn external_cancel_during_backoff_stops() {
        let http = Arc::new(Scripted::new([Step::Status(503), Step::Status(200)]));
        let cancel = CancellationToken::new();
        let opts = RetryOptions::default()
            .base_delay(Duration::from_secs(5))
            .cancel_on(cancel.clone());

        let task = {
            let http = Arc::clone(&http);
            tokio::spawn(async move { fetch_with_retry(&*http, &url(), &opts).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        assert!(task.await.unwrap().unwrap_err().is_cancelled());
        assert_eq!(http.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn live_scope_fires_after_timeout() {
        let scope = AttemptScope::start(None, Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(scope.token().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_scope_never_fires() {
        let external = CancellationToken::new();
        let scope = AttemptScope::start(Some(&external), Duration::from_millis(100));
        let token = scope.token().clone();
        drop(scope);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!token.is_cancelled());
        assert!(!external.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_attempts_leave_no_timeout_behind() {
        let cancel = CancellationToken::new();
        let hook_calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hook_calls);
        let http = Scripted::new([Step::Fail, Step::Status(503), Step::Status(200)]);
        let opts = fast()
            .timeout(Duration::from_secs(1))
            .cancel_on(cancel.clone())
            .on_attempt(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let resp = fetch_with_retry(&http, &url(), &opts).await.unwrap();
        assert_eq!(resp.status, 200);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!cancel.is_cancelled());
        assert_eq!(hook_calls.load(Ordering::SeqCst), 3);
        assert_eq!(http.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hook_sees_previous_error() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let http = Scripted::new([Step::Status(502), Step::Status(200)]);
        let opts = fast().on_attempt(move |n, err| {
            sink.lock().unwrap().push((n, err.map(ToString::to_string)));
        });

        fetch_with_retry(&http, &url(), &opts).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(1, None), (2, Some("HTTP 502".to_string()))]);
    }
}
