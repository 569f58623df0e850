// ── Live account session ──
//
// Wires a `LocatorWatcher` to an `AccountResolver`: every parameter change
// triggers a non-forced resolution, and an optional periodic task forces a
// reload of the current key.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use digitall_api::HttpSend;

use crate::locator::{DEFAULT_POLL_INTERVAL, LocatorParams, LocatorWatcher, NavigationContext};
use crate::resolver::{AccountResolver, ResolveOutcome, ResolverState};

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How often the navigation context is polled.
    pub poll_interval: Duration,
    /// Forced reload period; `None` disables it.
    pub refresh_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            refresh_interval: None,
        }
    }
}

/// A running session. Dropping it stops the background tasks.
pub struct AccountSession<H: HttpSend + 'static> {
    resolver: AccountResolver<H>,
    params: watch::Receiver<LocatorParams>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<H: HttpSend + 'static> AccountSession<H> {
    /// Start watching `nav` and resolve its initial parameters.
    pub fn start<N: NavigationContext>(
        resolver: AccountResolver<H>,
        nav: Arc<N>,
        config: SessionConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        let watcher = LocatorWatcher::spawn(nav, config.poll_interval, cancel.child_token());
        let params = watcher.params();

        let mut tasks = vec![tokio::spawn(drive_task(
            resolver.clone(),
            watcher,
            cancel.child_token(),
        ))];
        if let Some(period) = config.refresh_interval.filter(|p| !p.is_zero()) {
            tasks.push(tokio::spawn(refresh_task(
                resolver.clone(),
                period,
                cancel.child_token(),
            )));
        }

        Self {
            resolver,
            params,
            cancel,
            tasks,
        }
    }

    pub fn resolver(&self) -> &AccountResolver<H> {
        &self.resolver
    }

    pub fn state(&self) -> ResolverState {
        self.resolver.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolverState> {
        self.resolver.subscribe()
    }

    /// Current locator parameters.
    pub fn params(&self) -> LocatorParams {
        self.params.borrow().clone()
    }

    /// Forced reload of the current parameters.
    pub async fn reload(&self) -> ResolveOutcome {
        let params = self.params();
        self.resolver.resolve(&params, true).await
    }

    /// Stop background tasks and cancel any in-flight resolution.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        self.resolver.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl<H: HttpSend + 'static> Drop for AccountSession<H> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn spawn_resolution<H: HttpSend + 'static>(resolver: &AccountResolver<H>, params: LocatorParams) {
    let resolver = resolver.clone();
    tokio::spawn(async move {
        if let ResolveOutcome::Failed(e) = resolver.resolve(&params, false).await {
            debug!(error = %e, "session resolution failed");
        }
    });
}

/// Resolve the initial parameters, then every change the watcher reports.
async fn drive_task<H: HttpSend + 'static>(
    resolver: AccountResolver<H>,
    watcher: LocatorWatcher,
    cancel: CancellationToken,
) {
    let mut params = watcher.params();
    spawn_resolution(&resolver, watcher.current());

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = params.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = params.borrow_and_update().clone();
                spawn_resolution(&resolver, next);
            }
        }
    }

    watcher.join().await;
}

async fn refresh_task<H: HttpSend + 'static>(
    resolver: AccountResolver<H>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let ResolveOutcome::Failed(e) = resolver.reload().await {
                    warn!(error = %e, "periodic reload failed");
                }
            }
        }
    }
}
