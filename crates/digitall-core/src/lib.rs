//! Account resolution and profile logic between `digitall-api` and the CLI.
//!
//! - **[`AccountResolver`]**: Resolves a subscription from the `/info` and
//!   base endpoints, merging them with `/info` taking precedence. Publishes
//!   [`ResolverState`] (`data` / `loading` / `refreshing` / `error`) on a
//!   `tokio::sync::watch` channel, skips repeat resolutions of an unchanged
//!   key and cancels the in-flight one when the key changes.
//!
//! - **[`locator`]**: Derives the token and explicit API base from an
//!   injected [`NavigationContext`]; [`LocatorWatcher`] polls it for query
//!   changes.
//!
//! - **[`AccountSession`]**: Long-running combination of the two, with an
//!   optional periodic forced reload.
//!
//! - **[`validate()`]** / **[`ExportGate`]**: Structural checks of the
//!   WireGuard profile text; export is refused while issues remain.
//!
//! - **Display helpers**: [`AccountSummary`], [`format_bytes`], [`Locale`].

pub mod error;
pub mod export;
pub mod format;
pub mod i18n;
pub mod locator;
pub mod model;
pub mod resolver;
pub mod session;
pub mod summary;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use export::{ExportGate, generate_safe_conf_filename};
pub use format::{format_bytes, format_duration_compact, seconds_to_dhms};
pub use i18n::Locale;
pub use locator::{
    LocatorParams, LocatorWatcher, NavigationContext, ResolutionKey, UrlNavigation, locate,
};
pub use model::{AccountSnapshot, AccountStatus, TimeValue, normalize_epoch_to_date};
pub use resolver::{
    AccountResolver, DEFAULT_API_ROOT, EndpointPolicy, ResolveOutcome, ResolverConfig,
    ResolverState,
};
pub use session::{AccountSession, SessionConfig};
pub use summary::{AccountSummary, TimeStatus};
pub use validate::{IssueCode, ValidationResult, validate};
