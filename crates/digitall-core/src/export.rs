// ── Profile export ──
//
// Export actions (print, write file) only ever see the raw `clientConfig`
// text, and only after it passed validation.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::CoreError;
use crate::model::AccountSnapshot;
use crate::validate::{ValidationResult, validate};

const FILENAME_PREFIX: &str = "digitall-";
const FILENAME_FALLBACK: &str = "client";
const MAX_STEM_LEN: usize = 40;
const MASK_THRESHOLD: usize = 10;

/// Filesystem-safe `.conf` name derived from a subscription name.
///
/// Accented letters decompose to their base letter first. Anything else
/// outside `[A-Za-z0-9-]` collapses into single dashes; names longer
/// than ten characters are masked to `first4-x-last2` so the file does not
/// leak the full account name.
pub fn generate_safe_conf_filename(raw_name: Option<&str>) -> String {
    let base = raw_name.filter(|n| !n.is_empty()).unwrap_or(FILENAME_FALLBACK);

    let mut cleaned = String::with_capacity(base.len());
    for c in base.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            cleaned.push(c);
        } else if !cleaned.ends_with('-') {
            cleaned.push('-');
        }
    }
    let stem: String = cleaned.trim_matches('-').chars().take(MAX_STEM_LEN).collect();
    let stem = if stem.is_empty() {
        FILENAME_FALLBACK.to_owned()
    } else {
        stem
    };

    let masked = if stem.len() > MASK_THRESHOLD {
        let head = stem.get(..4).unwrap_or_default();
        let tail = stem.get(stem.len() - 2..).unwrap_or_default();
        format!("{head}-x-{tail}")
    } else {
        stem
    };

    format!("{FILENAME_PREFIX}{masked}.conf")
}

/// Validation gate in front of every export action.
#[derive(Debug, Clone)]
pub struct ExportGate<'a> {
    snapshot: &'a AccountSnapshot,
    validation: ValidationResult,
}

impl<'a> ExportGate<'a> {
    pub fn new(snapshot: &'a AccountSnapshot) -> Self {
        Self {
            validation: validate(snapshot.profile_text()),
            snapshot,
        }
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn is_allowed(&self) -> bool {
        self.validation.valid
    }

    /// The unmodified profile text, or `ExportBlocked` with the issue list.
    pub fn profile(&self) -> Result<&'a str, CoreError> {
        if self.validation.valid {
            Ok(self.snapshot.profile_text())
        } else {
            Err(CoreError::ExportBlocked {
                issues: self.validation.issues.clone(),
            })
        }
    }

    /// Suggested download name for this snapshot.
    pub fn filename(&self) -> String {
        generate_safe_conf_filename(Some(self.snapshot.name.as_str()))
    }
}
