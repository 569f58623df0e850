// ── Profile validation ──
//
// Structural checks over the `key = value` WireGuard profile text. Never
// fails: defects come back as data and only gate the export actions.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Accepted key length band (a 32-byte key is 44 base64 chars).
const KEY_LEN: std::ops::RangeInclusive<usize> = 42..=48;

/// A structural profile defect.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum IssueCode {
    #[serde(rename = "issue_private_missing")]
    #[strum(serialize = "issue_private_missing")]
    PrivateMissing,
    #[serde(rename = "issue_private_invalid")]
    #[strum(serialize = "issue_private_invalid")]
    PrivateInvalid,
    #[serde(rename = "issue_public_missing")]
    #[strum(serialize = "issue_public_missing")]
    PublicMissing,
    #[serde(rename = "issue_public_invalid")]
    #[strum(serialize = "issue_public_invalid")]
    PublicInvalid,
}

/// Outcome of [`validate`]. `valid` is true iff `issues` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<IssueCode>,
}

impl ValidationResult {
    fn from_issues(issues: Vec<IssueCode>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }
}

/// Value of the first line that starts with `<field> =` (ASCII
/// case-insensitive), trimmed. Empty when absent.
///
/// The value is everything after the first `=`, so base64 padding survives.
pub fn field_value<'a>(profile: &'a str, field: &str) -> &'a str {
    let prefix = format!("{} =", field.to_ascii_lowercase());
    profile
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .find(|line| {
            line.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(&prefix))
        })
        .and_then(|line| line.split_once('='))
        .map_or("", |(_, value)| value.trim())
}

/// Plausible base64 key: length 42-48 over `[A-Za-z0-9+/=]`, no `<`
/// placeholder.
pub fn is_plausible_key(value: &str) -> bool {
    !value.contains('<')
        && KEY_LEN.contains(&value.len())
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}

fn check_key(value: &str, missing: IssueCode, invalid: IssueCode) -> Option<IssueCode> {
    if value.is_empty() {
        Some(missing)
    } else if is_plausible_key(value) {
        None
    } else {
        Some(invalid)
    }
}

/// Check the `PrivateKey` and `PublicKey` fields of a profile.
///
/// Purely structural: keys are not decoded or verified.
pub fn validate(profile: &str) -> ValidationResult {
    let issues = [
        check_key(
            field_value(profile, "PrivateKey"),
            IssueCode::PrivateMissing,
            IssueCode::PrivateInvalid,
        ),
        check_key(
            field_value(profile, "PublicKey"),
            IssueCode::PublicMissing,
            IssueCode::PublicInvalid,
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    ValidationResult::from_issues(issues)
}
