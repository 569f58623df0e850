// ── Locale-aware messages ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::model::AccountStatus;
use crate::validate::IssueCode;

/// Display language. Persian switches digits and unit labels too.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Locale {
    #[default]
    En,
    Fa,
}

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];

impl Locale {
    /// Map a BCP 47 / POSIX language tag (`fa-IR`, `fa_IR.UTF-8`, `en-US`).
    pub fn from_language_tag(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("fa") {
            Self::Fa
        } else {
            Self::En
        }
    }

    /// Read `LC_ALL`, then `LANG`.
    pub fn from_env() -> Self {
        ["LC_ALL", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty())
            .map_or(Self::En, |tag| Self::from_language_tag(&tag))
    }

    /// Replace ASCII digits with the locale's digits.
    pub fn localize_digits(self, text: &str) -> String {
        match self {
            Self::En => text.to_owned(),
            Self::Fa => text
                .chars()
                .map(|c| {
                    c.to_digit(10)
                        .filter(|_| c.is_ascii_digit())
                        .and_then(|d| usize::try_from(d).ok())
                        .and_then(|d| PERSIAN_DIGITS.get(d).copied())
                        .unwrap_or(c)
                })
                .collect(),
        }
    }

    /// Friendly text for connectivity failures that look like blocking.
    pub fn network_error(self) -> &'static str {
        match self {
            Self::En => {
                "Network error contacting server. It may be temporary blocking/censorship; retry later or enable a browser VPN."
            }
            Self::Fa => {
                "خطا در ارتباط با سرور. ممکنه به خاطر اختلال شبکه یا فیلترینگ باشد؛ بعداً دوباره تلاش کنید یا VPN مرورگر را روشن کنید."
            }
        }
    }

    pub fn status_label(self, status: AccountStatus) -> &'static str {
        match (self, status) {
            (Self::En, AccountStatus::Active) => "Active",
            (Self::En, AccountStatus::Inactive) => "Inactive",
            (Self::En, AccountStatus::OnHold) => "On hold",
            (Self::En, AccountStatus::Unknown) => "Unknown",
            (Self::Fa, AccountStatus::Active) => "فعال",
            (Self::Fa, AccountStatus::Inactive) => "غیرفعال",
            (Self::Fa, AccountStatus::OnHold) => "در انتظار اتصال",
            (Self::Fa, AccountStatus::Unknown) => "نامشخص",
        }
    }

    pub fn issue_description(self, issue: IssueCode) -> &'static str {
        match (self, issue) {
            (Self::En, IssueCode::PrivateMissing) => "Private key is missing",
            (Self::En, IssueCode::PrivateInvalid) => "Private key is malformed or a placeholder",
            (Self::En, IssueCode::PublicMissing) => "Peer public key is missing",
            (Self::En, IssueCode::PublicInvalid) => "Peer public key is malformed or a placeholder",
            (Self::Fa, IssueCode::PrivateMissing) => "کلید خصوصی وجود ندارد",
            (Self::Fa, IssueCode::PrivateInvalid) => "کلید خصوصی نامعتبر است",
            (Self::Fa, IssueCode::PublicMissing) => "کلید عمومی وجود ندارد",
            (Self::Fa, IssueCode::PublicInvalid) => "کلید عمومی نامعتبر است",
        }
    }

    pub fn unlimited(self) -> &'static str {
        match self {
            Self::En => "Unlimited",
            Self::Fa => "نامحدود",
        }
    }

    pub fn expired(self) -> &'static str {
        match self {
            Self::En => "Expired",
            Self::Fa => "منقضی شده",
        }
    }

    pub fn days_left(self, days: i64) -> String {
        match self {
            Self::En => format!("{days}d left"),
            Self::Fa => format!("{} روز باقی", self.localize_digits(&days.to_string())),
        }
    }

    /// Suffix used by `format_duration_compact` for whole days.
    pub fn days_short(self) -> &'static str {
        match self {
            Self::En => "d",
            Self::Fa => " روز",
        }
    }

    pub fn never_connected(self) -> &'static str {
        match self {
            Self::En => "Never connected",
            Self::Fa => "هنوز متصل نشده",
        }
    }
}
