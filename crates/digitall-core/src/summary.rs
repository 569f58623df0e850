// ── Account summary ──
//
// Derived, display-ready view of an `AccountSnapshot`. All epoch fields
// pass through the seconds/millis heuristic here; export never does.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::format::format_bytes;
use crate::i18n::Locale;
use crate::model::{AccountSnapshot, AccountStatus};

const DAY_MS: i64 = 86_400_000;

/// Remaining validity of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum TimeStatus {
    Unlimited,
    Expired,
    DaysLeft(i64),
}

impl TimeStatus {
    pub fn label(self, locale: Locale) -> String {
        match self {
            Self::Unlimited => locale.unlimited().to_owned(),
            Self::Expired => locale.expired().to_owned(),
            Self::DaysLeft(days) => locale.days_left(days),
        }
    }
}

/// Display-ready facts about one snapshot at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub name: String,
    pub status: AccountStatus,
    pub effective_status: AccountStatus,
    pub data_limit: u64,
    pub used: u64,
    /// `None` when unlimited.
    pub remaining: Option<u64>,
    /// `used / limit`, 0 when unlimited. May exceed 1.
    pub usage_ratio: f64,
    pub over_quota: bool,
    pub time_status: TimeStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_handshake: Option<DateTime<Utc>>,
}

impl AccountSummary {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn from_snapshot(snapshot: &AccountSnapshot, now: DateTime<Utc>) -> Self {
        let limit = snapshot.data_limit;
        let used = snapshot.total_traffic;
        let (remaining, usage_ratio) = if limit == 0 {
            (None, 0.0)
        } else {
            (Some(limit.saturating_sub(used)), used as f64 / limit as f64)
        };

        let expires_at = snapshot
            .expire_time
            .as_ref()
            .filter(|v| v.is_set())
            .and_then(|v| v.to_datetime());

        Self {
            name: snapshot.name.clone(),
            status: snapshot.status,
            effective_status: snapshot.effective_status(),
            data_limit: limit,
            used,
            remaining,
            usage_ratio,
            over_quota: limit > 0 && used >= limit,
            time_status: time_status(expires_at, now),
            expires_at,
            created_at: snapshot.created_at.as_ref().and_then(|v| v.to_datetime()),
            last_handshake: snapshot.last_handshake.as_ref().and_then(|v| v.to_datetime()),
        }
    }

    /// `"1.5 GB / 10 GB"`, or just the used amount when unlimited.
    pub fn usage_label(&self, locale: Locale) -> String {
        let used = format_bytes(self.used, locale);
        if self.data_limit == 0 {
            format!("{used} / {}", locale.unlimited())
        } else {
            format!("{used} / {}", format_bytes(self.data_limit, locale))
        }
    }

    /// Percentage with one decimal, or the unlimited label.
    pub fn usage_percent_label(&self, locale: Locale) -> String {
        if self.data_limit == 0 {
            locale.unlimited().to_owned()
        } else {
            locale.localize_digits(&format!("{:.1}%", self.usage_ratio * 100.0))
        }
    }
}

/// Days until expiry counted from today's UTC midnight, rounded up.
pub fn time_status(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TimeStatus {
    let Some(expire) = expires_at else {
        return TimeStatus::Unlimited;
    };
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |naive| naive.and_utc());
    let diff_ms = (expire - midnight).num_milliseconds();
    let days = diff_ms.div_euclid(DAY_MS) + i64::from(diff_ms.rem_euclid(DAY_MS) != 0);
    if days <= 0 {
        TimeStatus::Expired
    } else {
        TimeStatus::DaysLeft(days)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::model::TimeValue;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 15, 30, 0).unwrap()
    }

    #[test]
    fn no_expiry_is_unlimited() {
        assert_eq!(time_status(None, now()), TimeStatus::Unlimited);
    }

    #[test]
    fn days_round_up_from_midnight() {
        let later_today = Utc.with_ymd_and_hms(2024, 5, 10, 18, 0, 0).unwrap();
        assert_eq!(time_status(Some(later_today), now()), TimeStatus::DaysLeft(1));

        let exactly_two = Utc.with_ymd_and_hms(2024, 5, 12, 0, 0, 0).unwrap();
        assert_eq!(time_status(Some(exactly_two), now()), TimeStatus::DaysLeft(2));

        let midnight_today = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        assert_eq!(time_status(Some(midnight_today), now()), TimeStatus::Expired);

        let last_week = Utc.with_ymd_and_hms(2024, 5, 3, 12, 0, 0).unwrap();
        assert_eq!(time_status(Some(last_week), now()), TimeStatus::Expired);
    }

    #[test]
    fn summary_of_limited_account() {
        let snap = AccountSnapshot {
            name: "alice".into(),
            status: AccountStatus::OnHold,
            data_limit: 1000,
            total_traffic: 250,
            expire_time: Some(TimeValue::Int(
                Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap().timestamp(),
            )),
            last_handshake: Some(TimeValue::Int(1_715_000_000_000)),
            ..AccountSnapshot::default()
        };
        let s = AccountSummary::from_snapshot(&snap, now());
        assert_eq!(s.effective_status, AccountStatus::Active);
        assert_eq!(s.remaining, Some(750));
        assert!((s.usage_ratio - 0.25).abs() < f64::EPSILON);
        assert!(!s.over_quota);
        assert_eq!(s.time_status, TimeStatus::DaysLeft(10));
        assert_eq!(s.usage_percent_label(Locale::En), "25.0%");
        assert!(s.last_handshake.is_some());
    }

    #[test]
    fn summary_of_unlimited_account() {
        let snap = AccountSnapshot {
            total_traffic: 2048,
            expire_time: Some(TimeValue::Int(0)),
            ..AccountSnapshot::default()
        };
        let s = AccountSummary::from_snapshot(&snap, now());
        assert_eq!(s.remaining, None);
        assert!(s.usage_ratio.abs() < f64::EPSILON);
        assert_eq!(s.time_status, TimeStatus::Unlimited);
        assert_eq!(s.usage_label(Locale::En), "2 KB / Unlimited");
        assert_eq!(s.time_status.label(Locale::Fa), "نامحدود");
    }

    #[test]
    fn over_quota_is_flagged() {
        let snap = AccountSnapshot {
            data_limit: 100,
            total_traffic: 150,
            ..AccountSnapshot::default()
        };
        let s = AccountSummary::from_snapshot(&snap, now());
        assert!(s.over_quota);
        assert_eq!(s.remaining, Some(0));
    }
}
