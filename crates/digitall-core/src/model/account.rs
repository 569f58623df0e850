// ── Account snapshot ──

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

use super::time::normalize_epoch_to_date;

/// Subscription state as reported by the server.
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
pub enum AccountStatus {
    Active,
    Inactive,
    /// Provisioned but waiting for the first connection to start the clock.
    OnHold,
    /// Anything newer than this client knows about.
    #[default]
    #[serde(other)]
    Unknown,
}

/// An epoch-like field that may arrive as an integer, a float, or a string
/// (numeric or ISO 8601).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl TimeValue {
    /// Whether the raw value counts as "set": non-zero number or
    /// non-empty string.
    pub fn is_set(&self) -> bool {
        match self {
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// Normalise to a UTC instant.
    ///
    /// Numbers and numeric strings go through the seconds/millis heuristic;
    /// other strings are parsed as RFC 3339 or a naive UTC timestamp.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Int(n) => normalize_epoch_to_date(*n as f64),
            Self::Float(f) => normalize_epoch_to_date(*f),
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                if let Ok(num) = s.parse::<f64>() {
                    return normalize_epoch_to_date(num);
                }
                parse_timestamp(s)
            }
        }
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// The resolved state of a subscription.
///
/// Replaced wholesale on every successful resolution; never patched.
/// `client_config` is the export payload and is kept byte-for-byte.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub status: AccountStatus,

    // ── Quota ────────────────────────────────────────────────────────
    /// Quota in bytes; 0 means unlimited.
    #[serde(default, deserialize_with = "lenient_bytes")]
    pub data_limit: u64,
    /// Bytes consumed so far.
    #[serde(default, deserialize_with = "lenient_bytes")]
    pub total_traffic: u64,

    // ── Timing ───────────────────────────────────────────────────────
    #[serde(default)]
    pub created_at: Option<TimeValue>,
    /// `None` means the subscription never expires.
    #[serde(default)]
    pub expire_time: Option<TimeValue>,
    /// `None` (or empty) means the peer never connected.
    #[serde(default)]
    pub last_handshake: Option<TimeValue>,
    /// Planned duration (seconds) applied once an on-hold account starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_hold_expire_duration: Option<u64>,

    // ── Payload ──────────────────────────────────────────────────────
    #[serde(default)]
    pub client_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe_link: Option<String>,

    // ── Interface details ────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preshared_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_ips: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_keepalive: Option<u32>,

    /// Fields this client does not model, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccountSnapshot {
    /// Decode a merged JSON payload.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// The raw profile text, or `""` when the server sent none.
    pub fn profile_text(&self) -> &str {
        self.client_config.as_deref().unwrap_or_default()
    }

    /// Any handshake recorded at all.
    pub fn has_connected(&self) -> bool {
        self.last_handshake.as_ref().is_some_and(TimeValue::is_set)
    }

    /// `OnHold` accounts that have already handshaken are effectively active.
    pub fn effective_status(&self) -> AccountStatus {
        match self.status {
            AccountStatus::OnHold if self.has_connected() => AccountStatus::Active,
            other => other,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.data_limit == 0
    }
}

// ── Lenient field decoding ───────────────────────────────────────────

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Byte counters: accepts integers, floats, numeric strings and `null`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
fn lenient_bytes<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let from_float = |f: f64| if f.is_finite() && f > 0.0 { f as u64 } else { 0 };
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .unwrap_or_else(|| n.as_f64().map_or(0, from_float)),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_or(0, from_float),
        _ => 0,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_known_and_extra_fields() {
        let snap = AccountSnapshot::from_value(json!({
            "id": 7,
            "name": "alice",
            "status": "OnHold",
            "dataLimit": 10_737_418_240_u64,
            "totalTraffic": 1024,
            "createdAt": "2024-01-02T03:04:05Z",
            "expireTime": null,
            "lastHandshake": 1_700_000_000,
            "clientConfig": "[Interface]\nPrivateKey = abc=\n",
            "mtu": 1420,
            "region": "eu-1"
        }))
        .unwrap();

        assert_eq!(snap.id, Some(7));
        assert_eq!(snap.status, AccountStatus::OnHold);
        assert_eq!(snap.data_limit, 10_737_418_240);
        assert_eq!(snap.expire_time, None);
        assert_eq!(snap.mtu, Some(1420));
        assert_eq!(snap.extra.get("region"), Some(&json!("eu-1")));
        assert_eq!(snap.profile_text(), "[Interface]\nPrivateKey = abc=\n");
    }

    #[test]
    fn unknown_status_and_missing_fields_default() {
        let snap = AccountSnapshot::from_value(json!({ "status": "Suspended" })).unwrap();
        assert_eq!(snap.status, AccountStatus::Unknown);
        assert_eq!(snap.name, "");
        assert!(snap.is_unlimited());
        assert_eq!(snap.profile_text(), "");
    }

    #[test]
    fn lenient_byte_counters() {
        let snap = AccountSnapshot::from_value(json!({
            "dataLimit": "2048",
            "totalTraffic": 1.5e3
        }))
        .unwrap();
        assert_eq!(snap.data_limit, 2048);
        assert_eq!(snap.total_traffic, 1500);

        let snap = AccountSnapshot::from_value(json!({ "dataLimit": null })).unwrap();
        assert_eq!(snap.data_limit, 0);
    }

    #[test]
    fn extra_fields_survive_serialization() {
        let snap = AccountSnapshot::from_value(json!({ "name": "bob", "plan": { "tier": 2 } })).unwrap();
        let out = serde_json::to_value(&snap).unwrap();
        assert_eq!(out["plan"]["tier"], 2);
        assert_eq!(out["name"], "bob");
    }

    #[test]
    fn on_hold_with_handshake_is_active() {
        let mut snap = AccountSnapshot {
            status: AccountStatus::OnHold,
            ..AccountSnapshot::default()
        };
        assert_eq!(snap.effective_status(), AccountStatus::OnHold);

        snap.last_handshake = Some(TimeValue::Text(String::new()));
        assert_eq!(snap.effective_status(), AccountStatus::OnHold);

        snap.last_handshake = Some(TimeValue::Text("2024-05-01T10:00:00Z".into()));
        assert_eq!(snap.effective_status(), AccountStatus::Active);
    }

    #[test]
    fn time_values_normalise() {
        let secs = TimeValue::Int(1_700_000_000).to_datetime().unwrap();
        let millis = TimeValue::Float(1_700_000_000_000.0).to_datetime().unwrap();
        let numeric_text = TimeValue::Text("1700000000".into()).to_datetime().unwrap();
        assert_eq!(secs, millis);
        assert_eq!(secs, numeric_text);

        let iso = TimeValue::Text("2024-05-01T10:00:00+02:00".into()).to_datetime().unwrap();
        assert_eq!(iso.to_rfc3339(), "2024-05-01T08:00:00+00:00");

        let naive = TimeValue::Text("2024-05-01 10:00:00".into()).to_datetime().unwrap();
        assert_eq!(naive.to_rfc3339(), "2024-05-01T10:00:00+00:00");

        assert!(TimeValue::Text("yesterday".into()).to_datetime().is_none());
    }
}
