// ── Display formatting ──

use crate::i18n::Locale;

const UNITS_EN: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const UNITS_FA: [&str; 5] = ["بایت", "کیلوبایت", "مگ", "گیگ", "ترابایت"];

/// Human-readable byte count, 1024-based.
///
/// Values ≥ 10 or whole are shown without decimals, otherwise with one.
/// Persian output uses Persian digits and unit labels.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn format_bytes(bytes: u64, locale: Locale) -> String {
    let units = match locale {
        Locale::En => &UNITS_EN,
        Locale::Fa => &UNITS_FA,
    };
    if bytes == 0 {
        return format!("{} {}", locale.localize_digits("0"), units[0]);
    }

    let mut value = bytes as f64;
    let mut idx = 0;
    while value >= 1024.0 && idx < units.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }

    let number = if value >= 10.0 || value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    };
    format!("{} {}", locale.localize_digits(&number), units[idx])
}

/// Split a duration into whole days and zero-padded hours, minutes and
/// seconds. Negative input clamps to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dhms {
    pub days: u64,
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

pub fn seconds_to_dhms(secs: i64) -> Dhms {
    let s = secs.max(0).unsigned_abs();
    Dhms {
        days: s / 86_400,
        hours: format!("{:02}", (s % 86_400) / 3600),
        minutes: format!("{:02}", (s % 3600) / 60),
        seconds: format!("{:02}", s % 60),
    }
}

/// `"<d><suffix>"` when at least a day remains, `"HH:MM"` otherwise.
pub fn format_duration_compact(secs: i64, days_short: &str) -> String {
    let dhms = seconds_to_dhms(secs);
    if dhms.days > 0 {
        format!("{}{days_short}", dhms.days)
    } else {
        format!("{}:{}", dhms.hours, dhms.minutes)
    }
}
