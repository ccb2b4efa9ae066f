//! Parsing and display of the date-like strings carried by execution records.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Parse the date formats the execution backend is known to emit.
///
/// Values without an explicit offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(dt);
    }

    let naive = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ];
    for fmt in naive {
        if let Ok(dt) = PrimitiveDateTime::parse(s, fmt) {
            return Some(dt.assume_utc());
        }
    }

    let date_only = format_description!("[year]-[month]-[day]");
    if let Ok(d) = Date::parse(s, date_only) {
        return Some(d.midnight().assume_utc());
    }
    None
}

/// Parse the `YYYY-MM-DD_HH-MM-SS-mmm` stamps used in backend object keys.
fn parse_underscore_stamp(s: &str) -> Option<OffsetDateTime> {
    let fmt = format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]-[subsecond]");
    PrimitiveDateTime::parse(s.trim(), fmt)
        .ok()
        .map(|dt| dt.assume_utc())
}

/// Milliseconds since the epoch used to order records; unparseable values sort as epoch 0.
pub fn recency_millis(s: Option<&str>) -> i128 {
    s.and_then(|v| parse_timestamp(v).or_else(|| parse_underscore_stamp(v)))
        .map(|dt| dt.unix_timestamp_nanos() / 1_000_000)
        .unwrap_or(0)
}

/// Render a timestamp for display.
///
/// ISO-8601 values are shown in local time; anything else is passed through with
/// underscores replaced by spaces.
pub fn format_timestamp(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    match parse_timestamp(s) {
        Some(dt) => {
            let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
            let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
            dt.to_offset(offset)
                .format(fmt)
                .unwrap_or_else(|_| s.replace('_', " "))
        }
        None => s.replace('_', " "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_timestamps_render_non_empty() {
        let out = format_timestamp("2025-09-26T06:24:48.215Z");
        assert!(!out.is_empty());
        assert!(out.starts_with("2025-09-2"));
    }

    #[test]
    fn non_iso_timestamps_replace_underscores() {
        assert_eq!(
            format_timestamp("2025-09-26_06-24-48-214"),
            "2025-09-26 06-24-48-214"
        );
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp(""), "");
    }

    #[test]
    fn parses_offsetless_and_date_only_values() {
        assert!(parse_timestamp("2025-09-27T10:00:00").is_some());
        assert!(parse_timestamp("2025-09-27T10:00:00.123").is_some());
        assert!(parse_timestamp("2025-09-27").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn recency_orders_and_defaults_to_epoch() {
        let a = recency_millis(Some("2025-09-25T10:00:00Z"));
        let b = recency_millis(Some("2025-09-28T10:00:00Z"));
        assert!(b > a);
        assert!(recency_millis(Some("2025-09-26_06-24-48-214")) > 0);
        assert_eq!(recency_millis(Some("garbage")), 0);
        assert_eq!(recency_millis(None), 0);
    }
}
