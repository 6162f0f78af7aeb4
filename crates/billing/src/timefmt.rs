//! Epoch timestamp formatting for API responses
//!
//! Stripe reports timestamps as unix epochs. The admin UI wants plain
//! `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DD` strings in UTC, with absent
//! timestamps rendered as null. A zero epoch counts as absent: Stripe uses
//! it for fields that were never set, and "1970-01-01" in a billing view is
//! always wrong.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn from_epoch(epoch: Option<i64>) -> Option<OffsetDateTime> {
    let ts = epoch.filter(|&ts| ts != 0)?;
    OffsetDateTime::from_unix_timestamp(ts).ok()
}

/// Format an optional epoch as `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn datetime_string(epoch: Option<i64>) -> Option<String> {
    from_epoch(epoch)?.format(DATETIME_FORMAT).ok()
}

/// Format an optional epoch as `YYYY-MM-DD` (UTC)
pub fn date_string(epoch: Option<i64>) -> Option<String> {
    from_epoch(epoch)?.format(DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_string() {
        // 2024-03-01 12:30:45 UTC
        assert_eq!(
            datetime_string(Some(1_709_296_245)),
            Some("2024-03-01 12:30:45".to_string())
        );
    }

    #[test]
    fn test_date_string() {
        assert_eq!(date_string(Some(1_709_296_245)), Some("2024-03-01".to_string()));
    }

    #[test]
    fn test_none_formats_to_none() {
        assert_eq!(datetime_string(None), None);
        assert_eq!(date_string(None), None);
    }

    #[test]
    fn test_zero_epoch_formats_to_none() {
        assert_eq!(datetime_string(Some(0)), None);
        assert_eq!(date_string(Some(0)), None);
    }

    #[test]
    fn test_out_of_range_epoch_formats_to_none() {
        assert_eq!(datetime_string(Some(i64::MAX)), None);
        assert_eq!(date_string(Some(i64::MIN)), None);
    }
}
