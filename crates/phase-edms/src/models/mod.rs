//! Data models for documents, revisions and reviews

mod distribution_list;
mod document;
mod filter;
mod import;
mod review;
mod revision;
mod transmittal;
mod user;

pub use distribution_list::*;
pub use document::*;
pub use filter::*;
pub use import::*;
pub use review::*;
pub use revision::*;
pub use transmittal::*;
pub use user::*;

#[cfg(test)]
pub(crate) use revision::fixtures;

use chrono::{DateTime, NaiveDate, Utc};

/// Revision class whose reviews run on the shortened schedule
pub const PRIORITARY_KLASS: i64 = 1;

/// Storage format of calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a stored date column
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Parse an optional stored date column
pub fn parse_opt_date(value: Option<String>) -> Option<NaiveDate> {
    value.as_deref().and_then(parse_date)
}

/// Format a date for storage
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored RFC 3339 or SQLite `datetime('now')` timestamp
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|naive| naive.and_utc())
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_round_trip_format() {
        let date = NaiveDate::from_ymd_opt(2014, 3, 7).unwrap();
        assert_eq!(format_date(date), "2014-03-07");
        assert_eq!(parse_date("2014-03-07"), Some(date));
        assert_eq!(parse_date("07/03/2014"), None);
    }

    #[test]
    fn test_parse_sqlite_timestamp() {
        let ts = parse_timestamp("2014-03-07 10:11:12").unwrap();
        assert_eq!(ts.format("%H:%M").to_string(), "10:11");
        assert!(parse_timestamp("2014-03-07T10:11:12+01:00").is_some());
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
