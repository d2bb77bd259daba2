//! Timestamp wire format
//!
//! Every date/time value that reaches the serializer is rendered as naive
//! local time with fixed-width microsecond precision and no timezone suffix:
//! `2025-01-08T10:30:45.123456`.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// strftime pattern for the `logged_at` field and date/time values
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.6f";

/// Capture the current instant as naive local time
#[must_use]
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Convert any zoned instant to the naive local representation
#[must_use]
pub fn to_local_naive<Tz: TimeZone>(datetime: &DateTime<Tz>) -> NaiveDateTime {
    datetime.with_timezone(&Local).naive_local()
}

#[must_use]
pub fn format_timestamp(datetime: &NaiveDateTime) -> String {
    datetime.format(TIMESTAMP_FORMAT).to_string()
}

#[must_use]
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[must_use]
pub fn format_time(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parse a string produced by [`format_timestamp`]
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
}
