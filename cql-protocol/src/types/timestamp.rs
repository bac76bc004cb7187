use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};

/// Default timestamp of a request, in microseconds since the Unix epoch.
#[inline]
pub fn micros_since_epoch(value: &DateTime<Utc>) -> i64 {
    value.timestamp_micros()
}

/// Current time as a request default timestamp.
#[inline]
pub fn now_micros() -> i64 {
    micros_since_epoch(&Utc::now())
}

/// `timestamp` column values are milliseconds since the Unix epoch.
#[inline]
pub fn millis_since_epoch(value: &DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

pub fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| Error::General(format!("Timestamp out of range: {millis}")))
}
