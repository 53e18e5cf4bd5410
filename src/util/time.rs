use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Builds the fixed offset of the site's clock from minutes east of UTC.
pub fn site_offset(offset_minutes: i32) -> Result<FixedOffset> {
    if offset_minutes.abs() >= 1440 {
        return Err(anyhow!(
            "Timezone offset must be strictly between -1440 and 1440 minutes: {offset_minutes}"
        ));
    }
    FixedOffset::east_opt(offset_minutes * 60)
        .ok_or_else(|| anyhow!("Invalid timezone offset: {offset_minutes}"))
}

/// Returns the half-open range `[start, end)` in epoch milliseconds covering
/// the given calendar month in the site's timezone.
///
/// # Errors
///
/// Fails when the month is outside 1..=12, the year is out of chrono's range,
/// or the offset is out of range.
pub fn month_range(year: i32, month: u32, offset_minutes: i32) -> Result<(i64, i64)> {
    let offset = site_offset(offset_minutes)?;

    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow!("Invalid archive month: {year}-{month}"))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| anyhow!("Invalid archive month: {year}-{month}"))?;

    let to_millis = |date: NaiveDate| -> Result<i64> {
        offset
            .from_local_datetime(&date.and_time(Default::default()))
            .earliest()
            .map(|dt| dt.timestamp_millis())
            .ok_or_else(|| anyhow!("Invalid datetime conversion"))
    };

    Ok((to_millis(start)?, to_millis(end)?))
}

/// Converts epoch milliseconds to the site's local time.
pub fn to_local(timestamp: i64, offset_minutes: i32) -> Option<DateTime<FixedOffset>> {
    let offset = site_offset(offset_minutes).ok()?;
    DateTime::from_timestamp_millis(timestamp).map(|dt| dt.with_timezone(&offset))
}

pub fn format_timestamp(timestamp: i64, offset_minutes: i32, fmt: &str) -> String {
    to_local(timestamp, offset_minutes)
        .map(|dt| dt.format(fmt).to_string())
        .unwrap_or_default()
}
