// =============================================================================
// Market Session Calendar: IST clock and previous-trading-day lookup
// =============================================================================
//
// The exchange runs on Indian Standard Time (UTC+05:30, no DST). Weekends are
// the only non-trading days modelled; exchange holidays are not.
// =============================================================================

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc, Weekday};

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Regular session open/close, used for the historical OI window.
pub const SESSION_OPEN: &str = "09:15";
pub const SESSION_CLOSE: &str = "15:30";

pub fn ist_offset() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub fn ist_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&ist_offset())
}

/// `YYYY-MM-DD HH:MM:SS IST`, the format every endpoint reports.
pub fn format_ist(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M:%S IST").to_string()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Nearest weekday strictly before `today`.
pub fn previous_trading_day(today: NaiveDate) -> NaiveDate {
    let mut day = today - Duration::days(1);
    while is_weekend(day) {
        day -= Duration::days(1);
    }
    day
}

/// `(from, to)` strings covering the regular session of `day`.
pub fn session_window(day: NaiveDate) -> (String, String) {
    let date = day.format("%Y-%m-%d");
    (
        format!("{date} {SESSION_OPEN}"),
        format!("{date} {SESSION_CLOSE}"),
    )
}
