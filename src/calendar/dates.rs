//! Date parsing and display for calendar tools.
//!
//! All times are floating wall-clock times with no zone attached.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Date-only input format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-and-time input format.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const DISPLAY_FORMAT: &str = "%b %-d, %Y at %-I:%M %p";

/// Which end of an event a date-only value stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Start of the day
    Start,
    /// Last second of the day
    End,
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, DATE_FORMAT).ok()
}

/// Parse an event start or end.
///
/// All-day events take a date only, at midnight. Timed events take
/// `YYYY-MM-DD HH:MM`, or a date only that snaps to the start or end of the
/// day depending on `boundary`.
pub fn parse_event_time(input: &str, all_day: bool, boundary: Boundary) -> Option<NaiveDateTime> {
    if all_day {
        return parse_date(input).map(start_of_day);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(input, DATE_TIME_FORMAT) {
        return Some(datetime);
    }
    let date = parse_date(input)?;
    Some(match boundary {
        Boundary::Start => start_of_day(date),
        Boundary::End => end_of_day(date),
    })
}

/// Midnight at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// 23:59:59 on `date`.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59).unwrap_or_else(|| start_of_day(date))
}

/// Render a time the way tool output shows it, e.g. `Jan 5, 2024 at 3:00 PM`.
pub fn format_display(datetime: NaiveDateTime) -> String {
    datetime.format(DISPLAY_FORMAT).to_string()
}

/// Current local wall-clock time, to the second.
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
