//! Recurrence rules and occurrence expansion.
//!
//! A rule repeats an event every `interval` days, weeks, months, or years,
//! optionally narrowed to certain weekdays, days of the month, or months, and
//! optionally ended by a date or an occurrence count. The event's own start is
//! always the first occurrence.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, Weekday};
use serde_json::{Map, Value};

use super::dates::{self, format_display};

/// Upper bound on periods walked while expanding one rule.
pub const MAX_PERIODS: u64 = 10_000;

/// How often a rule repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Parse a frequency name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            "yearly" => Some(Frequency::Yearly),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
        }
    }
}

/// When a rule stops producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceEnd {
    /// No occurrence starts after this day.
    Until(NaiveDate),
    /// Total occurrences, the first one included.
    Count(u32),
}

/// Why recurrence arguments were rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecurrenceError {
    #[error("unknown recurrence frequency")]
    Frequency,

    #[error("recurrence interval must be at least 1")]
    Interval,

    #[error("recurrence end date must be YYYY-MM-DD")]
    EndDate,

    #[error("recurrence count must be at least 1")]
    Count,
}

/// A repeat rule attached to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub end: Option<RecurrenceEnd>,
    pub weekdays: Vec<Weekday>,
    pub days_of_month: Vec<u32>,
    pub months: Vec<u32>,
}

impl RecurrenceRule {
    /// A rule repeating every period, forever.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            end: None,
            weekdays: Vec::new(),
            days_of_month: Vec::new(),
            months: Vec::new(),
        }
    }

    /// Read a rule from tool arguments.
    ///
    /// `Ok(None)` when `recurrenceFrequency` is absent. Weekday names that do
    /// not parse, days outside 1-31, and months outside 1-12 are dropped.
    pub fn from_arguments(args: &Map<String, Value>) -> Result<Option<Self>, RecurrenceError> {
        let Some(frequency) = args.get("recurrenceFrequency") else {
            return Ok(None);
        };
        let frequency =
            frequency.as_str().and_then(Frequency::parse).ok_or(RecurrenceError::Frequency)?;

        let interval = match args.get("recurrenceInterval").and_then(Value::as_i64) {
            None => 1,
            Some(n) => u32::try_from(n).ok().filter(|&n| n >= 1).ok_or(RecurrenceError::Interval)?,
        };

        let end = if let Some(until) = args.get("recurrenceEndDate").and_then(Value::as_str) {
            Some(RecurrenceEnd::Until(dates::parse_date(until).ok_or(RecurrenceError::EndDate)?))
        } else if let Some(count) = args.get("recurrenceCount").and_then(Value::as_i64) {
            let count = u32::try_from(count).ok().filter(|&n| n >= 1).ok_or(RecurrenceError::Count)?;
            Some(RecurrenceEnd::Count(count))
        } else {
            None
        };

        let mut weekdays: Vec<Weekday> =
            strings(args, "recurrenceWeekdays").filter_map(parse_weekday).collect();
        weekdays.sort_by_key(|day| day.num_days_from_sunday());
        weekdays.dedup();

        Ok(Some(Self {
            frequency,
            interval,
            end,
            weekdays,
            days_of_month: sorted_in_range(args, "recurrenceDaysOfMonth", 1..=31),
            months: sorted_in_range(args, "recurrenceMonths", 1..=12),
        }))
    }

    /// Human-readable summary, e.g. `Weekly every 2 until Mar 1, 2024 at 12:00 AM`.
    pub fn describe(&self) -> String {
        let mut text = self.frequency.label().to_string();
        if self.interval > 1 {
            text.push_str(&format!(" every {}", self.interval));
        }
        if let Some(RecurrenceEnd::Until(date)) = self.end {
            text.push_str(&format!(" until {}", format_display(dates::start_of_day(date))));
        }
        text
    }

    /// Start times of every occurrence beginning no later than `horizon`,
    /// in order, starting with `first`.
    pub fn occurrence_starts(&self, first: NaiveDateTime, horizon: NaiveDateTime) -> Vec<NaiveDateTime> {
        let mut starts = Vec::new();
        if first > horizon {
            return starts;
        }
        starts.push(first);

        let mut last_date = horizon.date();
        if let Some(RecurrenceEnd::Until(until)) = self.end {
            last_date = last_date.min(until);
        }
        let max_count = match self.end {
            Some(RecurrenceEnd::Count(n)) => n as usize,
            _ => usize::MAX,
        };

        let anchor = first.date();
        'periods: for k in 0..MAX_PERIODS {
            if starts.len() >= max_count {
                break;
            }
            let Some((period_start, candidates)) = self.period(anchor, k) else {
                break;
            };
            if period_start > last_date {
                break;
            }
            for date in candidates {
                if date <= anchor {
                    continue;
                }
                if date > last_date || starts.len() >= max_count {
                    break 'periods;
                }
                starts.push(date.and_time(first.time()));
            }
        }

        starts.retain(|start| *start <= horizon);
        starts
    }

    /// First day of the `k`th period after the anchor's, and the candidate
    /// dates in it, ascending. `None` once dates overflow.
    fn period(&self, anchor: NaiveDate, k: u64) -> Option<(NaiveDate, Vec<NaiveDate>)> {
        let step = k.checked_mul(u64::from(self.interval))?;
        match self.frequency {
            Frequency::Daily => {
                let date = anchor.checked_add_days(Days::new(step))?;
                let keep = self.month_allowed(date)
                    && (self.weekdays.is_empty() || self.weekdays.contains(&date.weekday()))
                    && (self.days_of_month.is_empty() || self.days_of_month.contains(&date.day()));
                Some((date, if keep { vec![date] } else { Vec::new() }))
            }
            Frequency::Weekly => {
                let week_start = anchor
                    .checked_sub_days(Days::new(u64::from(anchor.weekday().num_days_from_sunday())))?
                    .checked_add_days(Days::new(step.checked_mul(7)?))?;
                let mut days: Vec<NaiveDate> = if self.weekdays.is_empty() {
                    vec![anchor.weekday()]
                } else {
                    self.weekdays.clone()
                }
                .into_iter()
                .filter_map(|wd| week_start.checked_add_days(Days::new(u64::from(wd.num_days_from_sunday()))))
                .filter(|date| self.month_allowed(*date))
                .collect();
                days.sort_unstable();
                Some((week_start, days))
            }
            Frequency::Monthly => {
                let month_start = first_of_month(anchor)?
                    .checked_add_months(Months::new(u32::try_from(step).ok()?))?;
                let days = if self.month_allowed(month_start) {
                    self.days_in_month(month_start, anchor.day())
                } else {
                    Vec::new()
                };
                Some((month_start, days))
            }
            Frequency::Yearly => {
                let year = anchor.year().checked_add(i32::try_from(step).ok()?)?;
                let year_start = NaiveDate::from_ymd_opt(year, 1, 1)?;
                let months =
                    if self.months.is_empty() { vec![anchor.month()] } else { self.months.clone() };
                let mut days = Vec::new();
                for month in months {
                    let month_start = NaiveDate::from_ymd_opt(year, month, 1)?;
                    days.extend(self.days_in_month(month_start, anchor.day()));
                }
                Some((year_start, days))
            }
        }
    }

    /// Candidate days within one month: the listed days of the month, else
    /// every listed weekday, else `default_day` when the month has it.
    fn days_in_month(&self, month_start: NaiveDate, default_day: u32) -> Vec<NaiveDate> {
        let with_day = |day: u32| month_start.with_day(day);
        if !self.days_of_month.is_empty() {
            return self.days_of_month.iter().filter_map(|&d| with_day(d)).collect();
        }
        if !self.weekdays.is_empty() {
            return (1..=31)
                .filter_map(with_day)
                .filter(|date| self.weekdays.contains(&date.weekday()))
                .collect();
        }
        with_day(default_day).into_iter().collect()
    }

    fn month_allowed(&self, date: NaiveDate) -> bool {
        self.months.is_empty() || self.months.contains(&date.month())
    }
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name.to_ascii_lowercase().as_str() {
        "sunday" => Some(Weekday::Sun),
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        _ => None,
    }
}

fn strings<'a>(args: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a str> {
    args.get(key).and_then(Value::as_array).into_iter().flatten().filter_map(Value::as_str)
}

fn sorted_in_range(
    args: &Map<String, Value>,
    key: &str,
    range: std::ops::RangeInclusive<u32>,
) -> Vec<u32> {
    let mut values: Vec<u32> = args
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_i64)
        .filter_map(|n| u32::try_from(n).ok())
        .filter(|n| range.contains(n))
        .collect();
    values.sort_unstable();
    values.dedup();
    values
}
