//! Calendar tool implementations.
//!
//! Each handler reads its arguments, works against the store, and returns
//! the text shown to the caller. Failures are text too.

use std::fmt::Write as _;

use chrono::{Months, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::debug;

use super::dates::{self, format_display, Boundary};
use super::recurrence::RecurrenceRule;
use super::store::{CalendarStore, NewEvent, StoreError};

const INVALID_EVENT_DATE: &str =
    "Use YYYY-MM-DD for all-day events or YYYY-MM-DD HH:MM for timed events";

const NOTES_SNIPPET_CHARS: usize = 100;

/// A tool call that could not be completed, rendered as its message.
#[derive(Debug, thiserror::Error)]
pub enum ToolFailure {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Message(String),
}

impl From<&str> for ToolFailure {
    fn from(message: &str) -> Self {
        ToolFailure::Message(message.to_string())
    }
}

type ToolResult = Result<String, ToolFailure>;

fn string<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn boolean(args: &Map<String, Value>, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// `calendar_list_events`
pub fn list_events(store: &CalendarStore, args: &Map<String, Value>) -> ToolResult {
    let (Some(start), Some(end)) = (string(args, "startDate"), string(args, "endDate")) else {
        return Err("Missing required date parameters".into());
    };
    let (Some(start), Some(end)) = (dates::parse_date(start), dates::parse_date(end)) else {
        return Err("Invalid date format. Use YYYY-MM-DD".into());
    };

    let from = dates::start_of_day(start);
    let to = if start == end { dates::end_of_day(end) } else { dates::start_of_day(end) };

    let occurrences = store.occurrences(from, to, None);
    if occurrences.is_empty() {
        return Ok("No events found in the specified date range".to_string());
    }

    let mut out = format!("Found {} event(s):\n\n", occurrences.len());
    for occurrence in &occurrences {
        let event = occurrence.event;
        let _ = writeln!(out, "• {}", event.title);
        let _ = writeln!(out, "  Start: {}", format_display(occurrence.start));
        let _ = writeln!(out, "  End: {}", format_display(occurrence.end));
        if let Some(location) = &event.location {
            let _ = writeln!(out, "  Location: {location}");
        }
        out.push('\n');
    }
    Ok(out)
}

/// `calendar_list_calendars`
pub fn list_calendars(store: &CalendarStore) -> ToolResult {
    let mut calendars: Vec<_> = store.calendars().iter().collect();
    if calendars.is_empty() {
        return Ok("No calendars found".to_string());
    }
    calendars.sort_by(|a, b| a.title.cmp(&b.title));

    let mut out = format!("Found {} calendar(s):\n\n", calendars.len());
    for calendar in calendars {
        let _ = writeln!(out, "• {}", calendar.title);
        let _ = writeln!(out, "  ID: {}", calendar.id);
        let _ = writeln!(out, "  Type: {}", calendar.kind.label());
        let _ = writeln!(out, "  Source: {}", calendar.source);
        if let Some((r, g, b)) = calendar.color {
            let _ = writeln!(out, "  Color: RGB({r}, {g}, {b})");
        }
        let _ = writeln!(out, "  Allows Events: {}", yes_no(calendar.writable));
        out.push('\n');
    }
    Ok(out)
}

/// `calendar_create_event`
pub fn create_event(store: &mut CalendarStore, args: &Map<String, Value>) -> ToolResult {
    let (Some(title), Some(start), Some(end)) =
        (string(args, "title"), string(args, "startDate"), string(args, "endDate"))
    else {
        return Err("Missing required parameters: title, startDate, endDate".into());
    };
    let all_day = boolean(args, "allDay").unwrap_or(false);

    let (Some(start), Some(end)) = (
        dates::parse_event_time(start, all_day, Boundary::Start),
        dates::parse_event_time(end, all_day, Boundary::End),
    ) else {
        return Err(ToolFailure::Message(format!("Invalid date format. {INVALID_EVENT_DATE}")));
    };
    if start >= end {
        return Err("Start date must be before end date".into());
    }

    let calendar = store.target_calendar(string(args, "calendarId"))?;
    let (calendar_id, calendar_title) = (calendar.id.clone(), calendar.title.clone());

    // A malformed rule creates a one-off event.
    let recurrence = RecurrenceRule::from_arguments(args).unwrap_or_else(|e| {
        debug!(error = %e, "ignoring recurrence arguments");
        None
    });
    let recurring = recurrence.is_some();

    let event = store.insert(
        &calendar_id,
        NewEvent {
            title: title.to_string(),
            start,
            end,
            all_day,
            location: string(args, "location").map(str::to_string),
            notes: string(args, "notes").map(str::to_string),
            recurrence,
        },
    )?;

    Ok(format!(
        "Event '{}' created successfully in calendar '{}'{}\nEvent ID: {}",
        title,
        calendar_title,
        if recurring { " (recurring)" } else { "" },
        event.id
    ))
}

/// `calendar_get_event`
pub fn get_event(store: &CalendarStore, args: &Map<String, Value>) -> ToolResult {
    let event_id = string(args, "eventId").ok_or("Missing required parameter: eventId")?;
    let event = store.event(event_id)?;
    let calendar = store.calendar_of(event)?;

    let mut out = String::from("Event Details:\n\n");
    let _ = writeln!(out, "• Title: {}", event.title);
    let _ = writeln!(out, "• Event ID: {}", event.id);
    let _ = writeln!(out, "• Start: {}", format_display(event.start));
    let _ = writeln!(out, "• End: {}", format_display(event.end));
    let _ = writeln!(out, "• All Day: {}", yes_no(event.all_day));
    let _ = writeln!(out, "• Calendar: {}", calendar.title);
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "• Location: {location}");
    }
    if let Some(notes) = event.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "• Notes: {notes}");
    }
    match &event.recurrence {
        Some(rule) => {
            out.push_str("• Recurring: Yes (1 rule(s))\n");
            let _ = writeln!(out, "  - {}", rule.describe());
        }
        None => out.push_str("• Recurring: No\n"),
    }
    let _ = writeln!(out, "• Created: {}", format_display(event.created));
    let _ = writeln!(out, "• Last Modified: {}", format_display(event.last_modified));
    Ok(out)
}

/// `calendar_update_event`
pub fn update_event(store: &mut CalendarStore, args: &Map<String, Value>) -> ToolResult {
    let event_id = string(args, "eventId").ok_or("Missing required parameter: eventId")?;
    let mut event = store.editable_event(event_id)?.clone();
    let mut changed = false;

    if let Some(title) = string(args, "title") {
        event.title = title.to_string();
        changed = true;
    }

    if let Some(start) = string(args, "startDate") {
        // The new all-day flag decides how the new start is read.
        if let Some(all_day) = boolean(args, "allDay") {
            event.all_day = all_day;
            changed = true;
        }
        event.start = dates::parse_event_time(start, event.all_day, Boundary::Start).ok_or_else(
            || ToolFailure::Message(format!("Invalid start date format. {INVALID_EVENT_DATE}")),
        )?;
        changed = true;
    }

    if let Some(end) = string(args, "endDate") {
        event.end = dates::parse_event_time(end, event.all_day, Boundary::End).ok_or_else(|| {
            ToolFailure::Message(format!("Invalid end date format. {INVALID_EVENT_DATE}"))
        })?;
        changed = true;
    }

    if event.start >= event.end {
        return Err("Start date must be before end date".into());
    }

    if let Some(location) = string(args, "location") {
        event.location = Some(location.to_string());
        changed = true;
    }

    if let Some(notes) = string(args, "notes") {
        event.notes = Some(notes.to_string());
        changed = true;
    }

    if !args.contains_key("startDate") {
        if let Some(all_day) = boolean(args, "allDay") {
            event.all_day = all_day;
            changed = true;
        }
    }

    if args.contains_key("recurrenceFrequency") {
        match RecurrenceRule::from_arguments(args) {
            Ok(Some(rule)) => {
                event.recurrence = Some(rule);
                changed = true;
            }
            Ok(None) | Err(_) => return Err("Invalid recurrence parameters".into()),
        }
    }

    if !changed {
        return Err("No changes specified. Provide at least one field to update: title, startDate, endDate, location, notes, allDay, or recurrence parameters".into());
    }

    let saved = store.replace(event)?;
    Ok(format!("Event '{}' updated successfully", saved.title))
}

/// `calendar_delete_event`
pub fn delete_event(store: &mut CalendarStore, args: &Map<String, Value>) -> ToolResult {
    let event_id = string(args, "eventId").ok_or("Missing required parameter: eventId")?;
    let removed = store.remove(event_id)?;
    Ok(format!("Event '{}' deleted successfully", removed.title))
}

/// `calendar_search_events`
pub fn search_events(
    store: &CalendarStore,
    args: &Map<String, Value>,
    now: NaiveDateTime,
) -> ToolResult {
    let query = string(args, "query").ok_or("Missing required parameter: query")?;
    if query.trim().is_empty() {
        return Err("Search query cannot be empty".into());
    }

    let (from, to) = match (string(args, "startDate"), string(args, "endDate")) {
        (Some(start), Some(end)) => {
            let (Some(start), Some(end)) = (dates::parse_date(start), dates::parse_date(end))
            else {
                return Err("Invalid date format. Use YYYY-MM-DD".into());
            };
            (dates::start_of_day(start), dates::end_of_day(end))
        }
        _ => (
            now.checked_sub_months(Months::new(12)).unwrap_or(now),
            now.checked_add_months(Months::new(12)).unwrap_or(now),
        ),
    };

    let calendar_id = match string(args, "calendarId") {
        Some(id) => Some(store.calendar(id)?.id.as_str()),
        None => None,
    };

    let needle = query.to_lowercase();
    let contains = |text: Option<&str>| text.is_some_and(|t| t.to_lowercase().contains(&needle));
    let matches: Vec<_> = store
        .occurrences(from, to, calendar_id)
        .into_iter()
        .filter(|o| {
            let event = o.event;
            contains(Some(event.title.as_str()))
                || contains(event.notes.as_deref())
                || contains(event.location.as_deref())
        })
        .collect();

    if matches.is_empty() {
        let range = if args.contains_key("startDate") {
            "in specified date range"
        } else {
            "in the past and next year"
        };
        return Ok(format!("No events found matching '{query}' {range}"));
    }

    let mut out = format!("Found {} event(s) matching '{}':\n\n", matches.len(), query);
    for occurrence in &matches {
        let event = occurrence.event;
        let _ = writeln!(out, "• {}", event.title);
        let _ = writeln!(out, "  ID: {}", event.id);
        let _ = writeln!(out, "  Start: {}", format_display(occurrence.start));
        let _ = writeln!(out, "  End: {}", format_display(occurrence.end));
        let _ = writeln!(out, "  Calendar: {}", occurrence.calendar.title);
        if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "  Location: {location}");
        }
        if let Some(notes) = event.notes.as_deref().filter(|&n| contains(Some(n))) {
            let snippet: String = notes.chars().take(NOTES_SNIPPET_CHARS).collect();
            let more = if notes.chars().count() > NOTES_SNIPPET_CHARS { "..." } else { "" };
            let _ = writeln!(out, "  Notes: {snippet}{more}");
        }
        out.push('\n');
    }
    Ok(out)
}
