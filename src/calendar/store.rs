//! In-memory calendar and event store.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use super::dates;
use super::recurrence::RecurrenceRule;
use crate::core::{CalendarConfig, CalendarKind};

/// Calendar store errors. The messages are shown to tool callers as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Calendar with ID '{0}' not found")]
    CalendarNotFound(String),

    #[error("Event with ID '{0}' not found")]
    EventNotFound(String),

    /// Carries the calendar title.
    #[error("Calendar '{0}' does not allow modifications")]
    ReadOnlyCalendar(String),

    #[error("No default calendar available")]
    NoDefaultCalendar,
}

/// A calendar events can belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    pub id: String,
    pub title: String,
    pub kind: CalendarKind,
    pub source: String,
    /// RGB components; `None` when the configured color does not parse
    pub color: Option<(u8, u8, u8)>,
    pub writable: bool,
}

/// A stored event. Recurring events are stored once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub calendar_id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub all_day: bool,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub recurrence: Option<RecurrenceRule>,
    pub created: NaiveDateTime,
    pub last_modified: NaiveDateTime,
}

/// Fields for a new event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub all_day: bool,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub recurrence: Option<RecurrenceRule>,
}

/// One concrete instance of an event within a queried range.
#[derive(Debug, Clone, Copy)]
pub struct Occurrence<'a> {
    pub event: &'a Event,
    pub calendar: &'a Calendar,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Calendars and their events, held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct CalendarStore {
    calendars: Vec<Calendar>,
    default_calendar: Option<String>,
    events: HashMap<String, Event>,
}

impl CalendarStore {
    /// Create a store with the given calendars and no events.
    pub fn new(calendars: Vec<Calendar>, default_calendar: Option<String>) -> Self {
        Self { calendars, default_calendar, events: HashMap::new() }
    }

    /// Build the calendars described by configuration.
    pub fn from_config(config: &CalendarConfig) -> Self {
        let calendars = config
            .calendars
            .iter()
            .map(|entry| Calendar {
                id: entry.id.clone(),
                title: entry.title.clone(),
                kind: entry.kind,
                source: entry.source.clone(),
                color: entry.rgb(),
                writable: entry.writable,
            })
            .collect();
        Self::new(calendars, config.default_calendar.clone())
    }

    /// All calendars, in configuration order.
    pub fn calendars(&self) -> &[Calendar] {
        &self.calendars
    }

    /// Look up a calendar.
    pub fn calendar(&self, id: &str) -> Result<&Calendar, StoreError> {
        self.calendars
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::CalendarNotFound(id.to_string()))
    }

    /// The calendar new events go to when none is named.
    pub fn default_calendar(&self) -> Result<&Calendar, StoreError> {
        let id = self.default_calendar.as_deref().ok_or(StoreError::NoDefaultCalendar)?;
        self.calendar(id).map_err(|_| StoreError::NoDefaultCalendar)
    }

    /// The calendar a new event should be written to.
    pub fn target_calendar(&self, id: Option<&str>) -> Result<&Calendar, StoreError> {
        let calendar = match id {
            Some(id) => self.calendar(id)?,
            None => self.default_calendar()?,
        };
        ensure_writable(calendar)?;
        Ok(calendar)
    }

    /// Add an event to a calendar and return it.
    pub fn insert(&mut self, calendar_id: &str, new: NewEvent) -> Result<&Event, StoreError> {
        ensure_writable(self.calendar(calendar_id)?)?;

        let now = dates::now();
        let event = Event {
            id: uuid::Uuid::new_v4().to_string().to_uppercase(),
            calendar_id: calendar_id.to_string(),
            title: new.title,
            start: new.start,
            end: new.end,
            all_day: new.all_day,
            location: new.location,
            notes: new.notes,
            recurrence: new.recurrence,
            created: now,
            last_modified: now,
        };
        let id = event.id.clone();
        Ok(self.events.entry(id).or_insert(event))
    }

    /// Look up an event.
    pub fn event(&self, id: &str) -> Result<&Event, StoreError> {
        self.events.get(id).ok_or_else(|| StoreError::EventNotFound(id.to_string()))
    }

    /// The calendar an event belongs to.
    pub fn calendar_of(&self, event: &Event) -> Result<&Calendar, StoreError> {
        self.calendar(&event.calendar_id)
    }

    /// Look up an event that may be changed.
    pub fn editable_event(&self, id: &str) -> Result<&Event, StoreError> {
        let event = self.event(id)?;
        ensure_writable(self.calendar_of(event)?)?;
        Ok(event)
    }

    /// Replace a stored event with an edited copy.
    pub fn replace(&mut self, mut event: Event) -> Result<&Event, StoreError> {
        let current = self.editable_event(&event.id)?;
        event.calendar_id.clone_from(&current.calendar_id);
        event.created = current.created;
        event.last_modified = dates::now();

        let id = event.id.clone();
        self.events.insert(id.clone(), event);
        self.event(&id)
    }

    /// Remove an event and return it.
    pub fn remove(&mut self, id: &str) -> Result<Event, StoreError> {
        self.editable_event(id)?;
        self.events.remove(id).ok_or_else(|| StoreError::EventNotFound(id.to_string()))
    }

    /// Every occurrence overlapping `[from, to]`, sorted by start.
    ///
    /// With `calendar_id`, only that calendar is searched.
    pub fn occurrences(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        calendar_id: Option<&str>,
    ) -> Vec<Occurrence<'_>> {
        let mut found = Vec::new();
        for event in self.events.values() {
            if calendar_id.is_some_and(|id| id != event.calendar_id) {
                continue;
            }
            let Ok(calendar) = self.calendar_of(event) else {
                continue;
            };

            let duration = event.end - event.start;
            let starts = match &event.recurrence {
                Some(rule) => rule.occurrence_starts(event.start, to),
                None => vec![event.start],
            };
            for start in starts {
                let Some(end) = start.checked_add_signed(duration) else {
                    continue;
                };
                if start <= to && end >= from {
                    found.push(Occurrence { event, calendar, start, end });
                }
            }
        }
        found.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.event.title.cmp(&b.event.title)));
        found
    }

    /// Number of stored events (recurring events count once).
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are stored.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn ensure_writable(calendar: &Calendar) -> Result<(), StoreError> {
    if calendar.writable {
        Ok(())
    } else {
        Err(StoreError::ReadOnlyCalendar(calendar.title.clone()))
    }
}
