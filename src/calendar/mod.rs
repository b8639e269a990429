//! Calendar tools.
//!
//! [`CalendarExecutor`] is the [`ToolExecutor`] behind the seven
//! `calendar_*` tools. Calendars come from configuration; events live in
//! memory for the life of the process.
//!
//! ## Usage
//!
//! ```
//! use calendar_mcp::calendar::CalendarExecutor;
//! use calendar_mcp::core::CalendarConfig;
//! use calendar_mcp::mcp::ToolExecutor;
//! use serde_json::Map;
//!
//! # tokio_test::block_on(async {
//! let executor = CalendarExecutor::from_config(&CalendarConfig::default());
//! let text = executor.invoke("calendar_list_calendars", &Map::new()).await;
//! assert!(text.starts_with("Found 3 calendar(s):"));
//! # });
//! ```

mod access;
pub mod catalogue;
mod dates;
mod handlers;
mod recurrence;
mod store;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::{CalendarConfig, Config};
use crate::mcp::{Dispatcher, RegistryError, ServerInfo, ToolExecutor};

pub use access::{AccessGate, ConfiguredPrompt, PermissionPrompt, ACCESS_DENIED};
pub use dates::{format_display, parse_date, parse_event_time, Boundary};
pub use recurrence::{Frequency, RecurrenceEnd, RecurrenceError, RecurrenceRule};
pub use store::{Calendar, CalendarStore, Event, NewEvent, Occurrence, StoreError};

/// Runs calendar tools against an in-memory store.
#[derive(Debug)]
pub struct CalendarExecutor {
    store: Mutex<CalendarStore>,
    access: AccessGate,
}

impl CalendarExecutor {
    /// Create an executor over a store, guarded by an access gate.
    pub fn new(store: CalendarStore, access: AccessGate) -> Self {
        Self { store: Mutex::new(store), access }
    }

    /// Build the store and access gate described by configuration.
    pub fn from_config(config: &CalendarConfig) -> Self {
        Self::new(
            CalendarStore::from_config(config),
            AccessGate::new(config.access, Box::new(ConfiguredPrompt::new(config.grant_on_request))),
        )
    }

    /// Number of stored events.
    pub fn event_count(&self) -> usize {
        self.store.lock().len()
    }

    fn run(&self, tool: &str, arguments: &Map<String, Value>) -> String {
        let mut store = self.store.lock();
        let result = match tool {
            catalogue::LIST_EVENTS => handlers::list_events(&store, arguments),
            catalogue::LIST_CALENDARS => handlers::list_calendars(&store),
            catalogue::CREATE_EVENT => handlers::create_event(&mut store, arguments),
            catalogue::GET_EVENT => handlers::get_event(&store, arguments),
            catalogue::UPDATE_EVENT => handlers::update_event(&mut store, arguments),
            catalogue::DELETE_EVENT => handlers::delete_event(&mut store, arguments),
            catalogue::SEARCH_EVENTS => handlers::search_events(&store, arguments, dates::now()),
            other => return format!("Unknown tool: {other}"),
        };
        result.unwrap_or_else(|failure| {
            debug!(tool, %failure, "calendar tool failed");
            failure.to_string()
        })
    }
}

/// Wire the calendar catalogue and executor into a dispatcher.
pub fn dispatcher(config: &Config) -> Result<Dispatcher, RegistryError> {
    let registry = Arc::new(catalogue::registry()?);
    let executor = Arc::new(CalendarExecutor::from_config(&config.calendar));
    let info = ServerInfo { name: config.server.name.clone(), version: config.server.version.clone() };
    Ok(Dispatcher::new(registry, executor, info).with_protocol_version(&config.server.protocol_version))
}

#[async_trait]
impl ToolExecutor for CalendarExecutor {
    async fn invoke(&self, tool: &str, arguments: &Map<String, Value>) -> String {
        if let Err(denied) = self.access.check().await {
            return denied.to_string();
        }
        self.run(tool, arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AccessMode;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_denied_access_blocks_every_tool() {
        let config = CalendarConfig { access: AccessMode::Denied, ..CalendarConfig::default() };
        let executor = CalendarExecutor::from_config(&config);

        for tool in catalogue::tools() {
            assert_eq!(executor.invoke(&tool.name, &Map::new()).await, ACCESS_DENIED);
        }
    }

    #[tokio::test]
    async fn test_undetermined_access_uses_configured_answer() {
        let config = CalendarConfig {
            access: AccessMode::NotDetermined,
            grant_on_request: false,
            ..CalendarConfig::default()
        };
        let executor = CalendarExecutor::from_config(&config);
        assert_eq!(executor.invoke(catalogue::LIST_CALENDARS, &Map::new()).await, ACCESS_DENIED);

        let config = CalendarConfig { access: AccessMode::NotDetermined, ..CalendarConfig::default() };
        let executor = CalendarExecutor::from_config(&config);
        let text = executor.invoke(catalogue::LIST_CALENDARS, &Map::new()).await;
        assert!(text.starts_with("Found 3 calendar(s)"));
    }

    #[tokio::test]
    async fn test_unknown_tool_text() {
        let executor = CalendarExecutor::from_config(&CalendarConfig::default());
        assert_eq!(executor.invoke("calendar_nap", &Map::new()).await, "Unknown tool: calendar_nap");
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let executor = CalendarExecutor::from_config(&CalendarConfig::default());
        let created = executor
            .invoke(
                catalogue::CREATE_EVENT,
                &args(json!({
                    "title": "Dentist",
                    "startDate": "2024-06-03 09:30",
                    "endDate": "2024-06-03 10:15",
                    "location": "Main St"
                })),
            )
            .await;
        assert!(created.starts_with("Event 'Dentist' created successfully in calendar 'Personal'\nEvent ID: "));
        assert_eq!(executor.event_count(), 1);

        let id = created.rsplit("Event ID: ").next().unwrap();
        let details = executor.invoke(catalogue::GET_EVENT, &args(json!({"eventId": id}))).await;
        assert!(details.starts_with("Event Details:\n\n• Title: Dentist\n"));
        assert!(details.contains("• Start: Jun 3, 2024 at 9:30 AM\n"));
        assert!(details.contains("• End: Jun 3, 2024 at 10:15 AM\n"));
        assert!(details.contains("• Location: Main St\n"));
        assert!(details.contains("• Recurring: No\n"));
    }
}
