//! Descriptors for the calendar tools advertised by `tools/list`.

use crate::mcp::{RegistryError, SchemaBuilder, ToolDescriptor, ToolInputSchema, ToolRegistry};

pub const LIST_EVENTS: &str = "calendar_list_events";
pub const LIST_CALENDARS: &str = "calendar_list_calendars";
pub const CREATE_EVENT: &str = "calendar_create_event";
pub const GET_EVENT: &str = "calendar_get_event";
pub const UPDATE_EVENT: &str = "calendar_update_event";
pub const DELETE_EVENT: &str = "calendar_delete_event";
pub const SEARCH_EVENTS: &str = "calendar_search_events";

/// All calendar tools, in the order they are listed.
pub fn tools() -> Vec<ToolDescriptor> {
    vec![
        tool(
            LIST_EVENTS,
            "List calendar events within a date range",
            SchemaBuilder::new()
                .property("startDate", "string", "Start date (YYYY-MM-DD)")
                .property("endDate", "string", "End date (YYYY-MM-DD)")
                .required(&["startDate", "endDate"])
                .build(),
        ),
        tool(LIST_CALENDARS, "List all available calendars", SchemaBuilder::new().build()),
        tool(
            CREATE_EVENT,
            "Create a new calendar event",
            with_recurrence(
                SchemaBuilder::new()
                    .property("title", "string", "Event title")
                    .property(
                        "startDate",
                        "string",
                        "Start date and time (YYYY-MM-DD HH:MM or YYYY-MM-DD)",
                    )
                    .property("endDate", "string", "End date and time (YYYY-MM-DD HH:MM or YYYY-MM-DD)")
                    .property(
                        "calendarId",
                        "string",
                        "Calendar identifier (optional, uses default if not specified)",
                    )
                    .property("location", "string", "Event location (optional)")
                    .property("notes", "string", "Event notes/description (optional)")
                    .property(
                        "allDay",
                        "boolean",
                        "Whether this is an all-day event (optional, default: false)",
                    ),
            )
            .required(&["title", "startDate", "endDate"])
            .build(),
        ),
        tool(
            GET_EVENT,
            "Get detailed information about a specific event",
            event_id_only(),
        ),
        tool(
            UPDATE_EVENT,
            "Update an existing calendar event",
            with_recurrence(
                SchemaBuilder::new()
                    .property("eventId", "string", "Event identifier")
                    .property("title", "string", "Event title (optional)")
                    .property(
                        "startDate",
                        "string",
                        "Start date and time (YYYY-MM-DD HH:MM or YYYY-MM-DD, optional)",
                    )
                    .property(
                        "endDate",
                        "string",
                        "End date and time (YYYY-MM-DD HH:MM or YYYY-MM-DD, optional)",
                    )
                    .property("location", "string", "Event location (optional)")
                    .property("notes", "string", "Event notes/description (optional)")
                    .property("allDay", "boolean", "Whether this is an all-day event (optional)"),
            )
            .required(&["eventId"])
            .build(),
        ),
        tool(DELETE_EVENT, "Delete a calendar event", event_id_only()),
        tool(
            SEARCH_EVENTS,
            "Search for events by title or content",
            SchemaBuilder::new()
                .property("query", "string", "Search query to match against event titles and notes")
                .property("startDate", "string", "Start date for search range (YYYY-MM-DD, optional)")
                .property("endDate", "string", "End date for search range (YYYY-MM-DD, optional)")
                .property("calendarId", "string", "Calendar identifier to search within (optional)")
                .required(&["query"])
                .build(),
        ),
    ]
}

/// Registry holding [`tools`].
pub fn registry() -> Result<ToolRegistry, RegistryError> {
    ToolRegistry::from_tools(tools())
}

fn tool(name: &str, description: &str, input_schema: ToolInputSchema) -> ToolDescriptor {
    ToolDescriptor { name: name.to_string(), description: description.to_string(), input_schema }
}

fn event_id_only() -> ToolInputSchema {
    SchemaBuilder::new().property("eventId", "string", "Event identifier").required(&["eventId"]).build()
}

fn with_recurrence(schema: SchemaBuilder) -> SchemaBuilder {
    schema
        .property(
            "recurrenceFrequency",
            "string",
            "Recurrence frequency: daily, weekly, monthly, yearly (optional)",
        )
        .property("recurrenceInterval", "integer", "Repeat every N intervals (optional, default: 1)")
        .property("recurrenceEndDate", "string", "End date for recurrence (YYYY-MM-DD, optional)")
        .property("recurrenceCount", "integer", "Maximum number of occurrences (optional)")
        .array(
            "recurrenceWeekdays",
            "string",
            "Days of week for weekly/monthly recurrence: sunday, monday, tuesday, wednesday, thursday, friday, saturday (optional)",
        )
        .array(
            "recurrenceDaysOfMonth",
            "integer",
            "Days of month for monthly/yearly recurrence (1-31, optional)",
        )
        .array("recurrenceMonths", "integer", "Months for yearly recurrence (1-12, optional)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_names_and_order() {
        let names: Vec<_> = tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                LIST_EVENTS,
                LIST_CALENDARS,
                CREATE_EVENT,
                GET_EVENT,
                UPDATE_EVENT,
                DELETE_EVENT,
                SEARCH_EVENTS
            ]
        );
        assert_eq!(registry().unwrap().len(), 7);
    }

    #[test]
    fn test_create_event_schema() {
        let create = tools().into_iter().find(|t| t.name == CREATE_EVENT).unwrap();
        let schema = &create.input_schema;
        assert_eq!(schema.required, vec!["title", "startDate", "endDate"]);
        assert_eq!(schema.properties.len(), 14);
        assert_eq!(schema.properties["allDay"]["type"], "boolean");
        assert_eq!(schema.properties["recurrenceMonths"]["items"]["type"], "integer");
    }

    #[test]
    fn test_list_calendars_takes_no_arguments() {
        let list = tools().into_iter().find(|t| t.name == LIST_CALENDARS).unwrap();
        let value = serde_json::to_value(&list.input_schema).unwrap();
        assert_eq!(value, serde_json::json!({"type": "object", "properties": {}, "required": []}));
    }
}
