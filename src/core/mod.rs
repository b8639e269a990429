//! Core types shared by the server and the calendar tools.
//!
//! Currently this is configuration: server identity, transport and logging
//! settings, and the calendars the store starts with.

mod config;

pub use config::{
    parse_hex_color, AccessMode, CalendarConfig, CalendarEntry, CalendarKind, Config,
    LoggingConfig, ServerConfig, TransportConfig, CONFIG_ENV, LOCAL_CONFIG_FILE,
};
