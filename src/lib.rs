//! # calendar-mcp
//!
//! Calendar tools for AI assistants, served over the Model Context Protocol.
//!
//! The server speaks JSON-RPC 2.0 on stdin/stdout. Messages may arrive with
//! `Content-Length` headers or as newline-delimited JSON, in chunks of any
//! size; every response is written as a single line.
//!
//! ## Features
//!
//! - **Framing**: Header and line framing on the same stream, with resync on corrupt headers
//! - **Tools**: List, create, read, update, delete, and search calendar events
//! - **Recurrence**: Daily, weekly, monthly, and yearly rules with an end date or count
//! - **Configuration**: Calendars and access state from TOML
//!
//! ## Quick Start
//!
//! ```bash
//! # Serve on stdio
//! calendar-mcp
//!
//! # Show the tool catalogue
//! calendar-mcp tools
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::use_self)]
#![allow(clippy::cast_possible_truncation)]

pub mod calendar;
pub mod core;
pub mod mcp;

pub use calendar::{CalendarExecutor, CalendarStore};
pub use core::Config;
pub use mcp::{Dispatcher, Server, ToolExecutor, ToolRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "calendar-mcp";
