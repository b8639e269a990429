//! Configuration management for calendar-mcp.
//!
//! Handles loading configuration from TOML files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CALENDAR_MCP_CONFIG";

/// Config file looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".calendar-mcp.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity reported to clients
    pub server: ServerConfig,

    /// Stdio transport settings
    pub transport: TransportConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Calendar store settings
    pub calendar: CalendarConfig,
}

/// Server identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`
    pub name: String,

    /// Version reported in `serverInfo`
    pub version: String,

    /// MCP protocol revision reported by `initialize`
    pub protocol_version: String,
}

/// Stdio transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Bytes requested per stdin read
    pub read_chunk_size: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info", "calendar_mcp=debug")
    pub level: String,
}

/// Calendar access state before any tool runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// Access already granted
    Authorized,
    /// Access refused; every tool reports the denial
    Denied,
    /// Ask once, on the first tool call
    NotDetermined,
}

/// Kind of calendar, shown as its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalendarKind {
    /// Stored on this machine
    Local,
    /// CalDAV account
    Caldav,
    /// Exchange account
    Exchange,
    /// Subscribed feed
    Subscription,
    /// Contacts' birthdays
    Birthday,
}

impl CalendarKind {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            CalendarKind::Local => "Local",
            CalendarKind::Caldav => "CalDAV",
            CalendarKind::Exchange => "Exchange",
            CalendarKind::Subscription => "Subscription",
            CalendarKind::Birthday => "Birthday",
        }
    }
}

/// Calendar store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Initial access state
    pub access: AccessMode,

    /// Outcome of the permission request when access is not determined
    pub grant_on_request: bool,

    /// Calendar used when a request names none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_calendar: Option<String>,

    /// Calendars available at startup
    pub calendars: Vec<CalendarEntry>,
}

/// One calendar defined in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEntry {
    /// Unique identifier
    pub id: String,

    /// Display title
    pub title: String,

    /// Calendar kind
    #[serde(default = "default_kind")]
    pub kind: CalendarKind,

    /// Account the calendar belongs to
    #[serde(default = "default_source")]
    pub source: String,

    /// Color in `#rrggbb` form
    #[serde(default = "default_color")]
    pub color: String,

    /// Whether events may be added, changed, or removed
    #[serde(default = "default_writable")]
    pub writable: bool,
}

fn default_kind() -> CalendarKind {
    CalendarKind::Local
}

fn default_source() -> String {
    "On My Computer".to_string()
}

fn default_color() -> String {
    "#1badf8".to_string()
}

fn default_writable() -> bool {
    true
}

impl CalendarEntry {
    /// Create a writable local calendar.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: default_kind(),
            source: default_source(),
            color: default_color(),
            writable: default_writable(),
        }
    }

    /// Set the kind and source account.
    pub fn with_kind(mut self, kind: CalendarKind, source: impl Into<String>) -> Self {
        self.kind = kind;
        self.source = source.into();
        self
    }

    /// Set the color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Mark the calendar read-only.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Color as 8-bit RGB components.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        parse_hex_color(&self.color)
    }
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

impl Config {
    /// Load configuration.
    ///
    /// Looks for config in:
    /// 1. `explicit` (the `--config` flag), then `$CALENDAR_MCP_CONFIG`
    /// 2. `.calendar-mcp.toml` in current directory
    /// 3. `~/.config/calendar-mcp/config.toml`
    /// 4. Falls back to defaults
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match Self::resolve_path(explicit) {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// The config file [`load`](Self::load) would read, if any.
    ///
    /// Explicit paths are returned even when missing so loading reports the
    /// error instead of silently using defaults.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        Self::config_dir().map(|dir| dir.join("config.toml")).filter(|path| path.exists())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate().with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.transport.read_chunk_size == 0 {
            bail!("transport.read_chunk_size must be greater than 0");
        }

        let mut seen = HashSet::new();
        for calendar in &self.calendar.calendars {
            if !seen.insert(calendar.id.as_str()) {
                bail!("duplicate calendar id '{}'", calendar.id);
            }
            if calendar.rgb().is_none() {
                bail!("calendar '{}' has invalid color '{}'", calendar.id, calendar.color);
            }
        }

        if let Some(default) = &self.calendar.default_calendar {
            if !seen.contains(default.as_str()) {
                bail!("default_calendar '{default}' does not name a configured calendar");
            }
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("calendar-mcp"))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "calendar-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: crate::mcp::DEFAULT_PROTOCOL_VERSION.to_string(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { read_chunk_size: crate::mcp::DEFAULT_READ_CHUNK_SIZE }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            access: AccessMode::Authorized,
            grant_on_request: true,
            default_calendar: Some("personal".to_string()),
            calendars: vec![
                CalendarEntry::new("personal", "Personal"),
                CalendarEntry::new("work", "Work")
                    .with_kind(CalendarKind::Caldav, "iCloud")
                    .with_color("#cc73e1"),
                CalendarEntry::new("holidays", "Holidays")
                    .with_kind(CalendarKind::Subscription, "Subscribed Calendars")
                    .with_color("#63da38")
                    .read_only(),
            ],
        }
    }
}
