//! calendar-mcp - calendar tools over the Model Context Protocol.
//!
//! Runs a JSON-RPC 2.0 server on stdin/stdout. Logs go to stderr so they
//! never interleave with protocol traffic.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use calendar_mcp::core::{Config, CONFIG_ENV};
use calendar_mcp::mcp::{format_tool, run_stdio};
use calendar_mcp::{calendar, APP_NAME};

/// Calendar tools for AI assistants over MCP
#[derive(Parser)]
#[command(name = "calendar-mcp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default lookup
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP on stdin/stdout (default)
    Serve,

    /// List the tools the server advertises
    Tools {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show configuration
    Config {
        /// Show the config file path instead of its contents
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Timestamps as RFC 3339 UTC with milliseconds.
struct IsoTime;

impl FormatTime for IsoTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

fn init_logging(verbose: bool, level: &str) {
    let fallback = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false).with_timer(IsoTime))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref());
    let level = config.as_ref().map_or("info", |c| c.logging.level.as_str());
    init_logging(cli.verbose, level);
    let config = config?;

    match cli.command {
        None | Some(Commands::Serve) => cmd_serve(&config),
        Some(Commands::Tools { format }) => cmd_tools(&format),
        Some(Commands::Config { path }) => cmd_config(&config, cli.config.as_deref(), path),
        Some(Commands::Completions { shell }) => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Run the stdio server until stdin closes.
fn cmd_serve(config: &Config) -> Result<()> {
    let dispatcher = calendar::dispatcher(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

    let stats = runtime.block_on(run_stdio(dispatcher, config.transport.read_chunk_size))?;
    tracing::debug!(bytes = stats.bytes_read, frames = stats.frames, "session finished");
    Ok(())
}

/// Print the tool catalogue.
fn cmd_tools(format: &str) -> Result<()> {
    let tools = calendar::catalogue::tools();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        "text" => {
            println!("{} tool(s):\n", tools.len());
            for tool in &tools {
                println!("{}\n", format_tool(tool));
            }
        }
        other => anyhow::bail!("Unsupported format: {other}. Supported: text, json"),
    }
    Ok(())
}

/// Show configuration or where it comes from.
fn cmd_config(config: &Config, explicit: Option<&Path>, show_path: bool) -> Result<()> {
    if show_path {
        match Config::resolve_path(explicit) {
            Some(path) => println!("{}", path.display()),
            None => println!("(built-in defaults)"),
        }
        return Ok(());
    }

    print!("{}", config.to_toml()?);
    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}
