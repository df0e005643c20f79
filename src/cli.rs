//! Command line parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

/// MCP server for OmniFocus
#[derive(Parser, Debug, Clone)]
#[command(
    name = "omnifocus-mcp",
    about = "MCP server exposing the OmniFocus database over stdio",
    version,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `info,omnifocus_mcp=trace` (overrides RUST_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Also append logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the MCP server (default)
    Serve {
        /// Transport protocol
        #[arg(long, value_enum, default_value_t = Transport::Stdio)]
        transport: Transport,
    },

    /// Fetch the database summary once to verify OmniFocus is reachable
    Check,

    /// Print the effective configuration as TOML
    Config,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
}

impl Cli {
    /// Parse the process arguments; clap handles errors and exits.
    pub fn parse_args() -> Self {
        Self::parse_args_from(std::env::args_os())
    }

    pub fn try_parse_args_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Cli::try_parse_from(iter)
    }

    pub fn parse_args_from<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Self::try_parse_args_from(iter) {
            Ok(cli) => cli,
            Err(err) => err.exit(),
        }
    }

    /// The subcommand to run, `serve` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve {
            transport: Transport::Stdio,
        })
    }
}
