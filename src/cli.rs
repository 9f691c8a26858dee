use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::config::DirsnapConfig;
use crate::filter::FileFilter;

#[derive(Parser)]
#[command(name = "dirsnap")]
#[command(version = "0.1.0")]
#[command(about = "Snapshot a directory's files and delete anything that shows up later")]
#[command(
    long_about = "dirsnap runs an interactive session: point it at a directory, save the \
current files as a whitelist with `snapshot`, and later remove every file not on that \
whitelist with `purge`. The whitelist lives in memory for the length of the session only."
)]
pub struct Cli {
    /// Directory to manage
    #[arg(value_name = "PATH", help = "Directory to preload into the session")]
    pub path: Option<PathBuf>,

    /// Output format for command results
    #[arg(long, default_value = "text", help = "Output format")]
    pub output: OutputFormat,

    /// Exclude hidden files from snapshots and purges
    #[arg(long, help = "Leave hidden (dot) files out of snapshots and purges")]
    pub skip_hidden: bool,

    /// Only consider specific file types
    #[arg(
        long,
        value_delimiter = ',',
        help = "File extensions to consider (e.g. tmp,log,part)"
    )]
    pub extensions: Option<Vec<String>>,

    /// Names that are never snapshotted and never deleted
    #[arg(
        long,
        value_delimiter = ',',
        help = "Glob patterns to exclude entirely (e.g. *.bak,Cargo.lock)"
    )]
    pub ignore: Option<Vec<String>>,

    /// Skip the no-snapshot safety gate on purge
    #[arg(long, help = "Allow purging even when no snapshot was taken")]
    pub force: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Disable colors in output
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    Text,
    /// One JSON object per command result, for scripting
    Json,
    /// Compact single-line format
    Compact,
}

impl Cli {
    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .init();
    }

    /// Reject a preloaded path that cannot work. Paths set later inside the
    /// session are validated lazily by the operations that use them.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref path) = self.path {
            if !path.exists() {
                return Err(format!("Path does not exist: {}", path.display()));
            }

            if !path.is_dir() {
                return Err(format!("Path is not a directory: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Build the file filter from CLI flags merged with the config file.
    pub fn build_filter(&self, config: &DirsnapConfig) -> Result<FileFilter> {
        let skip_hidden = self.skip_hidden || config.listing.skip_hidden;
        let patterns = self.ignore.clone().unwrap_or_default();
        FileFilter::new(skip_hidden, self.extensions.clone(), &patterns)
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            path: None,
            output: OutputFormat::Text,
            skip_hidden: false,
            extensions: None,
            ignore: None,
            force: false,
            verbose: false,
            no_color: false,
        }
    }
}
