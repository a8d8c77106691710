//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "kestrel",
    about = "Editor-facing analysis service for an ML-family language",
    version
)]
pub struct Cli {
    /// Log filter for stderr (e.g. `debug`, `kestrel_lib=trace`).
    #[arg(long, value_name = "FILTER", global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Answer one JSON request read from stdin, then exit.
    Single {
        /// Document path, used for project configuration lookup.
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,
    },
    /// Serve newline-delimited JSON requests until stdin closes.
    Server,
}

/// Installs the stderr subscriber. Stdout stays clean for the protocol.
pub fn init_logging(filter: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => return,
        },
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
