//! CLI argument parsing.

use clap::{Args, Parser, Subcommand};

/// Goal accountability server: tracks goals and punishes missed ones.
#[derive(Parser, Debug)]
#[command(name = "doordont-server", version, about)]
pub struct Cli {
    /// Config profile; keys are read as `{PROFILE}_{KEY}` before `{KEY}`.
    #[arg(long, global = true, env = "DOORDONT_PROFILE")]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server and the evaluation scheduler (default).
    Serve(ServeArgs),
    /// Evaluate one goal immediately and print the outcome.
    Evaluate {
        /// Goal id.
        goal_id: i64,
    },
    /// Print the effective configuration with secrets removed.
    Config,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Override the bind host.
    #[arg(long)]
    pub host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Skip scheduling persisted goals at startup.
    #[arg(long)]
    pub no_restore: bool,
}
