//! CLI definitions using clap.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// tunewatch - finetune job watcher
#[derive(Parser, Debug)]
#[command(name = "tunewatch")]
#[command(version)]
#[command(about = "Create finetune jobs and watch them until their final state is reported")]
pub struct Cli {
    /// Path to the YAML (or .toml) config file
    #[arg(long)]
    pub config: PathBuf,

    /// Port the HTTP API listens on
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, default_value_t = false)]
    pub enable_debug: bool,

    /// Seconds to wait for in-flight requests on shutdown
    #[arg(long, default_value_t = 30)]
    pub grace_period: u64,
}

impl Cli {
    pub const fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period)
    }

    /// Default log directive.
    pub const fn log_level(&self) -> &'static str {
        if self.enable_debug { "debug" } else { "info" }
    }
}
