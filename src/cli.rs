use crate::auth::Role;
use clap::{Parser, Subcommand, ValueEnum};

/// Command-line client for the training dashboard API, with a local response cache.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format(), global = true)]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the server's freshness status for a user (or a tenant with --tenant)
    Status {
        id: u64,
        #[arg(long)]
        tenant: bool,
    },
    /// Show a user's scores, served from cache when still current
    Scores { tenant_id: u64, user_id: u64 },
    /// Show every score in a tenant (admin)
    TenantScores { tenant_id: u64 },
    /// Show a user's profile
    Profile { user_id: u64 },
    /// Show a pool user's scores (pool admin)
    PoolScores { user_id: u64 },
    /// Show a pool user's averaged eye-tracking metrics (pool admin)
    PoolAverages { user_id: u64 },
    /// List managed devices (superadmin)
    Devices,
    /// List the users registered on one device (superadmin)
    DeviceUsers { device_id: u64 },
    /// Show cross-device totals (superadmin)
    Overview,
    /// Drop one cached entry
    Invalidate { key: String },
    /// Drop every cached entry, keeping the session and preferences
    Clear,
    /// Store a bearer token issued by the server
    Login {
        #[arg(long)]
        token: String,
        /// Tier the token belongs to
        #[arg(long, value_enum, default_value_t = Role::Member)]
        role: Role,
    },
    /// Forget the stored tokens and all cached data
    Logout,
}

/// Formats for tracing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable output
    Pretty,
    /// One JSON object per line
    Json,
}

const fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}
