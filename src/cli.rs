use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cai-export")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Export Cloud Asset Inventory to a GCS bucket", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (default: ~/.config/cai-export/config.toml)
    #[arg(long, global = true, env = "CAI_EXPORT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export resource and IAM policy inventories and wait for completion
    Export(ExportArgs),

    /// Show what an export would do, without calling the API
    Plan(ScopeArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Scope
// ============================================================================

/// Which scope to export and where to write it. Overrides the settings file.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Project to export
    #[arg(short, long)]
    pub project: Option<String>,

    /// Organization to export (takes precedence over --project)
    #[arg(short, long)]
    pub organization: Option<String>,

    /// Project billed for the export requests (defaults to --project)
    #[arg(long)]
    pub control_project: Option<String>,

    /// Destination GCS bucket name
    #[arg(short, long)]
    pub bucket: Option<String>,
}

// ============================================================================
// Export
// ============================================================================

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Cloud Asset API endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// OAuth2 access token (default: `gcloud auth print-access-token`)
    #[arg(long, env = "CLOUDSDK_AUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Give up waiting on each export after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seconds between the first status polls
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: Option<u64>,

    /// Run both exports at the same time
    #[arg(long)]
    pub concurrent: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}
