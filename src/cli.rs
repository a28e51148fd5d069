use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dbsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Keep declared roles, tables, policies and functions in sync with your database platform",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to ./dbsync.toml, then the user config dir)
    #[arg(short, long, env = "DBSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Access token for the platform API
    #[arg(long, env = "DBSYNC_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub access_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Make the remote state match the declared resources
    Apply(ApplyArgs),

    /// Show per-kind drift between declared and remote state
    Status(TargetArgs),

    /// Build a REST read query for a registered model
    Query(QueryArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Plan / Apply
// ============================================================================

#[derive(Args)]
pub struct TargetArgs {
    /// Only consider a kind or a single resource (e.g. roles, policies.posts.read)
    pub target: Option<String>,

    /// Also delete platform-owned (native) records
    #[arg(long)]
    pub include_native: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Exit with status 3 when changes are pending
    #[arg(long)]
    pub detailed_exitcode: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Show what would be done without applying
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Query
// ============================================================================

#[derive(Args)]
pub struct QueryArgs {
    /// Registered model name to query
    pub model: String,

    /// Columns to select (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Relation path to embed, e.g. Author.Profile
    #[arg(short, long)]
    pub with: Option<String>,

    /// Columns of an embedded model: Model=col1,col2
    #[arg(long = "columns", value_name = "MODEL=COLS")]
    pub columns: Vec<String>,

    /// Foreign key hint for an embedded model: Model=constraint
    #[arg(long = "fk", value_name = "MODEL=FK")]
    pub foreign_keys: Vec<String>,

    /// Equality filter: column=value
    #[arg(long = "eq", value_name = "COL=VALUE")]
    pub eq: Vec<String>,

    /// Order by column, append `.desc` for descending
    #[arg(long)]
    pub order: Option<String>,

    /// Maximum number of rows
    #[arg(long, default_value = "0")]
    pub limit: usize,

    /// Rows to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,
}
