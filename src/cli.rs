mod output;

use clap::{ArgAction, Parser, Subcommand};
pub use output::{ColorMode, OutputFormat};
use std::path::PathBuf;

/// Filter spreadsheet rows with declarative, reusable filter sets
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "SHEET_FILTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'F', long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write results to a file; `apply` exports the filtered rows here
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the sheets of a workbook
    Sheets {
        /// Spreadsheet or delimited text file
        file: PathBuf,
    },
    /// Describe the columns of a sheet: type, nulls, distinct values, bounds
    Info {
        file: PathBuf,

        /// Sheet to read (required when the workbook has several)
        #[arg(short, long)]
        sheet: Option<String>,
    },
    /// Apply filters and show the rows that remain
    Apply {
        file: PathBuf,

        #[arg(short, long)]
        sheet: Option<String>,

        /// Start from a saved filter set
        #[arg(long = "set", value_name = "NAME")]
        set: Option<String>,

        /// JSON file with a list of filter specifications
        #[arg(short, long, value_name = "PATH")]
        filters: Option<PathBuf>,

        /// Filter terms such as `score>10`, `score=10..20` or `home>@away`
        #[arg(short = 'w', long = "where", value_name = "TERM")]
        where_terms: Vec<String>,

        /// Rows to show in the preview (defaults to the configured value)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print the active filter list
        #[arg(long)]
        show_filters: bool,
    },
    /// Row counts each saved filter set keeps on a sheet
    Impact {
        file: PathBuf,

        #[arg(short, long)]
        sheet: Option<String>,

        /// Filter sets to compare (all when omitted)
        names: Vec<String>,
    },
    /// Manage saved filter sets
    Set {
        #[command(subcommand)]
        action: SetCommand,
    },
    /// Register users and manage the login session
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
}

#[derive(Subcommand)]
pub enum SetCommand {
    /// List saved filter sets
    List,
    /// Print the filters of a saved set
    Show { name: String },
    /// Save a filter list under a name, replacing any set with that name
    Save {
        name: String,

        #[arg(short, long, value_name = "PATH")]
        filters: Option<PathBuf>,

        #[arg(short = 'w', long = "where", value_name = "TERM")]
        where_terms: Vec<String>,
    },
    /// Delete a saved filter set
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create an account
    Register {
        username: String,

        #[arg(long, env = "SHEET_FILTER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Repeat the password; registration fails when they differ
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Log in and keep the session for later commands
    Login {
        username: String,

        #[arg(long, env = "SHEET_FILTER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show the logged-in user
    Whoami,
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
