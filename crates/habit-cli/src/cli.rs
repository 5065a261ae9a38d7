use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use habit_core::{GridLayout, MAX_TRAILING_DAYS};

#[derive(Parser)]
#[command(name = "habit")]
#[command(about = "Track daily habits and their completion grids")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// CLI profile name for Supabase configuration and session
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List habits with their recent completion grid
    #[command(alias = "ls")]
    List {
        /// Number of week columns to show per habit
        #[arg(short, long, default_value = "20")]
        weeks: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new habit
    #[command(alias = "new")]
    Add {
        /// Habit name
        name: Vec<String>,
        /// Icon glyph (see `habit icons`)
        #[arg(short, long)]
        icon: Option<String>,
        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
        /// Color as #RRGGBB or #RGB
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Edit the name, icon, description or color of a habit
    Edit {
        /// Habit ID, unique ID prefix, or name
        habit: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        icon: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Delete a habit and its completion history
    Delete {
        /// Habit ID, unique ID prefix, or name
        habit: String,
    },
    /// Toggle completion for today or a past date
    #[command(alias = "done")]
    Toggle {
        /// Habit ID, unique ID prefix, or name
        habit: String,
        /// Date as YYYY-MM-DD (defaults to today)
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
    },
    /// Toggle completion for yesterday
    Yesterday {
        /// Habit ID, unique ID prefix, or name
        habit: String,
    },
    /// Show the full completion grid of one habit
    Grid {
        /// Habit ID, unique ID prefix, or name
        habit: String,
        #[arg(long, value_enum, default_value_t = LayoutArg::Year)]
        layout: LayoutArg,
        /// Number of trailing days for `--layout trailing`
        #[arg(
            long,
            default_value = "90",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TRAILING_DAYS))
        )]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a habit to a new position in the list
    Reorder {
        /// Habit ID, unique ID prefix, or name
        habit: String,
        /// New position, starting at 1
        position: usize,
    },
    /// Show the icon and color palettes
    Icons,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the anonymous Supabase session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum LayoutArg {
    /// Jan 1 to Dec 31 of the current year
    Year,
    /// Jan 1 up to today
    YearToDate,
    /// The last `--days` days
    Trailing,
}

impl LayoutArg {
    pub const fn to_layout(self, days: u32) -> GridLayout {
        match self {
            Self::Year => GridLayout::CalendarYear,
            Self::YearToDate => GridLayout::YearToDate,
            Self::Trailing => GridLayout::Trailing { days },
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update the selected profile
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        request_timeout_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in anonymously and store the session in the keychain
    SignIn,
    /// Show auth status for profile
    Status,
    /// Sign out and clear the stored session
    Logout,
}
