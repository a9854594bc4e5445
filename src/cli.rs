use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use pushpull::{
    backup::ImportMode,
    types::{DayCategory, Theme},
};

#[derive(Parser)]
#[command(name = "pushpull", version, about = "Rotating workout days and strength-training tracker")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Emit machine-readable JSON instead of colorful text.
    #[arg(global = true, long)]
    pub json: bool,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(global = true, short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Exercise catalogue
    #[command(subcommand, visible_alias = "ex")]
    Exercise(ExerciseCmd),

    /// Workout templates and their rotation
    #[command(subcommand, visible_alias = "d")]
    Day(DayCmd),

    /// The session in progress
    #[command(subcommand, visible_alias = "s")]
    Session(SessionCmd),

    /// Logged trainings: list, correct, delete
    #[command(subcommand, visible_alias = "h")]
    History(HistoryCmd),

    /// History analytics
    #[command(subcommand, visible_alias = "st")]
    Stats(StatsCmd),

    /// Show trainings in a calendar view
    #[command(visible_alias = "cal")]
    Calendar {
        /// Year to show (defaults to current year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Month to show (1-12, defaults to current month)
        #[arg(short, long)]
        month: Option<u32>,
    },

    /// Export or import every collection as JSON
    #[command(subcommand)]
    Backup(BackupCmd),

    /// App settings stored with the data (theme, rest timer)
    #[command(subcommand)]
    Settings(SettingsCmd),

    /// View or edit pushpull config
    #[command(subcommand)]
    Config(ConfigCmd),
}

#[derive(Debug, Subcommand)]
pub enum ExerciseCmd {
    /// Add a new exercise
    #[command(visible_alias = "a")]
    Add {
        /// Exercise name
        name: String,

        /// Muscle category
        #[arg(short, long)]
        category: String,

        /// What to pay attention to
        #[arg(short, long)]
        focus: Option<String>,
    },

    /// List all exercises
    #[command(visible_alias = "l")]
    List {
        /// Filter by muscle category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show statistics for one exercise
    #[command(visible_alias = "s", trailing_var_arg = true)]
    Show {
        /// Exercise id or name
        exercise: Vec<String>,
    },

    /// Rename or recategorise an exercise
    #[command(visible_alias = "e")]
    Edit {
        /// Exercise id or name
        exercise: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        focus: Option<String>,
    },

    /// Delete an exercise
    #[command(visible_alias = "d")]
    Delete {
        /// Exercise id or name
        exercise: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum DayCmd {
    /// Create an empty workout template
    #[command(visible_alias = "a")]
    Add {
        name: String,

        #[arg(short, long, value_enum)]
        category: DayCategory,

        /// Position in the rotation (defaults to last)
        #[arg(short, long)]
        order: Option<i64>,
    },

    /// List templates in rotation order
    #[command(visible_alias = "l")]
    List,

    /// Show one template
    #[command(visible_alias = "s")]
    Show {
        /// Template id or name
        day: String,
    },

    /// Import templates from a TOML file
    #[command(visible_alias = "i")]
    Import {
        /// Path to TOML file with `[[day]]` entries
        file: PathBuf,
    },

    /// Delete a template
    #[command(visible_alias = "d")]
    Delete { day: String },

    /// Append an exercise to a template - Usage: day add-ex DAY EXERCISE [SETS]
    AddEx {
        day: String,
        exercise: String,
        #[arg(default_value_t = 3)]
        sets: u32,
    },

    /// Remove an exercise from a template
    RmEx { day: String, exercise: String },

    /// Change how many sets an exercise gets
    Sets { day: String, exercise: String, sets: u32 },

    /// Reorder the exercises of a template
    Reorder {
        day: String,

        /// Exercises in their new order; unlisted ones follow
        #[arg(required = true)]
        exercises: Vec<String>,
    },

    /// Set the rotation order of all templates
    Rotation {
        #[arg(required = true)]
        days: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionCmd {
    /// Start a session (defaults to the next template in the rotation)
    #[command(visible_alias = "s")]
    Start { day: Option<String> },

    /// Show current session details
    #[command(visible_alias = "i")]
    Show,

    /// Log a set - Usage: session set EXERCISE SET WEIGHT REPS
    #[command(visible_alias = "e")]
    #[command(override_usage = "session set <EXERCISE> <SET> <WEIGHT> <REPS>")]
    Set {
        /// Exercise position in the session (1-based) or name
        exercise: String,

        /// Set number (1-based)
        set: u32,

        /// Weight in kg
        weight: f64,

        /// Number of reps
        reps: u32,
    },

    /// Mark a set as skipped
    Skip { exercise: String, set: u32 },

    /// Undo a skipped set
    Unskip { exercise: String, set: u32 },

    /// Skip every set of an exercise
    SkipEx { exercise: String },

    /// Copy the first set's values into the empty sets
    FillFirst { exercise: String },

    /// Copy the values from the last session of this template
    FillLast { exercise: String },

    /// Clear every set of the session
    Reset,

    /// Store the session and end it
    End,

    /// Throw the session away
    #[command(visible_alias = "c")]
    Cancel,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCmd {
    /// List logged trainings, newest first
    #[command(visible_alias = "l")]
    List {
        /// Restrict to one template
        #[arg(short, long)]
        day: Option<String>,

        /// Trainings to show (defaults to config `history_limit`)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show every set of one training
    #[command(visible_alias = "s")]
    Show { training: i64 },

    /// Correct a logged set - Usage: history set TRAINING EXERCISE SET WEIGHT REPS
    #[command(override_usage = "history set <TRAINING> <EXERCISE> <SET> <WEIGHT> <REPS>")]
    Set {
        training: i64,

        /// Exercise id or name
        exercise: String,

        set: u32,

        /// Weight in kg
        weight: f64,

        reps: u32,
    },

    /// Move a training to another date or template
    #[command(visible_alias = "e")]
    Edit {
        training: i64,

        /// New date (YYYY-MM-DD), time of day is kept
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Template id or name
        #[arg(short, long)]
        day: Option<String>,
    },

    /// Delete a training
    #[command(visible_alias = "rm")]
    Delete { training: i64 },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCmd {
    /// Show the stored settings
    Show,

    /// Change one or more settings
    Set {
        #[arg(long, value_enum)]
        theme: Option<Theme>,

        /// Rest timer length in seconds
        #[arg(long)]
        rest_timer: Option<u32>,

        /// Rest timer volume (0-10)
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=10))]
        rest_volume: Option<u32>,
    },
}

#[derive(Debug, Subcommand)]
pub enum StatsCmd {
    /// Totals and streaks
    #[command(visible_alias = "o")]
    Overview,

    /// Records, averages and trend of one exercise
    #[command(visible_alias = "e", trailing_var_arg = true)]
    Exercise { exercise: Vec<String> },

    /// Volume per session
    #[command(visible_alias = "v")]
    Volume {
        /// Restrict to one template
        #[arg(short, long)]
        day: Option<String>,

        /// Sessions to include (defaults to config `history_limit`)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Draw a graph instead of a table
        #[arg(short, long)]
        graph: bool,
    },

    /// Volume split by muscle category
    #[command(visible_alias = "c")]
    Categories,

    /// Exercises improving or needing attention
    #[command(visible_alias = "t")]
    Trends {
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// What to train next and what to focus on
    #[command(visible_alias = "n")]
    Next,

    /// Weight PRs set in a recent period
    Prs {
        /// Period length in days
        #[arg(short = 'n', long, default_value_t = 30)]
        days: i64,

        /// Restrict to one template
        #[arg(short, long)]
        day: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum BackupCmd {
    /// Write every collection as JSON (stdout if no file)
    Export { file: Option<PathBuf> },

    /// Load a backup file
    Import {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = ImportMode::Merge)]
        mode: ImportMode,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    /// Show all config keys
    List,

    /// Get the value of a key
    Get { key: String },

    /// Set or override a key
    Set { key: String, val: String },

    /// Remove a key
    Unset { key: String },
}
