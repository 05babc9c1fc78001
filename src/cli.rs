use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "taskboard", version, about = "Local kanban board with filters and a timeline")]
pub struct Cli {
    /// Use this directory for board data instead of the discovered one
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project-local data directory in the current directory
    Init,
    /// Manage boards (lists them when no action is given)
    Boards {
        #[command(subcommand)]
        action: Option<BoardAction>,
    },
    /// Manage columns of the active board
    Columns {
        #[command(subcommand)]
        action: ColumnAction,
    },
    /// Manage labels of the active board (lists them when no action is given)
    Labels {
        #[command(subcommand)]
        action: Option<LabelAction>,
    },
    /// List cards of the active board
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Apply a saved filter preset (name or id) before the flags
        #[arg(long)]
        preset: Option<String>,
    },
    /// Add a new card
    Add {
        /// Card text
        text: String,
        /// Column id (defaults to the first column)
        #[arg(long)]
        column: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// none, low, medium or high
        #[arg(long)]
        priority: Option<String>,
        /// Effort in hours
        #[arg(long)]
        effort: Option<f64>,
        /// Label id (repeatable)
        #[arg(long = "label", short = 'l')]
        labels: Vec<String>,
    },
    /// Edit an existing card
    Edit {
        card_id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        clear_start: bool,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        effort: Option<f64>,
    },
    /// Move a card to a column
    Move {
        card_id: String,
        column_id: String,
        /// Zero-based position in the destination (defaults to the end)
        #[arg(long)]
        position: Option<usize>,
    },
    /// Toggle a card's completed flag
    Done { card_id: String },
    /// Delete a card
    Rm { card_id: String },
    /// Duplicate a card next to the original
    Dup { card_id: String },
    /// Append a log entry to a card
    Log { card_id: String, text: String },
    /// Toggle a label on a card
    Tag { card_id: String, label_id: String },
    /// Add or remove a dependency between cards
    Depend {
        card_id: String,
        /// Card that `card_id` depends on
        on: String,
        /// FS, SS, FF or SF
        #[arg(long, default_value = "FS")]
        kind: String,
        #[arg(long)]
        remove: bool,
    },
    /// Print a text timeline of scheduled cards
    Gantt {
        /// day, week or month
        #[arg(long)]
        zoom: Option<String>,
    },
    /// Check card dependencies for cycles and dangling references
    Validate,
    /// Pick a card to work on, weighted by priority, due date and age
    Pick {
        /// Only draw from these column ids (repeatable)
        #[arg(long = "column")]
        columns: Vec<String>,
        #[arg(long)]
        include_completed: bool,
        #[arg(long)]
        no_priority: bool,
        #[arg(long)]
        no_due: bool,
        #[arg(long)]
        aging: bool,
        /// Remember these options for next time
        #[arg(long)]
        save: bool,
    },
    /// Write all boards to a JSON file
    Export {
        /// Output path (defaults to taskboard-export-<date>.json)
        path: Option<PathBuf>,
    },
    /// Replace all boards with the contents of an export file
    Import { path: PathBuf },
    /// Manage saved filter presets (lists them when no action is given)
    Presets {
        #[command(subcommand)]
        action: Option<PresetAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BoardAction {
    New {
        name: String,
        /// basic or development
        #[arg(long)]
        template: Option<String>,
    },
    Switch { board_id: String },
    Rename { board_id: String, name: String },
    Delete { board_id: String },
}

#[derive(Subcommand, Debug)]
pub enum ColumnAction {
    Add { title: String },
    Rename { column_id: String, title: String },
    Rm { column_id: String },
    /// Reorder columns; unlisted columns keep their relative order at the end
    Order { column_ids: Vec<String> },
}

#[derive(Subcommand, Debug)]
pub enum LabelAction {
    Add {
        name: String,
        #[arg(long, default_value = "#95a5a6")]
        color: String,
    },
    Rename { label_id: String, name: String },
    Rm { label_id: String },
}

#[derive(Subcommand, Debug)]
pub enum PresetAction {
    /// Save the given filter flags under a name
    Save {
        name: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    Rm { preset_id: String },
}

#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Search term
    #[arg(long)]
    pub search: Option<String>,
    /// Fields to search: text, description, labels, logs (repeatable)
    #[arg(long = "search-in")]
    pub search_in: Vec<String>,
    /// contains, exact, starts-with or not-contains
    #[arg(long = "match")]
    pub match_op: Option<String>,
    #[arg(long)]
    pub case_sensitive: bool,
    /// Label id (repeatable)
    #[arg(long = "with-label")]
    pub labels: Vec<String>,
    /// any, all or none
    #[arg(long)]
    pub label_mode: Option<String>,
    /// Priority (repeatable)
    #[arg(long = "with-priority")]
    pub priorities: Vec<String>,
    /// overdue, due-today, due-this-week, due-soon, no-due-date, has-due-date
    #[arg(long = "due")]
    pub due_status: Option<String>,
    #[arg(long)]
    pub due_from: Option<String>,
    #[arg(long)]
    pub due_to: Option<String>,
    #[arg(long)]
    pub start_from: Option<String>,
    #[arg(long)]
    pub start_to: Option<String>,
    #[arg(long, conflicts_with = "incomplete")]
    pub completed: bool,
    #[arg(long)]
    pub incomplete: bool,
    #[arg(long)]
    pub min_effort: Option<f64>,
    #[arg(long)]
    pub max_effort: Option<f64>,
    /// fresh, aging, stale or abandoned
    #[arg(long = "aging")]
    pub aging: Option<String>,
}
