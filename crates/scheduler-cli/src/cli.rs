use clap::{Parser, Subcommand};

/// Manage and run a calendar-driven industrial scheduler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage series
    Series(SeriesCommand),
    /// Manage per-date exceptions
    Exception(ExceptionCommand),
    /// Manage holiday calendars and entries
    Holiday(HolidayCommand),
    /// Manage categories
    Category(CategoryCommand),
    /// Manage the process-wide runtime override
    Override(OverrideCommand),
    /// Print the resolved occurrence timeline for a window
    Resolve(ResolveCommand),
    /// Print the current status and next event
    Status,
    /// Start the scheduler loop
    Run(RunCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct SeriesCommand {
    #[command(subcommand)]
    pub command: SeriesSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SeriesSubcommand {
    Add(SeriesAddCommand),
    List,
    Show(SeriesShowCommand),
    Edit(SeriesEditCommand),
    Delete(SeriesDeleteCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct SeriesAddCommand {
    /// Human-readable task name
    pub name: String,
    /// Wire endpoint descriptor
    #[arg(long)]
    pub endpoint: String,
    /// Target node identifier
    #[arg(long)]
    pub node_id: String,
    /// Target value (raw text, typed per --data-type)
    #[arg(long)]
    pub value: String,
    /// Recurrence rule string (spec §6.1)
    #[arg(long)]
    pub rrule: String,
    #[arg(long, default_value = "auto")]
    pub data_type: String,
    #[arg(long, default_value_t = 1)]
    pub category: i64,
    #[arg(long, default_value_t = 1)]
    pub priority: i32,
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SeriesShowCommand {
    pub id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct SeriesEditCommand {
    pub id: i64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub rrule: Option<String>,
    #[arg(long)]
    pub value: Option<String>,
    #[arg(long)]
    pub category: Option<i64>,
    #[arg(long)]
    pub priority: Option<i32>,
    #[arg(long)]
    pub enable: bool,
    #[arg(long, conflicts_with = "enable")]
    pub disable: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SeriesDeleteCommand {
    pub id: i64,
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ExceptionCommand {
    #[command(subcommand)]
    pub command: ExceptionSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExceptionSubcommand {
    Add(ExceptionAddCommand),
    List(ExceptionListCommand),
    Remove(ExceptionRemoveCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ExceptionAddCommand {
    /// Series id this exception applies to
    pub series_id: i64,
    /// Date in YYYY-MM-DD form
    pub date: String,
    /// cancel | override
    #[arg(long, default_value = "cancel")]
    pub action: String,
    #[arg(long)]
    pub value: Option<String>,
    #[arg(long)]
    pub category: Option<i64>,
    #[arg(long)]
    pub task_name: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ExceptionListCommand {
    pub series_id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct ExceptionRemoveCommand {
    pub series_id: i64,
    pub date: String,
}

#[derive(Parser, Debug, Clone)]
pub struct HolidayCommand {
    #[command(subcommand)]
    pub command: HolidaySubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum HolidaySubcommand {
    /// Manage holiday calendars
    Calendar(HolidayCalendarCommand),
    /// Manage holiday entries
    Entry(HolidayEntryCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct HolidayCalendarCommand {
    #[command(subcommand)]
    pub command: HolidayCalendarSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum HolidayCalendarSubcommand {
    Add(HolidayCalendarAddCommand),
    List,
    SetDefault(HolidayCalendarSetDefaultCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct HolidayCalendarAddCommand {
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub default: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct HolidayCalendarSetDefaultCommand {
    pub id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct HolidayEntryCommand {
    #[command(subcommand)]
    pub command: HolidayEntrySubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum HolidayEntrySubcommand {
    Add(HolidayEntryAddCommand),
    List(HolidayEntryListCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct HolidayEntryAddCommand {
    pub calendar_id: i64,
    /// Date in YYYY-MM-DD form
    pub date: String,
    pub name: String,
    #[arg(long)]
    pub full_day: bool,
    #[arg(long)]
    pub start_time: Option<String>,
    #[arg(long)]
    pub end_time: Option<String>,
    #[arg(long)]
    pub category: Option<i64>,
    #[arg(long)]
    pub value: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct HolidayEntryListCommand {
    pub calendar_id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct CategoryCommand {
    #[command(subcommand)]
    pub command: CategorySubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategorySubcommand {
    List,
    Add(CategoryAddCommand),
    Edit(CategoryEditCommand),
    Delete(CategoryDeleteCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct CategoryAddCommand {
    pub name: String,
    #[arg(long)]
    pub bg: String,
    #[arg(long)]
    pub fg: String,
    #[arg(long)]
    pub sort_order: Option<i32>,
}

#[derive(Parser, Debug, Clone)]
pub struct CategoryEditCommand {
    pub id: i64,
    #[arg(long)]
    pub bg: Option<String>,
    #[arg(long)]
    pub fg: Option<String>,
    #[arg(long)]
    pub sort_order: Option<i32>,
}

#[derive(Parser, Debug, Clone)]
pub struct CategoryDeleteCommand {
    pub id: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct OverrideCommand {
    #[command(subcommand)]
    pub command: OverrideSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum OverrideSubcommand {
    Set(OverrideSetCommand),
    Clear,
    Show,
}

#[derive(Parser, Debug, Clone)]
pub struct OverrideSetCommand {
    pub value: String,
    /// Optional expiry timestamp, RFC 3339
    #[arg(long)]
    pub until: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ResolveCommand {
    /// Window start, RFC 3339
    #[arg(long)]
    pub from: String,
    /// Window end, RFC 3339
    #[arg(long)]
    pub to: String,
}

#[derive(Parser, Debug, Clone)]
pub struct RunCommand {
    /// How the loop writes resolved values: logging (default) or recording
    #[arg(long, default_value = "logging")]
    pub sink: String,
}
