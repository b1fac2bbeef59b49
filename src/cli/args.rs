//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    building::BuildingCommands,
    completions::CompletionsArgs,
    export::ExportArgs,
    import::ImportArgs,
    init::InitArgs,
    intervention::IntCommands,
    log::LogArgs,
    manual::ManualCommands,
    pertinenza::PertinenzaCommands,
    plesso::PlessoCommands,
    registry::RegistryArgs,
    report::ReportCommands,
    road::RoadCommands,
    search::SearchArgs,
    session::LoginArgs,
    settings::SettingsCommands,
    user::UserCommands,
};

#[derive(Parser)]
#[command(name = "edilgest")]
#[command(author, version, about = "EdilGest Pro - provincial building and road asset registry")]
#[command(long_about = "EdilGest Pro asset registry: buildings, plessi, roads and works contracts, with an audit trail, CSV import/export and reports.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose diagnostics on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Workspace root (default: auto-detect by finding .edilgest/)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new workspace
    Init(InitArgs),

    /// Log in with one of the workspace accounts
    Login(LoginArgs),

    /// End the current session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Buildings (immobili)
    #[command(subcommand, alias = "structure")]
    Building(BuildingCommands),

    /// Units inside a building
    #[command(subcommand)]
    Plesso(PlessoCommands),

    /// Minor sub-assets of a plesso
    #[command(subcommand)]
    Pertinenza(PertinenzaCommands),

    /// Provincial roads
    #[command(subcommand)]
    Road(RoadCommands),

    /// Works contracts (interventi)
    #[command(subcommand, alias = "intervention")]
    Int(IntCommands),

    /// User accounts and section permissions
    #[command(subcommand)]
    User(UserCommands),

    /// Import records from a CSV file
    Import(ImportArgs),

    /// Export a register as CSV
    Export(ExportArgs),

    /// Reports, deadline alerts and printable sheets
    #[command(subcommand)]
    Report(ReportCommands),

    /// Show the audit log
    Log(LogArgs),

    /// Notification, export schedule and security settings
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Built-in help pages
    #[command(subcommand)]
    Manual(ManualCommands),

    /// Technical registry of buildings, plessi and roads
    Registry(RegistryArgs),

    /// Search all registers
    Search(SearchArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, table for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-aligned table (for terminals)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <OutputFormat as ValueEnum>::from_str(s, true)
    }
}
