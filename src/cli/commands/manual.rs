//! `edilgest manual` command - Built-in help pages

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::commands::common::print_structured;
use crate::cli::helpers::{dispatch, open_session, require_section, resolve_format};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::mutation::Mutation;
use crate::entities::Section;

#[derive(Subcommand, Debug)]
pub enum ManualCommands {
    /// List help topics
    List,

    /// Print a help page
    Show {
        /// Topic id
        id: String,
    },

    /// Replace a help page (admin)
    Edit(EditArgs),
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Topic id; a new id creates the page
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    /// Page body
    #[arg(long, conflicts_with = "file")]
    pub content: Option<String>,

    /// Read the page body from a file
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Link to an external document; pass an empty value to remove it
    #[arg(long)]
    pub url: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "TOPIC", 28),
    ColumnDef::new("title", "TITLE", 40),
    ColumnDef::new("external", "LINK", 5),
];

pub fn run(cmd: ManualCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ManualCommands::List => run_list(global),
        ManualCommands::Show { id } => run_show(&id, global),
        ManualCommands::Edit(args) => run_edit(args, global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::Manuals)?;
    let manuals = &session.state().manual_contents;

    let format = resolve_format(global, &config);
    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        print_structured(manuals, format)?;
        return Ok(());
    }
    let rows: Vec<TableRow> = manuals
        .iter()
        .map(|(id, entry)| {
            TableRow::new(id.as_str())
                .cell("id", CellValue::Text(id.clone()))
                .cell("title", CellValue::Text(entry.title.clone().unwrap_or_default()))
                .cell("external", CellValue::Flag(entry.external_url.is_some()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "topic").output(&rows, format);
    Ok(())
}

fn run_show(id: &str, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, session) = open_session(global)?;
    require_section(&session, Section::Manuals)?;
    let entry = session
        .state()
        .manual_contents
        .get(id)
        .ok_or_else(|| miette::miette!("No help page '{}'", id))?;

    if let Some(title) = &entry.title {
        println!("{}", style(title).bold());
        println!();
    }
    if !entry.content.is_empty() {
        println!("{}", entry.content);
    }
    if let Some(url) = &entry.external_url {
        println!();
        println!("See: {}", style(url).underlined());
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let mut entry = session
        .state()
        .manual_contents
        .get(&args.id)
        .cloned()
        .unwrap_or_default();

    if let Some(title) = args.title {
        entry.title = Some(title).filter(|t| !t.trim().is_empty());
    }
    if let Some(path) = &args.file {
        entry.content = fs::read_to_string(path).into_diagnostic()?;
    } else if let Some(content) = args.content {
        entry.content = content;
    }
    if let Some(url) = args.url {
        entry.external_url = Some(url).filter(|u| !u.trim().is_empty());
    }

    dispatch(
        &mut session,
        Mutation::UpdateManual {
            id: args.id.clone(),
            entry,
        },
        global,
    )?;
    if !global.quiet {
        println!("{} Saved help page {}", style("✓").green(), style(&args.id).cyan());
    }
    Ok(())
}
