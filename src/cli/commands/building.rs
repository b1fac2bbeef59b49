//! `edilgest building` command - Building (immobile) register

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::common::{
    print_structured, print_structured_list, BuildingTechArgs, DeleteArgs, ListArgs,
    LocationArgs, ShowArgs,
};
use crate::cli::helpers::{
    admin_guard, dispatch, format_amount, open_session, or_dash, require_section, resolve_format,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::entity::former_names;
use crate::core::mutation::Mutation;
use crate::core::state::AppState;
use crate::entities::{Section, Structure};

#[derive(Subcommand, Debug)]
pub enum BuildingCommands {
    /// List buildings
    List(ListArgs),

    /// Show a building with its plessi
    Show(ShowArgs),

    /// Register a new building
    New(NewArgs),

    /// Change a building's fields
    Edit(EditArgs),

    /// Delete a building (admin, security password)
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Building name
    #[arg(long, short = 'n')]
    pub name: String,

    #[arg(long, short = 'a', default_value = "")]
    pub address: String,

    #[arg(long, short = 'd', default_value = "")]
    pub description: String,

    /// Unique code (generated when omitted)
    #[arg(long)]
    pub code: Option<String>,

    #[arg(long)]
    pub cost_center: Option<String>,

    #[command(flatten)]
    pub location: LocationArgs,

    #[command(flatten)]
    pub tech: BuildingTechArgs,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Building id or unique code
    pub id: String,

    /// New name; the old one is kept in the rename history
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Record a historical name so searches still find it (repeatable)
    #[arg(long = "previous-name", value_name = "NAME")]
    pub previous_names: Vec<String>,

    #[arg(long, short = 'a')]
    pub address: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long)]
    pub cost_center: Option<String>,

    #[command(flatten)]
    pub location: LocationArgs,

    #[command(flatten)]
    pub tech: BuildingTechArgs,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 12),
    ColumnDef::new("name", "NAME", 36),
    ColumnDef::new("address", "ADDRESS", 32),
    ColumnDef::new("plessi", "PLESSI", 8),
    ColumnDef::new("works", "WORKS", 7),
];

/// Run a building subcommand
pub fn run(cmd: BuildingCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        BuildingCommands::List(args) => run_list(args, global),
        BuildingCommands::Show(args) => run_show(args, global),
        BuildingCommands::New(args) => run_new(args, global),
        BuildingCommands::Edit(args) => run_edit(args, global),
        BuildingCommands::Delete(args) => run_delete(args, global),
    }
}

pub(crate) fn lookup<'a>(state: &'a AppState, reference: &str) -> Result<&'a Structure> {
    state
        .structure_by_ref(reference)
        .ok_or_else(|| miette::miette!("Building not found: {}", reference))
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::Buildings)?;
    let state = session.state();

    let mut buildings: Vec<&Structure> = state
        .structures
        .iter()
        .filter(|s| {
            args.matches(&[
                s.name.as_str(),
                s.unique_code.as_deref().unwrap_or_default(),
                s.address.as_str(),
            ])
        })
        .collect();
    buildings.sort_by(|a, b| a.unique_code.cmp(&b.unique_code).then(a.name.cmp(&b.name)));
    let buildings = args.finish(buildings);

    if args.count {
        println!("{}", buildings.len());
        return Ok(());
    }
    let format = resolve_format(global, &config);
    if print_structured_list(&buildings, format)? {
        return Ok(());
    }
    if buildings.is_empty() {
        println!("No buildings found.");
        return Ok(());
    }

    let rows: Vec<TableRow> = buildings
        .iter()
        .map(|s| {
            TableRow::new(s.id.as_str())
                .cell("code", CellValue::Code(s.unique_code.clone()))
                .cell("name", CellValue::Text(s.name.clone()))
                .cell("address", CellValue::Text(s.address.clone()))
                .cell("plessi", CellValue::Number(s.plessi.len() as i64))
                .cell(
                    "works",
                    CellValue::Number(state.interventions_for(&s.id).count() as i64),
                )
        })
        .collect();
    TableFormatter::new(COLUMNS, "building").output(&rows, format);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::Buildings)?;
    let state = session.state();
    let s = lookup(state, &args.id)?;

    if print_structured(s, resolve_format(global, &config))? {
        return Ok(());
    }

    println!(
        "{} {}",
        style(or_dash(s.unique_code.as_deref())).yellow(),
        style(&s.name).bold()
    );
    println!("{}", "-".repeat(60));
    println!("ID:          {}", style(&s.id).cyan());
    println!("Address:     {}", or_dash(Some(s.address.as_str())));
    println!("Cost center: {}", or_dash(s.cost_center.as_deref()));
    if let Some(loc) = &s.location {
        println!("Position:    {}", loc);
    }
    let formerly = former_names(s);
    if !formerly.is_empty() {
        println!("Formerly:    {}", formerly.join(" → "));
    }
    if !s.description.is_empty() {
        println!();
        println!("{}", s.description);
    }

    if !s.plessi.is_empty() {
        println!();
        println!("{}", style("Plessi").bold());
        for p in &s.plessi {
            println!(
                "  {:<12} {} ({} pertinenz{})",
                style(or_dash(p.unique_code.as_deref())).yellow(),
                p.name,
                p.pertinenze.len(),
                if p.pertinenze.len() == 1 { "a" } else { "e" }
            );
        }
    }

    let works: Vec<_> = state.interventions_for(&s.id).collect();
    if !works.is_empty() {
        println!();
        println!("{}", style("Interventions").bold());
        for i in works {
            println!(
                "  {:<12} CIG {:<12} {:>16}  {}",
                style(or_dash(i.unique_code.as_deref())).yellow(),
                i.tender_code,
                format_amount(i.amount),
                i.title
            );
        }
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;

    let mut s = Structure::new(args.name, args.address);
    s.description = args.description;
    s.unique_code = args.code.filter(|c| !c.trim().is_empty());
    s.cost_center = args.cost_center;
    s.location = args.location.coordinates();
    s.technical_data = args.tech.apply(None);
    let id = s.id.clone();

    dispatch(&mut session, Mutation::SaveStructure(s), global)?;

    if let Some(saved) = session.state().find_structure(&id) {
        if !global.quiet {
            println!(
                "{} Created building {}",
                style("✓").green(),
                style(or_dash(saved.unique_code.as_deref())).cyan()
            );
            println!("   Name: {}", style(&saved.name).yellow());
            println!("   ID:   {}", style(&saved.id).dim());
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let mut s = lookup(session.state(), &args.id)?.clone();

    if let Some(name) = args.name {
        s.name = name;
    }
    s.previous_names.extend(args.previous_names);
    if let Some(address) = args.address {
        s.address = address;
    }
    if let Some(description) = args.description {
        s.description = description;
    }
    if let Some(cc) = args.cost_center {
        s.cost_center = Some(cc).filter(|c| !c.trim().is_empty());
    }
    if let Some(loc) = args.location.coordinates() {
        s.location = Some(loc);
    }
    s.technical_data = args.tech.apply(s.technical_data.take());
    let code = s.unique_code.clone();

    let done = dispatch(&mut session, Mutation::SaveStructure(s), global)?;
    if !global.quiet {
        if done.save.is_none() {
            println!("Nothing to change.");
        } else {
            println!(
                "{} Updated building {}",
                style("✓").green(),
                style(or_dash(code.as_deref())).cyan()
            );
        }
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let s = lookup(session.state(), &args.id)?;
    let (id, name) = (s.id.clone(), s.name.clone());
    let linked = session.state().interventions_for(&id).count();

    let prompt = if linked > 0 {
        format!(
            "Delete building '{}'? {} intervention(s) will be left without a target",
            name, linked
        )
    } else {
        format!("Delete building '{}' and its plessi?", name)
    };
    let guard = admin_guard(&prompt, args.yes, args.password)?;
    if !guard.confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    dispatch(&mut session, Mutation::DeleteStructure { id, guard }, global)?;
    if !global.quiet {
        println!("{} Deleted building {}", style("✓").green(), style(name).cyan());
        if linked > 0 {
            println!(
                "   {} intervention(s) now orphaned; see {}",
                style(linked).yellow(),
                style("edilgest int purge-orphans").yellow()
            );
        }
    }
    Ok(())
}
