//! `edilgest plesso` command - Units inside a building

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::building;
use crate::cli::commands::common::{
    print_structured, print_structured_list, BuildingTechArgs, DeleteArgs, ListArgs, ShowArgs,
};
use crate::cli::helpers::{
    admin_guard, dispatch, open_session, or_dash, require_section, resolve_format,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::entity::former_names;
use crate::core::mutation::Mutation;
use crate::core::state::AppState;
use crate::entities::{Plesso, Section, Structure};

#[derive(Subcommand, Debug)]
pub enum PlessoCommands {
    /// List plessi, optionally of one building
    List(PlessoListArgs),

    /// Show a plesso with its pertinenze
    Show(ShowArgs),

    /// Add a plesso to a building
    New(NewArgs),

    /// Change a plesso, or move it to another building
    Edit(EditArgs),

    /// Delete a plesso (admin, security password)
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct PlessoListArgs {
    /// Only plessi of this building (id or code)
    #[arg(long, short = 'b')]
    pub building: Option<String>,

    #[command(flatten)]
    pub list: ListArgs,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Owning building (id or code)
    #[arg(long, short = 'b')]
    pub building: String,

    #[arg(long, short = 'n')]
    pub name: String,

    #[arg(long, short = 'd', default_value = "")]
    pub description: String,

    /// Unique code (generated when omitted)
    #[arg(long)]
    pub code: Option<String>,

    #[arg(long)]
    pub cost_center: Option<String>,

    #[command(flatten)]
    pub tech: BuildingTechArgs,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Plesso id or unique code
    pub id: String,

    /// New name; the old one is kept in the rename history
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Record a historical name so searches still find it (repeatable)
    #[arg(long = "previous-name", value_name = "NAME")]
    pub previous_names: Vec<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long)]
    pub cost_center: Option<String>,

    /// Move to another building (id or code)
    #[arg(long, short = 'b')]
    pub building: Option<String>,

    #[command(flatten)]
    pub tech: BuildingTechArgs,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 12),
    ColumnDef::new("name", "NAME", 32),
    ColumnDef::new("building", "BUILDING", 32),
    ColumnDef::new("pertinenze", "PERTINENZE", 11),
];

pub fn run(cmd: PlessoCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PlessoCommands::List(args) => run_list(args, global),
        PlessoCommands::Show(args) => run_show(args, global),
        PlessoCommands::New(args) => run_new(args, global),
        PlessoCommands::Edit(args) => run_edit(args, global),
        PlessoCommands::Delete(args) => run_delete(args, global),
    }
}

pub(crate) fn lookup<'a>(state: &'a AppState, reference: &str) -> Result<(&'a Structure, &'a Plesso)> {
    state
        .plesso_by_ref(reference)
        .ok_or_else(|| miette::miette!("Plesso not found: {}", reference))
}

fn run_list(args: PlessoListArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::Buildings)?;
    let state = session.state();

    let parent = match &args.building {
        Some(reference) => Some(building::lookup(state, reference)?.id.clone()),
        None => None,
    };
    let plessi: Vec<(&Structure, &Plesso)> = state
        .plessi()
        .filter(|(s, _)| parent.as_ref().map_or(true, |id| &s.id == id))
        .filter(|(_, p)| {
            args.list
                .matches(&[p.name.as_str(), p.unique_code.as_deref().unwrap_or_default()])
        })
        .collect();
    let plessi = args.list.finish(plessi);

    if args.list.count {
        println!("{}", plessi.len());
        return Ok(());
    }
    let format = resolve_format(global, &config);
    let records: Vec<&Plesso> = plessi.iter().map(|(_, p)| *p).collect();
    if print_structured_list(&records, format)? {
        return Ok(());
    }
    if plessi.is_empty() {
        println!("No plessi found.");
        return Ok(());
    }

    let rows: Vec<TableRow> = plessi
        .iter()
        .map(|(s, p)| {
            TableRow::new(p.id.as_str())
                .cell("code", CellValue::Code(p.unique_code.clone()))
                .cell("name", CellValue::Text(p.name.clone()))
                .cell("building", CellValue::Text(s.name.clone()))
                .cell("pertinenze", CellValue::Number(p.pertinenze.len() as i64))
        })
        .collect();
    TableFormatter::new(COLUMNS, "plesso").output(&rows, format);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::Buildings)?;
    let state = session.state();
    let (s, p) = lookup(state, &args.id)?;

    if print_structured(p, resolve_format(global, &config))? {
        return Ok(());
    }

    println!(
        "{} {}",
        style(or_dash(p.unique_code.as_deref())).yellow(),
        style(&p.name).bold()
    );
    println!("{}", "-".repeat(60));
    println!("ID:          {}", style(&p.id).cyan());
    println!(
        "Building:    {} ({})",
        s.name,
        or_dash(s.unique_code.as_deref())
    );
    println!("Cost center: {}", or_dash(p.cost_center.as_deref()));
    let formerly = former_names(p);
    if !formerly.is_empty() {
        println!("Formerly:    {}", formerly.join(" → "));
    }
    if !p.description.is_empty() {
        println!();
        println!("{}", p.description);
    }
    if !p.pertinenze.is_empty() {
        println!();
        println!("{}", style("Pertinenze").bold());
        for x in &p.pertinenze {
            println!("  {:<28} {}", style(&x.id).dim(), x.name);
        }
    }
    let works = state.interventions_for(&p.id).count();
    if works > 0 {
        println!();
        println!("{} intervention(s) on this plesso", style(works).cyan());
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let parent = building::lookup(session.state(), &args.building)?;
    let parent_name = parent.name.clone();

    let mut p = Plesso::new(parent.id.clone(), args.name);
    p.description = args.description;
    p.unique_code = args.code.filter(|c| !c.trim().is_empty());
    p.cost_center = args.cost_center;
    p.technical_data = args.tech.apply(None);
    let id = p.id.clone();

    dispatch(&mut session, Mutation::SavePlesso(p), global)?;

    if let Some((_, saved)) = session.state().find_plesso(&id) {
        if !global.quiet {
            println!(
                "{} Created plesso {} in {}",
                style("✓").green(),
                style(or_dash(saved.unique_code.as_deref())).cyan(),
                style(parent_name).yellow()
            );
            println!("   Name: {}", style(&saved.name).yellow());
            println!("   ID:   {}", style(&saved.id).dim());
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let mut p = lookup(session.state(), &args.id)?.1.clone();

    if let Some(reference) = &args.building {
        p.structure_id = building::lookup(session.state(), reference)?.id.clone();
    }
    if let Some(name) = args.name {
        p.name = name;
    }
    p.previous_names.extend(args.previous_names);
    if let Some(description) = args.description {
        p.description = description;
    }
    if let Some(cc) = args.cost_center {
        p.cost_center = Some(cc).filter(|c| !c.trim().is_empty());
    }
    p.technical_data = args.tech.apply(p.technical_data.take());
    let code = p.unique_code.clone();

    let done = dispatch(&mut session, Mutation::SavePlesso(p), global)?;
    if !global.quiet {
        if done.save.is_none() {
            println!("Nothing to change.");
        } else {
            println!(
                "{} Updated plesso {}",
                style("✓").green(),
                style(or_dash(code.as_deref())).cyan()
            );
        }
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let (s, p) = lookup(session.state(), &args.id)?;
    let (id, name) = (p.id.clone(), p.name.clone());
    let prompt = format!("Delete plesso '{}' from '{}'?", name, s.name);

    let guard = admin_guard(&prompt, args.yes, args.password)?;
    if !guard.confirmed {
        println!("Cancelled.");
        return Ok(());
    }
    dispatch(&mut session, Mutation::DeletePlesso { id, guard }, global)?;
    if !global.quiet {
        println!("{} Deleted plesso {}", style("✓").green(), style(name).cyan());
    }
    Ok(())
}
