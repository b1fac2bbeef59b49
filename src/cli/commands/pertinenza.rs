//! `edilgest pertinenza` command - Minor sub-assets of a plesso

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::common::{print_structured_list, ConfirmDeleteArgs};
use crate::cli::commands::plesso;
use crate::cli::helpers::{confirm_guard, dispatch, open_session, require_section, resolve_format};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::identity::EntityId;
use crate::core::mutation::Mutation;
use crate::core::state::AppState;
use crate::entities::{Pertinenza, Section};

#[derive(Subcommand, Debug)]
pub enum PertinenzaCommands {
    /// List the pertinenze of a plesso
    List(ListArgs),

    /// Add a pertinenza to a plesso
    New(NewArgs),

    /// Rename or move a pertinenza
    Edit(EditArgs),

    /// Delete a pertinenza
    Delete(ConfirmDeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Plesso id or code
    pub plesso: String,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Owning plesso (id or code)
    #[arg(long, short = 'p')]
    pub plesso: String,

    #[arg(long, short = 'n')]
    pub name: String,

    #[arg(long, short = 'd', default_value = "")]
    pub description: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Pertinenza id
    pub id: String,

    #[arg(long, short = 'n')]
    pub name: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Move to another plesso (id or code)
    #[arg(long, short = 'p')]
    pub plesso: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 18),
    ColumnDef::new("name", "NAME", 32),
    ColumnDef::new("description", "DESCRIPTION", 40),
];

pub fn run(cmd: PertinenzaCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PertinenzaCommands::List(args) => run_list(args, global),
        PertinenzaCommands::New(args) => run_new(args, global),
        PertinenzaCommands::Edit(args) => run_edit(args, global),
        PertinenzaCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::Buildings)?;
    let (_, p) = plesso::lookup(session.state(), &args.plesso)?;

    let format = resolve_format(global, &config);
    if print_structured_list(&p.pertinenze, format)? {
        return Ok(());
    }
    if p.pertinenze.is_empty() {
        println!("No pertinenze in {}.", p.name);
        return Ok(());
    }
    let rows: Vec<TableRow> = p
        .pertinenze
        .iter()
        .map(|x| {
            TableRow::new(x.id.as_str())
                .cell("id", CellValue::Id(x.id.to_string()))
                .cell("name", CellValue::Text(x.name.clone()))
                .cell("description", CellValue::Text(x.description.clone()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "pertinenza").output(&rows, format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let (_, parent) = plesso::lookup(session.state(), &args.plesso)?;
    let parent_name = parent.name.clone();

    let mut x = Pertinenza::new(parent.id.clone(), args.name);
    x.description = args.description;
    let id = x.id.clone();

    dispatch(&mut session, Mutation::SavePertinenza(x), global)?;
    if !global.quiet {
        println!(
            "{} Created pertinenza {} in {}",
            style("✓").green(),
            style(&id).cyan(),
            style(parent_name).yellow()
        );
    }
    Ok(())
}

fn find(state: &AppState, id: &str) -> Result<Pertinenza> {
    state
        .find_pertinenza(&EntityId::from_raw(id.trim()))
        .map(|(_, _, x)| x.clone())
        .ok_or_else(|| miette::miette!("Pertinenza not found: {}", id))
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let mut x = find(session.state(), &args.id)?;

    if let Some(reference) = &args.plesso {
        x.plesso_id = plesso::lookup(session.state(), reference)?.1.id.clone();
    }
    if let Some(name) = args.name {
        x.name = name;
    }
    if let Some(description) = args.description {
        x.description = description;
    }
    let name = x.name.clone();

    dispatch(&mut session, Mutation::SavePertinenza(x), global)?;
    if !global.quiet {
        println!("{} Updated pertinenza {}", style("✓").green(), style(name).cyan());
    }
    Ok(())
}

fn run_delete(args: ConfirmDeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let x = find(session.state(), &args.id)?;

    let guard = confirm_guard(&format!("Delete pertinenza '{}'?", x.name), args.yes)?;
    if !guard.confirmed {
        println!("Cancelled.");
        return Ok(());
    }
    dispatch(
        &mut session,
        Mutation::DeletePertinenza {
            id: x.id.clone(),
            guard,
        },
        global,
    )?;
    if !global.quiet {
        println!("{} Deleted pertinenza {}", style("✓").green(), style(&x.name).cyan());
    }
    Ok(())
}
