//! `edilgest road` command - Provincial road register

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::common::{
    print_structured, print_structured_list, DeleteArgs, ListArgs, LocationArgs, RoadTechArgs,
    ShowArgs,
};
use crate::cli::helpers::{
    admin_guard, dispatch, format_amount, open_session, or_dash, require_section, resolve_format,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::mutation::Mutation;
use crate::core::state::AppState;
use crate::entities::{Road, Section};

#[derive(Subcommand, Debug)]
pub enum RoadCommands {
    /// List roads
    List(ListArgs),

    /// Show a road with its technical sheet
    Show(ShowArgs),

    /// Register a new road
    New(NewArgs),

    /// Change a road's fields
    Edit(EditArgs),

    /// Delete a road (admin, security password)
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Route code, e.g. "SP 2"
    #[arg(long, short = 'c')]
    pub route: String,

    #[arg(long, short = 'n')]
    pub name: String,

    /// Length in km
    #[arg(long, short = 'l', default_value_t = 0.0)]
    pub length: f64,

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
    pub tech: RoadTechArgs,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Road id, unique code or route code
    pub id: String,

    #[arg(long, short = 'c')]
    pub route: Option<String>,

    #[arg(long, short = 'n')]
    pub name: Option<String>,

    #[arg(long, short = 'l')]
    pub length: Option<f64>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long)]
    pub cost_center: Option<String>,

    #[command(flatten)]
    pub location: LocationArgs,

    #[command(flatten)]
    pub tech: RoadTechArgs,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 12),
    ColumnDef::new("route", "ROUTE", 8),
    ColumnDef::new("name", "NAME", 40),
    ColumnDef::new("km", "KM", 8),
    ColumnDef::new("works", "WORKS", 7),
];

pub fn run(cmd: RoadCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        RoadCommands::List(args) => run_list(args, global),
        RoadCommands::Show(args) => run_show(args, global),
        RoadCommands::New(args) => run_new(args, global),
        RoadCommands::Edit(args) => run_edit(args, global),
        RoadCommands::Delete(args) => run_delete(args, global),
    }
}

fn lookup<'a>(state: &'a AppState, reference: &str) -> Result<&'a Road> {
    state
        .road_by_ref(reference)
        .ok_or_else(|| miette::miette!("Road not found: {}", reference))
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::Roads)?;
    let state = session.state();

    let mut roads: Vec<&Road> = state
        .roads
        .iter()
        .filter(|r| {
            args.matches(&[
                r.code.as_str(),
                r.name.as_str(),
                r.unique_code.as_deref().unwrap_or_default(),
            ])
        })
        .collect();
    roads.sort_by(|a, b| a.unique_code.cmp(&b.unique_code).then(a.code.cmp(&b.code)));
    let roads = args.finish(roads);

    if args.count {
        println!("{}", roads.len());
        return Ok(());
    }
    let format = resolve_format(global, &config);
    if print_structured_list(&roads, format)? {
        return Ok(());
    }
    if roads.is_empty() {
        println!("No roads found.");
        return Ok(());
    }

    let rows: Vec<TableRow> = roads
        .iter()
        .map(|r| {
            TableRow::new(r.id.as_str())
                .cell("code", CellValue::Code(r.unique_code.clone()))
                .cell("route", CellValue::Text(r.code.clone()))
                .cell("name", CellValue::Text(r.name.clone()))
                .cell("km", CellValue::Float(r.length_km, 1))
                .cell(
                    "works",
                    CellValue::Number(state.interventions_for(&r.id).count() as i64),
                )
        })
        .collect();
    TableFormatter::new(COLUMNS, "road").output(&rows, format);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::Roads)?;
    let state = session.state();
    let r = lookup(state, &args.id)?;

    if print_structured(r, resolve_format(global, &config))? {
        return Ok(());
    }

    println!(
        "{} {}",
        style(or_dash(r.unique_code.as_deref())).yellow(),
        style(r.label()).bold()
    );
    println!("{}", "-".repeat(60));
    println!("ID:          {}", style(&r.id).cyan());
    println!("Length:      {:.1} km", r.length_km);
    println!("Cost center: {}", or_dash(r.cost_center.as_deref()));
    if let Some(loc) = &r.location {
        println!("Position:    {}", loc);
    }
    if let Some(tech) = &r.technical_data {
        println!("Pavement:    {}", or_dash(tech.pavement_type.as_deref()));
        if let Some(w) = tech.average_width {
            println!("Width:       {:.1} m", w);
        }
        if let Some(area) = tech.surface_area {
            println!("Surface:     {:.0} m²", area);
        }
        if let Some(status) = tech.maintenance_status {
            println!("Condition:   {}", status);
        }
    }
    if !r.description.is_empty() {
        println!();
        println!("{}", r.description);
    }

    let works: Vec<_> = state.interventions_for(&r.id).collect();
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

    let mut r = Road::new(args.route, args.name, args.length);
    r.description = args.description;
    r.unique_code = args.code.filter(|c| !c.trim().is_empty());
    r.cost_center = args.cost_center;
    r.location = args.location.coordinates();
    r.technical_data = args.tech.apply(None, r.length_km);
    let id = r.id.clone();

    dispatch(&mut session, Mutation::SaveRoad(r), global)?;

    if let Some(saved) = session.state().find_road(&id) {
        if !global.quiet {
            println!(
                "{} Created road {}",
                style("✓").green(),
                style(or_dash(saved.unique_code.as_deref())).cyan()
            );
            println!("   {}", style(saved.label()).yellow());
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let mut r = lookup(session.state(), &args.id)?.clone();

    if let Some(route) = args.route {
        r.code = route;
    }
    if let Some(name) = args.name {
        r.name = name;
    }
    if let Some(length) = args.length {
        r.length_km = length;
    }
    if let Some(description) = args.description {
        r.description = description;
    }
    if let Some(cc) = args.cost_center {
        r.cost_center = Some(cc).filter(|c| !c.trim().is_empty());
    }
    if let Some(loc) = args.location.coordinates() {
        r.location = Some(loc);
    }
    r.technical_data = args.tech.apply(r.technical_data.take(), r.length_km);
    let label = r.label();

    dispatch(&mut session, Mutation::SaveRoad(r), global)?;
    if !global.quiet {
        println!("{} Updated road {}", style("✓").green(), style(label).cyan());
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let r = lookup(session.state(), &args.id)?;
    let (id, label) = (r.id.clone(), r.label());
    let linked = session.state().interventions_for(&id).count();

    let prompt = if linked > 0 {
        format!(
            "Delete road '{}'? {} intervention(s) will be left without a target",
            label, linked
        )
    } else {
        format!("Delete road '{}'?", label)
    };
    let guard = admin_guard(&prompt, args.yes, args.password)?;
    if !guard.confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    dispatch(&mut session, Mutation::DeleteRoad { id, guard }, global)?;
    if !global.quiet {
        println!("{} Deleted road {}", style("✓").green(), style(label).cyan());
    }
    Ok(())
}
