//! `edilgest int` command - Works contracts (interventi)

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::common::{
    print_structured, print_structured_list, ConfirmDeleteArgs, ListArgs, LocationArgs, ShowArgs,
};
use crate::cli::helpers::{
    admin_guard, confirm_guard, dispatch, format_amount, open_session, or_dash, parse_date,
    require_section, resolve_format,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::mutation::Mutation;
use crate::core::state::AppState;
use crate::core::target::TargetRef;
use crate::entities::{Extension, Intervention, InterventionType, Section, Suspension};

#[derive(Subcommand, Debug)]
pub enum IntCommands {
    /// List interventions
    List(IntListArgs),

    /// Show an intervention
    Show(ShowArgs),

    /// Register a new intervention on an asset
    New(NewArgs),

    /// Change an intervention's fields
    Edit(EditArgs),

    /// Record a works suspension
    Suspend(SuspendArgs),

    /// Grant a contract time extension (proroga)
    Extend(ExtendArgs),

    /// Delete an intervention
    Delete(ConfirmDeleteArgs),

    /// Remove interventions whose target asset no longer exists (admin)
    PurgeOrphans(PurgeArgs),
}

#[derive(clap::Args, Debug)]
pub struct IntListArgs {
    /// Only interventions on this asset (id or unique code)
    #[arg(long, short = 't')]
    pub target: Option<String>,

    /// Filter by type (ordinary, extraordinary, maintenance, design-execution, design-only)
    #[arg(long = "type")]
    pub kind: Option<InterventionType>,

    /// Responsible person (substring match)
    #[arg(long)]
    pub rup: Option<String>,

    /// Only interventions whose target no longer exists
    #[arg(long)]
    pub orphans: bool,

    #[command(flatten)]
    pub list: ListArgs,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Tender code (CIG)
    #[arg(long)]
    pub cig: String,

    #[arg(long)]
    pub title: String,

    /// Target asset: id or unique code of a building, plesso, pertinenza or road
    #[arg(long, short = 't')]
    pub target: String,

    #[arg(long = "type", default_value = "ordinary")]
    pub kind: InterventionType,

    /// Formal object of the contract
    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Responsible person (RUP)
    #[arg(long)]
    pub rup: Option<String>,

    /// Contract amount in euro
    #[arg(long, default_value_t = 0.0)]
    pub amount: f64,

    #[command(flatten)]
    pub dates: DateArgs,

    /// Unique code (generated when omitted)
    #[arg(long)]
    pub code: Option<String>,

    #[command(flatten)]
    pub location: LocationArgs,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Intervention id or unique code
    pub id: String,

    #[arg(long)]
    pub cig: Option<String>,

    #[arg(long)]
    pub title: Option<String>,

    /// Move to another asset
    #[arg(long, short = 't')]
    pub target: Option<String>,

    #[arg(long = "type")]
    pub kind: Option<InterventionType>,

    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// New responsible person; the previous one goes to the history
    #[arg(long)]
    pub rup: Option<String>,

    #[arg(long)]
    pub amount: Option<f64>,

    #[command(flatten)]
    pub dates: DateArgs,

    #[command(flatten)]
    pub location: LocationArgs,
}

/// Contract milestones (YYYY-MM-DD)
#[derive(clap::Args, Debug, Default)]
pub struct DateArgs {
    /// Works handed over
    #[arg(long, value_parser = parse_date)]
    pub delivery: Option<NaiveDate>,

    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// Contractual execution date
    #[arg(long, value_parser = parse_date)]
    pub execution: Option<NaiveDate>,

    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Acceptance test (collaudo)
    #[arg(long, value_parser = parse_date)]
    pub test: Option<NaiveDate>,
}

impl DateArgs {
    fn apply(&self, i: &mut Intervention) {
        if self.delivery.is_some() {
            i.date_delivery = self.delivery;
        }
        if self.start.is_some() {
            i.date_start = self.start;
        }
        if self.execution.is_some() {
            i.date_execution = self.execution;
        }
        if self.end.is_some() {
            i.date_end = self.end;
        }
        if self.test.is_some() {
            i.date_test = self.test;
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct SuspendArgs {
    /// Intervention id or unique code
    pub id: String,

    /// First suspended day (default: today)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Resumption day; omit while still suspended
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    #[arg(long, default_value = "")]
    pub reason: String,
}

#[derive(clap::Args, Debug)]
pub struct ExtendArgs {
    /// Intervention id or unique code
    pub id: String,

    /// Days granted
    #[arg(long)]
    pub days: u32,

    #[arg(long, default_value = "")]
    pub reason: String,
}

#[derive(clap::Args, Debug)]
pub struct PurgeArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Security password (prompted when omitted)
    #[arg(long, env = "EDILGEST_SECURITY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 12),
    ColumnDef::new("cig", "CIG", 12),
    ColumnDef::new("title", "TITLE", 34),
    ColumnDef::new("target", "TARGET", 30),
    ColumnDef::new("amount", "AMOUNT", 16),
    ColumnDef::new("end", "END", 11),
];

pub fn run(cmd: IntCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        IntCommands::List(args) => run_list(args, global),
        IntCommands::Show(args) => run_show(args, global),
        IntCommands::New(args) => run_new(args, global),
        IntCommands::Edit(args) => run_edit(args, global),
        IntCommands::Suspend(args) => run_suspend(args, global),
        IntCommands::Extend(args) => run_extend(args, global),
        IntCommands::Delete(args) => run_delete(args, global),
        IntCommands::PurgeOrphans(args) => run_purge(args, global),
    }
}

pub(crate) fn lookup<'a>(state: &'a AppState, reference: &str) -> Result<&'a Intervention> {
    state
        .intervention_by_ref(reference)
        .ok_or_else(|| miette::miette!("Intervention not found: {}", reference))
}

fn target(state: &AppState, reference: &str) -> Result<TargetRef> {
    state
        .asset_by_ref(reference)
        .ok_or_else(|| miette::miette!("No building, plesso, pertinenza or road matches '{}'", reference))
}

fn run_list(args: IntListArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::Interventions)?;
    let state = session.state();

    let wanted_target = match &args.target {
        Some(reference) => Some(target(state, reference)?),
        None => None,
    };
    let orphans: Vec<&Intervention> = state.orphan_interventions();

    let mut items: Vec<&Intervention> = state
        .interventions
        .iter()
        .filter(|i| wanted_target.as_ref().map_or(true, |t| i.target.id == t.id))
        .filter(|i| args.kind.map_or(true, |k| i.kind == k))
        .filter(|i| {
            args.rup.as_ref().map_or(true, |rup| {
                i.responsible.to_lowercase().contains(&rup.to_lowercase())
            })
        })
        .filter(|i| !args.orphans || orphans.iter().any(|o| o.id == i.id))
        .filter(|i| {
            args.list.matches(&[
                i.tender_code.as_str(),
                i.title.as_str(),
                i.unique_code.as_deref().unwrap_or_default(),
            ])
        })
        .collect();
    items.sort_by(|a, b| a.unique_code.cmp(&b.unique_code).then(a.created_at.cmp(&b.created_at)));
    let items = args.list.finish(items);

    if args.list.count {
        println!("{}", items.len());
        return Ok(());
    }
    let format = resolve_format(global, &config);
    if print_structured_list(&items, format)? {
        return Ok(());
    }
    if items.is_empty() {
        println!("No interventions found.");
        return Ok(());
    }

    let rows: Vec<TableRow> = items
        .iter()
        .map(|i| {
            TableRow::new(i.id.as_str())
                .cell("code", CellValue::Code(i.unique_code.clone()))
                .cell("cig", CellValue::Text(i.tender_code.clone()))
                .cell("title", CellValue::Text(i.title.clone()))
                .cell("target", CellValue::Text(state.target_label(&i.target)))
                .cell("amount", CellValue::Amount(i.amount))
                .cell("end", CellValue::Date(i.effective_end()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "intervention").output(&rows, format);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::Interventions)?;
    let state = session.state();
    let i = lookup(state, &args.id)?;

    if print_structured(i, resolve_format(global, &config))? {
        return Ok(());
    }

    let today = Utc::now().date_naive();
    let resolved = state.resolve_target(&i.target);
    let date = |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());

    println!(
        "{} CIG {}",
        style(or_dash(i.unique_code.as_deref())).yellow(),
        style(&i.tender_code).bold()
    );
    println!("{}", "-".repeat(60));
    println!("Title:     {}", i.title);
    println!("Type:      {}", i.kind);
    if resolved.is_resolved() {
        println!("Target:    {}", resolved.label());
    } else {
        println!("Target:    {}", style(resolved.label()).red());
    }
    println!("RUP:       {}", or_dash(Some(i.responsible.as_str())));
    println!("Amount:    {}", format_amount(i.amount));
    println!("Start:     {}", date(i.date_start));
    println!("End:       {}", date(i.date_end));
    if !i.extensions.is_empty() {
        println!(
            "Extended:  +{} days → {}",
            i.extension_days(),
            date(i.effective_end())
        );
    }
    println!("Test:      {}", date(i.date_test));
    if i.is_suspended_on(today) {
        println!("Status:    {}", style("SUSPENDED").red().bold());
    }
    if !i.subject.is_empty() {
        println!();
        println!("{}", i.subject);
    }
    if !i.suspensions.is_empty() {
        println!();
        println!("{}", style("Suspensions").bold());
        for s in &i.suspensions {
            println!("  {} → {}  {}", s.start_date, date(s.end_date), s.reason);
        }
    }
    if !i.responsible_history.is_empty() {
        println!();
        println!("{}", style("Previous RUP").bold());
        for r in &i.responsible_history {
            println!("  {}  until {}", r.name, r.start_date);
        }
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let target = target(session.state(), &args.target)?;

    let mut i = Intervention::new(args.cig, args.title, target);
    i.kind = args.kind;
    i.subject = args.subject.unwrap_or_default();
    i.description = args.description.unwrap_or_default();
    i.responsible = args.rup.unwrap_or_default();
    i.amount = args.amount;
    i.unique_code = args.code.filter(|c| !c.trim().is_empty());
    i.location = args.location.coordinates();
    args.dates.apply(&mut i);
    let id = i.id.clone();

    dispatch(&mut session, Mutation::SaveIntervention(i), global)?;

    let state = session.state();
    if let Some(saved) = state.find_intervention(&id) {
        if !global.quiet {
            println!(
                "{} Created intervention {}",
                style("✓").green(),
                style(or_dash(saved.unique_code.as_deref())).cyan()
            );
            println!("   CIG:    {}", style(&saved.tender_code).yellow());
            println!("   Target: {}", state.target_label(&saved.target));
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let mut i = lookup(session.state(), &args.id)?.clone();

    if let Some(reference) = &args.target {
        i.target = target(session.state(), reference)?;
    }
    if let Some(cig) = args.cig {
        i.tender_code = cig;
    }
    if let Some(title) = args.title {
        i.title = title;
    }
    if let Some(kind) = args.kind {
        i.kind = kind;
    }
    if let Some(subject) = args.subject {
        i.subject = subject;
    }
    if let Some(description) = args.description {
        i.description = description;
    }
    if let Some(rup) = args.rup {
        i.responsible = rup;
    }
    if let Some(amount) = args.amount {
        i.amount = amount;
    }
    if let Some(loc) = args.location.coordinates() {
        i.location = Some(loc);
    }
    args.dates.apply(&mut i);
    let code = i.unique_code.clone();

    dispatch(&mut session, Mutation::SaveIntervention(i), global)?;
    if !global.quiet {
        println!(
            "{} Updated intervention {}",
            style("✓").green(),
            style(or_dash(code.as_deref())).cyan()
        );
    }
    Ok(())
}

fn run_suspend(args: SuspendArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let i = lookup(session.state(), &args.id)?;
    let (id, cig) = (i.id.clone(), i.tender_code.clone());

    let start = args.from.unwrap_or_else(|| Utc::now().date_naive());
    let suspension = Suspension::new(start, args.to, args.reason);
    dispatch(
        &mut session,
        Mutation::AddSuspension {
            intervention: id,
            suspension,
        },
        global,
    )?;
    if !global.quiet {
        let until = args.to.map_or_else(|| "further notice".to_string(), |d| d.to_string());
        println!(
            "{} CIG {} suspended from {} until {}",
            style("✓").green(),
            style(cig).cyan(),
            start,
            until
        );
    }
    Ok(())
}

fn run_extend(args: ExtendArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let id = lookup(session.state(), &args.id)?.id.clone();

    dispatch(
        &mut session,
        Mutation::AddExtension {
            intervention: id.clone(),
            extension: Extension::new(args.days, args.reason),
        },
        global,
    )?;
    if let Some(i) = session.state().find_intervention(&id) {
        if !global.quiet {
            let end = i
                .effective_end()
                .map_or_else(|| "no end date set".to_string(), |d| format!("now ends {}", d));
            println!(
                "{} CIG {} extended by {} day(s), {}",
                style("✓").green(),
                style(&i.tender_code).cyan(),
                args.days,
                end
            );
        }
    }
    Ok(())
}

fn run_delete(args: ConfirmDeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let i = lookup(session.state(), &args.id)?;
    let (id, cig) = (i.id.clone(), i.tender_code.clone());

    let guard = confirm_guard(&format!("Delete intervention CIG {}?", cig), args.yes)?;
    if !guard.confirmed {
        println!("Cancelled.");
        return Ok(());
    }
    dispatch(&mut session, Mutation::DeleteIntervention { id, guard }, global)?;
    if !global.quiet {
        println!("{} Deleted intervention CIG {}", style("✓").green(), style(cig).cyan());
    }
    Ok(())
}

fn run_purge(args: PurgeArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let orphans = session.state().orphan_interventions().len();
    if orphans == 0 {
        if !global.quiet {
            println!("No orphan interventions.");
        }
        return Ok(());
    }

    let prompt = format!(
        "Remove {} intervention(s) whose target no longer exists?",
        orphans
    );
    let guard = admin_guard(&prompt, args.yes, args.password)?;
    if !guard.confirmed {
        println!("Cancelled.");
        return Ok(());
    }
    dispatch(&mut session, Mutation::PurgeOrphanInterventions { guard }, global)?;
    if !global.quiet {
        println!(
            "{} Removed {} orphan intervention(s)",
            style("✓").green(),
            style(orphans).cyan()
        );
    }
    Ok(())
}
