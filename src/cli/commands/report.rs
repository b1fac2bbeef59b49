//! `edilgest report` command - Intervention reports, deadlines, dashboard and sheets

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::intervention;
use crate::cli::helpers::{format_amount, open_session, parse_date, require_section, truncate_str};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::report::{
    dashboard, summarize, upcoming_deadlines, DeadlineKind, InterventionFilter, SheetRenderer,
};
use crate::entities::{InterventionType, Section};

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Filtered intervention list with count, total and average amount
    Interventions(InterventionsArgs),

    /// Start, end and test dates inside the notification window
    Deadlines(DeadlinesArgs),

    /// Registry totals
    Dashboard(DashboardArgs),

    /// Printable sheet for one intervention
    Sheet(SheetArgs),
}

#[derive(clap::Args, Debug)]
pub struct InterventionsArgs {
    /// Only interventions on this asset (id or unique code)
    #[arg(long, short = 't')]
    pub target: Option<String>,

    #[arg(long = "type")]
    pub kind: Option<InterventionType>,

    /// Responsible person (substring match)
    #[arg(long)]
    pub rup: Option<String>,

    /// Start date on or after
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// End date on or before
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    #[arg(long)]
    pub min_amount: Option<f64>,

    #[arg(long)]
    pub max_amount: Option<f64>,

    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct DeadlinesArgs {
    /// Reference day (default: today)
    #[arg(long, value_parser = parse_date)]
    pub today: Option<NaiveDate>,

    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct DashboardArgs {
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct SheetArgs {
    /// Intervention id or unique code
    pub id: String,

    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const DEADLINE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("date", "DATE", 11),
    ColumnDef::new("days", "DAYS", 5),
    ColumnDef::new("event", "EVENT", 40),
];

pub fn run(cmd: ReportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReportCommands::Interventions(args) => run_interventions(args, global),
        ReportCommands::Deadlines(args) => run_deadlines(args, global),
        ReportCommands::Dashboard(args) => run_dashboard(args, global),
        ReportCommands::Sheet(args) => run_sheet(args, global),
    }
}

fn write_output(content: &str, output_path: Option<PathBuf>, global: &GlobalOpts) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            if !global.quiet {
                println!("Report written to: {}", path.display());
            }
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn date(d: Option<NaiveDate>) -> String {
    d.map_or_else(|| "-".to_string(), |d| d.format("%d/%m/%Y").to_string())
}

fn run_interventions(args: InterventionsArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, session) = open_session(global)?;
    require_section(&session, Section::Reports)?;
    let state = session.state();

    let target = match &args.target {
        Some(reference) => Some(
            state
                .asset_by_ref(reference)
                .ok_or_else(|| miette::miette!("No asset matches '{}'", reference))?
                .id,
        ),
        None => None,
    };
    let filter = InterventionFilter {
        target,
        kind: args.kind,
        responsible: args.rup,
        start_from: args.from,
        end_to: args.to,
        min_amount: args.min_amount,
        max_amount: args.max_amount,
    };
    let mut items = filter.apply(state);
    items.sort_by(|a, b| a.date_start.cmp(&b.date_start).then(a.tender_code.cmp(&b.tender_code)));
    let summary = summarize(&items);

    if global.format == OutputFormat::Json {
        let out = serde_json::json!({ "summary": summary, "interventions": items });
        println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
        return Ok(());
    }

    let mut output = String::new();
    output.push_str("# Report interventi\n\n");

    output.push_str("## Riepilogo\n\n");
    let mut totals = Builder::default();
    totals.push_record(["Voce", "Valore"]);
    totals.push_record(["Interventi".to_string(), summary.count.to_string()]);
    totals.push_record(["Importo totale".to_string(), format_amount(summary.total)]);
    totals.push_record(["Importo medio".to_string(), format_amount(summary.average)]);
    output.push_str(&totals.build().with(Style::markdown()).to_string());
    output.push('\n');

    if !items.is_empty() {
        output.push_str("\n## Dettaglio\n\n");
        let mut table = Builder::default();
        table.push_record(["CIG", "Titolo", "Asset", "Tipologia", "RUP", "Inizio", "Fine", "Importo"]);
        for i in &items {
            table.push_record([
                i.tender_code.clone(),
                truncate_str(&i.title, 40),
                state.target_label(&i.target),
                i.kind.to_string(),
                i.responsible.clone(),
                date(i.date_start),
                date(i.effective_end()),
                format_amount(i.amount),
            ]);
        }
        output.push_str(&table.build().with(Style::markdown()).to_string());
        output.push('\n');
    }

    write_output(&output, args.output, global)
}

fn run_deadlines(args: DeadlinesArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, session) = open_session(global)?;
    require_section(&session, Section::Dashboard)?;
    let state = session.state();
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());
    let alerts = upcoming_deadlines(state, today);

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&alerts).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Tsv | OutputFormat::Csv | OutputFormat::Id => {
            let rows: Vec<TableRow> = alerts
                .iter()
                .map(|d| {
                    TableRow::new(d.intervention_id.as_str())
                        .cell("date", CellValue::Date(Some(d.date)))
                        .cell("days", CellValue::DaysLeft(d.days_left))
                        .cell("event", CellValue::Text(d.message.clone()))
                })
                .collect();
            TableFormatter::new(DEADLINE_COLUMNS, "deadline")
                .without_summary()
                .output(&rows, global.format);
            return Ok(());
        }
        _ => {}
    }

    let days = state.notification_settings.days_before_deadline;
    let mut output = String::new();
    output.push_str(&format!(
        "# Scadenze entro {} giorni dal {}\n\n",
        days,
        today.format("%d/%m/%Y")
    ));
    if alerts.is_empty() {
        output.push_str("Nessuna scadenza imminente.\n");
        return write_output(&output, args.output, global);
    }

    let mut table = Builder::default();
    table.push_record(["Data", "Giorni", "Evento", "Asset"]);
    for d in &alerts {
        let asset = state
            .find_intervention(&d.intervention_id)
            .map(|i| state.target_label(&i.target))
            .unwrap_or_default();
        let left = match (d.days_left, d.kind) {
            (0, _) => "oggi".to_string(),
            (n, DeadlineKind::Test) => format!("{} (collaudo)", n),
            (n, _) => n.to_string(),
        };
        table.push_record([d.date.format("%d/%m/%Y").to_string(), left, d.message.clone(), asset]);
    }
    output.push_str(&table.build().with(Style::markdown()).to_string());
    output.push('\n');
    write_output(&output, args.output, global)
}

fn run_dashboard(args: DashboardArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, session) = open_session(global)?;
    require_section(&session, Section::Dashboard)?;
    let today = Utc::now().date_naive();
    let dash = dashboard(session.state(), today);

    if global.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&dash).into_diagnostic()?);
        return Ok(());
    }

    let mut output = String::new();
    output.push_str("# Dashboard\n\n");
    let mut assets = Builder::default();
    assets.push_record(["Registro", "Totale"]);
    assets.push_record(["Immobili".to_string(), dash.structures.to_string()]);
    assets.push_record(["Plessi".to_string(), dash.plessi.to_string()]);
    assets.push_record(["Pertinenze".to_string(), dash.pertinenze.to_string()]);
    assets.push_record(["Strade".to_string(), dash.roads.to_string()]);
    assets.push_record(["Km di strade".to_string(), format!("{:.1}", dash.road_km)]);
    assets.push_record(["Interventi".to_string(), dash.interventions.to_string()]);
    assets.push_record(["Importo complessivo".to_string(), format_amount(dash.total_amount)]);
    output.push_str(&assets.build().with(Style::markdown()).to_string());
    output.push('\n');

    output.push_str("\n## Interventi per tipologia\n\n");
    let mut by_type = Builder::default();
    by_type.push_record(["Tipologia", "Numero", "Importo"]);
    for t in &dash.by_type {
        by_type.push_record([t.kind.to_string(), t.count.to_string(), format_amount(t.amount)]);
    }
    output.push_str(&by_type.build().with(Style::markdown()).to_string());
    output.push('\n');

    if dash.orphans > 0 || dash.suspended_today > 0 {
        output.push('\n');
        if dash.suspended_today > 0 {
            output.push_str(&format!("- Interventi sospesi oggi: {}\n", dash.suspended_today));
        }
        if dash.orphans > 0 {
            output.push_str(&format!(
                "- Interventi senza asset di riferimento: {} (edilgest int purge-orphans)\n",
                dash.orphans
            ));
        }
    }
    write_output(&output, args.output, global)
}

fn run_sheet(args: SheetArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, session) = open_session(global)?;
    require_section(&session, Section::Reports)?;
    let state = session.state();
    let i = intervention::lookup(state, &args.id)?;

    let renderer = SheetRenderer::new().map_err(|e| miette::miette!("{}", e))?;
    let sheet = renderer
        .intervention_sheet(state, i, Utc::now().date_naive())
        .map_err(|e| miette::miette!("{}", e))?;
    write_output(&sheet, args.output, global)
}
