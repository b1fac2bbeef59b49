//! `edilgest registry` command - Technical registry of buildings, plessi and roads

use clap::ValueEnum;
use miette::Result;

use crate::cli::commands::common::{print_structured_list, ListArgs};
use crate::cli::helpers::{open_session, require_section, resolve_format};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::registry::{cost_centers, AssetKind, RegistryCategory, RegistryFilter};
use crate::entities::{MaintenanceStatus, Section};

#[derive(clap::Args, Debug)]
pub struct RegistryArgs {
    /// List roads instead of buildings and plessi
    #[arg(long)]
    pub roads: bool,

    /// Only buildings or only plessi
    #[arg(long = "type", value_enum, conflicts_with = "roads")]
    pub kind: Option<BuildingKind>,

    /// Only assets charged to this cost center
    #[arg(long)]
    pub cost_center: Option<String>,

    /// Road condition (ottimo, buono, sufficiente, degradato); implies --roads
    #[arg(long, conflicts_with = "kind")]
    pub status: Option<MaintenanceStatus>,

    /// Print the cost centers in use instead of the assets
    #[arg(long)]
    pub cost_centers: bool,

    #[command(flatten)]
    pub list: ListArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildingKind {
    /// Buildings (fabbricati)
    Structure,
    /// Units inside a building
    Plesso,
}

impl From<BuildingKind> for AssetKind {
    fn from(kind: BuildingKind) -> Self {
        match kind {
            BuildingKind::Structure => AssetKind::Structure,
            BuildingKind::Plesso => AssetKind::Plesso,
        }
    }
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 12),
    ColumnDef::new("kind", "TYPE", 10),
    ColumnDef::new("name", "NAME", 32),
    ColumnDef::new("context", "IN / ADDRESS", 28),
    ColumnDef::new("cost_center", "COST CENTER", 18),
    ColumnDef::new("surface", "SURFACE", 9),
    ColumnDef::new("status", "STATUS", 11),
    ColumnDef::new("works", "WORKS", 6),
];

pub fn run(args: RegistryArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::TechRegistry)?;
    let state = session.state();

    let category = if args.roads || args.status.is_some() {
        RegistryCategory::Roads
    } else {
        RegistryCategory::Buildings
    };

    if args.cost_centers {
        for cc in cost_centers(state, category) {
            println!("{}", cc);
        }
        return Ok(());
    }

    let filter = RegistryFilter {
        category,
        text: args.list.search.clone(),
        cost_center: args.cost_center.clone(),
        kind: args.kind.map(AssetKind::from),
        road_status: args.status,
    };
    let assets = args.list.finish(filter.apply(state));

    if args.list.count {
        println!("{}", assets.len());
        return Ok(());
    }
    let format = resolve_format(global, &config);
    if print_structured_list(&assets, format)? {
        return Ok(());
    }
    if assets.is_empty() {
        println!("No assets match the filters.");
        return Ok(());
    }

    let rows: Vec<TableRow> = assets
        .iter()
        .map(|a| {
            let surface = match a.surface_area() {
                Some(m2) => CellValue::Float(m2, 0),
                None => CellValue::Text("-".to_string()),
            };
            TableRow::new(a.id.as_str())
                .cell("code", CellValue::Code(a.unique_code.clone()))
                .cell("kind", CellValue::Text(a.kind.to_string()))
                .cell("name", CellValue::Text(a.name.clone()))
                .cell("context", CellValue::Text(a.context().unwrap_or("-").to_string()))
                .cell(
                    "cost_center",
                    CellValue::Text(a.cost_center.clone().unwrap_or_else(|| "-".to_string())),
                )
                .cell("surface", surface)
                .cell(
                    "status",
                    CellValue::Text(
                        a.maintenance_status()
                            .map_or_else(|| "-".to_string(), |s| s.to_string()),
                    ),
                )
                .cell("works", CellValue::Number(a.interventions as i64))
        })
        .collect();
    TableFormatter::new(COLUMNS, "asset").output(&rows, format);
    Ok(())
}
