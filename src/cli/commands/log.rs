//! `edilgest log` command - Audit trail

use miette::Result;

use crate::cli::commands::common::print_structured_list;
use crate::cli::helpers::{open_session, require_section, resolve_format};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::audit::{AuditAction, AuditLogEntry};
use crate::entities::Section;

#[derive(clap::Args, Debug)]
pub struct LogArgs {
    /// Number of entries to show (newest first)
    #[arg(long, short = 'n', default_value_t = 50)]
    pub limit: usize,

    /// Only this action (create, update, delete, purge, login)
    #[arg(long, short = 'a')]
    pub action: Option<AuditAction>,

    /// Only this record type (e.g. Immobile, Strada, Intervento)
    #[arg(long, short = 't')]
    pub entity_type: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("when", "WHEN", 17),
    ColumnDef::new("action", "ACTION", 7),
    ColumnDef::new("type", "TYPE", 14),
    ColumnDef::new("details", "DETAILS", 60),
];

pub fn run(args: LogArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::History)?;

    let entries: Vec<&AuditLogEntry> = session
        .state()
        .audit_logs
        .iter()
        .filter(|e| args.action.map_or(true, |a| e.action == a))
        .filter(|e| {
            args.entity_type
                .as_ref()
                .map_or(true, |t| e.entity_type.eq_ignore_ascii_case(t.trim()))
        })
        .take(args.limit)
        .collect();

    let format = resolve_format(global, &config);
    if print_structured_list(&entries, format)? {
        return Ok(());
    }
    if entries.is_empty() {
        println!("No audit entries.");
        return Ok(());
    }

    let rows: Vec<TableRow> = entries
        .iter()
        .map(|e| {
            TableRow::new(e.id.as_str())
                .cell("when", CellValue::DateTime(e.timestamp))
                .cell("action", CellValue::Action(e.action))
                .cell("type", CellValue::Text(e.entity_type.clone()))
                .cell("details", CellValue::Text(e.details.clone()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "entry").output(&rows, format);
    Ok(())
}
