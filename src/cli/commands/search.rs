//! `edilgest search` command - Search across all registers

use miette::Result;

use crate::cli::commands::common::print_structured_list;
use crate::cli::helpers::{open_session, resolve_format};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::state::SearchHit;

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Text to look for in names, codes, route codes, CIGs and titles
    pub query: String,

    /// Limit number of results
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("kind", "TYPE", 11),
    ColumnDef::new("code", "CODE", 12),
    ColumnDef::new("name", "NAME", 48),
    ColumnDef::new("matched", "MATCHED", 14),
];

pub fn run(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    let user = session
        .state()
        .current_user()
        .ok_or_else(|| miette::miette!("no user is logged in (run 'edilgest login')"))?;
    tracing::debug!(user = %user.username, query = %args.query, "search");

    let mut hits: Vec<SearchHit> = session.state().search(&args.query);
    hits.truncate(args.limit);

    if args.count {
        println!("{}", hits.len());
        return Ok(());
    }
    let format = resolve_format(global, &config);
    if print_structured_list(&hits, format)? {
        return Ok(());
    }
    if hits.is_empty() {
        println!("No matches for '{}'.", args.query);
        return Ok(());
    }

    let rows: Vec<TableRow> = hits
        .iter()
        .map(|h| {
            TableRow::new(h.id.as_str())
                .cell("kind", CellValue::Text(h.kind.to_string()))
                .cell("code", CellValue::Code(h.code.clone()))
                .cell("name", CellValue::Text(h.name.clone()))
                .cell("matched", CellValue::Text(h.matched.to_string()))
        })
        .collect();
    TableFormatter::new(COLUMNS, "match").output(&rows, format);
    Ok(())
}
