//! `edilgest import` command - Load registers from CSV files

use chrono::Utc;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::{dispatch, open_session, require_section};
use crate::cli::GlobalOpts;
use crate::core::mutation::Mutation;
use crate::csv::{plan_import, ImportKind};
use crate::entities::Section;

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Record type (structures, plessi, roads, interventions)
    pub kind: ImportKind,

    /// CSV file to import
    pub file: Option<PathBuf>,

    /// Print the CSV template for the record type instead
    #[arg(long)]
    pub template: bool,

    /// Parse and report without saving
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    if args.template {
        print!("{}", args.kind.template());
        return Ok(());
    }

    let path = args.file.ok_or_else(|| {
        miette::miette!(
            "CSV file required. Usage: edilgest import {} <FILE>, or --template for a sample",
            args.kind
        )
    })?;
    let text = fs::read_to_string(&path).into_diagnostic()?;

    let (_ws, _config, mut session) = open_session(global)?;
    require_section(&session, Section::CsvImport)?;

    let plan = plan_import(args.kind, &text, session.state(), Utc::now())
        .map_err(|e| miette::miette!("{}", e))?;
    tracing::debug!(
        kind = %args.kind,
        rows = plan.rows(),
        rejected = plan.errors.len(),
        "import planned"
    );

    if !global.quiet {
        for err in &plan.errors {
            eprintln!(
                "{} line {}: {}",
                style("✗").red(),
                err.line,
                err.reason
            );
        }
    }

    if args.dry_run {
        println!(
            "{} Dry run: {} of {} row(s) would be imported from {}",
            style("→").blue(),
            style(plan.imported()).cyan(),
            plan.rows(),
            path.display()
        );
        return Ok(());
    }

    let feedback = plan.feedback();
    if !plan.batch.is_empty() {
        dispatch(&mut session, Mutation::ImportBatch(plan.batch), global)?;
    }
    if !global.quiet {
        let mark = if plan.errors.is_empty() {
            style("✓").green()
        } else {
            style("!").yellow()
        };
        println!("{} {}", mark, feedback);
    }
    Ok(())
}
