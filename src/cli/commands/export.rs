//! `edilgest export` command - Registers as CSV

use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::{open_session, require_section};
use crate::cli::GlobalOpts;
use crate::core::state::AppState;
use crate::csv::{export_interventions_importable, export_records, ExportError};
use crate::entities::{Intervention, Plesso, Section};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportTarget {
    Structures,
    Plessi,
    Roads,
    Interventions,
    Users,
    #[value(name = "audit-log")]
    AuditLog,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Register to export
    pub what: ExportTarget,

    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Interventions only: use the import layout so the file can be re-imported
    #[arg(long)]
    pub importable: bool,
}

fn render(what: ExportTarget, importable: bool, state: &AppState) -> Result<String, ExportError> {
    match what {
        ExportTarget::Structures => export_records(&state.structures),
        ExportTarget::Plessi => {
            let plessi: Vec<&Plesso> = state.plessi().map(|(_, p)| p).collect();
            export_records(&plessi)
        }
        ExportTarget::Roads => export_records(&state.roads),
        ExportTarget::Interventions if importable => {
            let all: Vec<&Intervention> = state.interventions.iter().collect();
            export_interventions_importable(state, &all)
        }
        ExportTarget::Interventions => export_records(&state.interventions),
        ExportTarget::Users => export_records(&state.users),
        ExportTarget::AuditLog => export_records(&state.audit_logs),
    }
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    if args.importable && args.what != ExportTarget::Interventions {
        return Err(miette::miette!("--importable applies to interventions only"));
    }

    let (_ws, _config, session) = open_session(global)?;
    let section = match args.what {
        ExportTarget::Users => Section::UserManagement,
        ExportTarget::AuditLog => Section::History,
        _ => Section::DataView,
    };
    require_section(&session, section)?;

    let text = render(args.what, args.importable, session.state())
        .map_err(|e| miette::miette!("{}", e))?;

    match args.output {
        Some(path) => {
            fs::write(&path, &text).into_diagnostic()?;
            if !global.quiet {
                let rows = text.lines().count().saturating_sub(1);
                println!(
                    "{} Exported {} row(s) to {}",
                    style("✓").green(),
                    style(rows).cyan(),
                    style(path.display()).yellow()
                );
            }
        }
        None => print!("{}", text),
    }
    Ok(())
}
