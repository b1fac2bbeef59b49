//! `edilgest init` command - Create a workspace

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::core::persistence::LoadSource;
use crate::core::session::Session;
use crate::core::workspace::{Workspace, WorkspaceError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory, or --workspace)
    pub path: Option<PathBuf>,

    /// SQLite database mirroring the audit log
    #[arg(long)]
    pub remote_db: Option<PathBuf>,

    /// Rewrite the configuration even if .edilgest/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = match args.path.or_else(|| global.workspace.clone()) {
        Some(path) => path,
        None => std::env::current_dir().into_diagnostic()?,
    };

    let workspace = match Workspace::init(&path, args.force, args.remote_db.as_deref()) {
        Ok(ws) => ws,
        Err(WorkspaceError::AlreadyExists(path)) => {
            println!(
                "{} EdilGest workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("edilgest init --force").yellow());
            return Ok(());
        }
        Err(e) => return Err(miette::miette!("{}", e)),
    };

    // First load installs the sample registers and writes the data file
    let config = Config::load(Some(&workspace));
    let session = Session::for_workspace(&workspace, &config);

    if global.quiet {
        return Ok(());
    }
    println!(
        "{} Initialized EdilGest workspace at {}",
        style("✓").green(),
        style(workspace.root().display()).cyan()
    );
    println!("   {}", style(workspace.config_path().display()).dim());
    println!("   {}", style(workspace.slot_path().display()).dim());
    if session.source() == LoadSource::Seed {
        let state = session.state();
        println!(
            "   Sample registers installed: {} building(s), {} road(s), {} intervention(s)",
            style(state.structures.len()).cyan(),
            style(state.roads.len()).cyan(),
            style(state.interventions.len()).cyan()
        );
    }
    if let Some(db) = &config.remote_database {
        println!("   Audit mirror: {}", style(db.display()).yellow());
    }
    println!();
    println!("Next steps:");
    println!("  {} Log in (admin / editor / user)", style("edilgest login admin").yellow());
    println!("  {} List the buildings", style("edilgest building list").yellow());
    println!(
        "  {} Get a CSV import template",
        style("edilgest import interventions --template").yellow()
    );
    Ok(())
}
