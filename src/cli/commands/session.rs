//! `edilgest login` / `logout` / `whoami` commands

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{dispatch, open_session, password_or_prompt, resolve_format};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::mutation::Mutation;

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// Account name (admin, editor or user)
    pub username: String,

    /// Password (prompted when omitted)
    #[arg(long, short = 'p', env = "EDILGEST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

pub fn run_login(args: LoginArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let password = password_or_prompt(args.password, "Password")?;

    dispatch(
        &mut session,
        Mutation::Login {
            username: args.username,
            password,
        },
        global,
    )?;

    if let Some(user) = session.state().current_user() {
        if !global.quiet {
            println!(
                "{} Logged in as {} ({})",
                style("✓").green(),
                style(&user.username).cyan(),
                style(user.role).yellow()
            );
        }
    }
    Ok(())
}

pub fn run_logout(global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let who = session.state().current_user().map(|u| u.username.clone());

    match who {
        Some(username) => {
            dispatch(&mut session, Mutation::Logout, global)?;
            if !global.quiet {
                println!("{} Logged out {}", style("✓").green(), style(username).cyan());
            }
        }
        None => {
            if !global.quiet {
                println!("Nobody is logged in.");
            }
        }
    }
    Ok(())
}

pub fn run_whoami(global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    let Some(user) = session.state().current_user() else {
        println!("Not logged in.");
        return Ok(());
    };

    match resolve_format(global, &config) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(user).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(user).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", user.id),
        _ => {
            println!(
                "{} {} <{}>",
                style(&user.username).cyan().bold(),
                user.full_name(),
                user.email
            );
            println!("Role:     {}", style(user.role).yellow());
            let sections: Vec<&str> = user.sections.iter().map(|s| s.as_str()).collect();
            println!("Sections: {}", sections.join(", "));
        }
    }
    Ok(())
}
