//! `edilgest user` command - Account management

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::common::{print_structured, print_structured_list, ConfirmDeleteArgs, ShowArgs};
use crate::cli::helpers::{confirm_guard, dispatch, open_session, require_section, resolve_format};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::GlobalOpts;
use crate::core::mutation::Mutation;
use crate::core::state::AppState;
use crate::entities::{Role, Section, User};

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List accounts
    List,

    /// Show an account
    Show(ShowArgs),

    /// Create an account
    New(NewArgs),

    /// Change an account's role, name, e-mail or sections
    Edit(EditArgs),

    /// Delete an account
    Delete(ConfirmDeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    #[arg(long, short = 'u')]
    pub username: String,

    #[arg(long, short = 'e')]
    pub email: String,

    /// admin, editor or user
    #[arg(long, short = 'r', default_value = "user")]
    pub role: Role,

    #[arg(long)]
    pub first: Option<String>,

    #[arg(long)]
    pub last: Option<String>,

    /// Accessible sections (comma separated); role defaults when omitted
    #[arg(long, value_delimiter = ',')]
    pub sections: Vec<Section>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Account id or username
    pub id: String,

    #[arg(long, short = 'e')]
    pub email: Option<String>,

    /// New role; resets the sections to the role defaults unless --sections is given
    #[arg(long, short = 'r')]
    pub role: Option<Role>,

    #[arg(long)]
    pub first: Option<String>,

    #[arg(long)]
    pub last: Option<String>,

    /// Replace the accessible sections (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub sections: Option<Vec<Section>>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("username", "USERNAME", 16),
    ColumnDef::new("name", "NAME", 28),
    ColumnDef::new("email", "EMAIL", 32),
    ColumnDef::new("role", "ROLE", 8),
    ColumnDef::new("sections", "SECTIONS", 9),
];

pub fn run(cmd: UserCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        UserCommands::List => run_list(global),
        UserCommands::Show(args) => run_show(args, global),
        UserCommands::New(args) => run_new(args, global),
        UserCommands::Edit(args) => run_edit(args, global),
        UserCommands::Delete(args) => run_delete(args, global),
    }
}

fn lookup<'a>(state: &'a AppState, reference: &str) -> Result<&'a User> {
    state
        .user_by_ref(reference)
        .ok_or_else(|| miette::miette!("User not found: {}", reference))
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::UserManagement)?;
    let state = session.state();

    let mut users: Vec<&User> = state.users.iter().collect();
    users.sort_by(|a, b| a.username.cmp(&b.username));

    let format = resolve_format(global, &config);
    if print_structured_list(&users, format)? {
        return Ok(());
    }
    let rows: Vec<TableRow> = users
        .iter()
        .map(|u| {
            TableRow::new(u.id.as_str())
                .cell("username", CellValue::Text(u.username.clone()))
                .cell("name", CellValue::Text(u.full_name()))
                .cell("email", CellValue::Text(u.email.clone()))
                .cell("role", CellValue::Text(u.role.to_string()))
                .cell("sections", CellValue::Number(u.sections.len() as i64))
        })
        .collect();
    TableFormatter::new(COLUMNS, "user").output(&rows, format);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, config, session) = open_session(global)?;
    require_section(&session, Section::UserManagement)?;
    let u = lookup(session.state(), &args.id)?;

    if print_structured(u, resolve_format(global, &config))? {
        return Ok(());
    }
    println!("{} ({})", style(&u.username).bold(), u.role);
    println!("{}", "-".repeat(40));
    println!("Name:   {}", u.full_name());
    println!("E-mail: {}", u.email);
    if u.external_identity {
        println!("Source: external directory");
    }
    println!("Sections:");
    for s in &u.sections {
        println!("  {}", s);
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;

    let mut u = User::new(args.username, args.email, args.role);
    u.first_name = args.first.unwrap_or_default();
    u.last_name = args.last.unwrap_or_default();
    if !args.sections.is_empty() {
        u.sections = args.sections;
    }
    let username = u.username.clone();

    dispatch(&mut session, Mutation::SaveUser(u), global)?;
    if !global.quiet {
        println!("{} Created user {}", style("✓").green(), style(username).cyan());
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let mut u = lookup(session.state(), &args.id)?.clone();

    if let Some(email) = args.email {
        u.email = email;
    }
    if let Some(role) = args.role {
        u.role = role;
        u.sections = role.default_sections();
    }
    if let Some(first) = args.first {
        u.first_name = first;
    }
    if let Some(last) = args.last {
        u.last_name = last;
    }
    if let Some(sections) = args.sections {
        u.sections = sections;
    }
    let username = u.username.clone();

    dispatch(&mut session, Mutation::SaveUser(u), global)?;
    if !global.quiet {
        println!("{} Updated user {}", style("✓").green(), style(username).cyan());
    }
    Ok(())
}

fn run_delete(args: ConfirmDeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let u = lookup(session.state(), &args.id)?;
    let (id, username) = (u.id.clone(), u.username.clone());

    let guard = confirm_guard(&format!("Delete user '{}'?", username), args.yes)?;
    if !guard.confirmed {
        println!("Cancelled.");
        return Ok(());
    }
    dispatch(&mut session, Mutation::DeleteUser { id, guard }, global)?;
    if !global.quiet {
        println!("{} Deleted user {}", style("✓").green(), style(username).cyan());
    }
    Ok(())
}
