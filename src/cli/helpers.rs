//! Shared helper functions for CLI commands
//!
//! Workspace/session bootstrapping, permission checks and the small
//! formatting utilities used across command modules.

use chrono::NaiveDate;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Password};
use miette::{IntoDiagnostic, Result};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::mutation::{DeleteGuard, Mutation};
use crate::core::session::{Dispatched, Session};
use crate::core::workspace::Workspace;
use crate::entities::{Section, User};

/// Workspace from `--workspace` or by walking up from the current directory
pub fn open_workspace(global: &GlobalOpts) -> Result<Workspace> {
    let found = match &global.workspace {
        Some(path) => Workspace::discover_from(path),
        None => Workspace::discover(),
    };
    found.map_err(|e| miette::miette!("{}", e))
}

/// Workspace, layered config and a loaded session
pub fn open_session(global: &GlobalOpts) -> Result<(Workspace, Config, Session)> {
    let workspace = open_workspace(global)?;
    let config = Config::load(Some(&workspace));
    let session = Session::for_workspace(&workspace, &config);
    Ok((workspace, config, session))
}

/// `--format auto` falls back to the configured default
pub fn resolve_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    match global.format {
        OutputFormat::Auto => config
            .default_format
            .as_deref()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Auto),
        f => f,
    }
}

/// The logged-in user, if they may open `section`
pub fn require_section(session: &Session, section: Section) -> Result<User> {
    let user = session
        .state()
        .current_user()
        .cloned()
        .ok_or_else(|| miette::miette!("no user is logged in (run 'edilgest login')"))?;
    if !user.can_access(section) {
        return Err(miette::miette!(
            "user '{}' has no access to the '{}' section",
            user.username,
            section
        ));
    }
    Ok(user)
}

/// Apply a mutation and report persistence problems
pub fn dispatch(session: &mut Session, mutation: Mutation, global: &GlobalOpts) -> Result<Dispatched> {
    let done = session
        .dispatch(mutation)
        .map_err(|e| miette::miette!("{}", e))?;
    if let Some(report) = &done.save {
        if !report.local_written {
            eprintln!(
                "{} Change applied but the local data file could not be written",
                style("!").yellow()
            );
        } else if report.mirror_failures > 0 && !global.quiet {
            eprintln!(
                "{} {} audit entr{} not mirrored to the remote database",
                style("!").yellow(),
                report.mirror_failures,
                if report.mirror_failures == 1 { "y" } else { "ies" }
            );
        }
    }
    Ok(done)
}

/// Ask for confirmation unless `--yes` was given
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()
}

/// Password from the flag, or prompted without echo
pub fn password_or_prompt(given: Option<String>, prompt: &str) -> Result<String> {
    match given {
        Some(p) => Ok(p),
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .interact()
            .into_diagnostic(),
    }
}

/// Guard for deletions needing only confirmation
pub fn confirm_guard(prompt: &str, yes: bool) -> Result<DeleteGuard> {
    Ok(DeleteGuard {
        confirmed: confirm(prompt, yes)?,
        admin_password: None,
    })
}

/// Guard for deletions that also need the security password
pub fn admin_guard(prompt: &str, yes: bool, password: Option<String>) -> Result<DeleteGuard> {
    let confirmed = confirm(prompt, yes)?;
    if !confirmed {
        return Ok(DeleteGuard::default());
    }
    let password = password_or_prompt(password, "Security password")?;
    Ok(DeleteGuard::with_password(password))
}

/// Parse a `YYYY-MM-DD` argument
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Euro amount with thousands separators ("€ 145.000,00")
pub fn format_amount(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let (sign, cents) = if cents < 0 { ("-", -cents) } else { ("", cents) };
    let units = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("€ {}{},{:02}", sign, grouped, cents % 100)
}

/// Escape a string for CSV output (RFC 4180)
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_is_char_safe() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("università àèìòù", 8), "unive...");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("Piazza Roma 1, Carbonia"), "\"Piazza Roma 1, Carbonia\"");
        assert_eq!(escape_csv("l'aula \"magna\""), "\"l'aula \"\"magna\"\"\"");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(145000.0), "€ 145.000,00");
        assert_eq!(format_amount(999.5), "€ 999,50");
        assert_eq!(format_amount(1234567.891), "€ 1.234.567,89");
        assert_eq!(format_amount(0.0), "€ 0,00");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-06-30"),
            Ok(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
        );
        assert!(parse_date("30/06/2024").is_err());
    }
}
