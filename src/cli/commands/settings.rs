//! `edilgest settings` command - Notification, export schedule and security settings

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::helpers::{dispatch, open_session, require_section};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::mutation::Mutation;
use crate::entities::{
    ExportFrequency, NotificationSettings, ScheduledExportConfig, SecurityPolicy, Section,
};

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show all settings
    Show,

    /// Deadline alert settings
    Notifications(NotificationArgs),

    /// Periodic e-mail export of the registers
    ExportSchedule(ExportScheduleArgs),

    /// Account e-mail domain whitelist
    Security(SecurityArgs),
}

#[derive(clap::Args, Debug)]
pub struct NotificationArgs {
    /// Alert this many days ahead of a date
    #[arg(long)]
    pub days: Option<u32>,

    /// Alert on works start (true/false)
    #[arg(long)]
    pub start: Option<bool>,

    /// Alert on works end (true/false)
    #[arg(long)]
    pub end: Option<bool>,

    /// Alert on acceptance test (true/false)
    #[arg(long)]
    pub test: Option<bool>,
}

#[derive(clap::Args, Debug)]
pub struct ExportScheduleArgs {
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    #[arg(long)]
    pub disable: bool,

    /// Comma separated e-mail addresses
    #[arg(long)]
    pub recipients: Option<String>,

    /// daily, weekly or monthly
    #[arg(long)]
    pub frequency: Option<ExportFrequency>,

    /// Time of day (HH:MM)
    #[arg(long)]
    pub time: Option<String>,

    /// Attach the audit log (true/false)
    #[arg(long)]
    pub audit_logs: Option<bool>,
}

#[derive(clap::Args, Debug)]
pub struct SecurityArgs {
    /// Enforce the domain whitelist (true/false)
    #[arg(long)]
    pub enforce: Option<bool>,

    /// Allowed e-mail domains (comma separated), replacing the current list
    #[arg(long, value_delimiter = ',')]
    pub domains: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AllSettings<'a> {
    notifications: &'a NotificationSettings,
    scheduled_export: &'a ScheduledExportConfig,
    security: &'a SecurityPolicy,
}

pub fn run(cmd: SettingsCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SettingsCommands::Show => run_show(global),
        SettingsCommands::Notifications(args) => run_notifications(args, global),
        SettingsCommands::ExportSchedule(args) => run_export_schedule(args, global),
        SettingsCommands::Security(args) => run_security(args, global),
    }
}

fn on_off(flag: bool) -> String {
    if flag {
        style("on").green().to_string()
    } else {
        style("off").dim().to_string()
    }
}

fn run_show(global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, session) = open_session(global)?;
    require_section(&session, Section::Dashboard)?;
    let state = session.state();
    let all = AllSettings {
        notifications: &state.notification_settings,
        scheduled_export: &state.scheduled_export,
        security: &state.security_policy,
    };

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&all).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&all).into_diagnostic()?);
        }
        _ => {
            let n = all.notifications;
            println!("{}", style("Notifications").bold());
            println!("  Days before deadline: {}", n.days_before_deadline);
            println!("  Start:                {}", on_off(n.notify_start));
            println!("  End:                  {}", on_off(n.notify_end));
            println!("  Test:                 {}", on_off(n.notify_test));

            let e = all.scheduled_export;
            println!();
            println!("{}", style("Scheduled export").bold());
            println!("  Enabled:    {}", on_off(e.enabled));
            println!("  Frequency:  {}", e.frequency);
            println!("  Time:       {}", e.export_time.as_deref().unwrap_or("-"));
            println!("  Recipients: {}", e.recipient_list().join(", "));
            println!("  Audit log:  {}", on_off(e.include_audit_logs));

            let s = all.security;
            println!();
            println!("{}", style("Security").bold());
            println!("  Domain check: {}", on_off(s.enforce_domain_check));
            println!("  Domains:      {}", s.allowed_domains.join(", "));
        }
    }
    Ok(())
}

fn run_notifications(args: NotificationArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let mut settings = session.state().notification_settings.clone();
    if let Some(days) = args.days {
        settings.days_before_deadline = days;
    }
    if let Some(start) = args.start {
        settings.notify_start = start;
    }
    if let Some(end) = args.end {
        settings.notify_end = end;
    }
    if let Some(test) = args.test {
        settings.notify_test = test;
    }

    dispatch(&mut session, Mutation::UpdateNotificationSettings(settings), global)?;
    if !global.quiet {
        println!("{} Notification settings saved", style("✓").green());
    }
    Ok(())
}

fn valid_time(raw: &str) -> bool {
    chrono::NaiveTime::parse_from_str(raw, "%H:%M").is_ok()
}

fn run_export_schedule(args: ExportScheduleArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let mut config = session.state().scheduled_export.clone();
    if args.enable {
        config.enabled = true;
    }
    if args.disable {
        config.enabled = false;
    }
    if let Some(recipients) = args.recipients {
        config.recipients = recipients;
    }
    if let Some(frequency) = args.frequency {
        config.frequency = frequency;
    }
    if let Some(time) = args.time {
        if !valid_time(&time) {
            return Err(miette::miette!("invalid time '{}' (expected HH:MM)", time));
        }
        config.export_time = Some(time);
    }
    if let Some(audit) = args.audit_logs {
        config.include_audit_logs = audit;
    }
    if config.enabled && config.recipient_list().is_empty() {
        return Err(miette::miette!("a scheduled export needs at least one recipient"));
    }

    dispatch(&mut session, Mutation::UpdateScheduledExport(config), global)?;
    if !global.quiet {
        println!("{} Export schedule saved", style("✓").green());
    }
    Ok(())
}

fn run_security(args: SecurityArgs, global: &GlobalOpts) -> Result<()> {
    let (_ws, _config, mut session) = open_session(global)?;
    let mut policy = session.state().security_policy.clone();
    if let Some(enforce) = args.enforce {
        policy.enforce_domain_check = enforce;
    }
    if let Some(domains) = args.domains {
        policy.allowed_domains = domains
            .into_iter()
            .map(|d| d.trim().trim_start_matches('@').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
    }

    dispatch(&mut session, Mutation::UpdateSecurityPolicy(policy), global)?;
    if !global.quiet {
        println!("{} Security policy saved", style("✓").green());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_time_format() {
        assert!(valid_time("07:30"));
        assert!(!valid_time("7.30"));
        assert!(!valid_time("25:00"));
    }
}
