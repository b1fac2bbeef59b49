//! Singleton configuration records kept inside the application state

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deadline alert settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub days_before_deadline: u32,
    pub notify_start: bool,
    pub notify_end: bool,
    pub notify_test: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            days_before_deadline: 7,
            notify_start: true,
            notify_end: true,
            notify_test: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFrequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl fmt::Display for ExportFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFrequency::Daily => write!(f, "daily"),
            ExportFrequency::Weekly => write!(f, "weekly"),
            ExportFrequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for ExportFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(ExportFrequency::Daily),
            "weekly" => Ok(ExportFrequency::Weekly),
            "monthly" => Ok(ExportFrequency::Monthly),
            _ => Err(format!(
                "Unknown frequency: '{}'. Use daily, weekly or monthly",
                s
            )),
        }
    }
}

/// Periodic e-mail export of the registers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduledExportConfig {
    pub enabled: bool,

    /// Comma separated e-mail addresses
    pub recipients: String,

    pub frequency: ExportFrequency,

    /// `HH:mm`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<String>,

    pub include_audit_logs: bool,
}

impl ScheduledExportConfig {
    pub fn recipient_list(&self) -> Vec<&str> {
        self.recipients
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .collect()
    }
}

/// Account e-mail domain whitelist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityPolicy {
    pub enforce_domain_check: bool,
    pub allowed_domains: Vec<String>,
}

impl SecurityPolicy {
    /// Whether an account with this e-mail domain may be saved
    ///
    /// An enforced policy with an empty whitelist accepts everything.
    pub fn allows_domain(&self, domain: Option<&str>) -> bool {
        if !self.enforce_domain_check || self.allowed_domains.is_empty() {
            return true;
        }
        match domain {
            Some(domain) => self
                .allowed_domains
                .iter()
                .any(|allowed| allowed.trim().eq_ignore_ascii_case(domain)),
            None => false,
        }
    }
}

/// Rich-text help page, keyed by topic id in the state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_notification_settings_fill_defaults() {
        let s: NotificationSettings = serde_json::from_str(r#"{"daysBeforeDeadline": 30}"#).unwrap();
        assert_eq!(s.days_before_deadline, 30);
        assert!(s.notify_start && s.notify_end && s.notify_test);
    }

    #[test]
    fn test_domain_policy() {
        let mut policy = SecurityPolicy::default();
        assert!(policy.allows_domain(Some("gmail.com")));

        policy.enforce_domain_check = true;
        assert!(policy.allows_domain(Some("gmail.com")));

        policy.allowed_domains = vec!["provincia.sulcis.it".into()];
        assert!(policy.allows_domain(Some("provincia.sulcis.it")));
        assert!(!policy.allows_domain(Some("gmail.com")));
        assert!(!policy.allows_domain(None));
    }

    #[test]
    fn test_recipient_list_skips_blanks() {
        let cfg = ScheduledExportConfig {
            recipients: "a@provincia.it, ,b@provincia.it".into(),
            ..Default::default()
        };
        assert_eq!(cfg.recipient_list(), vec!["a@provincia.it", "b@provincia.it"]);
    }
}
