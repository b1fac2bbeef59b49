//! Intervention entity type (maintenance / works contract)

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::code::CodePrefix;
use crate::core::entity::{Coded, Entity};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::target::TargetRef;
use crate::entities::technical::Coordinates;

/// Fixed classification of interventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InterventionType {
    #[default]
    #[serde(rename = "Interventi Ordinari")]
    Ordinary,
    #[serde(rename = "Interventi Straordinari")]
    Extraordinary,
    #[serde(rename = "Manutenzioni")]
    Maintenance,
    #[serde(rename = "Interventi a seguito di progettazione")]
    DesignThenExecution,
    #[serde(rename = "Sola Progettazione")]
    DesignOnly,
}

impl InterventionType {
    /// Institutional label, as stored and exported
    pub fn label(&self) -> &'static str {
        match self {
            InterventionType::Ordinary => "Interventi Ordinari",
            InterventionType::Extraordinary => "Interventi Straordinari",
            InterventionType::Maintenance => "Manutenzioni",
            InterventionType::DesignThenExecution => "Interventi a seguito di progettazione",
            InterventionType::DesignOnly => "Sola Progettazione",
        }
    }

    pub fn all() -> &'static [InterventionType] {
        &[
            InterventionType::Ordinary,
            InterventionType::Extraordinary,
            InterventionType::Maintenance,
            InterventionType::DesignThenExecution,
            InterventionType::DesignOnly,
        ]
    }

    /// Exact institutional label, as written by exports
    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::all().iter().copied().find(|t| t.label() == raw)
    }

    /// Map a free-text type column by substring, as spreadsheets fill it in
    ///
    /// Anything unrecognised is an ordinary intervention.
    pub fn from_free_text(raw: &str) -> Self {
        if raw.contains("Straordinari") {
            InterventionType::Extraordinary
        } else if raw.contains("Manutenzioni") {
            InterventionType::Maintenance
        } else if raw.contains("progettazione") {
            InterventionType::DesignThenExecution
        } else {
            InterventionType::Ordinary
        }
    }
}

impl fmt::Display for InterventionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InterventionType {
    type Err = String;

    /// Accepts the short CLI names or the full institutional labels
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ordinary" | "ordinario" | "interventi ordinari" => Ok(InterventionType::Ordinary),
            "extraordinary" | "straordinario" | "interventi straordinari" => {
                Ok(InterventionType::Extraordinary)
            }
            "maintenance" | "manutenzione" | "manutenzioni" => Ok(InterventionType::Maintenance),
            "design-execution" | "interventi a seguito di progettazione" => {
                Ok(InterventionType::DesignThenExecution)
            }
            "design-only" | "sola progettazione" => Ok(InterventionType::DesignOnly),
            _ => Err(format!(
                "Unknown intervention type: '{}'. Use ordinary, extraordinary, maintenance, design-execution or design-only",
                s
            )),
        }
    }
}

/// A previous responsible person (RUP) assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RupAssignment {
    pub id: EntityId,
    pub name: String,
    pub start_date: NaiveDate,
}

/// Works suspension; an absent end date means still suspended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suspension {
    pub id: EntityId,
    pub start_date: NaiveDate,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::blank_as_none"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub reason: String,
}

impl Suspension {
    pub fn new(start_date: NaiveDate, end_date: Option<NaiveDate>, reason: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(EntityKind::Record),
            start_date,
            end_date,
            reason: reason.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// Whether works are suspended on `day`
    pub fn covers(&self, day: NaiveDate) -> bool {
        day >= self.start_date && self.end_date.map_or(true, |end| day <= end)
    }
}

/// Contract time extension (proroga)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub id: EntityId,
    pub days: u32,
    #[serde(default)]
    pub reason: String,
}

impl Extension {
    pub fn new(days: u32, reason: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(EntityKind::Record),
            days,
            reason: reason.into(),
        }
    }
}

/// A maintenance or works contract on one target asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intervention {
    pub id: EntityId,

    /// Human unique code (`INT_NNNNNN`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_code: Option<String>,

    /// Tender code (CIG); required but not guaranteed unique
    #[serde(rename = "cig")]
    pub tender_code: String,

    #[serde(flatten)]
    pub target: TargetRef,

    #[serde(rename = "type", default)]
    pub kind: InterventionType,

    pub title: String,

    /// Formal object of the contract
    #[serde(rename = "oggetto", default)]
    pub subject: String,

    #[serde(default)]
    pub description: String,

    /// Current responsible person (RUP)
    #[serde(rename = "currentRup", default)]
    pub responsible: String,

    #[serde(rename = "rupHistory", default)]
    pub responsible_history: Vec<RupAssignment>,

    #[serde(default)]
    pub amount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "super::blank_as_none")]
    pub date_delivery: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "super::blank_as_none")]
    pub date_start: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "super::blank_as_none")]
    pub date_execution: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "super::blank_as_none")]
    pub date_end: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "super::blank_as_none")]
    pub date_test: Option<NaiveDate>,

    #[serde(default)]
    pub suspensions: Vec<Suspension>,

    #[serde(default)]
    pub extensions: Vec<Extension>,

    pub created_at: DateTime<Utc>,

    #[serde(flatten)]
    pub location: Option<Coordinates>,
}

impl Intervention {
    pub fn new(tender_code: impl Into<String>, title: impl Into<String>, target: TargetRef) -> Self {
        Self {
            id: EntityId::generate(EntityKind::Intervention),
            unique_code: None,
            tender_code: tender_code.into(),
            target,
            kind: InterventionType::default(),
            title: title.into(),
            subject: String::new(),
            description: String::new(),
            responsible: String::new(),
            responsible_history: Vec::new(),
            amount: 0.0,
            date_delivery: None,
            date_start: None,
            date_execution: None,
            date_end: None,
            date_test: None,
            suspensions: Vec::new(),
            extensions: Vec::new(),
            created_at: Utc::now(),
            location: None,
        }
    }

    /// Total days granted by extensions
    pub fn extension_days(&self) -> u32 {
        self.extensions.iter().map(|e| e.days).sum()
    }

    /// Contract end date moved forward by all extensions
    pub fn effective_end(&self) -> Option<NaiveDate> {
        self.date_end
            .map(|end| end + Duration::days(i64::from(self.extension_days())))
    }

    /// Whether an open or covering suspension applies on `day`
    pub fn is_suspended_on(&self, day: NaiveDate) -> bool {
        self.suspensions.iter().any(|s| s.covers(day))
    }
}

impl Entity for Intervention {
    const LABEL: &'static str = "Intervento";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> String {
        format!("CIG {}", self.tender_code)
    }
}

impl Coded for Intervention {
    const CODE_PREFIX: CodePrefix = CodePrefix::Int;

    fn unique_code(&self) -> Option<&str> {
        self.unique_code.as_deref()
    }

    fn set_unique_code(&mut self, code: String) {
        self.unique_code = Some(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::TargetType;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_free_text_type_mapping() {
        assert_eq!(
            InterventionType::from_free_text("Interventi Straordinari"),
            InterventionType::Extraordinary
        );
        assert_eq!(
            InterventionType::from_free_text("Manutenzioni"),
            InterventionType::Maintenance
        );
        assert_eq!(
            InterventionType::from_free_text("Interventi a seguito di progettazione"),
            InterventionType::DesignThenExecution
        );
        // capitalised "Progettazione" does not match the lowercase pattern
        assert_eq!(
            InterventionType::from_free_text("Sola Progettazione"),
            InterventionType::Ordinary
        );
        assert_eq!(InterventionType::from_free_text(""), InterventionType::Ordinary);
    }

    #[test]
    fn test_exact_labels_map_back() {
        for kind in InterventionType::all() {
            assert_eq!(InterventionType::from_label(kind.label()), Some(*kind));
        }
        assert_eq!(
            InterventionType::from_label(" Sola Progettazione "),
            Some(InterventionType::DesignOnly)
        );
        assert_eq!(InterventionType::from_label("sola progettazione"), None);
    }

    #[test]
    fn test_reads_stored_snapshot_with_blank_dates() {
        let json = r#"{
            "id": "int-sample-1",
            "uniqueCode": "INT_000001",
            "targetId": "road-sample-sp2",
            "targetType": "road",
            "type": "Manutenzioni",
            "title": "Rifacimento giunti SP 2",
            "oggetto": "Manutenzione straordinaria del piano viabile Km 0-10.",
            "description": "",
            "cig": "B23445566A",
            "rupHistory": [],
            "currentRup": "Ing. Mario Rossi",
            "amount": 145000,
            "dateExecution": "",
            "dateStart": "2024-01-15",
            "dateEnd": "2024-06-30",
            "suspensions": [],
            "extensions": [],
            "createdAt": "2024-01-10T09:00:00Z",
            "lat": 39.2936,
            "lng": 8.8921
        }"#;
        let i: Intervention = serde_json::from_str(json).unwrap();
        assert_eq!(i.kind, InterventionType::Maintenance);
        assert_eq!(i.target.kind, TargetType::Road);
        assert_eq!(i.date_execution, None);
        assert_eq!(i.date_start, Some(date("2024-01-15")));
        assert_eq!(i.amount, 145000.0);
    }

    #[test]
    fn test_effective_end_adds_extensions() {
        let mut i = Intervention::new("C1", "Tetto", TargetRef::new("s1", TargetType::Structure));
        assert_eq!(i.effective_end(), None);
        i.date_end = Some(date("2024-06-30"));
        i.extensions.push(Extension::new(10, "meteo"));
        i.extensions.push(Extension::new(5, "forniture"));
        assert_eq!(i.extension_days(), 15);
        assert_eq!(i.effective_end(), Some(date("2024-07-15")));
    }

    #[test]
    fn test_open_suspension_covers_later_days() {
        let s = Suspension::new(date("2024-03-01"), None, "variante");
        assert!(s.is_open());
        assert!(s.covers(date("2025-01-01")));
        assert!(!s.covers(date("2024-02-28")));

        let closed = Suspension::new(date("2024-03-01"), Some(date("2024-03-10")), "");
        assert!(!closed.covers(date("2024-03-11")));
    }

    #[test]
    fn test_type_parses_cli_names() {
        assert_eq!("design-only".parse(), Ok(InterventionType::DesignOnly));
        assert_eq!("Manutenzioni".parse(), Ok(InterventionType::Maintenance));
        assert!("other".parse::<InterventionType>().is_err());
    }
}
