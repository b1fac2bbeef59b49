//! Report data: intervention filtering, deadline alerts, dashboard totals
//! and the printable intervention sheet

use chrono::{Duration, NaiveDate};
use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::state::AppState;
use crate::entities::{Intervention, InterventionType};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const SHEET_TEMPLATE: &str = "intervention_sheet.md.tera";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    Render(String),
}

/// Criteria for the intervention report; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct InterventionFilter {
    pub target: Option<EntityId>,
    pub kind: Option<InterventionType>,
    /// Case-insensitive substring of the current RUP
    pub responsible: Option<String>,
    /// Start date on or after
    pub start_from: Option<NaiveDate>,
    /// End date on or before
    pub end_to: Option<NaiveDate>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

impl InterventionFilter {
    /// Interventions without the date a bound refers to are excluded by it.
    pub fn matches(&self, i: &Intervention) -> bool {
        if let Some(target) = &self.target {
            if &i.target.id != target {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if i.kind != kind {
                return false;
            }
        }
        if let Some(rup) = self.responsible.as_deref().filter(|r| !r.is_empty()) {
            if !i.responsible.to_lowercase().contains(&rup.to_lowercase()) {
                return false;
            }
        }
        if let Some(from) = self.start_from {
            if !i.date_start.is_some_and(|d| d >= from) {
                return false;
            }
        }
        if let Some(to) = self.end_to {
            if !i.date_end.is_some_and(|d| d <= to) {
                return false;
            }
        }
        if self.min_amount.is_some_and(|min| i.amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| i.amount > max) {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, state: &'a AppState) -> Vec<&'a Intervention> {
        state.interventions.iter().filter(|i| self.matches(i)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub total: f64,
    pub average: f64,
}

pub fn summarize(items: &[&Intervention]) -> Summary {
    let total: f64 = items.iter().map(|i| i.amount).sum();
    let average = if items.is_empty() {
        0.0
    } else {
        total / items.len() as f64
    };
    Summary {
        count: items.len(),
        total,
        average,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineKind {
    Start,
    End,
    Test,
}

/// A contract date falling inside the notification window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deadline {
    pub date: NaiveDate,
    pub kind: DeadlineKind,
    pub intervention_id: EntityId,
    pub message: String,
    pub days_left: i64,
}

/// Start, end and test dates between `today` and the configured horizon
///
/// The end date includes granted extensions.
pub fn upcoming_deadlines(state: &AppState, today: NaiveDate) -> Vec<Deadline> {
    let settings = &state.notification_settings;
    let horizon = today + Duration::days(i64::from(settings.days_before_deadline));
    let mut out = Vec::new();

    for i in &state.interventions {
        let candidates = [
            (settings.notify_start, i.date_start, DeadlineKind::Start, "Inizio lavori"),
            (settings.notify_end, i.effective_end(), DeadlineKind::End, "Fine lavori"),
            (settings.notify_test, i.date_test, DeadlineKind::Test, "Collaudo"),
        ];
        for (enabled, date, kind, what) in candidates {
            let Some(date) = date.filter(|_| enabled) else {
                continue;
            };
            if date < today || date > horizon {
                continue;
            }
            out.push(Deadline {
                date,
                kind,
                intervention_id: i.id.clone(),
                message: format!("{} CIG {}", what, i.tender_code),
                days_left: (date - today).num_days(),
            });
        }
    }
    out.sort_by(|a, b| a.date.cmp(&b.date).then(a.kind.cmp(&b.kind)));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeTotal {
    pub kind: InterventionType,
    pub count: usize,
    pub amount: f64,
}

/// Headline numbers for the whole registry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub structures: usize,
    pub plessi: usize,
    pub pertinenze: usize,
    pub roads: usize,
    pub road_km: f64,
    pub interventions: usize,
    pub total_amount: f64,
    pub by_type: Vec<TypeTotal>,
    /// Interventions whose target no longer exists
    pub orphans: usize,
    pub suspended_today: usize,
}

pub fn dashboard(state: &AppState, today: NaiveDate) -> Dashboard {
    let by_type = InterventionType::all()
        .iter()
        .map(|kind| {
            let matching = state.interventions.iter().filter(|i| i.kind == *kind);
            TypeTotal {
                kind: *kind,
                count: matching.clone().count(),
                amount: matching.map(|i| i.amount).sum(),
            }
        })
        .collect();

    Dashboard {
        structures: state.structures.len(),
        plessi: state.plessi().count(),
        pertinenze: state.plessi().map(|(_, p)| p.pertinenze.len()).sum(),
        roads: state.roads.len(),
        road_km: state.roads.iter().map(|r| r.length_km).sum(),
        interventions: state.interventions.len(),
        total_amount: state.interventions.iter().map(|i| i.amount).sum(),
        by_type,
        orphans: state.orphan_interventions().len(),
        suspended_today: state
            .interventions
            .iter()
            .filter(|i| i.is_suspended_on(today))
            .count(),
    }
}

/// Renders printable sheets from the embedded Tera templates
pub struct SheetRenderer {
    tera: Tera,
}

impl SheetRenderer {
    pub fn new() -> Result<Self, ReportError> {
        let mut tera = Tera::default();
        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| ReportError::Render(e.to_string()))?;
                }
            }
        }
        Ok(Self { tera })
    }

    /// Markdown sheet for one intervention
    pub fn intervention_sheet(
        &self,
        state: &AppState,
        intervention: &Intervention,
        today: NaiveDate,
    ) -> Result<String, ReportError> {
        if !self.tera.get_template_names().any(|n| n == SHEET_TEMPLATE) {
            return Err(ReportError::NotFound(SHEET_TEMPLATE.to_string()));
        }
        let target = state.resolve_target(&intervention.target);

        let mut context = tera::Context::new();
        context.insert("int", intervention);
        context.insert("type_label", intervention.kind.label());
        context.insert("target_label", &target.label());
        context.insert("target_code", &target.unique_code().unwrap_or("-"));
        context.insert("cost_center", &target.cost_center().unwrap_or("-"));
        context.insert(
            "effective_end",
            &intervention
                .effective_end()
                .map_or_else(|| "-".to_string(), |d| d.to_string()),
        );
        context.insert("extension_days", &intervention.extension_days());
        context.insert("suspended", &intervention.is_suspended_on(today));
        context.insert("printed", &today.format("%d/%m/%Y").to_string());

        self.tera
            .render(SHEET_TEMPLATE, &context)
            .map_err(|e| ReportError::Render(e.to_string()))
    }
}
