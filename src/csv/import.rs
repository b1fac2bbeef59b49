//! CSV importer
//!
//! Parsing never touches the store: [`plan_import`] turns a file into an
//! [`ImportPlan`] holding the resolved records and the rejected rows, and
//! the caller commits the plan as a single [`ImportBatch`] mutation.

use chrono::{DateTime, NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use thiserror::Error;

use crate::core::mutation::ImportBatch;
use crate::core::state::AppState;
use crate::csv::schema::ImportKind;
use crate::entities::{Intervention, InterventionType, Plesso, Road, Structure};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("File CSV vuoto o non valido.")]
    Empty,

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// A row that was not imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line in the file, header included
    pub line: usize,
    pub reason: String,
}

/// Outcome of parsing one file
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub batch: ImportBatch,
    pub errors: Vec<RowError>,
}

impl ImportPlan {
    pub fn imported(&self) -> usize {
        self.batch.len()
    }

    /// Rows read, rejected ones included
    pub fn rows(&self) -> usize {
        self.imported() + self.errors.len()
    }

    /// One-line outcome in the registry's language
    pub fn feedback(&self) -> String {
        let n = self.imported();
        let errors = self.errors.len();
        match &self.batch {
            ImportBatch::Structures(_) => format!("Importati con successo {} immobili.", n),
            ImportBatch::Roads(_) => format!("Importate con successo {} strade.", n),
            ImportBatch::Plessi(_) if errors > 0 => format!(
                "Importati {} plessi. {} errori (codice immobile non trovato).",
                n, errors
            ),
            ImportBatch::Plessi(_) => format!("Importati {} plessi.", n),
            ImportBatch::Interventions(_) if errors > 0 => format!(
                "Importati {} interventi. {} record scartati (target asset non trovato).",
                n, errors
            ),
            ImportBatch::Interventions(_) => format!("Importati {} interventi.", n),
        }
    }
}

/// Header-keyed field access, falling back to the template position
struct Columns {
    by_name: HashMap<String, usize>,
    positional: bool,
}

impl Columns {
    fn new(headers: &StringRecord, kind: ImportKind) -> Self {
        let by_name: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        // a header sharing no names with the template is read by position
        let positional = !kind.columns().iter().any(|c| by_name.contains_key(*c));
        Self { by_name, positional }
    }

    fn get(&self, record: &StringRecord, kind: ImportKind, column: &str) -> Option<String> {
        let idx = if self.positional {
            kind.columns().iter().position(|c| *c == column)
        } else {
            self.by_name.get(column).copied()
        };
        idx.and_then(|i| record.get(i))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

fn parse_number(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.parse::<f64>().ok()).filter(|v| v.is_finite())
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

/// Parse `text` as a file of `kind`, resolving references against `state`
pub fn plan_import(
    kind: ImportKind,
    text: &str,
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<ImportPlan, ImportError> {
    if text.lines().filter(|l| !l.trim().is_empty()).count() < 2 {
        return Err(ImportError::Empty);
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = rdr.headers()?.clone();
    let cols = Columns::new(&headers, kind);
    let field = |record: &StringRecord, column: &str| cols.get(record, kind, column);

    let mut errors = Vec::new();
    let mut structures = Vec::new();
    let mut plessi = Vec::new();
    let mut roads = Vec::new();
    let mut interventions = Vec::new();

    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line() as usize);
        let mut reject = |reason: String| errors.push(RowError { line, reason });

        match kind {
            ImportKind::Structures => {
                let Some(name) = field(&record, "nome") else {
                    reject("nome mancante".to_string());
                    continue;
                };
                let mut s = Structure::new(name, field(&record, "indirizzo").unwrap_or_default());
                s.description = field(&record, "descrizione").unwrap_or_default();
                s.unique_code = field(&record, "codice_univoco");
                s.cost_center = field(&record, "centro_costo");
                structures.push(s);
            }
            ImportKind::Plessi => {
                let parent_code = field(&record, "codice_univoco_immobile_riferimento").unwrap_or_default();
                let Some(parent) = state.structure_by_ref(&parent_code) else {
                    reject(format!("codice immobile non trovato: '{}'", parent_code));
                    continue;
                };
                let mut p = Plesso::new(
                    parent.id.clone(),
                    field(&record, "nome_plesso").unwrap_or_default(),
                );
                p.description = field(&record, "descrizione_plesso").unwrap_or_default();
                p.unique_code = field(&record, "codice_univoco_plesso");
                p.cost_center = field(&record, "centro_di_costo");
                plessi.push(p);
            }
            ImportKind::Roads => {
                let length = parse_number(field(&record, "lunghezza_km"))
                    .filter(|v| *v >= 0.0)
                    .unwrap_or(0.0);
                let mut r = Road::new(
                    field(&record, "codice_sp").unwrap_or_default(),
                    field(&record, "nome").unwrap_or_default(),
                    length,
                );
                r.description = field(&record, "descrizione").unwrap_or_default();
                r.unique_code = field(&record, "codice_univoco");
                roads.push(r);
            }
            ImportKind::Interventions => {
                let target_code = field(&record, "codice_univoco_asset_target").unwrap_or_default();
                let Some(target) = state.asset_by_code(&target_code) else {
                    reject(format!("target asset non trovato: '{}'", target_code));
                    continue;
                };
                let amount = parse_number(field(&record, "importo")).unwrap_or(0.0);
                if amount < 0.0 {
                    reject(format!("importo negativo: {}", amount));
                    continue;
                }
                let mut i = Intervention::new(
                    field(&record, "cig").unwrap_or_default(),
                    field(&record, "titolo").unwrap_or_default(),
                    target,
                );
                i.subject = field(&record, "oggetto").unwrap_or_default();
                i.amount = amount;
                i.responsible = field(&record, "rup").unwrap_or_default();
                i.date_start = parse_date(field(&record, "data_inizio"));
                i.date_end = parse_date(field(&record, "data_fine"));
                i.kind = field(&record, "tipologia")
                    .map(|t| {
                        InterventionType::from_label(&t)
                            .unwrap_or_else(|| InterventionType::from_free_text(&t))
                    })
                    .unwrap_or_default();
                i.description = format!("Importato via CSV il {}", now.format("%d/%m/%Y"));
                i.created_at = now;
                interventions.push(i);
            }
        }
    }

    let batch = match kind {
        ImportKind::Structures => ImportBatch::Structures(structures),
        ImportKind::Plessi => ImportBatch::Plessi(plessi),
        ImportKind::Roads => ImportBatch::Roads(roads),
        ImportKind::Interventions => ImportBatch::Interventions(interventions),
    };
    if !errors.is_empty() {
        tracing::debug!(rejected = errors.len(), kind = %kind, "import rows rejected");
    }
    Ok(ImportPlan { batch, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seed;
    use crate::core::target::TargetType;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_single_line_is_rejected() {
        let state = seed::sample_state();
        let err = plan_import(ImportKind::Roads, "codice_sp,nome\n\n", &state, now()).unwrap_err();
        assert!(matches!(err, ImportError::Empty));
        assert_eq!(err.to_string(), "File CSV vuoto o non valido.");
    }

    #[test]
    fn test_structure_template_imports() {
        let state = AppState::default();
        let plan = plan_import(
            ImportKind::Structures,
            &ImportKind::Structures.template(),
            &state,
            now(),
        )
        .unwrap();
        assert_eq!(plan.imported(), 2);
        let ImportBatch::Structures(rows) = &plan.batch else {
            panic!("wrong batch kind");
        };
        assert_eq!(rows[0].name, "Palazzo Regio");
        assert_eq!(rows[0].unique_code.as_deref(), Some("IMM_000101"));
        assert!(rows[0].plessi.is_empty());
    }

    #[test]
    fn test_plessi_with_unknown_parent_are_counted() {
        let state = seed::sample_state();
        let text = "codice_univoco_immobile_riferimento,nome_plesso,descrizione_plesso,codice_univoco_plesso,centro_di_costo\n\
                    IMM_000101,Palestra,Impianto sportivo,,\n\
                    IMM_999999,Ala Nord,,,\n";
        let plan = plan_import(ImportKind::Plessi, text, &state, now()).unwrap();
        assert_eq!(plan.imported(), 1);
        assert_eq!(plan.errors.len(), 1);
        assert_eq!(plan.errors[0].line, 3);
        assert_eq!(
            plan.feedback(),
            "Importati 1 plessi. 1 errori (codice immobile non trovato)."
        );
    }

    #[test]
    fn test_road_length_defaults_to_zero() {
        let state = AppState::default();
        let text = "codice_sp,nome,lunghezza_km,descrizione,codice_univoco\nSP 3,Interna,abc,,\n";
        let plan = plan_import(ImportKind::Roads, text, &state, now()).unwrap();
        let ImportBatch::Roads(rows) = &plan.batch else {
            panic!("wrong batch kind");
        };
        assert_eq!(rows[0].length_km, 0.0);
        assert_eq!(rows[0].unique_code, None);
    }

    #[test]
    fn test_intervention_error_accounting() {
        let state = seed::sample_state();
        let text = "cig,titolo,oggetto,importo,rup,data_inizio,data_fine,codice_univoco_asset_target,tipologia\n\
                    A1,Tetto,Coperture,1000,Ing. Rossi,2024-05-01,2024-12-31,IMM_000101,Interventi Straordinari\n\
                    A2,Segnaletica,Cartelli,200,,2024-06-01,,STR_000002,Manutenzioni\n\
                    A3,Aule,Tinteggiatura,50,,,,PLX_000102,a seguito di progettazione\n\
                    A4,Fantasma,,10,,,,XXX_000001,\n\
                    A5,Negativo,,-5,,,,IMM_000105,\n";
        let plan = plan_import(ImportKind::Interventions, text, &state, now()).unwrap();
        assert_eq!(plan.rows(), 5);
        assert_eq!(plan.imported(), 3);
        assert_eq!(plan.errors.len(), 2);

        let ImportBatch::Interventions(rows) = &plan.batch else {
            panic!("wrong batch kind");
        };
        assert_eq!(rows[0].kind, InterventionType::Extraordinary);
        assert_eq!(rows[0].target.kind, TargetType::Structure);
        assert_eq!(rows[1].kind, InterventionType::Maintenance);
        assert_eq!(rows[1].target.kind, TargetType::Road);
        assert_eq!(rows[1].date_end, None);
        assert_eq!(rows[2].kind, InterventionType::DesignThenExecution);
        assert_eq!(rows[2].target.kind, TargetType::Plesso);
        assert_eq!(rows[0].description, "Importato via CSV il 10/05/2024");
    }

    #[test]
    fn test_quoted_fields_and_headerless_layout() {
        let state = AppState::default();
        // unknown header names: fields are read by position
        let text = "a,b,c,d,e\n\"Palazzo, Ala Est\",\"Via Roma 1\",,IMM_000007,\n";
        let plan = plan_import(ImportKind::Structures, text, &state, now()).unwrap();
        let ImportBatch::Structures(rows) = &plan.batch else {
            panic!("wrong batch kind");
        };
        assert_eq!(rows[0].name, "Palazzo, Ala Est");
        assert_eq!(rows[0].address, "Via Roma 1");
    }
}
