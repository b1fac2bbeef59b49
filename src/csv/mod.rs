//! CSV templates, import and export

pub mod export;
pub mod import;
pub mod schema;

pub use export::{export_interventions_importable, export_records, ExportError};
pub use import::{plan_import, ImportError, ImportPlan, RowError};
pub use schema::ImportKind;
