//! EdilGest Pro: asset register for provincial buildings and roads
//!
//! Keeps the registers of buildings (with their plessi and pertinenze),
//! provincial roads and the works contracts carried out on them, with an
//! audit trail mirrored to an SQLite database, CSV import/export and
//! deadline reports.

pub mod cli;
pub mod core;
pub mod csv;
pub mod entities;
