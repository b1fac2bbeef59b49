//! CLI command implementations

pub mod building;
pub mod common;
pub mod completions;
pub mod export;
pub mod import;
pub mod init;
pub mod intervention;
pub mod log;
pub mod manual;
pub mod pertinenza;
pub mod plesso;
pub mod registry;
pub mod report;
pub mod road;
pub mod search;
pub mod session;
pub mod settings;
pub mod user;
