//! Core module - registers, codes, mutations and persistence

pub mod audit;
pub mod auth;
pub mod code;
pub mod config;
pub mod entity;
pub mod identity;
pub mod mutation;
pub mod persistence;
pub mod registry;
pub mod report;
pub mod seed;
pub mod session;
pub mod state;
pub mod target;
pub mod workspace;

pub use audit::{AuditAction, AuditLogEntry};
pub use code::CodePrefix;
pub use config::Config;
pub use entity::{Coded, Entity, Renamable};
pub use identity::{EntityId, EntityKind, IdParseError};
pub use mutation::{DeleteGuard, ImportBatch, Mutation, MutationError};
pub use persistence::{Gateway, PersistenceError, SaveReport};
pub use session::Session;
pub use state::AppState;
pub use target::{ResolvedTarget, TargetRef, TargetType};
pub use workspace::{Workspace, WorkspaceError};
