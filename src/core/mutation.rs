//! State transitions
//!
//! Every change to the registers is a [`Mutation`]. Applying one never
//! touches the input state: it returns a [`Transition`] holding the new
//! state and the audit entries the change appended, so handlers can be
//! exercised in isolation and the caller decides when to persist.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::core::audit::{AuditAction, AuditLogEntry};
use crate::core::auth::{authenticate, verify_password};
use crate::core::code::{CodePrefix, CodeSequence};
use crate::core::entity::{carry_rename_history, Coded, Entity};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::state::AppState;
use crate::core::target::TargetRef;
use crate::entities::{
    Extension, Intervention, ManualEntry, NotificationSettings, Pertinenza, Plesso, Road,
    RupAssignment, ScheduledExportConfig, SecurityPolicy, Section, Structure, Suspension, User,
};

/// Caller-supplied authorization for a deletion
#[derive(Debug, Clone, Default)]
pub struct DeleteGuard {
    /// The caller explicitly confirmed the deletion
    pub confirmed: bool,
    /// Security password typed for protected deletions
    pub admin_password: Option<String>,
}

impl DeleteGuard {
    pub fn confirmed() -> Self {
        Self {
            confirmed: true,
            admin_password: None,
        }
    }

    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            confirmed: true,
            admin_password: Some(password.into()),
        }
    }
}

/// Records committed by a CSV import
#[derive(Debug, Clone, PartialEq)]
pub enum ImportBatch {
    Structures(Vec<Structure>),
    Plessi(Vec<Plesso>),
    Roads(Vec<Road>),
    Interventions(Vec<Intervention>),
}

impl ImportBatch {
    pub fn len(&self) -> usize {
        match self {
            ImportBatch::Structures(v) => v.len(),
            ImportBatch::Plessi(v) => v.len(),
            ImportBatch::Roads(v) => v.len(),
            ImportBatch::Interventions(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Audit label and plural noun
    fn describe(&self) -> (&'static str, &'static str) {
        match self {
            ImportBatch::Structures(_) => (Structure::LABEL, "immobili"),
            ImportBatch::Plessi(_) => (Plesso::LABEL, "plessi"),
            ImportBatch::Roads(_) => (Road::LABEL, "strade"),
            ImportBatch::Interventions(_) => (Intervention::LABEL, "interventi"),
        }
    }
}

/// A single state change
#[derive(Debug, Clone)]
pub enum Mutation {
    SaveStructure(Structure),
    DeleteStructure { id: EntityId, guard: DeleteGuard },
    SavePlesso(Plesso),
    DeletePlesso { id: EntityId, guard: DeleteGuard },
    SavePertinenza(Pertinenza),
    DeletePertinenza { id: EntityId, guard: DeleteGuard },
    SaveRoad(Road),
    DeleteRoad { id: EntityId, guard: DeleteGuard },
    SaveIntervention(Intervention),
    AddSuspension { intervention: EntityId, suspension: Suspension },
    AddExtension { intervention: EntityId, extension: Extension },
    DeleteIntervention { id: EntityId, guard: DeleteGuard },
    PurgeOrphanInterventions { guard: DeleteGuard },
    SaveUser(User),
    DeleteUser { id: EntityId, guard: DeleteGuard },
    Login { username: String, password: String },
    Logout,
    UpdateNotificationSettings(NotificationSettings),
    UpdateScheduledExport(ScheduledExportConfig),
    UpdateSecurityPolicy(SecurityPolicy),
    UpdateManual { id: String, entry: ManualEntry },
    ImportBatch(ImportBatch),
}

/// Environment a mutation is applied in
#[derive(Debug, Clone)]
pub struct MutationContext {
    pub now: DateTime<Utc>,
    /// Hex SHA-256 of the security password for protected deletions
    pub admin_secret: String,
}

impl MutationContext {
    pub fn new(now: DateTime<Utc>, admin_secret: impl Into<String>) -> Self {
        Self {
            now,
            admin_secret: admin_secret.into(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// Result of applying a mutation
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: AppState,
    /// Audit entries added by this change, oldest first
    pub appended: Vec<AuditLogEntry>,
}

impl Transition {
    /// Nothing was changed
    pub fn is_noop(&self, before: &AppState) -> bool {
        self.appended.is_empty() && self.state == *before
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MutationError {
    #[error("no user is logged in (run 'edilgest login')")]
    NotLoggedIn,

    #[error("user '{user}' has no access to the '{section}' section")]
    AccessDenied { user: String, section: Section },

    #[error("only administrators can {0}")]
    AdminOnly(&'static str),

    #[error("deletion not confirmed")]
    NotConfirmed,

    #[error("wrong security password, operation cancelled")]
    WrongSecurityPassword,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("{kind} not found: {reference}")]
    NotFound { kind: &'static str, reference: String },

    #[error("parent {kind} not found: {reference}")]
    ParentNotFound { kind: &'static str, reference: String },

    #[error("intervention target does not resolve: {0}")]
    UnresolvedTarget(TargetRef),

    #[error("amount must be a non-negative number (got {0})")]
    InvalidAmount(f64),

    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("e-mail domain of '{0}' is not in the allowed list")]
    DomainNotAllowed(String),

    #[error("cannot delete the account that is currently logged in")]
    SelfDeletion,

    #[error("{0}")]
    Invalid(String),
}

/// Working copy of the state plus the audit entries recorded so far
struct Draft {
    state: AppState,
    appended: Vec<AuditLogEntry>,
    now: DateTime<Utc>,
}

impl Draft {
    fn new(state: &AppState, ctx: &MutationContext) -> Self {
        Self {
            state: state.clone(),
            appended: Vec::new(),
            now: ctx.now,
        }
    }

    fn log(
        &mut self,
        action: AuditAction,
        entity_type: &str,
        entity_id: impl Into<String>,
        details: impl Into<String>,
    ) {
        let entry = AuditLogEntry::new(action, entity_type, entity_id, details, self.now);
        self.state.audit_logs.insert(0, entry.clone());
        self.appended.push(entry);
    }

    fn finish(self) -> Transition {
        Transition {
            state: self.state,
            appended: self.appended,
        }
    }
}

impl Mutation {
    /// Section a user must be able to open to perform this change
    pub fn section(&self) -> Option<Section> {
        match self {
            Mutation::SaveStructure(_)
            | Mutation::DeleteStructure { .. }
            | Mutation::SavePlesso(_)
            | Mutation::DeletePlesso { .. }
            | Mutation::SavePertinenza(_)
            | Mutation::DeletePertinenza { .. } => Some(Section::Buildings),
            Mutation::SaveRoad(_) | Mutation::DeleteRoad { .. } => Some(Section::Roads),
            Mutation::SaveIntervention(_)
            | Mutation::AddSuspension { .. }
            | Mutation::AddExtension { .. }
            | Mutation::DeleteIntervention { .. } => Some(Section::Interventions),
            Mutation::PurgeOrphanInterventions { .. } => Some(Section::SystemDb),
            Mutation::SaveUser(_)
            | Mutation::DeleteUser { .. }
            | Mutation::UpdateScheduledExport(_)
            | Mutation::UpdateSecurityPolicy(_) => Some(Section::UserManagement),
            Mutation::UpdateNotificationSettings(_) => Some(Section::Dashboard),
            Mutation::UpdateManual { .. } => Some(Section::Manuals),
            Mutation::ImportBatch(_) => Some(Section::CsvImport),
            Mutation::Login { .. } | Mutation::Logout => None,
        }
    }

    /// Apply the change to `state`, returning the new state
    pub fn apply(self, state: &AppState, ctx: &MutationContext) -> Result<Transition, MutationError> {
        if let Some(section) = self.section() {
            let user = state.current_user().ok_or(MutationError::NotLoggedIn)?;
            if !user.can_access(section) {
                return Err(MutationError::AccessDenied {
                    user: user.username.clone(),
                    section,
                });
            }
        }

        let mut draft = Draft::new(state, ctx);
        match self {
            Mutation::SaveStructure(s) => save_structure(&mut draft, s)?,
            Mutation::DeleteStructure { id, guard } => {
                admin_guard(state, ctx, &guard, "delete structures")?;
                delete_structure(&mut draft, &id)?
            }
            Mutation::SavePlesso(p) => save_plesso(&mut draft, p)?,
            Mutation::DeletePlesso { id, guard } => {
                admin_guard(state, ctx, &guard, "delete plessi")?;
                delete_plesso(&mut draft, &id)?
            }
            Mutation::SavePertinenza(p) => save_pertinenza(&mut draft, p)?,
            Mutation::DeletePertinenza { id, guard } => {
                confirm_guard(&guard)?;
                delete_pertinenza(&mut draft, &id)?
            }
            Mutation::SaveRoad(r) => save_road(&mut draft, r)?,
            Mutation::DeleteRoad { id, guard } => {
                admin_guard(state, ctx, &guard, "delete roads")?;
                delete_road(&mut draft, &id)?
            }
            Mutation::SaveIntervention(i) => save_intervention(&mut draft, i, ctx.today())?,
            Mutation::AddSuspension {
                intervention,
                suspension,
            } => add_suspension(&mut draft, &intervention, suspension)?,
            Mutation::AddExtension {
                intervention,
                extension,
            } => add_extension(&mut draft, &intervention, extension)?,
            Mutation::DeleteIntervention { id, guard } => {
                confirm_guard(&guard)?;
                delete_intervention(&mut draft, &id)?
            }
            Mutation::PurgeOrphanInterventions { guard } => {
                admin_guard(state, ctx, &guard, "purge interventions")?;
                purge_orphans(&mut draft)
            }
            Mutation::SaveUser(u) => save_user(&mut draft, u)?,
            Mutation::DeleteUser { id, guard } => {
                confirm_guard(&guard)?;
                delete_user(&mut draft, &id)?
            }
            Mutation::Login { username, password } => login(&mut draft, &username, &password)?,
            Mutation::Logout => draft.state.current_user_id = None,
            Mutation::UpdateNotificationSettings(settings) => {
                draft.state.notification_settings = settings;
                draft.log(
                    AuditAction::Update,
                    "System",
                    "Notifiche",
                    "Impostazioni notifiche aggiornate.",
                );
            }
            Mutation::UpdateScheduledExport(config) => {
                draft.state.scheduled_export = config;
                draft.log(
                    AuditAction::Update,
                    "System",
                    "Automazione",
                    "Schedulazione export aggiornata.",
                );
            }
            Mutation::UpdateSecurityPolicy(policy) => {
                draft.state.security_policy = policy;
                draft.log(
                    AuditAction::Update,
                    "System",
                    "Sicurezza",
                    "Politiche di accesso aggiornate.",
                );
            }
            Mutation::UpdateManual { id, entry } => {
                require_admin(state, "edit manuals")?;
                draft.log(
                    AuditAction::Update,
                    "Manuale",
                    id.clone(),
                    format!("Aggiornato contenuto manuale: {}", id),
                );
                draft.state.manual_contents.insert(id, entry);
            }
            Mutation::ImportBatch(batch) => import_batch(&mut draft, batch),
        }
        Ok(draft.finish())
    }
}

// ---- guards ----

fn require_admin(state: &AppState, action: &'static str) -> Result<(), MutationError> {
    match state.current_user() {
        Some(user) if user.is_admin() => Ok(()),
        Some(_) => Err(MutationError::AdminOnly(action)),
        None => Err(MutationError::NotLoggedIn),
    }
}

fn confirm_guard(guard: &DeleteGuard) -> Result<(), MutationError> {
    if guard.confirmed {
        Ok(())
    } else {
        Err(MutationError::NotConfirmed)
    }
}

/// Admin role, explicit confirmation, then the security password
fn admin_guard(
    state: &AppState,
    ctx: &MutationContext,
    guard: &DeleteGuard,
    action: &'static str,
) -> Result<(), MutationError> {
    require_admin(state, action)?;
    confirm_guard(guard)?;
    match guard.admin_password.as_deref() {
        Some(pw) if verify_password(pw, &ctx.admin_secret) => Ok(()),
        _ => Err(MutationError::WrongSecurityPassword),
    }
}

fn require_name(name: &str, what: &str) -> Result<(), MutationError> {
    if name.trim().is_empty() {
        Err(MutationError::Invalid(format!("{} name is required", what)))
    } else {
        Ok(())
    }
}

/// Keep the stored code when the update brings none, else generate one
fn settle_code<T: Coded>(stored: Option<&T>, updated: &mut T, next: impl FnOnce() -> String) {
    if !updated.needs_code() {
        return;
    }
    match stored.and_then(|s| s.unique_code()).filter(|c| !c.trim().is_empty()) {
        Some(code) => updated.set_unique_code(code.to_string()),
        None => updated.set_unique_code(next()),
    }
}

// ---- structures ----

fn save_structure(draft: &mut Draft, mut s: Structure) -> Result<(), MutationError> {
    require_name(&s.name, "structure")?;
    let position = draft.state.structures.iter().position(|x| x.id == s.id);

    let stored = position.map(|i| draft.state.structures[i].clone());
    settle_code(stored.as_ref(), &mut s, || draft.state.next_code(CodePrefix::Imm));
    for p in &mut s.plessi {
        p.structure_id = s.id.clone();
    }

    let action = match (position, stored) {
        (Some(i), Some(stored)) => {
            carry_rename_history(&stored, &mut s);
            if stored == s {
                return Ok(());
            }
            draft.state.structures[i] = s.clone();
            AuditAction::Update
        }
        _ => {
            draft.state.structures.push(s.clone());
            AuditAction::Create
        }
    };
    draft.log(
        action,
        Structure::LABEL,
        s.id.as_str(),
        format!("Gestione immobile: {}", s.name),
    );
    Ok(())
}

fn delete_structure(draft: &mut Draft, id: &EntityId) -> Result<(), MutationError> {
    let position = draft
        .state
        .structures
        .iter()
        .position(|s| &s.id == id)
        .ok_or_else(|| not_found(Structure::LABEL, id))?;
    let removed = draft.state.structures.remove(position);
    draft.log(
        AuditAction::Delete,
        Structure::LABEL,
        id.as_str(),
        format!("Eliminato immobile: {}", removed.name),
    );
    Ok(())
}

// ---- plessi ----

fn save_plesso(draft: &mut Draft, mut p: Plesso) -> Result<(), MutationError> {
    require_name(&p.name, "plesso")?;
    let parent = draft
        .state
        .structures
        .iter()
        .position(|s| s.id == p.structure_id)
        .ok_or_else(|| MutationError::ParentNotFound {
            kind: Structure::LABEL,
            reference: p.structure_id.to_string(),
        })?;

    let stored = draft.state.find_plesso(&p.id).map(|(_, x)| x.clone());
    settle_code(stored.as_ref(), &mut p, || draft.state.next_code(CodePrefix::Plx));
    for x in &mut p.pertinenze {
        x.plesso_id = p.id.clone();
    }

    let action = match stored {
        Some(stored) => {
            carry_rename_history(&stored, &mut p);
            if stored == p {
                return Ok(());
            }
            if stored.structure_id == p.structure_id {
                if let Some(slot) = draft.state.structures[parent]
                    .plessi
                    .iter_mut()
                    .find(|x| x.id == p.id)
                {
                    *slot = p.clone();
                }
            } else {
                // moved to another structure
                for s in &mut draft.state.structures {
                    s.plessi.retain(|x| x.id != p.id);
                }
                draft.state.structures[parent].plessi.push(p.clone());
            }
            AuditAction::Update
        }
        None => {
            draft.state.structures[parent].plessi.push(p.clone());
            AuditAction::Create
        }
    };
    draft.log(
        action,
        Plesso::LABEL,
        p.id.as_str(),
        format!("Gestione plesso: {}", p.name),
    );
    Ok(())
}

fn delete_plesso(draft: &mut Draft, id: &EntityId) -> Result<(), MutationError> {
    let (structure_name, plesso_name) = draft
        .state
        .find_plesso(id)
        .map(|(s, p)| (s.name.clone(), p.name.clone()))
        .ok_or_else(|| not_found(Plesso::LABEL, id))?;
    for s in &mut draft.state.structures {
        s.plessi.retain(|p| &p.id != id);
    }
    draft.log(
        AuditAction::Delete,
        Plesso::LABEL,
        id.as_str(),
        format!(
            "Eliminato plesso: {} dall'immobile {}",
            plesso_name, structure_name
        ),
    );
    Ok(())
}

// ---- pertinenze ----

fn save_pertinenza(draft: &mut Draft, p: Pertinenza) -> Result<(), MutationError> {
    require_name(&p.name, "pertinenza")?;
    if draft.state.find_plesso(&p.plesso_id).is_none() {
        return Err(MutationError::ParentNotFound {
            kind: Plesso::LABEL,
            reference: p.plesso_id.to_string(),
        });
    }

    let stored = draft.state.find_pertinenza(&p.id).map(|(_, _, x)| x.clone());
    if stored.as_ref() == Some(&p) {
        return Ok(());
    }
    let existed = stored.is_some();
    let mut replaced = false;
    for s in &mut draft.state.structures {
        for plesso in &mut s.plessi {
            if plesso.id == p.plesso_id {
                if let Some(slot) = plesso.pertinenze.iter_mut().find(|x| x.id == p.id) {
                    *slot = p.clone();
                    replaced = true;
                }
            } else {
                plesso.pertinenze.retain(|x| x.id != p.id);
            }
        }
    }
    if !replaced {
        for s in &mut draft.state.structures {
            if let Some(plesso) = s.plessi.iter_mut().find(|x| x.id == p.plesso_id) {
                plesso.pertinenze.push(p.clone());
            }
        }
    }

    let action = if existed {
        AuditAction::Update
    } else {
        AuditAction::Create
    };
    draft.log(
        action,
        Pertinenza::LABEL,
        p.id.as_str(),
        format!("Gestione pertinenza: {}", p.name),
    );
    Ok(())
}

fn delete_pertinenza(draft: &mut Draft, id: &EntityId) -> Result<(), MutationError> {
    let name = draft
        .state
        .find_pertinenza(id)
        .map(|(_, _, x)| x.name.clone())
        .ok_or_else(|| not_found(Pertinenza::LABEL, id))?;
    for s in &mut draft.state.structures {
        for p in &mut s.plessi {
            p.pertinenze.retain(|x| &x.id != id);
        }
    }
    draft.log(
        AuditAction::Delete,
        Pertinenza::LABEL,
        id.as_str(),
        format!("Eliminata pertinenza: {}", name),
    );
    Ok(())
}

// ---- roads ----

fn save_road(draft: &mut Draft, mut r: Road) -> Result<(), MutationError> {
    if r.code.trim().is_empty() {
        return Err(MutationError::Invalid("road code is required".to_string()));
    }
    if !r.length_km.is_finite() || r.length_km < 0.0 {
        return Err(MutationError::Invalid(format!(
            "road length must be a non-negative number (got {})",
            r.length_km
        )));
    }
    let position = draft.state.roads.iter().position(|x| x.id == r.id);
    let stored = position.map(|i| draft.state.roads[i].clone());
    settle_code(stored.as_ref(), &mut r, || draft.state.next_code(CodePrefix::Str));

    if stored.as_ref() == Some(&r) {
        return Ok(());
    }
    let action = match position {
        Some(i) => {
            draft.state.roads[i] = r.clone();
            AuditAction::Update
        }
        None => {
            draft.state.roads.push(r.clone());
            AuditAction::Create
        }
    };
    draft.log(
        action,
        Road::LABEL,
        r.id.as_str(),
        format!("Gestione strada: {}", r.code),
    );
    Ok(())
}

fn delete_road(draft: &mut Draft, id: &EntityId) -> Result<(), MutationError> {
    let position = draft
        .state
        .roads
        .iter()
        .position(|r| &r.id == id)
        .ok_or_else(|| not_found(Road::LABEL, id))?;
    let removed = draft.state.roads.remove(position);
    draft.log(
        AuditAction::Delete,
        Road::LABEL,
        id.as_str(),
        format!("Eliminata strada: {}", removed.code),
    );
    Ok(())
}

// ---- interventions ----

fn save_intervention(
    draft: &mut Draft,
    mut i: Intervention,
    today: NaiveDate,
) -> Result<(), MutationError> {
    if i.tender_code.trim().is_empty() {
        return Err(MutationError::Invalid("CIG is required".to_string()));
    }
    if !i.amount.is_finite() || i.amount < 0.0 {
        return Err(MutationError::InvalidAmount(i.amount));
    }
    if let (Some(start), Some(end)) = (i.date_start, i.date_end) {
        if end < start {
            return Err(MutationError::Invalid(format!(
                "end date {} is before start date {}",
                end, start
            )));
        }
    }

    let position = draft.state.interventions.iter().position(|x| x.id == i.id);
    let stored = position.map(|p| draft.state.interventions[p].clone());

    let retargeted = stored.as_ref().map_or(true, |s| s.target != i.target);
    if retargeted && !draft.state.resolve_target(&i.target).is_resolved() {
        return Err(MutationError::UnresolvedTarget(i.target.clone()));
    }

    settle_code(stored.as_ref(), &mut i, || draft.state.next_code(CodePrefix::Int));

    let action = match (position, stored) {
        (Some(p), Some(stored)) => {
            i.created_at = stored.created_at;
            carry_responsible_history(&stored, &mut i, today);
            if stored == i {
                return Ok(());
            }
            draft.state.interventions[p] = i.clone();
            AuditAction::Update
        }
        _ => {
            draft.state.interventions.push(i.clone());
            AuditAction::Create
        }
    };
    let details = match action {
        AuditAction::Create => format!("Creato CIG {}", i.tender_code),
        _ => format!("Modificato CIG {}", i.tender_code),
    };
    draft.log(action, Intervention::LABEL, i.id.as_str(), details);
    Ok(())
}

/// Stored assignments are never lost; a changed RUP is appended to them
fn carry_responsible_history(stored: &Intervention, updated: &mut Intervention, today: NaiveDate) {
    let mut history = stored.responsible_history.clone();
    for entry in &updated.responsible_history {
        if !history.iter().any(|h| h.id == entry.id) {
            history.push(entry.clone());
        }
    }
    if stored.responsible != updated.responsible && !stored.responsible.trim().is_empty() {
        history.push(RupAssignment {
            id: EntityId::generate(EntityKind::Record),
            name: stored.responsible.clone(),
            start_date: today,
        });
    }
    updated.responsible_history = history;
}

fn intervention_mut<'a>(
    draft: &'a mut Draft,
    id: &EntityId,
) -> Result<&'a mut Intervention, MutationError> {
    draft
        .state
        .interventions
        .iter_mut()
        .find(|i| &i.id == id)
        .ok_or_else(|| not_found(Intervention::LABEL, id))
}

fn add_suspension(
    draft: &mut Draft,
    id: &EntityId,
    suspension: Suspension,
) -> Result<(), MutationError> {
    if let Some(end) = suspension.end_date {
        if end < suspension.start_date {
            return Err(MutationError::Invalid(format!(
                "suspension end {} is before its start {}",
                end, suspension.start_date
            )));
        }
    }
    let intervention = intervention_mut(draft, id)?;
    intervention.suspensions.push(suspension.clone());
    let cig = intervention.tender_code.clone();
    draft.log(
        AuditAction::Update,
        Intervention::LABEL,
        id.as_str(),
        format!(
            "Sospensione dal {} registrata su CIG {}",
            suspension.start_date, cig
        ),
    );
    Ok(())
}

fn add_extension(
    draft: &mut Draft,
    id: &EntityId,
    extension: Extension,
) -> Result<(), MutationError> {
    if extension.days == 0 {
        return Err(MutationError::Invalid(
            "an extension must grant at least one day".to_string(),
        ));
    }
    let intervention = intervention_mut(draft, id)?;
    intervention.extensions.push(extension.clone());
    let cig = intervention.tender_code.clone();
    draft.log(
        AuditAction::Update,
        Intervention::LABEL,
        id.as_str(),
        format!("Proroga di {} giorni su CIG {}", extension.days, cig),
    );
    Ok(())
}

fn delete_intervention(draft: &mut Draft, id: &EntityId) -> Result<(), MutationError> {
    let position = draft
        .state
        .interventions
        .iter()
        .position(|i| &i.id == id)
        .ok_or_else(|| not_found(Intervention::LABEL, id))?;
    let removed = draft.state.interventions.remove(position);
    draft.log(
        AuditAction::Delete,
        Intervention::LABEL,
        id.as_str(),
        format!("Eliminato intervento CIG: {}", removed.tender_code),
    );
    Ok(())
}

fn purge_orphans(draft: &mut Draft) {
    let orphans: Vec<EntityId> = draft
        .state
        .orphan_interventions()
        .into_iter()
        .map(|i| i.id.clone())
        .collect();
    if orphans.is_empty() {
        return;
    }
    draft
        .state
        .interventions
        .retain(|i| !orphans.contains(&i.id));
    draft.log(
        AuditAction::Purge,
        Intervention::LABEL,
        "orfani",
        format!("Rimossi {} interventi con target inesistente.", orphans.len()),
    );
}

// ---- users ----

fn save_user(draft: &mut Draft, u: User) -> Result<(), MutationError> {
    let username = u.username.trim();
    if username.is_empty() {
        return Err(MutationError::Invalid("username is required".to_string()));
    }
    if draft
        .state
        .users
        .iter()
        .any(|x| x.id != u.id && x.username.eq_ignore_ascii_case(username))
    {
        return Err(MutationError::DuplicateUsername(username.to_string()));
    }
    if !draft
        .state
        .security_policy
        .allows_domain(u.email_domain().as_deref())
    {
        return Err(MutationError::DomainNotAllowed(u.email.clone()));
    }

    let (action, details) = match draft.state.users.iter().position(|x| x.id == u.id) {
        Some(i) if draft.state.users[i] == u => return Ok(()),
        Some(i) => {
            draft.state.users[i] = u.clone();
            (AuditAction::Update, format!("Aggiornato utente: {}", u.username))
        }
        None => {
            draft.state.users.push(u.clone());
            (AuditAction::Create, format!("Creato utente: {}", u.username))
        }
    };
    draft.log(action, User::LABEL, u.id.as_str(), details);
    Ok(())
}

fn delete_user(draft: &mut Draft, id: &EntityId) -> Result<(), MutationError> {
    if draft.state.find_user(id).is_none() {
        return Err(not_found(User::LABEL, id));
    }
    if draft.state.current_user_id.as_ref() == Some(id) {
        return Err(MutationError::SelfDeletion);
    }
    draft.state.users.retain(|u| &u.id != id);
    draft.log(AuditAction::Delete, User::LABEL, id.as_str(), "Utente rimosso.");
    Ok(())
}

fn login(draft: &mut Draft, username: &str, password: &str) -> Result<(), MutationError> {
    let creds = authenticate(username, password).ok_or(MutationError::InvalidCredentials)?;
    if draft.state.find_user(&creds.user_id).is_none() {
        return Err(MutationError::InvalidCredentials);
    }
    draft.state.current_user_id = Some(creds.user_id.clone());
    draft.log(
        AuditAction::Login,
        "User",
        creds.user_id.as_str(),
        creds.greeting,
    );
    Ok(())
}

// ---- import ----

fn import_batch(draft: &mut Draft, batch: ImportBatch) {
    let (label, noun) = batch.describe();
    let mut committed = 0usize;

    match batch {
        ImportBatch::Structures(rows) => {
            let mut seq = CodeSequence::new(
                CodePrefix::Imm,
                draft.state.structures.iter().map(|s| s.unique_code.as_deref()),
            );
            for mut s in rows {
                fill_code(&mut seq, &mut s);
                draft.state.structures.push(s);
                committed += 1;
            }
        }
        ImportBatch::Plessi(rows) => {
            let mut seq = CodeSequence::new(
                CodePrefix::Plx,
                draft.state.plessi().map(|(_, p)| p.unique_code.as_deref()),
            );
            for mut p in rows {
                let Some(parent) = draft
                    .state
                    .structures
                    .iter_mut()
                    .find(|s| s.id == p.structure_id)
                else {
                    tracing::warn!(plesso = %p.name, parent = %p.structure_id, "skipping imported plesso without parent");
                    continue;
                };
                fill_code(&mut seq, &mut p);
                parent.plessi.push(p);
                committed += 1;
            }
        }
        ImportBatch::Roads(rows) => {
            let mut seq = CodeSequence::new(
                CodePrefix::Str,
                draft.state.roads.iter().map(|r| r.unique_code.as_deref()),
            );
            for mut r in rows {
                fill_code(&mut seq, &mut r);
                draft.state.roads.push(r);
                committed += 1;
            }
        }
        ImportBatch::Interventions(rows) => {
            let mut seq = CodeSequence::new(
                CodePrefix::Int,
                draft.state.interventions.iter().map(|i| i.unique_code.as_deref()),
            );
            for mut i in rows {
                fill_code(&mut seq, &mut i);
                draft.state.interventions.push(i);
                committed += 1;
            }
        }
    }

    if committed > 0 {
        draft.log(
            AuditAction::Create,
            label,
            "CSV",
            format!("Importati {} {} via CSV.", committed, noun),
        );
    }
}

fn fill_code<T: Coded>(seq: &mut CodeSequence, record: &mut T) {
    if record.needs_code() {
        record.set_unique_code(seq.take());
    } else if let Some(code) = record.unique_code() {
        let code = code.to_string();
        seq.observe(&code);
    }
}

fn not_found(kind: &'static str, id: &EntityId) -> MutationError {
    MutationError::NotFound {
        kind,
        reference: id.to_string(),
    }
}
