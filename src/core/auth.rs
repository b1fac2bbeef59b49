//! Authentication and protected-action checks

use sha2::{Digest, Sha256};

use crate::core::identity::EntityId;

/// Security password protected deletions ask for, unless configured otherwise
pub const DEFAULT_SECURITY_PASSWORD: &str = "AdminPassword2025!";

/// A successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: EntityId,
    /// Audit detail recorded for the login
    pub greeting: &'static str,
}

/// Fixed username/password pairs mapped to the built-in accounts
const ACCOUNTS: &[(&str, &str, &str, &str)] = &[
    ("admin", "password", "admin-001", "Accesso amministratore eseguito."),
    ("editor", "password", "editor-001", "Accesso editor eseguito."),
    ("user", "password", "user-001", "Accesso operatore standard eseguito."),
];

/// Check a username/password pair against the built-in accounts
pub fn authenticate(username: &str, password: &str) -> Option<Credentials> {
    ACCOUNTS
        .iter()
        .find(|(u, p, _, _)| *u == username.trim() && *p == password)
        .map(|(_, _, id, greeting)| Credentials {
            user_id: EntityId::from_raw(*id),
            greeting: *greeting,
        })
}

/// Lowercase hex SHA-256 of a password
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    format!("{:x}", digest)
}

/// Compare a typed password against the configured digest
pub fn verify_password(candidate: &str, expected_sha256: &str) -> bool {
    hash_password(candidate) == expected_sha256.trim().to_lowercase()
}
