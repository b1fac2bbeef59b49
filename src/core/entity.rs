//! Entity traits - common interface for stored record types

use serde::{de::DeserializeOwned, Serialize};

use crate::core::code::CodePrefix;
use crate::core::identity::EntityId;

/// Common trait for all records held by the entity store
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Entity-type label written to the audit log (e.g. "Immobile")
    const LABEL: &'static str;

    /// Get the record's identifier
    fn id(&self) -> &EntityId;

    /// Short human-readable name for listings and audit details
    fn display_name(&self) -> String;
}

/// Records that carry a human-readable unique code
pub trait Coded {
    const CODE_PREFIX: CodePrefix;

    fn unique_code(&self) -> Option<&str>;

    fn set_unique_code(&mut self, code: String);

    /// True when the code is absent or blank
    fn needs_code(&self) -> bool {
        self.unique_code().map_or(true, |c| c.trim().is_empty())
    }
}

/// Records whose name changes are tracked in a previous-name history
pub trait Renamable {
    fn name(&self) -> &str;

    fn previous_names(&self) -> &[String];

    fn previous_names_mut(&mut self) -> &mut Vec<String>;
}

/// Carry the rename history from the stored record onto its replacement
///
/// The history is append-only and ordered by when a name was first
/// superseded. Names the replacement brings along (e.g. historical names
/// typed in by hand) are appended after the stored ones, then the
/// superseded name if the record was renamed. A name already present is
/// never added twice nor moved. A record renamed back to an old name keeps
/// that name in its history; listings hide it with [`former_names`].
pub fn carry_rename_history<T: Renamable>(stored: &T, updated: &mut T) {
    let mut history: Vec<String> = stored.previous_names().to_vec();

    for name in updated.previous_names() {
        if !name.trim().is_empty() && !history.contains(name) {
            history.push(name.clone());
        }
    }

    if stored.name() != updated.name() && !history.iter().any(|n| n == stored.name()) {
        history.push(stored.name().to_string());
    }

    *updated.previous_names_mut() = history;
}

/// Previous names other than the current one, in history order
pub fn former_names<T: Renamable>(record: &T) -> Vec<&str> {
    record
        .previous_names()
        .iter()
        .map(String::as_str)
        .filter(|n| *n != record.name())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Named {
        name: String,
        previous: Vec<String>,
    }

    impl Renamable for Named {
        fn name(&self) -> &str {
            &self.name
        }
        fn previous_names(&self) -> &[String] {
            &self.previous
        }
        fn previous_names_mut(&mut self) -> &mut Vec<String> {
            &mut self.previous
        }
    }

    fn named(name: &str) -> Named {
        Named {
            name: name.to_string(),
            previous: Vec::new(),
        }
    }

    fn rename(current: &Named, to: &str) -> Named {
        let mut next = current.clone();
        next.name = to.to_string();
        carry_rename_history(current, &mut next);
        next
    }

    #[test]
    fn test_rename_pushes_old_name() {
        let a = named("Palazzo A");
        let b = rename(&a, "Palazzo B");
        assert_eq!(b.previous, vec!["Palazzo A"]);
    }

    #[test]
    fn test_same_name_leaves_history_untouched() {
        let a = named("Palazzo A");
        let again = rename(&a, "Palazzo A");
        assert!(again.previous.is_empty());
    }

    #[test]
    fn test_history_keeps_first_superseded_order() {
        let a = named("A");
        let b = rename(&a, "B");
        let c = rename(&b, "C");
        let b2 = rename(&c, "B");
        let d = rename(&b2, "D");
        assert_eq!(d.previous, vec!["A", "B", "C"]);
        assert!(!d.previous.contains(&"D".to_string()));
    }

    #[test]
    fn test_rename_back_keeps_every_name() {
        let a = named("A");
        let b = rename(&a, "B");
        let back = rename(&b, "A");
        assert_eq!(back.previous, vec!["A", "B"]);
        assert_eq!(former_names(&back), vec!["B"]);

        let c = rename(&back, "C");
        assert_eq!(c.previous, vec!["A", "B"]);
        assert_eq!(former_names(&c), vec!["A", "B"]);
    }

    #[test]
    fn test_blank_hand_added_names_are_skipped() {
        let stored = named("Sede");
        let mut updated = named("Sede");
        updated.previous = vec!["  ".to_string(), "Ex Convento".to_string()];
        carry_rename_history(&stored, &mut updated);
        assert_eq!(updated.previous, vec!["Ex Convento"]);
    }

    #[test]
    fn test_stale_history_on_update_is_not_lost() {
        let mut stored = named("Nuovo");
        stored.previous = vec!["Vecchio".to_string()];
        // an update built from an older copy without history
        let mut updated = named("Nuovissimo");
        carry_rename_history(&stored, &mut updated);
        assert_eq!(updated.previous, vec!["Vecchio", "Nuovo"]);
    }

    #[test]
    fn test_hand_added_names_are_kept() {
        let stored = named("Sede");
        let mut updated = named("Sede");
        updated.previous = vec!["Ex Convento".to_string()];
        carry_rename_history(&stored, &mut updated);
        assert_eq!(updated.previous, vec!["Ex Convento"]);
    }
}
