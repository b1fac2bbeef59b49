//! Human-readable unique codes (`IMM_000101`, `PLX_000002`, ...)
//!
//! Codes are advisory-unique: the next code is derived from the highest
//! numeric suffix already present, so imported records carrying
//! out-of-band codes can still collide.

use std::fmt;
use std::str::FromStr;

/// Width of the zero-padded numeric suffix
pub const CODE_DIGITS: usize = 6;

/// Unique-code prefixes, one per asset family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodePrefix {
    /// Buildings
    Imm,
    /// Sub-units (plessi)
    Plx,
    /// Roads
    Str,
    /// Interventions
    Int,
}

impl CodePrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePrefix::Imm => "IMM",
            CodePrefix::Plx => "PLX",
            CodePrefix::Str => "STR",
            CodePrefix::Int => "INT",
        }
    }
}

impl fmt::Display for CodePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodePrefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "IMM" => Ok(CodePrefix::Imm),
            "PLX" => Ok(CodePrefix::Plx),
            "STR" => Ok(CodePrefix::Str),
            "INT" => Ok(CodePrefix::Int),
            _ => Err(format!("Unknown code prefix: {}", s)),
        }
    }
}

/// Numeric suffix of a code: the segment after the last `_`
///
/// Returns `None` for codes without a strictly numeric, positive suffix.
pub fn code_suffix(code: &str) -> Option<u64> {
    let last = code.rsplit('_').next()?.trim();
    if last.is_empty() || !last.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    last.parse::<u64>().ok().filter(|n| *n > 0)
}

/// Format a code from prefix and sequence number
pub fn format_code(prefix: CodePrefix, n: u64) -> String {
    format!("{}_{:0width$}", prefix, n, width = CODE_DIGITS)
}

/// Next code for `prefix`, given the codes currently in the collection
///
/// Only codes of the form `PREFIX_...` participate; malformed suffixes
/// count as zero and are ignored, as does a suffix with no successor
/// (`u64::MAX`). An empty collection yields `_000001`.
pub fn next_code<'a, I>(prefix: CodePrefix, codes: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let head = format!("{}_", prefix);
    let next = codes
        .into_iter()
        .flatten()
        .filter(|c| c.to_uppercase().starts_with(&head))
        .filter_map(code_suffix)
        .filter_map(|n| n.checked_add(1))
        .max()
        .unwrap_or(1);
    format_code(prefix, next)
}

/// Allocates consecutive codes for a batch of new records
///
/// Used by imports, where several records need codes before any of them
/// is committed to the store.
#[derive(Debug, Clone)]
pub struct CodeSequence {
    prefix: CodePrefix,
    next: u64,
}

impl CodeSequence {
    pub fn new<'a, I>(prefix: CodePrefix, codes: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let first = code_suffix(&next_code(prefix, codes)).unwrap_or(1);
        Self {
            prefix,
            next: first,
        }
    }

    /// Record a code taken by a row that brought its own
    pub fn observe(&mut self, code: &str) {
        if code.to_uppercase().starts_with(&format!("{}_", self.prefix)) {
            if let Some(n) = code_suffix(code).and_then(|n| n.checked_add(1)) {
                self.next = self.next.max(n);
            }
        }
    }

    pub fn take(&mut self) -> String {
        let code = format_code(self.prefix, self.next);
        self.next = self.next.saturating_add(1);
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collection_starts_at_one() {
        assert_eq!(next_code(CodePrefix::Imm, Vec::new()), "IMM_000001");
    }

    #[test]
    fn test_next_is_max_plus_one() {
        let codes = vec![Some("STR_000002"), Some("STR_000015"), None, Some("STR_000007")];
        assert_eq!(next_code(CodePrefix::Str, codes), "STR_000016");
    }

    #[test]
    fn test_malformed_suffixes_are_ignored() {
        let codes = vec![Some("INT_abc"), Some("INT_"), Some("INT_12x"), Some("INT_000003")];
        assert_eq!(next_code(CodePrefix::Int, codes), "INT_000004");

        let only_bad = vec![Some("INT_abc"), Some("garbage")];
        assert_eq!(next_code(CodePrefix::Int, only_bad), "INT_000001");
    }

    #[test]
    fn test_other_prefixes_do_not_count() {
        let codes = vec![Some("IMM_000900"), Some("PLX_000004")];
        assert_eq!(next_code(CodePrefix::Plx, codes), "PLX_000005");
    }

    #[test]
    fn test_suffix_wider_than_padding() {
        let codes = vec![Some("IMM_1234567")];
        assert_eq!(next_code(CodePrefix::Imm, codes), "IMM_1234568");
    }

    #[test]
    fn test_huge_suffix_does_not_overflow() {
        let codes = vec![Some("IMM_18446744073709551615"), Some("IMM_000007")];
        assert_eq!(next_code(CodePrefix::Imm, codes), "IMM_000008");

        let codes = vec![Some("IMM_18446744073709551614")];
        assert_eq!(next_code(CodePrefix::Imm, codes), "IMM_18446744073709551615");

        let mut seq = CodeSequence::new(CodePrefix::Imm, vec![Some("IMM_000003")]);
        seq.observe("IMM_18446744073709551615");
        assert_eq!(seq.take(), "IMM_000004");
    }

    #[test]
    fn test_sequence_hands_out_consecutive_codes() {
        let mut seq = CodeSequence::new(CodePrefix::Imm, vec![Some("IMM_000101")]);
        assert_eq!(seq.take(), "IMM_000102");
        seq.observe("IMM_000200");
        assert_eq!(seq.take(), "IMM_000201");
        seq.observe("STR_000999");
        assert_eq!(seq.take(), "IMM_000202");
    }
}
