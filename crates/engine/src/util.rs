//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Display form of a category name: trimmed, internal whitespace collapsed.
pub(crate) fn normalize_category_display(value: &str) -> ResultEngine<String> {
    let display = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if display.is_empty() {
        return Err(EngineError::InvalidName(
            "category name must not be empty".to_string(),
        ));
    }
    Ok(display)
}

/// Uniqueness key for a category name: NFKC-normalized and case-folded.
///
/// Two names mapping to the same key count as the same category for the
/// per-owner uniqueness check.
pub(crate) fn normalize_category_key(display: &str) -> String {
    display.nfkc().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_collapses_whitespace() {
        assert_eq!(
            normalize_category_display("  Eating   out ").unwrap(),
            "Eating out"
        );
        assert!(normalize_category_display("   ").is_err());
    }

    #[test]
    fn key_folds_case_and_compatibility_forms() {
        assert_eq!(normalize_category_key("Caf\u{00e9}"), "caf\u{00e9}");
        // U+FB01 LATIN SMALL LIGATURE FI normalizes to "fi".
        assert_eq!(normalize_category_key("O\u{fb01}ce"), "ofice");
    }
}
