//! Canonical store names.
//!
//! Store names end up as backend namespace identifiers, so they are held to
//! the strictest rule among the backends we target: lower-case, starting
//! with a letter, drawn from `a-z 0-9 _ $ ( ) + - /`.

use crate::error::{Error, Result};

/// Longest canonical name accepted.
pub const MAX_STORE_NAME_LEN: usize = 238;

fn is_allowed(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '$' | '(' | ')' | '+' | '-' | '/')
}

/// Build the canonical name for `name` under an optional prefix.
///
/// `"<prefix>_<name>"` when a prefix is set, lower-cased, then checked.
pub fn canonical_store_name(prefix: Option<&str>, name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::validation("store name is mandatory"));
    }

    let composed = match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix, name),
        _ => name.to_string(),
    };
    let canonical = composed.to_lowercase();

    if canonical.len() > MAX_STORE_NAME_LEN {
        return Err(Error::validation(format!(
            "store name '{}' is longer than {} bytes",
            canonical, MAX_STORE_NAME_LEN
        )));
    }
    if !canonical.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(Error::validation(format!(
            "store name '{}' must begin with a letter",
            canonical
        )));
    }
    if let Some(bad) = canonical.chars().find(|c| !is_allowed(*c)) {
        return Err(Error::validation(format!(
            "store name '{}' contains invalid character {:?}",
            canonical, bad
        )));
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_lowercase() {
        assert_eq!(canonical_store_name(Some("dbprefix"), "Wallet").unwrap(), "dbprefix_wallet");
        assert_eq!(canonical_store_name(None, "DIDs").unwrap(), "dids");
        assert_eq!(canonical_store_name(Some(""), "plain").unwrap(), "plain");
    }

    #[test]
    fn test_same_name_different_case_collides() {
        let a = canonical_store_name(Some("p"), "Store").unwrap();
        let b = canonical_store_name(Some("P"), "store").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_uuid_style_names_accepted() {
        let name = "key7c80bdcd-b0e3-405a-bb82-fae75f9f2470";
        assert_eq!(canonical_store_name(None, name).unwrap(), name);
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(
            canonical_store_name(Some("prefix"), ""),
            Err(Error::Validation("store name is mandatory".into()))
        );
    }

    #[test]
    fn test_rejects_leading_digit() {
        assert!(canonical_store_name(None, "7c80bdcd").is_err());
    }

    #[test]
    fn test_rejects_bad_characters() {
        assert!(canonical_store_name(None, "has space").is_err());
        assert!(canonical_store_name(None, "did:example").is_err());
        assert!(canonical_store_name(None, "caf\u{e9}").is_err());
    }

    #[test]
    fn test_rejects_too_long() {
        let name = "a".repeat(MAX_STORE_NAME_LEN + 1);
        assert!(canonical_store_name(None, &name).is_err());
    }
}
