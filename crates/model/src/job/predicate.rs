use crate::entities::store::Store;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PredicateError {
    #[error("Address prefix must not be blank")]
    BlankPrefix,

    #[error("Address prefix contains a control character at byte {0}")]
    ControlCharacter(usize),
}

/// Filter applied to the store table by a paged read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorePredicate {
    All,
    /// `address LIKE '<prefix>%'`
    AddressPrefix(String),
}

impl StorePredicate {
    pub fn address_prefix(prefix: &str) -> Self {
        StorePredicate::AddressPrefix(prefix.to_string())
    }

    pub fn validate(&self) -> Result<(), PredicateError> {
        match self {
            StorePredicate::All => Ok(()),
            StorePredicate::AddressPrefix(prefix) => {
                if prefix.trim().is_empty() {
                    return Err(PredicateError::BlankPrefix);
                }
                match prefix.char_indices().find(|(_, c)| c.is_control()) {
                    Some((pos, _)) => Err(PredicateError::ControlCharacter(pos)),
                    None => Ok(()),
                }
            }
        }
    }

    /// SQL `LIKE` pattern for this predicate, with the wildcard and escape
    /// characters of the prefix itself escaped. `None` means no filter.
    pub fn like_pattern(&self) -> Option<String> {
        match self {
            StorePredicate::All => None,
            StorePredicate::AddressPrefix(prefix) => {
                let mut pattern = String::with_capacity(prefix.len() + 1);
                for c in prefix.chars() {
                    if matches!(c, '\\' | '%' | '_') {
                        pattern.push('\\');
                    }
                    pattern.push(c);
                }
                pattern.push('%');
                Some(pattern)
            }
        }
    }

    /// Evaluates the predicate in memory with the same semantics as the
    /// SQL pattern.
    pub fn matches(&self, store: &Store) -> bool {
        match self {
            StorePredicate::All => true,
            StorePredicate::AddressPrefix(prefix) => store.address.starts_with(prefix.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_becomes_escaped_like_pattern() {
        let p = StorePredicate::address_prefix("50%_off\\");
        assert_eq!(p.like_pattern().as_deref(), Some("50\\%\\_off\\\\%"));
        assert_eq!(StorePredicate::All.like_pattern(), None);
    }

    #[test]
    fn rejects_blank_and_control_characters() {
        assert_eq!(
            StorePredicate::address_prefix("  ").validate(),
            Err(PredicateError::BlankPrefix)
        );
        assert_eq!(
            StorePredicate::address_prefix("Se\0oul").validate(),
            Err(PredicateError::ControlCharacter(2))
        );
        assert!(StorePredicate::address_prefix("Seoul").validate().is_ok());
    }

    #[test]
    fn matches_by_prefix() {
        let p = StorePredicate::address_prefix("Seoul");
        assert!(p.matches(&Store::new(1, "s1", "Seoul a1")));
        assert!(!p.matches(&Store::new(2, "s2", "Newyork a2")));
        assert!(!p.matches(&Store::new(3, "s3", "seoul a3")));
    }
}
