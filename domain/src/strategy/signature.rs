//! Error signature for detecting repeated compile failures

use std::collections::BTreeSet;

/// Order-independent identity of a list of errors
///
/// Two error lists with the same messages (after trimming, ignoring order
/// and duplicates) produce equal signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorSignature(Vec<String>);

impl ErrorSignature {
    pub fn from_errors<S: AsRef<str>>(errors: &[S]) -> Self {
        let set: BTreeSet<String> = errors
            .iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self(set.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_order_and_duplicates_ignored() {
        let a = ErrorSignature::from_errors(&["E2: bad", "E1: worse", "E2: bad"]);
        let b = ErrorSignature::from_errors(&[" E1: worse", "E2: bad "]);
        assert_eq!(a, b);

        let mut seen = HashSet::new();
        assert!(seen.insert(a));
        assert!(!seen.insert(b));
    }

    #[test]
    fn test_different_errors_differ() {
        let a = ErrorSignature::from_errors(&["NameError: x"]);
        let b = ErrorSignature::from_errors(&["NameError: y"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_blank_entries_dropped() {
        let sig = ErrorSignature::from_errors(&["", "  "]);
        assert!(sig.is_empty());
    }
}
