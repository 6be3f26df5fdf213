use std::collections::BTreeSet;

/// Compares external names (input keys, variable keys, column names) with
/// schema names.
#[derive(Clone, Copy, Debug)]
pub struct NameMatcher {
    case_insensitive: bool,
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self {
            case_insensitive: true,
        }
    }
}

impl NameMatcher {
    pub fn new(case_insensitive: bool) -> Self {
        Self { case_insensitive }
    }

    pub fn matches(&self, a: &str, b: &str) -> bool {
        a == b || (self.case_insensitive && a.to_lowercase() == b.to_lowercase())
    }

    /// Whether any of `names` shows up in `keys`.
    pub fn any_in<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
        keys: &BTreeSet<String>,
    ) -> bool {
        names.into_iter().any(|name| self.find_in(name, keys).is_some())
    }

    /// The key matching `name`, exact matches win over case-folded ones.
    pub fn find_in<'k>(&self, name: &str, keys: &'k BTreeSet<String>) -> Option<&'k String> {
        if let Some(key) = keys.get(name) {
            return Some(key);
        }

        if !self.case_insensitive {
            return None;
        }

        let folded = name.to_lowercase();
        keys.iter().find(|key| key.to_lowercase() == folded)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::NameMatcher;

    #[test]
    fn case_folding_can_be_disabled() {
        let keys: BTreeSet<String> = ["Person".to_string()].into();

        assert!(NameMatcher::new(true).any_in(["person"], &keys));
        assert!(!NameMatcher::new(false).any_in(["person"], &keys));
        assert_eq!(
            NameMatcher::new(false).find_in("Person", &keys),
            Some(&"Person".to_string())
        );
    }
}
