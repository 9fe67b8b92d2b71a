//! The requirement table: external module specifiers the output depends on.

use std::collections::HashMap;

use jsld_codegen::runtime::RESERVED_NAMES;
use jsld_types::names::escape_identifier;
use jsld_types::{LinkError, Result};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Module specifier as written, e.g. `lodash/fp`.
    pub specifier: String,
    /// Factory parameter bound to the module, e.g. `__lodash_fp`.
    pub ident: String,
}

#[derive(Debug, Default)]
pub struct RequirementTable {
    requirements: Vec<Requirement>,
    by_specifier: HashMap<String, usize>,
}

impl RequirementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create-or-get the requirement for `specifier`.
    pub fn add(&mut self, specifier: &str) -> &Requirement {
        if let Some(&index) = self.by_specifier.get(specifier) {
            return &self.requirements[index];
        }
        let ident = self.fresh_ident(specifier);
        debug!(specifier, ident = %ident, "new requirement");
        let index = self.requirements.len();
        self.requirements.push(Requirement {
            specifier: specifier.to_string(),
            ident,
        });
        self.by_specifier.insert(specifier.to_string(), index);
        &self.requirements[index]
    }

    /// The requirement for `specifier`; it must have been added first.
    pub fn get(&self, specifier: &str) -> Result<&Requirement> {
        self.by_specifier
            .get(specifier)
            .map(|&index| &self.requirements[index])
            .ok_or_else(|| {
                LinkError::internal(format!("requirement '{specifier}' was never registered"))
            })
    }

    /// Requirements in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    fn fresh_ident(&self, specifier: &str) -> String {
        let sanitized: String = specifier
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let base = escape_identifier(&format!("__{sanitized}"));
        let taken = |name: &str| {
            RESERVED_NAMES.contains(&name) || self.requirements.iter().any(|r| r.ident == name)
        };
        if !taken(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsld_types::ErrorCode;

    #[test]
    fn add_is_idempotent_and_ordered() {
        let mut table = RequirementTable::new();
        assert_eq!(table.add("jquery").ident, "__jquery");
        assert_eq!(table.add("lodash/fp").ident, "__lodash_fp");
        assert_eq!(table.add("jquery").ident, "__jquery");
        let specifiers: Vec<_> = table.iter().map(|r| r.specifier.as_str()).collect();
        assert_eq!(specifiers, vec!["jquery", "lodash/fp"]);
    }

    #[test]
    fn colliding_identifiers_get_suffixes() {
        let mut table = RequirementTable::new();
        assert_eq!(table.add("a-b").ident, "__a_b");
        assert_eq!(table.add("a.b").ident, "__a_b_2");
        assert_eq!(table.add("a/b").ident, "__a_b_3");
    }

    #[test]
    fn runtime_names_are_avoided() {
        let mut table = RequirementTable::new();
        assert_eq!(table.add("symbols").ident, "__symbols_2");
        assert_eq!(table.add("@scope/pkg").ident, "___scope_pkg");
    }

    #[test]
    fn get_before_add_is_internal() {
        let mut table = RequirementTable::new();
        let err = table.get("react").unwrap_err();
        assert_eq!(err.code, ErrorCode::INTERNAL);
        table.add("react");
        assert_eq!(table.get("react").unwrap().ident, "__react");
    }
}
