use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::metamodel::coordinates::FieldCoordinates;

/// External names that resolve to schema fields and arguments.
///
/// Raw-input-context keys, variable keys and tabular column names rarely match
/// the schema spelling, so every field and argument may carry extra names.
#[derive(Debug, Default, Clone)]
pub struct AliasRegistry {
    field_aliases: FxHashMap<FieldCoordinates, BTreeSet<String>>,
    argument_aliases: FxHashMap<(FieldCoordinates, String), BTreeSet<String>>,
}

impl AliasRegistry {
    pub fn register_field_alias(&mut self, coordinates: FieldCoordinates, alias: impl Into<String>) {
        self.field_aliases
            .entry(coordinates)
            .or_default()
            .insert(alias.into());
    }

    pub fn register_argument_alias(
        &mut self,
        coordinates: FieldCoordinates,
        argument_name: impl Into<String>,
        alias: impl Into<String>,
    ) {
        self.argument_aliases
            .entry((coordinates, argument_name.into()))
            .or_default()
            .insert(alias.into());
    }

    pub fn field_aliases(&self, coordinates: &FieldCoordinates) -> impl Iterator<Item = &str> {
        self.field_aliases
            .get(coordinates)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn argument_aliases(
        &self,
        coordinates: &FieldCoordinates,
        argument_name: &str,
    ) -> impl Iterator<Item = &str> {
        // tuple keys can't be borrowed piecewise
        self.argument_aliases
            .get(&(coordinates.clone(), argument_name.to_string()))
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// The field name followed by all of its aliases.
    pub fn field_names<'a>(&'a self, coordinates: &'a FieldCoordinates) -> Vec<&'a str> {
        std::iter::once(coordinates.field_name.as_str())
            .chain(self.field_aliases(coordinates))
            .collect()
    }

    /// The argument name followed by all of its aliases.
    pub fn argument_names<'a>(
        &'a self,
        coordinates: &FieldCoordinates,
        argument_name: &'a str,
    ) -> Vec<&'a str> {
        std::iter::once(argument_name)
            .chain(self.argument_aliases(coordinates, argument_name))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.field_aliases.is_empty() && self.argument_aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::AliasRegistry;
    use crate::metamodel::coordinates::FieldCoordinates;

    #[test]
    fn names_start_with_the_schema_name() {
        let mut registry = AliasRegistry::default();
        let coordinates = FieldCoordinates::new("Person", "minScore");
        registry.register_field_alias(coordinates.clone(), "minimumScore");
        registry.register_argument_alias(coordinates.clone(), "unit", "scoreUnit");

        assert_eq!(registry.field_names(&coordinates), vec!["minScore", "minimumScore"]);
        assert_eq!(
            registry.argument_names(&coordinates, "unit"),
            vec!["unit", "scoreUnit"]
        );
        assert_eq!(
            registry.argument_names(&coordinates, "other"),
            vec!["other"]
        );
    }
}
