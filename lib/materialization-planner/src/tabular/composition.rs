use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument, trace};

use crate::{
    metamodel::{coordinates::FieldCoordinates, namespace::Namespace, MaterializationMetamodel},
    path::OperationPath,
    request::TabularSpec,
    tabular::error::{CompositionError, ReferenceKind, UnresolvableReference},
    utils::matching::NameMatcher,
};

/// Variable key to the canonical domain-argument paths it can supply.
pub type DomainArgumentMatches = BTreeMap<String, BTreeSet<OperationPath>>;

/// Matches every variable key against the arguments of every domain source.
pub fn match_domain_arguments(
    metamodel: &MaterializationMetamodel,
    variable_keys: &BTreeSet<String>,
    matcher: NameMatcher,
) -> DomainArgumentMatches {
    let mut matches = DomainArgumentMatches::new();

    for key in variable_keys.iter() {
        let paths: BTreeSet<OperationPath> = metamodel
            .domain_sources()
            .flat_map(|domain| {
                domain
                    .arguments
                    .iter()
                    .filter(move |argument| {
                        metamodel
                            .aliases()
                            .argument_names(&domain.coordinates, &argument.name)
                            .iter()
                            .any(|name| matcher.matches(key, name))
                    })
                    .map(move |argument| domain.path.with_argument(&argument.name))
            })
            .collect();

        matches.insert(key.clone(), paths);
    }

    matches
}

/// Result of matching a tabular request against the metamodel.
#[derive(Debug, Default)]
pub struct Composition {
    /// Domains the raw input context supplies as a whole
    pub raw_domains: BTreeSet<FieldCoordinates>,
    /// Domains whose every required argument is bound to a variable
    pub variable_domains: BTreeSet<FieldCoordinates>,
    /// Argument canonical path to the variable key supplying it
    pub variable_bindings: BTreeMap<OperationPath, String>,
    /// Output column to the canonical field paths producing it
    pub output_columns: BTreeMap<String, Vec<OperationPath>>,
    pub passthrough_columns: BTreeSet<String>,
}

impl Composition {
    pub fn available_domains(&self) -> BTreeSet<&FieldCoordinates> {
        self.raw_domains.iter().chain(self.variable_domains.iter()).collect()
    }
}

/// Staged matcher for tabular requests.
///
/// Stages run in order: raw input keys, variable keys, output columns. Each
/// stage collects every unresolvable name it finds, and a stage is skipped
/// once an earlier one reported anything.
pub struct CompositionContext<'a> {
    metamodel: &'a MaterializationMetamodel,
    spec: &'a TabularSpec,
    matcher: NameMatcher,
    composition: Composition,
    errors: Vec<UnresolvableReference>,
}

impl<'a> CompositionContext<'a> {
    pub fn new(
        metamodel: &'a MaterializationMetamodel,
        spec: &'a TabularSpec,
        matcher: NameMatcher,
    ) -> Self {
        Self {
            metamodel,
            spec,
            matcher,
            composition: Composition::default(),
            errors: vec![],
        }
    }

    pub fn errors(&self) -> &[UnresolvableReference] {
        &self.errors
    }

    fn report(&mut self, kind: ReferenceKind, name: &str, candidates: Vec<String>) {
        trace!("unresolvable {} '{}'", kind, name);
        self.errors.push(UnresolvableReference {
            kind,
            name: name.to_string(),
            candidates,
        });
    }

    /// Raw keys name a domain, else one of its arguments, else a data-element
    /// field. Unmatched keys that are also output columns pass through.
    #[instrument(level = "trace", skip_all)]
    pub fn match_raw_input_keys(mut self) -> Self {
        if !self.errors.is_empty() {
            return self;
        }

        let (metamodel, spec) = (self.metamodel, self.spec);
        for key in spec.raw_input_context_keys.iter() {
            let domains: Vec<FieldCoordinates> = metamodel
                .domain_sources()
                .filter(|domain| {
                    metamodel
                        .domain_names(domain)
                        .iter()
                        .any(|name| self.matcher.matches(key, name))
                })
                .map(|domain| domain.coordinates.clone())
                .collect();

            if !domains.is_empty() {
                trace!("raw input key '{}' supplies {} domain(s)", key, domains.len());
                self.composition.raw_domains.extend(domains);
                continue;
            }

            let matches_argument = metamodel.domain_sources().any(|domain| {
                domain.arguments.iter().any(|argument| {
                    metamodel
                        .aliases()
                        .argument_names(&domain.coordinates, &argument.name)
                        .iter()
                        .any(|name| self.matcher.matches(key, name))
                })
            });
            let matches_field = !metamodel
                .field_paths_matching(Namespace::DataElement, &[key.as_str()], self.matcher)
                .is_empty();

            if matches_argument || matches_field {
                continue;
            }

            if self
                .matcher
                .find_in(key, &spec.output_column_names)
                .is_some()
            {
                trace!("raw input key '{}' passes through", key);
                self.composition.passthrough_columns.insert(key.clone());
                continue;
            }

            self.report(ReferenceKind::RawInputKey, key, vec![]);
        }

        self
    }

    /// Binds variable keys to domain arguments (or any other argument) and
    /// marks the domains whose required arguments are all bound.
    #[instrument(level = "trace", skip_all)]
    pub fn match_variable_keys(mut self, domain_arguments: &DomainArgumentMatches) -> Self {
        if !self.errors.is_empty() {
            return self;
        }

        let (metamodel, spec) = (self.metamodel, self.spec);
        for key in spec.variable_keys.iter() {
            let paths: Vec<OperationPath> = match domain_arguments.get(key) {
                Some(paths) if !paths.is_empty() => paths.iter().cloned().collect(),
                _ => metamodel.argument_paths_matching(key, self.matcher),
            };

            if paths.is_empty() {
                self.report(ReferenceKind::VariableKey, key, vec![]);
                continue;
            }

            for path in paths {
                self.composition
                    .variable_bindings
                    .entry(path)
                    .or_insert_with(|| key.clone());
            }
        }

        for domain in metamodel.domain_sources() {
            let bound = |name: &str| {
                self.composition
                    .variable_bindings
                    .contains_key(&domain.path.with_argument(name))
            };

            let any_bound = domain.arguments.iter().any(|argument| bound(&argument.name));
            let complete = domain.required_arguments().all(|argument| bound(&argument.name));

            if any_bound && complete {
                trace!("domain '{}' is fully supplied by variables", domain.name);
                self.composition
                    .variable_domains
                    .insert(domain.coordinates.clone());
            }
        }

        self
    }

    /// Columns resolve to a feature calculator first, then to data-element
    /// fields under every available domain, then to pass-through raw keys.
    #[instrument(level = "trace", skip_all)]
    pub fn match_output_columns(mut self) -> Self {
        if !self.errors.is_empty() {
            return self;
        }

        let (metamodel, spec) = (self.metamodel, self.spec);
        for column in spec.output_column_names.iter() {
            let names = [column.as_str()];

            let feature = metamodel
                .field_paths_matching(Namespace::Feature, &names, self.matcher)
                .into_iter()
                .find(|path| {
                    metamodel
                        .field_coordinates(path)
                        .into_iter()
                        .flatten()
                        .any(|c| metamodel.feature_calculator(c).is_some())
                });

            if let Some(feature) = feature {
                self.composition
                    .output_columns
                    .insert(column.clone(), vec![feature.clone()]);
                continue;
            }

            let data_element_paths =
                metamodel.field_paths_matching(Namespace::DataElement, &names, self.matcher);
            let available = self.composition.available_domains();
            let mut per_domain: BTreeMap<&OperationPath, &OperationPath> = BTreeMap::new();

            for &path in data_element_paths.iter() {
                let Some((domain_path, domain)) = metamodel.domain_root_of(path) else {
                    continue;
                };
                if &domain_path == path || !available.contains(&domain.coordinates) {
                    continue;
                }

                per_domain
                    .entry(&domain.path)
                    .and_modify(|current| {
                        if path.len() < current.len() {
                            *current = path;
                        }
                    })
                    .or_insert(path);
            }

            if !per_domain.is_empty() {
                let paths = per_domain.into_values().cloned().collect();
                self.composition.output_columns.insert(column.clone(), paths);
                continue;
            }

            if self.composition.passthrough_columns.contains(column)
                || self
                    .matcher
                    .find_in(column, &spec.raw_input_context_keys)
                    .is_some()
            {
                self.composition.passthrough_columns.insert(column.clone());
                continue;
            }

            let candidates = data_element_paths.iter().map(|p| p.to_string()).collect();
            self.report(ReferenceKind::OutputColumn, column, candidates);
        }

        self
    }

    pub fn finish(self) -> Result<Composition, CompositionError> {
        if !self.errors.is_empty() {
            return Err(CompositionError::UnresolvableReferences(self.errors));
        }

        debug!(
            "tabular request resolved to {} column(s), {} pass-through",
            self.composition.output_columns.len(),
            self.composition.passthrough_columns.len()
        );

        Ok(self.composition)
    }
}
