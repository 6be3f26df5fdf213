pub mod composition;
pub mod error;

use std::collections::BTreeSet;

use tracing::instrument;

use crate::{
    context::ComponentContext,
    metamodel::MaterializationMetamodel,
    path::OperationPath,
    request::{RequestInputs, TabularSpec},
    tabular::{
        composition::{Composition, CompositionContext, DomainArgumentMatches},
        error::CompositionError,
    },
    traverser::{error::TraversalError, synthesis::ComponentSynthesizer},
    utils::matching::NameMatcher,
};

/// Runs every matching stage over a tabular request.
#[instrument(level = "trace", skip_all)]
pub fn compose(
    metamodel: &MaterializationMetamodel,
    spec: &TabularSpec,
    matcher: NameMatcher,
    domain_arguments: &DomainArgumentMatches,
) -> Result<Composition, CompositionError> {
    CompositionContext::new(metamodel, spec, matcher)
        .match_raw_input_keys()
        .match_variable_keys(domain_arguments)
        .match_output_columns()
        .finish()
}

/// Component contexts equivalent to a document selecting every column of the
/// composition.
pub fn synthesize_components(
    metamodel: &MaterializationMetamodel,
    inputs: &RequestInputs,
    composition: &Composition,
    matcher: NameMatcher,
) -> Result<Vec<ComponentContext>, TraversalError> {
    let targets: BTreeSet<OperationPath> = composition
        .output_columns
        .values()
        .flatten()
        .cloned()
        .collect();

    ComponentSynthesizer::new(metamodel, inputs, matcher)
        .with_variable_bindings(&composition.variable_bindings)
        .synthesize(targets, |_| None)
}

#[cfg(test)]
mod tests {
    use crate::{
        metamodel::coordinates::FieldCoordinates,
        path::OperationPath,
        request::TabularSpec,
        tabular::{
            compose,
            composition::match_domain_arguments,
            error::{CompositionError, ReferenceKind},
        },
        tests::testkit::build_metamodel,
        utils::matching::NameMatcher,
    };

    fn compose_spec(
        spec: &TabularSpec,
    ) -> Result<crate::tabular::composition::Composition, CompositionError> {
        let metamodel = build_metamodel();
        let matcher = NameMatcher::default();
        let domain_arguments = match_domain_arguments(&metamodel, &spec.variable_keys, matcher);
        compose(&metamodel, spec, matcher, &domain_arguments)
    }

    #[test]
    fn raw_domain_makes_its_fields_available() -> Result<(), CompositionError> {
        let spec = TabularSpec::new(["age"], Vec::<String>::new(), ["person"]);
        let composition = compose_spec(&spec)?;

        assert!(composition
            .raw_domains
            .contains(&FieldCoordinates::new("DataElement", "person")));
        assert_eq!(
            composition.output_columns.get("age"),
            Some(&vec![OperationPath::of_fields(["dataElement", "person", "age"])])
        );
        Ok(())
    }

    #[test]
    fn completeness_gate_requires_every_required_argument() -> Result<(), CompositionError> {
        let account = FieldCoordinates::new("DataElement", "account");

        let complete = compose_spec(&TabularSpec::new(
            ["balance"],
            ["accountId"],
            Vec::<String>::new(),
        ))?;
        assert!(complete.variable_domains.contains(&account));
        assert_eq!(
            complete.output_columns.get("balance"),
            Some(&vec![OperationPath::of_fields([
                "dataElement",
                "account",
                "balance"
            ])])
        );

        let partial = compose_spec(&TabularSpec::new(
            Vec::<String>::new(),
            ["region"],
            Vec::<String>::new(),
        ))?;
        assert!(!partial.variable_domains.contains(&account));
        Ok(())
    }

    #[test]
    fn output_columns_prefer_feature_calculators() -> Result<(), CompositionError> {
        let composition = compose_spec(&TabularSpec::new(
            ["score"],
            Vec::<String>::new(),
            Vec::<String>::new(),
        ))?;

        assert_eq!(
            composition.output_columns.get("score"),
            Some(&vec![OperationPath::of_fields(["feature", "score"])])
        );
        Ok(())
    }

    #[test]
    fn every_unresolvable_column_is_reported() {
        let spec = TabularSpec::new(
            ["unknownColumn", "otherUnknown", "age"],
            Vec::<String>::new(),
            Vec::<String>::new(),
        );

        let Err(CompositionError::UnresolvableReferences(references)) = compose_spec(&spec) else {
            panic!("composition should fail");
        };

        let names: Vec<(&str, ReferenceKind)> = references
            .iter()
            .map(|r| (r.name.as_str(), r.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("age", ReferenceKind::OutputColumn),
                ("otherUnknown", ReferenceKind::OutputColumn),
                ("unknownColumn", ReferenceKind::OutputColumn),
            ]
        );
        assert_eq!(
            references[0].candidates,
            vec![
                "/dataElement/account/owner/age".to_string(),
                "/dataElement/person/age".to_string()
            ]
        );
    }

    #[test]
    fn earlier_stage_errors_skip_later_stages() {
        let spec = TabularSpec::new(["unknownColumn"], ["nope"], ["alsoNope"]);

        let Err(CompositionError::UnresolvableReferences(references)) = compose_spec(&spec) else {
            panic!("composition should fail");
        };

        assert_eq!(references.len(), 1);
        assert_eq!(references[0].kind, ReferenceKind::RawInputKey);
        assert_eq!(references[0].name, "alsoNope");
    }

    #[test]
    fn raw_keys_that_are_columns_pass_through() -> Result<(), CompositionError> {
        let composition = compose_spec(&TabularSpec::new(
            ["customerSegment"],
            Vec::<String>::new(),
            ["customerSegment"],
        ))?;

        assert!(composition.passthrough_columns.contains("customerSegment"));
        assert!(composition.output_columns.is_empty());
        Ok(())
    }
}
