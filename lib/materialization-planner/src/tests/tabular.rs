use std::error::Error;

use crate::{
    graph::edge::MaterializationEdge,
    path::OperationPath,
    planner::error::PlanningError,
    request::TabularSpec,
    tabular::error::{CompositionError, ReferenceKind},
    tests::testkit::{build_planner, init_logger},
};

#[test]
fn raw_domain_column() -> Result<(), Box<dyn Error>> {
    init_logger();
    let planner = build_planner();

    let plan = planner.plan_tabular(&TabularSpec::new(
        ["age"],
        Vec::<String>::new(),
        ["person"],
    ))?;

    insta::assert_snapshot!(format!("{}", plan), @r#"
    MaterializationPlan {
      Edges {
        /dataElement -[ELEMENT_TYPE]-> /
        /dataElement/person -[EXTRACT_FROM_SOURCE]-> /dataElement
        /dataElement/person/age -[EXTRACT_FROM_SOURCE]-> /dataElement/person
        /dataElement/person/lastUpdated -[EXTRACT_FROM_SOURCE]-> /dataElement/person
        /dataElement/person?id -[ELEMENT_TYPE]-> /dataElement
        /dataElement/person?id -[RAW_INPUT_VALUE_PROVIDED]-> /dataElement/person
      },
      DataElements {
        /dataElement/person: person(id: "1") selecting [/dataElement/person/age, /dataElement/person/lastUpdated]
      },
      OutputColumns {
        age: /dataElement/person/age
      },
    }
    "#);

    Ok(())
}

#[test]
fn unknown_column_fails_composition() {
    let planner = build_planner();

    let result = planner.plan_tabular(&TabularSpec::new(
        ["unknownColumn"],
        Vec::<String>::new(),
        ["person"],
    ));

    match result {
        Err(PlanningError::CompositionFailure(CompositionError::UnresolvableReferences(refs))) => {
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].kind, ReferenceKind::OutputColumn);
            assert_eq!(refs[0].name, "unknownColumn");
        }
        other => panic!("unexpected planning result: {:?}", other.map(|p| p.to_string())),
    }
}

#[test]
fn variables_complete_a_domain() -> Result<(), Box<dyn Error>> {
    let planner = build_planner();

    let plan = planner.plan_tabular(&TabularSpec::new(
        ["balance"],
        ["accountId"],
        Vec::<String>::new(),
    ))?;
    let account = OperationPath::of_fields(["dataElement", "account"]);

    assert!(plan
        .graph
        .successors(&account.with_argument("accountId"))
        .contains(&(&account, MaterializationEdge::VariableValueProvided)));
    assert!(plan
        .graph
        .successors(&account.with_argument("region"))
        .contains(&(&account, MaterializationEdge::DefaultArgumentValueProvided)));

    let builder = plan
        .data_elements
        .get(&account)
        .ok_or("account builder is missing")?;
    assert_eq!(
        builder.to_string(),
        r#"account(accountId: $accountId, region: "eu") selecting [/dataElement/account/balance]"#
    );
    assert_eq!(
        plan.output_columns.get("balance"),
        Some(&vec![account.with_field("balance")])
    );

    Ok(())
}

#[test]
fn feature_column_pulls_its_source_from_a_raw_domain() -> Result<(), Box<dyn Error>> {
    let planner = build_planner();

    let plan = planner.plan_tabular(&TabularSpec::new(
        ["score"],
        Vec::<String>::new(),
        ["person"],
    ))?;
    let score = OperationPath::of_fields(["feature", "score"]);

    assert_eq!(plan.output_columns.get("score"), Some(&vec![score.clone()]));
    assert_eq!(
        plan.graph.successors(&score.with_argument("threshold")),
        vec![(
            &OperationPath::of_fields(["dataElement", "person", "minScore"]),
            MaterializationEdge::ExtractFromSource
        )]
    );
    assert!(plan.graph.is_acyclic());

    Ok(())
}

#[test]
fn raw_keys_pass_through_to_columns() -> Result<(), Box<dyn Error>> {
    let planner = build_planner();

    let plan = planner.plan_tabular(&TabularSpec::new(
        ["age", "customerId"],
        Vec::<String>::new(),
        ["person", "customerId"],
    ))?;

    assert!(plan.passthrough_columns.contains("customerId"));
    assert!(!plan.output_columns.contains_key("customerId"));
    assert_eq!(
        plan.output_columns.get("age"),
        Some(&vec![OperationPath::of_fields(["dataElement", "person", "age"])])
    );

    Ok(())
}

#[test]
fn repeated_variable_keys_hit_the_match_cache() -> Result<(), Box<dyn Error>> {
    let planner = build_planner();
    let spec = TabularSpec::new(["balance"], ["accountId"], Vec::<String>::new());
    assert_eq!(planner.cached_variable_matches(), 0);

    let first = planner.plan_tabular(&spec)?;
    let second = planner.plan_tabular(&spec)?;

    assert_eq!(planner.cached_variable_matches(), 1);
    assert_eq!(first.graph, second.graph);
    assert_eq!(first.output_columns, second.output_columns);

    planner.plan_tabular(&TabularSpec::new(
        ["balance"],
        ["accountId", "region"],
        Vec::<String>::new(),
    ))?;
    assert_eq!(planner.cached_variable_matches(), 2);

    Ok(())
}
