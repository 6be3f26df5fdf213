use std::error::Error;

use crate::{
    graph::edge::MaterializationEdge,
    path::OperationPath,
    planner::error::PlanningError,
    request::RequestInputs,
    tests::testkit::{build_planner, init_logger, parse_operation},
};

fn person_id() -> OperationPath {
    OperationPath::of_fields(["dataElement", "person"]).with_argument("id")
}

fn person() -> OperationPath {
    OperationPath::of_fields(["dataElement", "person"])
}

#[test]
fn raw_input_context_wins_over_variables() -> Result<(), Box<dyn Error>> {
    init_logger();
    let planner = build_planner();
    let document = parse_operation("query ($id: ID) { dataElement { person(id: $id) { age } } }");

    let plan = planner.plan_document(&document, None, RequestInputs::new(["id"], ["person"]))?;
    assert_eq!(
        plan.graph.successors(&person_id()),
        vec![
            (
                &OperationPath::of_fields(["dataElement"]),
                MaterializationEdge::ElementType
            ),
            (&person(), MaterializationEdge::RawInputValueProvided),
        ]
    );

    let plan = planner.plan_document(
        &document,
        None,
        RequestInputs::new(["id"], Vec::<String>::new()),
    )?;
    assert!(plan
        .graph
        .successors(&person_id())
        .contains(&(&person(), MaterializationEdge::VariableValueProvided)));

    Ok(())
}

#[test]
fn raw_input_matches_the_selection_alias() -> Result<(), Box<dyn Error>> {
    let planner = build_planner();
    let document = parse_operation("{ dataElement { customer: person { age } } }");

    let plan = planner.plan_document(
        &document,
        None,
        RequestInputs::new(Vec::<String>::new(), ["Customer"]),
    )?;

    let aliased = OperationPath::of_fields(["dataElement"]).with_aliased_field("person", Some("customer"));
    assert!(plan.graph.successors(&aliased.with_argument("id")).contains(&(
        &aliased,
        MaterializationEdge::RawInputValueProvided
    )));
    Ok(())
}

#[test]
fn default_valued_argument_named_in_raw_input() -> Result<(), Box<dyn Error>> {
    let planner = build_planner();
    let document = parse_operation(r#"{ dataElement { person(id: "1") { age } } }"#);

    let plan = planner.plan_document(
        &document,
        None,
        RequestInputs::new(Vec::<String>::new(), ["id"]),
    )?;
    assert!(plan
        .graph
        .successors(&person_id())
        .contains(&(&person(), MaterializationEdge::RawInputValueProvided)));

    Ok(())
}

#[test]
fn literals_are_direct_or_default() -> Result<(), Box<dyn Error>> {
    let planner = build_planner();
    let document = parse_operation(
        r#"{ dataElement { person(id: "7") { age } account(accountId: "a-1", region: "eu") { balance } } }"#,
    );

    let plan = planner.plan_document(&document, None, RequestInputs::default())?;
    let account = OperationPath::of_fields(["dataElement", "account"]);

    assert!(plan
        .graph
        .successors(&person_id())
        .contains(&(&person(), MaterializationEdge::DirectArgumentValueProvided)));
    assert!(plan
        .graph
        .successors(&account.with_argument("accountId"))
        .contains(&(&account, MaterializationEdge::DirectArgumentValueProvided)));
    assert!(plan
        .graph
        .successors(&account.with_argument("region"))
        .contains(&(&account, MaterializationEdge::DefaultArgumentValueProvided)));

    let builder = plan
        .data_elements
        .get(&account)
        .ok_or("account builder is missing")?;
    assert_eq!(builder.arguments.len(), 2);
    assert_eq!(
        builder.selections.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        vec!["/dataElement/account/balance"]
    );

    Ok(())
}

#[test]
fn unknown_variable_on_a_domain_argument_is_unhandled() {
    let planner = build_planner();
    let document = parse_operation("{ dataElement { person(id: $missing) { age } } }");

    let result = planner.plan_document(&document, None, RequestInputs::default());
    assert!(matches!(
        result,
        Err(PlanningError::UnhandledArgumentProvenance { path, .. }) if path == person_id()
    ));
}

#[test]
fn transformer_arguments() -> Result<(), Box<dyn Error>> {
    let planner = build_planner();
    let document = parse_operation("{ transformer { math { scale(value: $v) normalize } } }");

    let plan = planner.plan_document(&document, None, RequestInputs::new(["v"], Vec::<String>::new()))?;
    let scale = OperationPath::of_fields(["transformer", "math", "scale"]);
    let normalize = OperationPath::of_fields(["transformer", "math", "normalize"]);

    assert_eq!(
        plan.graph.successors(&scale.with_argument("value")),
        vec![(&scale, MaterializationEdge::VariableValueProvided)]
    );
    assert_eq!(
        plan.graph.successors(&scale.with_argument("factor")),
        vec![(&scale, MaterializationEdge::DefaultArgumentValueProvided)]
    );
    assert_eq!(
        plan.graph.successors(&normalize.with_argument("value")),
        vec![(&normalize, MaterializationEdge::DefaultArgumentValueProvided)]
    );
    assert_eq!(plan.transformers.len(), 2);

    let missing_variable = planner.plan_document(&document, None, RequestInputs::default());
    assert!(matches!(
        missing_variable,
        Err(PlanningError::UnhandledArgumentProvenance { .. })
    ));

    Ok(())
}
