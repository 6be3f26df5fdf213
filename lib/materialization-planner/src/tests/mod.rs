mod arguments;
mod tabular;
pub mod testkit;

use std::error::Error;

use crate::{
    request::RequestInputs,
    tests::testkit::{build_planner, init_logger, parse_operation},
};

#[test]
fn plans_a_mixed_operation() -> Result<(), Box<dyn Error>> {
    init_logger();
    let planner = build_planner();
    let document = parse_operation(
        r#"
        query Mixed {
          feature { score }
          transformer { math { scale(value: 1) } }
          dataElement { person { best: minScore } }
        }"#,
    );

    let plan = planner.plan_document(&document, Some("Mixed"), RequestInputs::default())?;

    insta::assert_snapshot!(format!("{}", plan), @r#"
    MaterializationPlan {
      Edges {
        /dataElement -[ELEMENT_TYPE]-> /
        /dataElement/person -[EXTRACT_FROM_SOURCE]-> /dataElement
        /dataElement/person/lastUpdated -[EXTRACT_FROM_SOURCE]-> /dataElement/person
        /dataElement/person/best:minScore -[EXTRACT_FROM_SOURCE]-> /dataElement/person
        /dataElement/person?id -[ELEMENT_TYPE]-> /dataElement
        /dataElement/person?id -[DEFAULT_ARGUMENT_VALUE_PROVIDED]-> /dataElement/person
        /feature -[ELEMENT_TYPE]-> /
        /feature/score -[EXTRACT_FROM_SOURCE]-> /feature
        /feature/score?threshold -[EXTRACT_FROM_SOURCE]-> /dataElement/person/best:minScore
        /transformer -[ELEMENT_TYPE]-> /
        /transformer/math -[EXTRACT_FROM_SOURCE]-> /transformer
        /transformer/math/scale -[EXTRACT_FROM_SOURCE]-> /transformer/math
        /transformer/math/scale?factor -[DEFAULT_ARGUMENT_VALUE_PROVIDED]-> /transformer/math/scale
        /transformer/math/scale?value -[DIRECT_ARGUMENT_VALUE_PROVIDED]-> /transformer/math/scale
      },
      DataElements {
        /dataElement/person: person(id: "1") selecting [/dataElement/person/lastUpdated, /dataElement/person/best:minScore]
      },
      Features {
        /feature/score: score() threshold <- [/dataElement/person/best:minScore] via scale at /transformer/math/scale
      },
      Transformers {
        /transformer/math/scale: scale(factor: 2.0, value: 1)
      },
    }
    "#);

    assert!(plan.graph.is_acyclic());
    Ok(())
}
