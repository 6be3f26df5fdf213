use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Once};

use lazy_static::lazy_static;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    config::PlannerConfig,
    metamodel::{coordinates::FieldCoordinates, MaterializationMetamodel, MetamodelBuilder},
    planner::Planner,
    traverser::OperationDocument,
    utils::parsing::safe_parse_operation,
};

pub const FIXTURE_PATH: &str = "fixture/materialization.graphql";

fn init_test_logger_internal() {
    let tree_layer = tracing_tree::HierarchicalLayer::new(2)
        .with_bracketed_fields(true)
        .with_deferred_spans(false)
        .with_wraparound(25)
        .with_indent_lines(true)
        .with_timer(tracing_tree::time::Uptime::default())
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_targets(false);

    tracing_subscriber::registry()
        .with(tree_layer)
        .with(EnvFilter::from_default_env())
        .init();
}

lazy_static! {
    static ref TRACING_INIT: Once = Once::new();
}

pub fn init_logger() {
    TRACING_INIT.call_once(|| {
        init_test_logger_internal();
    });
}

pub fn read_fixture(fixture_path: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(fixture_path);
    std::fs::read_to_string(path).expect("Unable to read fixture file")
}

/// The fixture schema with its domain sources, calculators and transformers
/// registered.
pub fn build_metamodel() -> MaterializationMetamodel {
    MetamodelBuilder::from_sdl(&read_fixture(FIXTURE_PATH))
        .expect("fixture schema should parse")
        .domain_source(FieldCoordinates::new("DataElement", "person"), "person")
        .domain_source(FieldCoordinates::new("DataElement", "account"), "account")
        .transformer_source(FieldCoordinates::new("MathTransformers", "scale"), "scale")
        .transformer_source(
            FieldCoordinates::new("MathTransformers", "normalize"),
            "normalize",
        )
        .feature_calculator(
            FieldCoordinates::new("Feature", "score"),
            "score",
            FieldCoordinates::new("MathTransformers", "scale"),
        )
        .feature_calculator(
            FieldCoordinates::new("Feature", "risk"),
            "risk",
            FieldCoordinates::new("MathTransformers", "normalize"),
        )
        .feature_calculator(
            FieldCoordinates::new("Profile", "tier"),
            "tier",
            FieldCoordinates::new("MathTransformers", "normalize"),
        )
        .build()
        .expect("fixture metamodel should build")
}

pub fn build_planner() -> Planner {
    Planner::new(Arc::new(build_metamodel()), PlannerConfig::default())
}

pub fn parse_operation(operation: &str) -> OperationDocument {
    safe_parse_operation(operation).expect("operation should parse")
}
