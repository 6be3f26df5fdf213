pub mod config;
pub mod context;
pub mod graph;
pub mod metamodel;
pub mod path;
pub mod planner;
pub mod request;
pub mod tabular;
pub mod traverser;
pub mod utils;

#[cfg(test)]
mod tests;

pub use config::PlannerConfig;
pub use graph::{edge::MaterializationEdge, MaterializationGraph};
pub use metamodel::{MaterializationMetamodel, MetamodelBuilder};
pub use path::{OperationPath, PathSegment};
pub use planner::{error::PlanningError, plan::MaterializationPlan, Planner};
pub use request::{RequestInputs, TabularSpec};
