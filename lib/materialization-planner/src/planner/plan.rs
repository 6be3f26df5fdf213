use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter as FmtFormatter, Result as FmtResult},
};

use crate::{
    graph::MaterializationGraph,
    path::OperationPath,
    planner::{
        callable::{
            DataElementCallableBuilder, FeatureCalculatorCallableBuilder,
            TransformerCallableBuilder,
        },
        context::PlannerContext,
    },
    utils::pretty_display::{get_indent, PrettyDisplay},
};

/// Everything the execution layer needs to materialize one request.
#[derive(Clone, Debug)]
pub struct MaterializationPlan {
    pub graph: MaterializationGraph,
    pub data_elements: BTreeMap<OperationPath, DataElementCallableBuilder>,
    pub features: BTreeMap<OperationPath, FeatureCalculatorCallableBuilder>,
    pub transformers: BTreeMap<OperationPath, TransformerCallableBuilder>,
    pub canonical_to_materialized: BTreeMap<OperationPath, OperationPath>,
    /// Tabular columns copied straight from the raw input context
    pub passthrough_columns: BTreeSet<String>,
    /// Tabular column name to the materialized paths producing it
    pub output_columns: BTreeMap<String, Vec<OperationPath>>,
}

impl MaterializationPlan {
    pub(crate) fn from_context(context: &PlannerContext) -> Self {
        Self {
            graph: context.graph().clone(),
            data_elements: context.data_element_builders().clone(),
            features: context.feature_builders().clone(),
            transformers: context.transformer_builders().clone(),
            canonical_to_materialized: context.canonical_to_materialized().clone(),
            passthrough_columns: BTreeSet::new(),
            output_columns: BTreeMap::new(),
        }
    }

    pub fn with_output_columns(
        mut self,
        output_columns: BTreeMap<String, Vec<OperationPath>>,
        passthrough_columns: BTreeSet<String>,
    ) -> Self {
        self.output_columns = output_columns;
        self.passthrough_columns = passthrough_columns;
        self
    }
}

fn write_section<I, T>(f: &mut FmtFormatter<'_>, depth: usize, title: &str, items: I) -> FmtResult
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let mut items = items.into_iter().peekable();
    if items.peek().is_none() {
        return Ok(());
    }

    let indent = get_indent(depth);
    writeln!(f, "{indent}{title} {{")?;
    for item in items {
        writeln!(f, "{indent}  {item}")?;
    }
    writeln!(f, "{indent}}},")
}

impl PrettyDisplay for MaterializationPlan {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        let indent = get_indent(depth);
        writeln!(f, "{indent}MaterializationPlan {{")?;

        write_section(
            f,
            depth + 1,
            "Edges",
            self.graph
                .edges()
                .into_iter()
                .map(|(from, to, edge)| format!("{from} -[{edge}]-> {to}")),
        )?;
        write_section(
            f,
            depth + 1,
            "DataElements",
            self.data_elements
                .iter()
                .map(|(path, builder)| format!("{path}: {builder}")),
        )?;
        write_section(
            f,
            depth + 1,
            "Features",
            self.features
                .iter()
                .map(|(path, builder)| format!("{path}: {builder}")),
        )?;
        write_section(
            f,
            depth + 1,
            "Transformers",
            self.transformers
                .iter()
                .map(|(path, builder)| format!("{path}: {builder}")),
        )?;
        write_section(
            f,
            depth + 1,
            "OutputColumns",
            self.output_columns.iter().map(|(column, paths)| {
                format!(
                    "{column}: {}",
                    paths
                        .iter()
                        .map(|p| p.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }),
        )?;
        write_section(f, depth + 1, "PassThrough", self.passthrough_columns.iter())?;

        writeln!(f, "{indent}}}")
    }
}

impl Display for MaterializationPlan {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        self.pretty_fmt(f, 0)
    }
}
