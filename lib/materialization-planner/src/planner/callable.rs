use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    sync::Arc,
};

use graphql_parser::query::Value;

use crate::{
    metamodel::sources::{DomainSource, FeatureCalculator, TransformerSource},
    path::OperationPath,
    utils::value::render_value,
};

type ArgumentValues = BTreeMap<String, Value<'static, String>>;

/// Collects what one data-element domain call has to return. Populated while
/// planning, invoked by the execution layer.
#[derive(Clone, Debug)]
pub struct DataElementCallableBuilder {
    pub domain: Arc<DomainSource>,
    /// Materialized path of the domain root field
    pub domain_path: OperationPath,
    /// Materialized paths selected below the domain root
    pub selections: BTreeSet<OperationPath>,
    pub arguments: ArgumentValues,
}

impl DataElementCallableBuilder {
    pub fn new(domain: Arc<DomainSource>, domain_path: OperationPath) -> Self {
        Self {
            domain,
            domain_path,
            selections: BTreeSet::new(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_selection(mut self, path: OperationPath) -> Self {
        self.selections.insert(path);
        self
    }

    pub fn with_argument(mut self, name: &str, value: Value<'static, String>) -> Self {
        self.arguments.insert(name.to_string(), value);
        self
    }
}

#[derive(Clone, Debug)]
pub struct FeatureCalculatorCallableBuilder {
    pub calculator: Arc<FeatureCalculator>,
    pub path: OperationPath,
    pub arguments: ArgumentValues,
    /// Arguments read from other vertices of the plan
    pub extracted_arguments: BTreeMap<String, BTreeSet<OperationPath>>,
    pub transformer_source: Option<Arc<TransformerSource>>,
    /// Materialized path of the transformer, when it is selected in the same plan
    pub transformer_path: Option<OperationPath>,
}

impl FeatureCalculatorCallableBuilder {
    pub fn new(calculator: Arc<FeatureCalculator>, path: OperationPath) -> Self {
        Self {
            calculator,
            path,
            arguments: BTreeMap::new(),
            extracted_arguments: BTreeMap::new(),
            transformer_source: None,
            transformer_path: None,
        }
    }

    pub fn with_transformer(
        mut self,
        source: Option<Arc<TransformerSource>>,
        path: Option<OperationPath>,
    ) -> Self {
        self.transformer_source = source;
        self.transformer_path = path;
        self
    }

    pub fn with_argument(mut self, name: &str, value: Value<'static, String>) -> Self {
        self.arguments.insert(name.to_string(), value);
        self
    }

    pub fn with_extracted_argument(mut self, name: &str, source: OperationPath) -> Self {
        self.extracted_arguments
            .entry(name.to_string())
            .or_default()
            .insert(source);
        self
    }
}

#[derive(Clone, Debug)]
pub struct TransformerCallableBuilder {
    pub source: Arc<TransformerSource>,
    pub path: OperationPath,
    pub arguments: ArgumentValues,
}

impl TransformerCallableBuilder {
    pub fn new(source: Arc<TransformerSource>, path: OperationPath) -> Self {
        Self {
            source,
            path,
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, name: &str, value: Value<'static, String>) -> Self {
        self.arguments.insert(name.to_string(), value);
        self
    }
}

fn render_arguments(arguments: &ArgumentValues) -> String {
    arguments
        .iter()
        .map(|(name, value)| format!("{}: {}", name, render_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Display for DataElementCallableBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}) selecting [{}]",
            self.domain.name,
            render_arguments(&self.arguments),
            self.selections
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Display for FeatureCalculatorCallableBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.calculator.name, render_arguments(&self.arguments))?;
        for (name, sources) in self.extracted_arguments.iter() {
            write!(
                f,
                " {} <- [{}]",
                name,
                sources
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
        }
        match (&self.transformer_source, &self.transformer_path) {
            (Some(source), Some(path)) => write!(f, " via {} at {}", source.name, path),
            (Some(source), None) => write!(f, " via {}", source.name),
            _ => Ok(()),
        }
    }
}

impl Display for TransformerCallableBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.source.name, render_arguments(&self.arguments))
    }
}
