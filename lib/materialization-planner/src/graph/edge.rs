use std::fmt::{Debug, Display};

/// Why a vertex's value will be available at execution time.
///
/// An edge `A -> B` reads "A can only be materialized once B is".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterializationEdge {
    /// The caller's raw input context carries the value
    RawInputValueProvided,
    /// A variable supplied with the request carries the value
    VariableValueProvided,
    /// The value was written literally in the request
    DirectArgumentValueProvided,
    /// The schema default applies
    DefaultArgumentValueProvided,
    /// The value is read from another, already resolved vertex
    ExtractFromSource,
    /// Membership of a namespace umbrella
    ElementType,
}

impl MaterializationEdge {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RawInputValueProvided => "RAW_INPUT_VALUE_PROVIDED",
            Self::VariableValueProvided => "VARIABLE_VALUE_PROVIDED",
            Self::DirectArgumentValueProvided => "DIRECT_ARGUMENT_VALUE_PROVIDED",
            Self::DefaultArgumentValueProvided => "DEFAULT_ARGUMENT_VALUE_PROVIDED",
            Self::ExtractFromSource => "EXTRACT_FROM_SOURCE",
            Self::ElementType => "ELEMENT_TYPE",
        }
    }
}

impl Display for MaterializationEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Debug for MaterializationEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
