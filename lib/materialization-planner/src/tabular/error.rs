use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReferenceKind {
    OutputColumn,
    VariableKey,
    RawInputKey,
}

impl Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::OutputColumn => write!(f, "output column"),
            ReferenceKind::VariableKey => write!(f, "variable key"),
            ReferenceKind::RawInputKey => write!(f, "raw input key"),
        }
    }
}

/// A tabular name that matches no schema field, argument or alias.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvableReference {
    pub kind: ReferenceKind,
    pub name: String,
    /// Schema locations carrying the name that could not be used, if any
    pub candidates: Vec<String>,
}

impl Display for UnresolvableReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)?;
        if !self.candidates.is_empty() {
            write!(f, " (candidates: {})", self.candidates.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompositionError {
    #[error("Unresolvable references: {}", render_references(.0))]
    UnresolvableReferences(Vec<UnresolvableReference>),
}

fn render_references(references: &[UnresolvableReference]) -> String {
    references
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
