use std::{
    fmt::{Debug, Display},
    sync::Arc,
};

/// A single step of an [`OperationPath`].
///
/// The variant order matters: paths are ordered segment by segment, so a field
/// sorts before anything selected underneath it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Field(String),
    AliasedField { name: String, alias: String },
    Argument(String),
    /// `... on TypeName { }`
    InlineFragment(String),
    /// `...FragmentName`, together with the fragment's type condition
    FragmentSpread {
        fragment_name: String,
        type_name: String,
    },
}

impl PathSegment {
    /// Name of the schema field this segment selects, ignoring aliases.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field(name) => Some(name),
            Self::AliasedField { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self, Self::InlineFragment(_) | Self::FragmentSpread { .. })
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(name) => write!(f, "/{}", name),
            Self::AliasedField { name, alias } => write!(f, "/{}:{}", alias, name),
            Self::Argument(name) => write!(f, "?{}", name),
            Self::InlineFragment(type_name) => write!(f, "/[on {}]", type_name),
            Self::FragmentSpread {
                fragment_name,
                type_name,
            } => write!(f, "/[...{} on {}]", fragment_name, type_name),
        }
    }
}

/// Hierarchical locator of a selected field or argument.
///
/// Every node of a request has two of these: the materialized path, as the
/// caller wrote it (aliases and fragment wrappers included), and the canonical
/// path, which only contains bare field and argument segments.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)] // Clone is cheap with Arc inside
pub struct OperationPath {
    segments: Arc<[PathSegment]>,
}

impl Default for OperationPath {
    fn default() -> Self {
        Self::root()
    }
}

impl OperationPath {
    pub fn root() -> Self {
        Self {
            segments: Arc::from(Vec::new()),
        }
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self {
            segments: segments.into(),
        }
    }

    /// Shorthand for a path made only of plain field segments.
    pub fn of_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            names
                .into_iter()
                .map(|name| PathSegment::Field(name.into()))
                .collect(),
        )
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn is_argument(&self) -> bool {
        matches!(self.last(), Some(PathSegment::Argument(_)))
    }

    pub fn argument_name(&self) -> Option<&str> {
        match self.last() {
            Some(PathSegment::Argument(name)) => Some(name),
            _ => None,
        }
    }

    pub fn field_name(&self) -> Option<&str> {
        self.last().and_then(PathSegment::field_name)
    }

    /// The prefix without the last segment. The root has no parent.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }

        Some(self.without_last())
    }

    /// Drops the trailing segment, the root stays the root.
    pub fn without_last(&self) -> Self {
        if self.segments.is_empty() {
            return self.clone();
        }

        Self {
            segments: Arc::from(&self.segments[..self.segments.len() - 1]),
        }
    }

    /// The closest ancestor that selects a field (or the root), skipping
    /// fragment wrappers in between.
    pub fn selection_parent(&self) -> Option<Self> {
        let mut end = self.segments.len().checked_sub(1)?;

        while end > 0 && self.segments[end - 1].is_fragment() {
            end -= 1;
        }

        Some(Self {
            segments: Arc::from(&self.segments[..end]),
        })
    }

    /// Reflexive prefix relation.
    pub fn is_ancestor_of(&self, other: &OperationPath) -> bool {
        other.segments.len() >= self.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }

    pub fn is_descendant_of(&self, other: &OperationPath) -> bool {
        other.is_ancestor_of(self)
    }

    /// All ancestors, starting from the root and ending with `self`.
    pub fn ancestors(&self) -> impl Iterator<Item = OperationPath> + '_ {
        (0..=self.segments.len()).map(move |end| Self {
            segments: Arc::from(&self.segments[..end]),
        })
    }

    pub fn push(&self, segment: impl Into<PathSegment>) -> Self {
        let mut new_segments = Vec::with_capacity(self.segments.len() + 1);
        new_segments.extend_from_slice(&self.segments);
        new_segments.push(segment.into());
        Self::new(new_segments)
    }

    pub fn with_field(&self, name: impl Into<String>) -> Self {
        self.push(PathSegment::Field(name.into()))
    }

    /// Appends a field selection, falling back to a plain field segment when
    /// there is no alias or the alias equals the field name.
    pub fn with_aliased_field(&self, name: impl Into<String>, alias: Option<&str>) -> Self {
        let name = name.into();
        match alias {
            Some(alias) if alias != name => self.push(PathSegment::AliasedField {
                name,
                alias: alias.to_string(),
            }),
            _ => self.push(PathSegment::Field(name)),
        }
    }

    pub fn with_argument(&self, name: impl Into<String>) -> Self {
        self.push(PathSegment::Argument(name.into()))
    }

    pub fn with_inline_fragment(&self, type_name: impl Into<String>) -> Self {
        self.push(PathSegment::InlineFragment(type_name.into()))
    }

    pub fn with_fragment_spread(
        &self,
        fragment_name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        self.push(PathSegment::FragmentSpread {
            fragment_name: fragment_name.into(),
            type_name: type_name.into(),
        })
    }

    /// Strips aliases and fragment wrappers.
    pub fn to_canonical(&self) -> Self {
        Self::new(
            self.segments
                .iter()
                .filter_map(|segment| match segment {
                    PathSegment::AliasedField { name, .. } => Some(PathSegment::Field(name.clone())),
                    PathSegment::InlineFragment(_) | PathSegment::FragmentSpread { .. } => None,
                    other => Some(other.clone()),
                })
                .collect(),
        )
    }
}

impl Display for OperationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }

        for segment in self.segments.iter() {
            write!(f, "{}", segment)?;
        }

        Ok(())
    }
}

impl Debug for OperationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
