use std::collections::BTreeSet;

/// Names the caller promises to supply when the plan is executed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestInputs {
    /// Keys of the variables map sent along with the request
    pub variable_keys: BTreeSet<String>,
    /// Keys of the raw input context, usually whole domain records
    pub raw_input_context_keys: BTreeSet<String>,
}

impl RequestInputs {
    pub fn new<V, R>(variable_keys: V, raw_input_context_keys: R) -> Self
    where
        V: IntoIterator,
        V::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            variable_keys: variable_keys.into_iter().map(Into::into).collect(),
            raw_input_context_keys: raw_input_context_keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// A request expressed as flat column and key sets instead of a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TabularSpec {
    pub output_column_names: BTreeSet<String>,
    pub variable_keys: BTreeSet<String>,
    pub raw_input_context_keys: BTreeSet<String>,
}

impl TabularSpec {
    pub fn new<C, V, R>(output_column_names: C, variable_keys: V, raw_input_context_keys: R) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            output_column_names: output_column_names.into_iter().map(Into::into).collect(),
            variable_keys: variable_keys.into_iter().map(Into::into).collect(),
            raw_input_context_keys: raw_input_context_keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn request_inputs(&self) -> RequestInputs {
        RequestInputs {
            variable_keys: self.variable_keys.clone(),
            raw_input_context_keys: self.raw_input_context_keys.clone(),
        }
    }
}
