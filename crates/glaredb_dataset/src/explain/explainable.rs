use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An entry in an output for explaining a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainEntry {
    /// Name of the node.
    pub name: String,
    /// Items to display in the explain entry.
    ///
    /// Using a btree to ensure consistent ordering.
    pub items: BTreeMap<String, ExplainValue>,
}

impl ExplainEntry {
    pub fn new(name: impl Into<String>) -> Self {
        ExplainEntry {
            name: name.into(),
            items: BTreeMap::new(),
        }
    }

    /// Put a value in the explain entry.
    pub fn with_value(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.items
            .insert(key.into(), ExplainValue::Value(value.to_string()));
        self
    }

    /// Put a list of values in the explain entry.
    pub fn with_values<S: fmt::Display>(
        mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let vals = ExplainValue::Values(values.into_iter().map(|s| s.to_string()).collect());
        self.items.insert(key.into(), vals);
        self
    }

    /// Put a value only when producing verbose output.
    pub fn with_verbose_value(
        self,
        conf: ExplainConfig,
        key: impl Into<String>,
        value: impl fmt::Display,
    ) -> Self {
        if conf.verbose {
            self.with_value(key, value)
        } else {
            self
        }
    }
}

impl fmt::Display for ExplainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.items.is_empty() {
            write!(f, " (")?;
            for (idx, (k, v)) in self.items.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{k} = {v}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplainValue {
    Value(String),
    Values(Vec<String>),
}

impl fmt::Display for ExplainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Values(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

/// Configuration for producing an ExplainEntry for a node in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplainConfig {
    /// Include attribute ids and other details.
    pub verbose: bool,
}

/// Trait for explaining a single node in the plan.
pub trait Explainable {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry;
}

/// Formats attributes according to the explain config.
///
/// Verbose output includes attribute ids so that same-named columns from
/// different join branches can be told apart.
pub fn attribute_names<'a>(
    conf: ExplainConfig,
    attrs: impl IntoIterator<Item = &'a crate::expr::attribute::Attribute>,
) -> Vec<String> {
    attrs
        .into_iter()
        .map(|attr| {
            if conf.verbose {
                attr.to_string()
            } else {
                attr.name.clone()
            }
        })
        .collect()
}
