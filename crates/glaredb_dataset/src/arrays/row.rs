use std::fmt;

use serde::{Deserialize, Serialize};

use super::scalar::ScalarValue;
use crate::errors::{Result, internal};

/// A single physical row.
///
/// Values are positional. The attributes describing each position live on the
/// plan that produced the row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Row {
    values: Vec<ScalarValue>,
}

impl Row {
    pub fn new(values: Vec<ScalarValue>) -> Self {
        Row { values }
    }

    pub const fn empty() -> Self {
        Row { values: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[ScalarValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<ScalarValue> {
        self.values
    }

    pub fn get(&self, idx: usize) -> Option<&ScalarValue> {
        self.values.get(idx)
    }

    pub fn try_get(&self, idx: usize) -> Result<&ScalarValue> {
        self.values
            .get(idx)
            .ok_or_else(|| internal!("Missing value at index {idx} in row of width {}", self.len()))
    }

    /// Create a new row with the values from `self` followed by `other`.
    pub fn concat(&self, other: &Row) -> Row {
        let mut values = Vec::with_capacity(self.len() + other.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);
        Row { values }
    }
}

impl From<Vec<ScalarValue>> for Row {
    fn from(values: Vec<ScalarValue>) -> Self {
        Row { values }
    }
}

impl FromIterator<ScalarValue> for Row {
    fn from_iter<T: IntoIterator<Item = ScalarValue>>(iter: T) -> Self {
        Row {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, v) in self.values.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

/// Build a row from a list of values convertible to scalars.
///
/// ```text
/// let row = row!["a", 30];
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::arrays::row::Row::empty()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::arrays::row::Row::new(vec![$($crate::arrays::scalar::ScalarValue::from($value)),+])
    };
}
