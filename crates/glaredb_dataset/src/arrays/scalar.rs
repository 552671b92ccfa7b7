use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::datatype::DataType;
use crate::errors::{DatasetError, Result, internal};

/// A single value in a row.
///
/// Equality, ordering and hashing are total. Integers and floats compare
/// numerically across widths so that values produced by differently typed (but
/// compatible) branches of a set operation line up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    List(Vec<ScalarValue>),
    /// Struct values, fields in declaration order.
    Struct(Vec<ScalarValue>),
}

impl ScalarValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Datatype of this value, if it can be determined from the value alone.
    ///
    /// Struct values don't carry field names, so their type can't be
    /// recovered.
    pub fn datatype(&self) -> Result<DataType> {
        Ok(match self {
            Self::Null => DataType::Null,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::List(vals) => {
                let inner = vals
                    .iter()
                    .find(|v| !v.is_null())
                    .map(|v| v.datatype())
                    .transpose()?
                    .unwrap_or(DataType::Null);
                DataType::list(inner)
            }
            Self::Struct(_) => {
                return Err(internal!("Cannot determine datatype of a struct value"));
            }
        })
    }

    pub fn try_as_bool(&self) -> Result<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            other => Err(internal!("Not a bool: {other}")),
        }
    }

    pub fn try_as_i64(&self) -> Result<i64> {
        match self {
            Self::Int32(v) => Ok(*v as i64),
            Self::Int64(v) => Ok(*v),
            other => Err(internal!("Not an integer: {other}")),
        }
    }

    pub fn try_as_f64(&self) -> Result<f64> {
        match self {
            Self::Int32(v) => Ok(*v as f64),
            Self::Int64(v) => Ok(*v as f64),
            Self::Float64(v) => Ok(*v),
            other => Err(internal!("Not a number: {other}")),
        }
    }

    pub fn try_as_str(&self) -> Result<&str> {
        match self {
            Self::Utf8(s) => Ok(s),
            other => Err(internal!("Not a string: {other}")),
        }
    }

    const fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Int32(_) | Self::Int64(_) | Self::Float64(_) => 2,
            Self::Utf8(_) => 3,
            Self::List(_) => 4,
            Self::Struct(_) => 5,
        }
    }

    /// Cast this value to a different type.
    ///
    /// Strings that can't be parsed as the target type produce null.
    pub fn cast_to(&self, datatype: &DataType) -> Result<ScalarValue> {
        let casted = match (self, datatype) {
            (Self::Null, _) => Self::Null,
            (_, DataType::Null) => Self::Null,
            (v, DataType::Utf8) => match v {
                Self::Utf8(s) => Self::Utf8(s.clone()),
                other => Self::Utf8(other.to_string()),
            },

            (Self::Boolean(b), DataType::Boolean) => Self::Boolean(*b),
            (Self::Boolean(b), DataType::Int32) => Self::Int32(*b as i32),
            (Self::Boolean(b), DataType::Int64) => Self::Int64(*b as i64),
            (Self::Boolean(b), DataType::Float64) => Self::Float64(if *b { 1.0 } else { 0.0 }),

            (Self::Int32(v), DataType::Int32) => Self::Int32(*v),
            (Self::Int32(v), DataType::Int64) => Self::Int64(*v as i64),
            (Self::Int32(v), DataType::Float64) => Self::Float64(*v as f64),
            (Self::Int32(v), DataType::Boolean) => Self::Boolean(*v != 0),

            (Self::Int64(v), DataType::Int32) => Self::Int32(*v as i32),
            (Self::Int64(v), DataType::Int64) => Self::Int64(*v),
            (Self::Int64(v), DataType::Float64) => Self::Float64(*v as f64),
            (Self::Int64(v), DataType::Boolean) => Self::Boolean(*v != 0),

            (Self::Float64(v), DataType::Int32) => Self::Int32(*v as i32),
            (Self::Float64(v), DataType::Int64) => Self::Int64(*v as i64),
            (Self::Float64(v), DataType::Float64) => Self::Float64(*v),
            (Self::Float64(v), DataType::Boolean) => Self::Boolean(*v != 0.0),

            (Self::Utf8(s), DataType::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Self::Boolean(true),
                "false" | "f" | "0" => Self::Boolean(false),
                _ => Self::Null,
            },
            (Self::Utf8(s), DataType::Int32) => {
                s.trim().parse().map(Self::Int32).unwrap_or(Self::Null)
            }
            (Self::Utf8(s), DataType::Int64) => {
                s.trim().parse().map(Self::Int64).unwrap_or(Self::Null)
            }
            (Self::Utf8(s), DataType::Float64) => {
                s.trim().parse().map(Self::Float64).unwrap_or(Self::Null)
            }

            (Self::List(vals), DataType::List(meta)) => Self::List(
                vals.iter()
                    .map(|v| v.cast_to(&meta.datatype))
                    .collect::<Result<_>>()?,
            ),
            (Self::Struct(vals), DataType::Struct(meta)) if vals.len() == meta.fields.len() => {
                Self::Struct(
                    vals.iter()
                        .zip(&meta.fields)
                        .map(|(v, f)| v.cast_to(&f.datatype))
                        .collect::<Result<_>>()?,
                )
            }
            (v, datatype) => {
                return Err(DatasetError::Execution(format!(
                    "Cannot cast '{v}' to {datatype}"
                )));
            }
        };

        Ok(casted)
    }
}

/// 2^63, the first float past the range of i64.
const I64_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn numeric_cmp(a: &ScalarValue, b: &ScalarValue) -> Ordering {
    // Both checked to be numeric by the caller.
    match (a, b) {
        (ScalarValue::Float64(a), ScalarValue::Float64(b)) => float_cmp(*a, *b),
        (ScalarValue::Float64(f), other) => {
            int_float_cmp(other.try_as_i64().unwrap_or_default(), *f).reverse()
        }
        (other, ScalarValue::Float64(f)) => {
            int_float_cmp(other.try_as_i64().unwrap_or_default(), *f)
        }
        _ => {
            let a = a.try_as_i64().unwrap_or_default();
            let b = b.try_as_i64().unwrap_or_default();
            a.cmp(&b)
        }
    }
}

/// Total order over floats where -0.0 and 0.0 are equal.
fn float_cmp(a: f64, b: f64) -> Ordering {
    if a == b {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// Exact comparison of an integer with a float, without rounding the
/// integer.
fn int_float_cmp(i: i64, f: f64) -> Ordering {
    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= I64_UPPER_BOUND {
        return Ordering::Less;
    }
    if f < -I64_UPPER_BOUND {
        return Ordering::Greater;
    }

    let truncated = f.trunc();
    match i.cmp(&(truncated as i64)) {
        Ordering::Equal if f > truncated => Ordering::Less,
        Ordering::Equal if f < truncated => Ordering::Greater,
        other => other,
    }
}

impl Ord for ScalarValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.iter().cmp(b.iter()),
            (Self::Struct(a), Self::Struct(b)) => a.iter().cmp(b.iter()),
            (a, b) if a.type_rank() == 2 && b.type_rank() == 2 => numeric_cmp(a, b),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl PartialOrd for ScalarValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => 0_u8.hash(state),
            Self::Boolean(v) => {
                1_u8.hash(state);
                v.hash(state);
            }
            Self::Int32(v) => {
                2_u8.hash(state);
                (*v as i64).hash(state);
            }
            Self::Int64(v) => {
                2_u8.hash(state);
                v.hash(state);
            }
            Self::Float64(v) => {
                // Integral floats need to hash the same as the equivalent
                // integer since they compare equal.
                if v.fract() == 0.0 && *v >= -I64_UPPER_BOUND && *v < I64_UPPER_BOUND {
                    2_u8.hash(state);
                    (*v as i64).hash(state);
                } else {
                    3_u8.hash(state);
                    v.to_bits().hash(state);
                }
            }
            Self::Utf8(v) => {
                4_u8.hash(state);
                v.hash(state);
            }
            Self::List(v) => {
                5_u8.hash(state);
                v.hash(state);
            }
            Self::Struct(v) => {
                6_u8.hash(state);
                v.hash(state);
            }
        }
    }
}

/// Format a float so that integral values keep a trailing ".0".
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{}", format_float(*v)),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::List(vals) => {
                write!(f, "[")?;
                for (idx, v) in vals.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Self::Struct(vals) => {
                write!(f, "{{")?;
                for (idx, v) in vals.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int32(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}

impl<T> From<Option<T>> for ScalarValue
where
    T: Into<ScalarValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => ScalarValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn cross_width_integer_equality() {
        assert_eq!(ScalarValue::Int32(4), ScalarValue::Int64(4));
        assert_eq!(ScalarValue::Int64(4), ScalarValue::Float64(4.0));

        let mut set = HashSet::new();
        set.insert(ScalarValue::Int32(4));
        assert!(set.contains(&ScalarValue::Int64(4)));
        assert!(set.contains(&ScalarValue::Float64(4.0)));
    }

    #[test]
    fn mixed_int_float_compare_exactly() {
        let two_pow_53 = 9_007_199_254_740_992_i64;
        let float = ScalarValue::Float64(two_pow_53 as f64);

        assert_eq!(ScalarValue::Int64(two_pow_53), float);
        assert_ne!(ScalarValue::Int64(two_pow_53 + 1), float);
        assert!(ScalarValue::Int64(two_pow_53 + 1) > float);
        assert!(ScalarValue::Int32(3) < ScalarValue::Float64(3.5));
        assert!(ScalarValue::Int32(-3) > ScalarValue::Float64(-3.5));
        assert_eq!(ScalarValue::Int64(i64::MIN), ScalarValue::Float64(i64::MIN as f64));
        assert!(ScalarValue::Int64(i64::MAX) < ScalarValue::Float64(i64::MAX as f64));
        assert_eq!(ScalarValue::Float64(-0.0), ScalarValue::Float64(0.0));

        let mut set = HashSet::new();
        set.insert(ScalarValue::Int64(two_pow_53 + 1));
        set.insert(float.clone());
        set.insert(ScalarValue::Int64(two_pow_53));
        set.insert(ScalarValue::Int64(i64::MIN));
        set.insert(ScalarValue::Float64(i64::MIN as f64));
        set.insert(ScalarValue::Float64(-0.0));
        set.insert(ScalarValue::Float64(0.0));
        assert_eq!(4, set.len());
    }

    #[test]
    fn nulls_sort_first() {
        let mut vals = vec![
            ScalarValue::Int32(3),
            ScalarValue::Null,
            ScalarValue::Int32(1),
        ];
        vals.sort();
        assert_eq!(
            vec![
                ScalarValue::Null,
                ScalarValue::Int32(1),
                ScalarValue::Int32(3)
            ],
            vals
        );
    }

    #[test]
    fn cast_string_to_number() {
        let v = ScalarValue::from("12").cast_to(&DataType::Int64).unwrap();
        assert_eq!(ScalarValue::Int64(12), v);

        let v = ScalarValue::from("twelve")
            .cast_to(&DataType::Int64)
            .unwrap();
        assert_eq!(ScalarValue::Null, v);
    }

    #[test]
    fn cast_number_to_string() {
        let v = ScalarValue::Float64(35.0).cast_to(&DataType::Utf8).unwrap();
        assert_eq!(ScalarValue::from("35.0"), v);

        let v = ScalarValue::Int64(2).cast_to(&DataType::Utf8).unwrap();
        assert_eq!(ScalarValue::from("2"), v);
    }

    #[test]
    fn cast_struct_to_list_fails() {
        let v = ScalarValue::Struct(vec![ScalarValue::Int32(1)]);
        let err = v.cast_to(&DataType::list(DataType::Int32)).unwrap_err();
        assert!(err.is_execution());
    }
}
