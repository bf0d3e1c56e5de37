//! Dynamically typed values for name-based variable access.

use std::fmt;

use crate::error::VarError;

/// A module variable exposed by name to external collaborators
/// (scripting, tracking, input files).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    /// A real number.
    F64(f64),
    /// A signed integer.
    I64(i64),
    /// A flag.
    Bool(bool),
}

impl Value {
    /// Type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::F64(_) => "f64",
            Value::I64(_) => "i64",
            Value::Bool(_) => "bool",
        }
    }

    /// The value as `f64`, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F64(v) => Some(v),
            Value::I64(v) => Some(v as f64),
            Value::Bool(_) => None,
        }
    }

    /// The value as `i64`, if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(v) => Some(v),
            _ => None,
        }
    }

    /// The value as `bool`, if it is a flag.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Unpack a numeric value written to variable `name`.
    pub fn try_f64(&self, name: &str) -> Result<f64, VarError> {
        self.as_f64().ok_or_else(|| VarError::TypeMismatch {
            name: name.into(),
            expected: "f64",
        })
    }

    /// Unpack an integer value written to variable `name`.
    pub fn try_i64(&self, name: &str) -> Result<i64, VarError> {
        self.as_i64().ok_or_else(|| VarError::TypeMismatch {
            name: name.into(),
            expected: "i64",
        })
    }

    /// Unpack a flag written to variable `name`.
    pub fn try_bool(&self, name: &str) -> Result<bool, VarError> {
        self.as_bool().ok_or_else(|| VarError::TypeMismatch {
            name: name.into(),
            expected: "bool",
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::F64(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<f64>().prop_filter("finite", |v| v.is_finite()).prop_map(Value::F64),
            any::<i64>().prop_map(Value::I64),
            any::<bool>().prop_map(Value::Bool),
        ]
    }

    proptest! {
        #[test]
        fn display_round_trips_numbers(v in arb_value()) {
            let text = v.to_string();
            match v {
                Value::F64(x) => prop_assert_eq!(text.parse::<f64>().unwrap(), x),
                Value::I64(x) => prop_assert_eq!(text.parse::<i64>().unwrap(), x),
                Value::Bool(x) => prop_assert_eq!(text.parse::<bool>().unwrap(), x),
            }
        }

        #[test]
        fn numeric_kinds_unpack_as_f64(v in arb_value()) {
            prop_assert_eq!(v.try_f64("v").is_ok(), v.kind() != "bool");
        }
    }

    #[test]
    fn integer_widens_to_f64_but_not_back() {
        let v = Value::from(3_i64);
        assert_eq!(v.as_f64(), Some(3.0));
        assert_eq!(Value::F64(3.0).as_i64(), None);
    }

    #[test]
    fn bool_is_not_numeric() {
        let v = Value::from(true);
        assert_eq!(v.as_f64(), None);
        assert_eq!(v.as_bool(), Some(true));
        assert_eq!(v.kind(), "bool");
    }

    #[test]
    fn try_accessors_report_the_variable_name() {
        assert_eq!(Value::F64(2.0).try_f64("k"), Ok(2.0));
        let err = Value::Bool(true).try_f64("k").unwrap_err();
        assert_eq!(
            err,
            VarError::TypeMismatch {
                name: "k".into(),
                expected: "f64"
            }
        );
    }

    #[test]
    fn display_formats_payload() {
        assert_eq!(Value::F64(0.5).to_string(), "0.5");
        assert_eq!(Value::I64(-2).to_string(), "-2");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }
}
