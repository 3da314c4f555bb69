//! The value payload carried by variables and container snapshots.

/// A realized variable value.
///
/// This is the payload stored in stochastic variables, cached by
/// deterministic variables, and written into container snapshots. The
/// kernel never interprets payloads beyond moving them around; eval
/// functions and samplers give them meaning.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// A boolean payload
    Bool(bool),
    /// An integer payload
    Int(i64),
    /// A continuous payload
    Real(f64),
    /// A dense numeric vector payload
    Vector(Vec<f64>),
}

impl Value {
    /// Returns the payload as a bool, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the payload as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the payload as a real number.
    ///
    /// Integers widen to `f64`; other payloads return `None`.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the payload as a numeric vector, if it is one.
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Real(x)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}
