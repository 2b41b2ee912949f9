use std::cmp::Ordering;
use serde_json::Value;
use crate::core::utils::canonical_number;

/// Scalar view over a resolved leaf value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Bool(bool),
    Number(f64),
    Str(&'a str),
}

impl<'a> Scalar<'a> {
    /// `None` for null, arrays and objects
    pub fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            Value::String(s) => Some(Scalar::Str(s.as_str())),
            _ => None,
        }
    }

    pub fn canonical_string(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => canonical_number(*n),
            Scalar::Str(s) => (*s).to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Scalar::Str(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Scalar::Bool(_) => 0,
            Scalar::Number(_) => 1,
            Scalar::Str(_) => 2,
        }
    }

    /// Total natural order. Values of different types order by type rank.
    pub fn natural_cmp(&self, other: &Scalar<'_>) -> Ordering {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Number(a), Scalar::Number(b)) => a.total_cmp(b),
            (Scalar::Str(a), Scalar::Str(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

/// Canonical string of any JSON value. Null and containers map to "".
pub fn canonical_string(value: &Value) -> String {
    Scalar::from_value(value)
        .map(|s| s.canonical_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_from_json() {
        assert_eq!(Scalar::from_value(&json!(true)), Some(Scalar::Bool(true)));
        assert_eq!(Scalar::from_value(&json!(3)), Some(Scalar::Number(3.0)));
        assert_eq!(Scalar::from_value(&json!("x")), Some(Scalar::Str("x")));
        assert_eq!(Scalar::from_value(&json!(null)), None);
        assert_eq!(Scalar::from_value(&json!([1])), None);
    }

    #[test]
    fn test_natural_order() {
        assert_eq!(Scalar::Number(2.0).natural_cmp(&Scalar::Number(10.0)), Ordering::Less);
        assert_eq!(Scalar::Str("b").natural_cmp(&Scalar::Str("a")), Ordering::Greater);
        assert_eq!(Scalar::Bool(true).natural_cmp(&Scalar::Str("a")), Ordering::Less);
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(canonical_string(&json!(25)), "25");
        assert_eq!(canonical_string(&json!(25.0)), "25");
        assert_eq!(canonical_string(&json!(false)), "false");
        assert_eq!(canonical_string(&json!(null)), "");
    }
}
