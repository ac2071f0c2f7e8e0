//! Typed comparison between dynamically-typed values.
//!
//! The left operand's kind selects the comparison domain (string, integer or
//! float) and the right operand is coerced toward it. Coercion is a total
//! match over (source kind, target kind): every cell either converts or
//! reports a type mismatch.

use crate::error::{FunctionError, Result};
use crate::record::Record;
use crate::value::Value;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Binary operator of a comparison rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
    /// Right operand is a pattern searched for in the left string
    Regex,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Regex => "regex",
        }
    }

    fn ordering<T: PartialOrd + ?Sized>(&self, left: &T, right: &T) -> Result<bool> {
        Ok(match self {
            Operator::Lt => left < right,
            Operator::Le => left <= right,
            Operator::Eq => left == right,
            Operator::Ne => left != right,
            Operator::Gt => left > right,
            Operator::Ge => left >= right,
            Operator::Regex => {
                return Err(FunctionError::Unsupported(
                    "regex operator requires a string field".to_string(),
                ))
            }
        })
    }
}

impl FromStr for Operator {
    type Err = FunctionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "regex" => Ok(Operator::Regex),
            other => Err(FunctionError::Unsupported(format!(
                "unknown comparison operator '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn mismatch(expected: &'static str, value: &Value) -> FunctionError {
    FunctionError::TypeMismatch {
        expected,
        actual: value.type_name().to_string(),
    }
}

/// Coerce a right operand to text.
pub fn coerce_to_string(value: &Value) -> Result<Cow<'_, str>> {
    match value {
        Value::String(s) => Ok(Cow::Borrowed(s.as_str())),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::DateTime(_) => {
            Ok(Cow::Owned(value.to_string()))
        }
        Value::Null => Err(mismatch("a value coercible to string", value)),
    }
}

/// Coerce a right operand to an integer.
///
/// Non-numeric strings become `0` rather than failing. Routing rules have
/// always relied on this leniency, so it is kept as-is.
pub fn coerce_to_int(value: &Value) -> Result<i64> {
    match value {
        Value::String(s) => Ok(s.parse::<i64>().unwrap_or(0)),
        Value::Int(i) => Ok(*i),
        // Round half to even through zero-decimal formatting, then reparse
        Value::Float(f) => Ok(format!("{:.0}", f).parse::<i64>().unwrap_or(0)),
        Value::Bool(_) | Value::DateTime(_) | Value::Null => {
            Err(mismatch("a value coercible to integer", value))
        }
    }
}

/// Coerce a right operand to a float. Non-numeric strings become `0.0`.
pub fn coerce_to_float(value: &Value) -> Result<f64> {
    match value {
        Value::String(s) => Ok(s.parse::<f64>().unwrap_or(0.0)),
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Bool(_) | Value::DateTime(_) | Value::Null => {
            Err(mismatch("a value coercible to float", value))
        }
    }
}

/// Evaluate `left <op> right`.
///
/// # Errors
/// * `TypeMismatch` if `left` is not a string, integer or float, or `right`
///   has no coercion toward `left`'s kind
/// * `Unsupported` for `regex` on a numeric left operand
/// * `Pattern` if a regex pattern does not compile
pub fn compare(left: &Value, op: Operator, right: &Value) -> Result<bool> {
    match left {
        Value::String(l) => {
            let r = coerce_to_string(right)?;
            if op == Operator::Regex {
                return Ok(Regex::new(&r)?.is_match(l));
            }
            op.ordering(l.as_str(), r.as_ref())
        }
        Value::Int(l) => op.ordering(l, &coerce_to_int(right)?),
        Value::Float(l) => op.ordering(l, &coerce_to_float(right)?),
        Value::Bool(_) | Value::DateTime(_) | Value::Null => Err(FunctionError::TypeMismatch {
            expected: "string, integer or float field",
            actual: left.type_name().to_string(),
        }),
    }
}

/// Where a rule's right operand comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    /// Name of another field in the same record
    Field(String),
}

/// One native routing rule: `field <op> operand` sends the record to `output_port`.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: String,
    pub op: Operator,
    pub operand: Operand,
    pub output_port: String,
    /// Pre-compiled pattern for `regex` rules with a literal operand
    pattern: Option<Regex>,
}

impl FieldRule {
    /// Build a rule, compiling a literal regex pattern up front.
    pub fn new(
        field: impl Into<String>,
        op: Operator,
        operand: Operand,
        output_port: impl Into<String>,
    ) -> Result<Self> {
        let pattern = match (&op, &operand) {
            (Operator::Regex, Operand::Literal(value)) => {
                Some(Regex::new(&coerce_to_string(value)?)?)
            }
            _ => None,
        };
        Ok(Self {
            field: field.into(),
            op,
            operand,
            output_port: output_port.into(),
            pattern,
        })
    }

    /// Evaluate the rule against `record`.
    ///
    /// A missing left field evaluates as null and therefore fails with a type
    /// mismatch, like any other unsupported left operand.
    pub fn matches(&self, record: &Record) -> Result<bool> {
        let left = record.get(&self.field).unwrap_or(&Value::Null);

        if let (Some(pattern), Value::String(l)) = (&self.pattern, left) {
            return Ok(pattern.is_match(l));
        }

        let right = match &self.operand {
            Operand::Literal(value) => value,
            Operand::Field(name) => record.get(name).unwrap_or(&Value::Null),
        };
        compare(left, self.op, right)
    }
}

/// Return the output port of the first matching rule, or `default_port`.
pub fn route<'a>(rules: &'a [FieldRule], record: &Record, default_port: &'a str) -> Result<&'a str> {
    for rule in rules {
        if rule.matches(record)? {
            return Ok(rule.output_port.as_str());
        }
    }
    Ok(default_port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    const ORDERING_OPS: [Operator; 6] = [
        Operator::Lt,
        Operator::Le,
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Ge,
    ];

    #[test]
    fn test_operator_parse() {
        for op in ORDERING_OPS {
            assert_eq!(op.symbol().parse::<Operator>().unwrap(), op);
        }
        assert_eq!("regex".parse::<Operator>().unwrap(), Operator::Regex);
        assert!(matches!(
            "=~".parse::<Operator>(),
            Err(FunctionError::Unsupported(_))
        ));
    }

    #[test]
    fn test_reflexive_for_identical_values() {
        let samples = [
            Value::from("abc"),
            Value::Int(-7),
            Value::Float(50.25),
        ];
        for value in &samples {
            assert!(compare(value, Operator::Eq, value).unwrap());
            assert!(compare(value, Operator::Le, value).unwrap());
            assert!(compare(value, Operator::Ge, value).unwrap());
            assert!(!compare(value, Operator::Lt, value).unwrap());
            assert!(!compare(value, Operator::Gt, value).unwrap());
            assert!(!compare(value, Operator::Ne, value).unwrap());
        }
    }

    #[test]
    fn test_antisymmetric_lt_gt() {
        let pairs = [
            (Value::Int(3), Value::Int(9)),
            (Value::Float(1.5), Value::Float(-2.0)),
            (Value::from("apple"), Value::from("banana")),
        ];
        for (a, b) in &pairs {
            assert_eq!(
                compare(a, Operator::Lt, b).unwrap(),
                compare(b, Operator::Gt, a).unwrap()
            );
            assert!(!(compare(a, Operator::Lt, b).unwrap() && compare(b, Operator::Lt, a).unwrap()));
        }
    }

    #[test]
    fn test_left_type_wins() {
        // Integer left: the float literal is rounded to 50
        assert!(compare(&Value::Int(50), Operator::Eq, &Value::Float(50.4)).unwrap());
        // Float left: the integer is widened
        assert!(compare(&Value::Float(40.0), Operator::Le, &Value::Int(50)).unwrap());
        // String left: numbers are formatted
        assert!(compare(&Value::from("42"), Operator::Eq, &Value::Int(42)).unwrap());
        assert!(compare(&Value::from("50.5"), Operator::Eq, &Value::Float(50.5)).unwrap());
    }

    #[test]
    fn test_float_to_int_rounds_half_to_even() {
        assert_eq!(coerce_to_int(&Value::Float(2.5)).unwrap(), 2);
        assert_eq!(coerce_to_int(&Value::Float(3.5)).unwrap(), 4);
        assert_eq!(coerce_to_int(&Value::Float(-1.6)).unwrap(), -2);
        assert_eq!(coerce_to_int(&Value::Float(f64::NAN)).unwrap(), 0);
    }

    #[test]
    fn test_non_numeric_string_coerces_to_zero() {
        assert_eq!(coerce_to_int(&Value::from("abc")).unwrap(), 0);
        assert_eq!(coerce_to_float(&Value::from("n/a")).unwrap(), 0.0);
        assert!(compare(&Value::Int(0), Operator::Eq, &Value::from("abc")).unwrap());
    }

    #[test]
    fn test_coercion_mismatches() {
        assert!(coerce_to_string(&Value::Null).is_err());
        assert!(coerce_to_int(&Value::Bool(true)).is_err());
        assert!(coerce_to_float(&Value::Null).is_err());

        let dt = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        assert!(coerce_to_int(&Value::DateTime(dt)).is_err());
        assert_eq!(
            coerce_to_string(&Value::DateTime(dt)).unwrap(),
            "2024-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_unsupported_left_operand() {
        let err = compare(&Value::Bool(true), Operator::Eq, &Value::Bool(true)).unwrap_err();
        assert!(matches!(err, FunctionError::TypeMismatch { .. }));
        assert!(compare(&Value::Null, Operator::Eq, &Value::Int(1)).is_err());
    }

    #[test]
    fn test_regex_operator() {
        assert!(compare(&Value::from("report_2024.csv"), Operator::Regex, &Value::from(r"\d{4}")).unwrap());
        assert!(!compare(&Value::from("report.csv"), Operator::Regex, &Value::from(r"^\d")).unwrap());
        assert!(matches!(
            compare(&Value::Int(1), Operator::Regex, &Value::from("1")),
            Err(FunctionError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rule_with_field_operand() {
        let rule = FieldRule::new(
            "spent",
            Operator::Gt,
            Operand::Field("budget".to_string()),
            "over",
        )
        .unwrap();

        let over = Record::new().with("spent", 120i64).with("budget", 100i64);
        let under = Record::new().with("spent", 80i64).with("budget", 100i64);
        assert!(rule.matches(&over).unwrap());
        assert!(!rule.matches(&under).unwrap());
    }

    #[test]
    fn test_literal_regex_compiled_once() {
        assert!(FieldRule::new("name", Operator::Regex, Operand::Literal(Value::from("(")), "x").is_err());

        let rule = FieldRule::new(
            "state",
            Operator::Regex,
            Operand::Literal(Value::from("^W")),
            "west",
        )
        .unwrap();
        assert!(rule.matches(&Record::new().with("state", "WA")).unwrap());
    }

    #[test]
    fn test_route_first_match_wins() {
        let rules = vec![
            FieldRule::new("balance", Operator::Le, Operand::Literal(Value::Float(50.0)), "poor").unwrap(),
            FieldRule::new("balance", Operator::Le, Operand::Literal(Value::Float(100.0)), "middle").unwrap(),
        ];

        let record = Record::new().with("balance", 40.0);
        assert_eq!(route(&rules, &record, "ok").unwrap(), "poor");
        let record = Record::new().with("balance", 75.0);
        assert_eq!(route(&rules, &record, "ok").unwrap(), "middle");
        let record = Record::new().with("balance", 175.0);
        assert_eq!(route(&rules, &record, "ok").unwrap(), "ok");
    }
}
