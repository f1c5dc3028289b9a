//! Match expressions for `wait_for_event`.
//!
//! The orchestrator evaluates a single boolean expression against each
//! incoming event to decide whether it resolves a waiting step. Inside the
//! expression `event` is the event that triggered the function run and
//! `async` is the candidate event being awaited. This module only composes
//! the expression string; it never validates or evaluates it.

use crate::error::StepError;

/// A literal compared against a field of the awaited event.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    /// Emitted bare, in JSON number form
    Number(serde_json::Number),
    /// Emitted single-quoted
    String(String),
}

impl MatchValue {
    /// Creates a numeric value from a float, or `None` for NaN and infinities.
    pub fn float(value: f64) -> Option<Self> {
        serde_json::Number::from_f64(value).map(Self::Number)
    }

    /// Renders this value as an expression literal.
    pub fn to_literal(&self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::String(s) => quote(s),
        }
    }
}

impl From<i64> for MatchValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for MatchValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for MatchValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for MatchValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MatchValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// How a waiting step selects the event that resolves it.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOn {
    /// The field must be equal on the triggering and the awaited event.
    Field(String),
    /// The field on the awaited event must equal a literal.
    FieldEquals(String, MatchValue),
}

impl MatchOn {
    /// Compiles this match into an expression.
    pub fn to_expression(&self) -> Result<String, StepError> {
        match self {
            Self::Field(field) => {
                let field = non_empty_field(field)?;
                Ok(format!("event.{field} == async.{field}"))
            }
            Self::FieldEquals(field, value) => {
                let field = non_empty_field(field)?;
                Ok(format!("async.{} == {}", field, value.to_literal()))
            }
        }
    }
}

impl From<&str> for MatchOn {
    fn from(field: &str) -> Self {
        Self::Field(field.to_string())
    }
}

impl From<String> for MatchOn {
    fn from(field: String) -> Self {
        Self::Field(field)
    }
}

impl<F, V> From<(F, V)> for MatchOn
where
    F: Into<String>,
    V: Into<MatchValue>,
{
    fn from((field, value): (F, V)) -> Self {
        Self::FieldEquals(field.into(), value.into())
    }
}

/// Builds the match expression for a waiting step.
///
/// `match_on` takes priority over `if_expr`; a raw `if_expr` is used
/// verbatim. Returns `None` when neither is given.
///
/// ```
/// use durable_step_sdk::matching::{build_match_expression, MatchOn};
///
/// let on: MatchOn = ("name", 123).into();
/// assert_eq!(
///     build_match_expression(Some(&on), None).unwrap().as_deref(),
///     Some("async.name == 123")
/// );
/// ```
pub fn build_match_expression(
    match_on: Option<&MatchOn>,
    if_expr: Option<&str>,
) -> Result<Option<String>, StepError> {
    if let Some(match_on) = match_on {
        return match_on.to_expression().map(Some);
    }
    match if_expr {
        Some(expr) if expr.trim().is_empty() => Err(StepError::definition(
            "wait_for_event `if` expression must not be empty",
        )),
        Some(expr) => Ok(Some(expr.to_string())),
        None => Ok(None),
    }
}

fn non_empty_field(field: &str) -> Result<&str, StepError> {
    if field.trim().is_empty() {
        return Err(StepError::definition(
            "wait_for_event match field must not be empty",
        ));
    }
    Ok(field)
}

/// Single-quotes a string literal, escaping backslashes and single quotes.
fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_match() {
        let on = MatchOn::from("name");
        assert_eq!(on.to_expression().unwrap(), "event.name == async.name");
    }

    #[test]
    fn test_nested_field_match() {
        let on = MatchOn::from("data.user.id");
        assert_eq!(
            on.to_expression().unwrap(),
            "event.data.user.id == async.data.user.id"
        );
    }

    #[test]
    fn test_number_is_unquoted() {
        let on = MatchOn::from(("name", 123));
        assert_eq!(on.to_expression().unwrap(), "async.name == 123");
    }

    #[test]
    fn test_float_is_unquoted() {
        let on = MatchOn::FieldEquals("price".into(), MatchValue::float(1.5).unwrap());
        assert_eq!(on.to_expression().unwrap(), "async.price == 1.5");
        assert!(MatchValue::float(f64::NAN).is_none());
    }

    #[test]
    fn test_string_is_quoted() {
        let on = MatchOn::from(("name", "123"));
        assert_eq!(on.to_expression().unwrap(), "async.name == '123'");
    }

    #[test]
    fn test_string_quotes_are_escaped() {
        let on = MatchOn::from(("name", "o'brien"));
        assert_eq!(on.to_expression().unwrap(), r"async.name == 'o\'brien'");
        assert_eq!(MatchValue::from(r"a\b").to_literal(), r"'a\\b'");
    }

    #[test]
    fn test_if_used_verbatim() {
        let expr = build_match_expression(None, Some("name == 123")).unwrap();
        assert_eq!(expr.as_deref(), Some("name == 123"));
    }

    #[test]
    fn test_match_takes_priority_over_if() {
        let on = MatchOn::from("name");
        let expr = build_match_expression(Some(&on), Some("name == 123")).unwrap();
        assert_eq!(expr.as_deref(), Some("event.name == async.name"));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(build_match_expression(None, None).unwrap(), None);
    }

    #[test]
    fn test_empty_inputs_are_definition_errors() {
        assert!(MatchOn::from("").to_expression().unwrap_err().is_definition());
        assert!(MatchOn::from((" ", 1)).to_expression().unwrap_err().is_definition());
        assert!(build_match_expression(None, Some("")).unwrap_err().is_definition());
    }
}
