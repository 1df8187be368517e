//! Argument validation.
//!
//! Two primitives every handler composes ([`validate_symbol`] and
//! [`validate_positive_number`]) plus [`validate_arguments`], which checks a full
//! argument object against a [`ToolDescriptor`]: unknown names are rejected,
//! declared defaults are filled in, numeric strings are coerced and constraints
//! are applied. Everything here is pure and synchronous.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use crate::types::{JsonObject, ParamConstraint, ParamSpec, ParamType, ToolDescriptor};
use crate::{Error, Result};

/// Allow-pattern for normalized symbols: `BTC`, `BTC/USDT`.
pub const SYMBOL_PATTERN_SOURCE: &str = "^[A-Z0-9]+(/[A-Z0-9]+)?$";

/// Default upper bound for positive numbers.
pub const DEFAULT_MAX_NUMERIC_VALUE: f64 = 1e15;

const SYMBOL_MIN_LEN: usize = 2;
const SYMBOL_MAX_LEN: usize = 20;

static SYMBOL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(SYMBOL_PATTERN_SOURCE).unwrap_or_else(|e| panic!("invalid symbol pattern: {e}"))
});

/// Validate and normalize a trading symbol (trimmed, upper-cased).
pub fn validate_symbol(field: &str, symbol: &str) -> Result<String> {
    let normalized = symbol.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(Error::validation(field, "Symbol must be a non-empty string"));
    }
    if normalized.len() < SYMBOL_MIN_LEN {
        return Err(Error::validation(
            field,
            format!("Symbol must be at least {SYMBOL_MIN_LEN} characters long"),
        ));
    }
    if normalized.len() > SYMBOL_MAX_LEN {
        return Err(Error::validation(
            field,
            format!("Symbol must be at most {SYMBOL_MAX_LEN} characters long"),
        ));
    }
    if !SYMBOL_PATTERN.is_match(&normalized) {
        return Err(Error::validation(
            field,
            format!("Invalid symbol format: {normalized}"),
        ));
    }
    Ok(normalized)
}

/// Parse `value` as a number that is strictly positive and at most `max`.
pub fn validate_positive_number(field: &str, value: &Value, max: f64) -> Result<f64> {
    let n = as_f64(field, value)?;
    if n <= 0.0 {
        return Err(Error::validation(
            field,
            format!("{field} must be greater than 0"),
        ));
    }
    if n > max {
        return Err(Error::validation(
            field,
            format!("{field} value is unreasonably large (max {max})"),
        ));
    }
    Ok(n)
}

fn as_f64(field: &str, value: &Value) -> Result<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(Error::validation(field, format!("{field} must be a number"))),
    }
}

fn as_i64(field: &str, value: &Value) -> Result<i64> {
    let n = as_f64(field, value)
        .map_err(|_| Error::validation(field, format!("{field} must be an integer")))?;
    if n.fract() != 0.0 || n.abs() > i64::MAX as f64 {
        return Err(Error::validation(field, format!("{field} must be an integer")));
    }
    Ok(n as i64)
}

fn coerce(spec: &ParamSpec, value: &Value) -> Result<Value> {
    let field = spec.name.as_str();
    match spec.param_type {
        ParamType::String => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            _ => Err(Error::validation(field, format!("{field} must be a string"))),
        },
        ParamType::Number => {
            let n = as_f64(field, value)?;
            Number::from_f64(n)
                .map(Value::Number)
                .ok_or_else(|| Error::validation(field, format!("{field} must be a number")))
        }
        ParamType::Integer => as_i64(field, value).map(Value::from),
        ParamType::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(Error::validation(field, format!("{field} must be a boolean"))),
        },
    }
}

fn apply_constraint(spec: &ParamSpec, constraint: &ParamConstraint, value: Value) -> Result<Value> {
    let field = spec.name.as_str();
    match constraint {
        ParamConstraint::Symbol => {
            let raw = value
                .as_str()
                .ok_or_else(|| Error::validation(field, "Symbol must be a non-empty string"))?;
            validate_symbol(field, raw).map(Value::String)
        }
        ParamConstraint::Positive { max } => {
            validate_positive_number(field, &value, *max)?;
            Ok(value)
        }
        ParamConstraint::Range { min, max } => {
            let n = as_f64(field, &value)?;
            if n < *min || n > *max {
                return Err(Error::validation(
                    field,
                    format!("{field} must be between {min} and {max}"),
                ));
            }
            Ok(value)
        }
    }
}

/// Validate an argument object against a descriptor, returning the normalized arguments.
pub fn validate_arguments(descriptor: &ToolDescriptor, arguments: &JsonObject) -> Result<JsonObject> {
    if let Some(unknown) = arguments
        .keys()
        .find(|k| descriptor.find_param(k).is_none())
    {
        return Err(Error::validation(
            unknown.as_str(),
            format!("Unexpected argument '{}' for tool '{}'", unknown, descriptor.name),
        ));
    }

    let mut out = JsonObject::new();
    for spec in &descriptor.params {
        let value = match arguments.get(&spec.name) {
            Some(v) if !v.is_null() => v,
            _ => {
                if let Some(default) = &spec.default {
                    out.insert(spec.name.clone(), default.clone());
                } else if spec.required {
                    return Err(Error::validation(
                        spec.name.as_str(),
                        format!("{} is required", spec.name),
                    ));
                }
                continue;
            }
        };

        let mut coerced = coerce(spec, value)?;
        for constraint in &spec.constraints {
            coerced = apply_constraint(spec, constraint, coerced)?;
        }
        out.insert(spec.name.clone(), coerced);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::object;
    use serde_json::json;

    fn buy() -> ToolDescriptor {
        ToolDescriptor::new("buy_crypto", "Simulated buy")
            .param(
                ParamSpec::required("symbol", ParamType::String)
                    .with_constraint(ParamConstraint::Symbol),
            )
            .param(
                ParamSpec::required("amount", ParamType::Number)
                    .with_constraint(ParamConstraint::Positive { max: 1e6 }),
            )
    }

    #[test]
    fn test_symbol_normalized() {
        assert_eq!(validate_symbol("symbol", " btc ").unwrap(), "BTC");
        assert_eq!(validate_symbol("symbol", "eth/usdt").unwrap(), "ETH/USDT");
    }

    #[test]
    fn test_symbol_rejections() {
        for bad in ["", "   ", "b", "/BTC", "BTC/", "BTC/USDT/X", "BT-C", "ABCDEFGHIJKLMNOPQRSTUVWXYZ"] {
            let err = validate_symbol("symbol", bad).unwrap_err();
            assert_eq!(err.field(), Some("symbol"), "input {:?}", bad);
        }
    }

    #[test]
    fn test_positive_number() {
        assert_eq!(validate_positive_number("amount", &json!("250.5"), 1e6).unwrap(), 250.5);
        assert!(validate_positive_number("amount", &json!(0), 1e6).is_err());
        assert!(validate_positive_number("amount", &json!(-3), 1e6).is_err());
        assert!(validate_positive_number("amount", &json!(2e6), 1e6).is_err());
        assert!(validate_positive_number("amount", &json!("abc"), 1e6).is_err());
        assert!(validate_positive_number("amount", &json!(true), 1e6).is_err());
    }

    #[test]
    fn test_validate_arguments_coerces_and_normalizes() {
        let args = object(json!({"symbol": "sol", "amount": "100"}));
        let out = validate_arguments(&buy(), &args).unwrap();
        assert_eq!(out["symbol"], "SOL");
        assert_eq!(out["amount"].as_f64(), Some(100.0));
    }

    #[test]
    fn test_validate_arguments_missing_required() {
        let args = object(json!({"symbol": "BTC"}));
        let err = validate_arguments(&buy(), &args).unwrap_err();
        assert_eq!(err.field(), Some("amount"));
    }

    #[test]
    fn test_validate_arguments_unknown_field() {
        let args = object(json!({"symbol": "BTC", "amount": 5, "leverage": 10}));
        let err = validate_arguments(&buy(), &args).unwrap_err();
        assert_eq!(err.field(), Some("leverage"));
    }

    #[test]
    fn test_integer_default_and_range() {
        let desc = ToolDescriptor::new("transaction_history", "History").param(
            ParamSpec::optional("limit", ParamType::Integer)
                .with_default(json!(10))
                .with_constraint(ParamConstraint::Range { min: 1.0, max: 100.0 }),
        );
        let out = validate_arguments(&desc, &JsonObject::new()).unwrap();
        assert_eq!(out["limit"], 10);

        let out = validate_arguments(&desc, &object(json!({"limit": "25"}))).unwrap();
        assert_eq!(out["limit"], 25);

        assert!(validate_arguments(&desc, &object(json!({"limit": 2.5}))).is_err());
        assert!(validate_arguments(&desc, &object(json!({"limit": 0}))).is_err());
        assert!(validate_arguments(&desc, &object(json!({"limit": 1000}))).is_err());
    }
}
