//! Scalar conversion between XML text and JSON values
//!
//! Decoding never fails: text that does not parse as its declared kind is
//! kept as a string, so every document round trips. Encoding fails only
//! when a structured value (array or object) stands where a scalar belongs.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};

use crate::error::{Error, Result};
use crate::model::ScalarKind;
use crate::walker::ScalarType;

/// Decode element or attribute text
pub fn decode(text: &str, scalar: ScalarType) -> Value {
    if scalar.list {
        return Value::Array(
            text.split_whitespace()
                .map(|item| decode_one(item, scalar.kind))
                .collect(),
        );
    }
    decode_one(text, scalar.kind)
}

fn decode_one(text: &str, kind: ScalarKind) -> Value {
    let trimmed = text.trim();
    let decoded = match kind {
        ScalarKind::Boolean => Some(Value::Bool(trimmed == "true" || trimmed == "1")),
        ScalarKind::Integer => trimmed
            .parse::<i64>()
            .map(Number::from)
            .or_else(|_| trimmed.parse::<u64>().map(Number::from))
            .ok()
            .map(Value::Number),
        ScalarKind::Decimal => decode_decimal(trimmed),
        ScalarKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        _ => None,
    };
    decoded.unwrap_or_else(|| Value::String(text.to_string()))
}

fn decode_decimal(text: &str) -> Option<Value> {
    let decimal = Decimal::from_str(text).ok()?;
    if decimal.fract().is_zero() {
        if let Some(n) = decimal.to_i64() {
            return Some(Value::Number(Number::from(n)));
        }
    }
    decimal.to_f64().and_then(Number::from_f64).map(Value::Number)
}

/// Encode a value as element or attribute text
pub fn encode(value: &Value, scalar: ScalarType) -> Result<String> {
    match value {
        Value::Array(items) if scalar.list => {
            let parts = items
                .iter()
                .map(|item| encode_one(item, scalar.kind))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(" "))
        }
        _ => encode_one(value, scalar.kind),
    }
}

fn encode_one(value: &Value, kind: ScalarKind) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(encode_number(n, kind)),
        Value::String(s) if kind == ScalarKind::Date => Ok(normalize_date(s)),
        Value::String(s) => Ok(s.clone()),
        Value::Array(_) => Err(Error::Encode(format!(
            "expected a {} value, found an array",
            kind
        ))),
        Value::Object(_) => Err(Error::Encode(format!(
            "expected a {} value, found an object",
            kind
        ))),
    }
}

fn encode_number(n: &Number, kind: ScalarKind) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    let Some(f) = n.as_f64() else {
        return n.to_string();
    };
    match kind {
        ScalarKind::Integer if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (f as i64).to_string()
        }
        ScalarKind::Decimal | ScalarKind::Integer => plain_decimal(&n.to_string()),
        _ => n.to_string(),
    }
}

/// Rewrite the shortest float text without an exponent; xs:decimal has none
fn plain_decimal(shortest: &str) -> String {
    Decimal::from_str(shortest)
        .or_else(|_| Decimal::from_scientific(shortest))
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|_| shortest.to_string())
}

/// Reduce a date or timestamp to `YYYY-MM-DD`; anything else is kept
fn normalize_date(text: &str) -> String {
    let trimmed = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return timestamp.date_naive().format("%Y-%m-%d").to_string();
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return timestamp.date().format("%Y-%m-%d").to_string();
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn single(kind: ScalarKind) -> ScalarType {
        ScalarType::of(kind)
    }

    #[test]
    fn test_decode_kinds() {
        assert_eq!(decode("42", single(ScalarKind::Integer)), json!(42));
        assert_eq!(decode("12.50", single(ScalarKind::Decimal)), json!(12.5));
        assert_eq!(decode("3.0", single(ScalarKind::Decimal)), json!(3));
        assert_eq!(decode("1.5E2", single(ScalarKind::Float)), json!(150.0));
        assert_eq!(decode("1", single(ScalarKind::Boolean)), json!(true));
        assert_eq!(decode("yes", single(ScalarKind::Boolean)), json!(false));
        assert_eq!(decode("2024-02-29", single(ScalarKind::Date)), json!("2024-02-29"));
        assert_eq!(decode(" text ", single(ScalarKind::String)), json!(" text "));
    }

    #[test]
    fn test_unparseable_numbers_stay_strings() {
        assert_eq!(decode("n/a", single(ScalarKind::Integer)), json!("n/a"));
        assert_eq!(
            decode("123456789012345678901234", single(ScalarKind::Integer)),
            json!("123456789012345678901234")
        );
        assert_eq!(decode("NaN", single(ScalarKind::Float)), json!("NaN"));
    }

    #[test]
    fn test_lists() {
        let ints = ScalarType {
            kind: ScalarKind::Integer,
            list: true,
        };
        assert_eq!(decode(" 1  2 3 ", ints), json!([1, 2, 3]));
        assert_eq!(encode(&json!([1, 2, 3]), ints).unwrap(), "1 2 3");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(&json!(true), single(ScalarKind::Boolean)).unwrap(), "true");
        assert_eq!(encode(&json!(3.0), single(ScalarKind::Integer)).unwrap(), "3");
        assert_eq!(encode(&json!(0.1), single(ScalarKind::Decimal)).unwrap(), "0.1");
        assert_eq!(encode(&json!(9.99), single(ScalarKind::Decimal)).unwrap(), "9.99");
        assert_eq!(encode(&json!(120.0), single(ScalarKind::Decimal)).unwrap(), "120");
        assert_eq!(encode(&json!("abc"), single(ScalarKind::String)).unwrap(), "abc");
        assert!(encode(&json!({"a": 1}), single(ScalarKind::String)).is_err());
    }

    #[test]
    fn test_decimal_text_survives_a_round_trip() {
        let decimal = single(ScalarKind::Decimal);
        for text in ["0.1", "9.99", "2.5", "-0.3", "100"] {
            assert_eq!(encode(&decode(text, decimal), decimal).unwrap(), text);
        }
        assert_eq!(encode(&json!(1e-7), decimal).unwrap(), "0.0000001");
    }

    #[test]
    fn test_dates_normalize_to_date_only() {
        let date = single(ScalarKind::Date);
        assert_eq!(encode(&json!("2024-03-01T10:30:00Z"), date).unwrap(), "2024-03-01");
        assert_eq!(encode(&json!("2024-03-01T10:30:00"), date).unwrap(), "2024-03-01");
        assert_eq!(encode(&json!("2024-03-01"), date).unwrap(), "2024-03-01");
        assert_eq!(encode(&json!("someday"), date).unwrap(), "someday");
        assert_eq!(
            encode(&json!("2024-03-01T10:30:00Z"), single(ScalarKind::DateTime)).unwrap(),
            "2024-03-01T10:30:00Z"
        );
    }
}
