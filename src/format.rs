//! pt-BR display formatting for snapshot values.
//!
//! Every function here is total: malformed or missing input renders as
//! [`PLACEHOLDER`] (or, for timestamps, as the raw input) and never panics.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;

pub const PLACEHOLDER: &str = "-";
pub const CURRENCY_PREFIX: &str = "R$ ";
pub const DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

const THOUSANDS_SEP: char = '.';
const DECIMAL_SEP: char = ',';

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn format_int(value: Option<&Value>) -> String {
    let Some(number) = value.and_then(coerce_int) else {
        return PLACEHOLDER.to_string();
    };
    let grouped = group_digits(&number.unsigned_abs().to_string());
    if number < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_decimal(value: Option<&Value>, places: usize) -> String {
    let Some(number) = value.and_then(coerce_f64).filter(|v| v.is_finite()) else {
        return PLACEHOLDER.to_string();
    };
    let rendered = format!("{:.*}", places, number.abs());
    let (int_part, frac_part) = rendered
        .split_once('.')
        .unwrap_or((rendered.as_str(), ""));

    let mut out = String::with_capacity(rendered.len() + rendered.len() / 3 + 1);
    if number < 0.0 {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if !frac_part.is_empty() {
        out.push(DECIMAL_SEP);
        out.push_str(frac_part);
    }
    out
}

pub fn format_brl(value: Option<&Value>) -> String {
    let amount = format_decimal(value, 2);
    if amount == PLACEHOLDER {
        amount
    } else {
        format!("{CURRENCY_PREFIX}{amount}")
    }
}

/// Renders a timestamp in `tz`; naive inputs are read as UTC.
pub fn format_datetime(value: Option<&Value>, tz: Tz) -> String {
    let Some(value) = value.filter(|v| !is_blank(v)) else {
        return PLACEHOLDER.to_string();
    };
    match value {
        Value::String(raw) => parse_timestamp(raw)
            .map(|ts| ts.with_timezone(&tz).format(DATETIME_FORMAT).to_string())
            .unwrap_or_else(|| raw.clone()),
        other => other.to_string(),
    }
}

pub fn format_text(value: Option<&Value>) -> String {
    match value {
        Some(v) if is_blank(v) => PLACEHOLDER.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// Falsy values: null, false, 0, and empty strings/collections.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn coerce_int(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i128::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(i128::from(u))
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i128)
            }
        }
        Value::Bool(b) => Some(i128::from(*b)),
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(THOUSANDS_SEP);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono_tz::America::Sao_Paulo;
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn integers_group_with_periods() {
        assert_eq!(format_int(Some(&json!(1234567))), "1.234.567");
        assert_eq!(format_int(Some(&json!(999))), "999");
        assert_eq!(format_int(Some(&json!(1000))), "1.000");
        assert_eq!(format_int(Some(&json!(0))), "0");
        assert_eq!(format_int(Some(&json!(-1234))), "-1.234");
        assert_eq!(format_int(Some(&json!(u64::MAX))), "18.446.744.073.709.551.615");
    }

    #[test]
    fn integers_accept_floats_and_numeric_strings() {
        assert_eq!(format_int(Some(&json!(1234.9))), "1.234");
        assert_eq!(format_int(Some(&json!(" 42000 "))), "42.000");
        assert_eq!(format_int(Some(&json!(true))), "1");
    }

    #[test]
    fn integers_reject_non_numeric_input() {
        for value in [json!(null), json!("abc"), json!("12.5"), json!([1]), json!({})] {
            assert_eq!(format_int(Some(&value)), PLACEHOLDER, "input {value}");
        }
        assert_eq!(format_int(None), PLACEHOLDER);
    }

    #[test]
    fn decimals_use_brazilian_separators() {
        assert_eq!(format_decimal(Some(&json!(1234.5)), 2), "1.234,50");
        assert_eq!(format_decimal(Some(&json!(1234567.891)), 2), "1.234.567,89");
        assert_eq!(format_decimal(Some(&json!(0.5)), 2), "0,50");
        assert_eq!(format_decimal(Some(&json!(-9876.5)), 1), "-9.876,5");
        assert_eq!(format_decimal(Some(&json!(1234.4)), 0), "1.234");
        assert_eq!(format_decimal(Some(&json!("87.25")), 2), "87,25");
    }

    #[test]
    fn decimals_treat_null_and_nan_as_missing() {
        assert_eq!(format_decimal(Some(&Value::Null), 2), PLACEHOLDER);
        assert_eq!(format_decimal(Some(&json!("NaN")), 2), PLACEHOLDER);
        assert_eq!(format_decimal(Some(&json!("n/a")), 2), PLACEHOLDER);
        assert_eq!(format_decimal(None, 2), PLACEHOLDER);
    }

    #[test]
    fn currency_prefixes_decimal_output() {
        let value = json!(15234.5);
        assert_eq!(
            format_brl(Some(&value)),
            format!("R$ {}", format_decimal(Some(&value), 2))
        );
        assert_eq!(format_brl(Some(&value)), "R$ 15.234,50");
        assert_eq!(format_brl(Some(&Value::Null)), PLACEHOLDER);
        assert_eq!(format_brl(None), PLACEHOLDER);
    }

    #[test]
    fn datetimes_convert_to_sao_paulo() {
        assert_eq!(
            format_datetime(Some(&json!("2024-01-15T12:00:00Z")), Sao_Paulo),
            "15/01/2024 09:00:00"
        );
        assert_eq!(
            format_datetime(Some(&json!("2024-01-15T12:00:00.123456+00:00")), Sao_Paulo),
            "15/01/2024 09:00:00"
        );
        assert_eq!(
            format_datetime(Some(&json!("2024-01-15 02:30:00+00")), Sao_Paulo),
            "14/01/2024 23:30:00"
        );
    }

    #[test]
    fn naive_datetimes_are_read_as_utc() {
        assert_eq!(
            format_datetime(Some(&json!("2024-06-01T03:00:00")), Sao_Paulo),
            "01/06/2024 00:00:00"
        );
        assert_eq!(
            format_datetime(Some(&json!("2024-06-01")), Sao_Paulo),
            "31/05/2024 21:00:00"
        );
    }

    #[test]
    fn datetimes_fall_back_to_raw_input() {
        assert_eq!(format_datetime(None, Sao_Paulo), PLACEHOLDER);
        assert_eq!(format_datetime(Some(&Value::Null), Sao_Paulo), PLACEHOLDER);
        assert_eq!(format_datetime(Some(&json!("")), Sao_Paulo), PLACEHOLDER);
        assert_eq!(
            format_datetime(Some(&json!("ontem à tarde")), Sao_Paulo),
            "ontem à tarde"
        );
        assert_eq!(format_datetime(Some(&json!(17)), Sao_Paulo), "17");
    }

    #[test]
    fn text_uses_placeholder_for_falsy_values() {
        assert_eq!(format_text(Some(&json!("ATIVA"))), "ATIVA");
        assert_eq!(format_text(Some(&json!(""))), PLACEHOLDER);
        assert_eq!(format_text(Some(&json!(0))), PLACEHOLDER);
        assert_eq!(format_text(Some(&json!(3))), "3");
        assert_eq!(format_text(None), PLACEHOLDER);
    }
}
