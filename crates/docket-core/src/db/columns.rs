//! Column encoding shared by the repositories.
//!
//! Flags are stored as INTEGER 0/1, sets as JSON arrays in TEXT, calendar
//! dates as `YYYY-MM-DD` TEXT.

use chrono::NaiveDate;
use libsql::{Row, Value};

use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub const fn flag_value(flag: bool) -> i64 {
    if flag {
        1
    } else {
        0
    }
}

pub fn date_value(date: Option<NaiveDate>) -> Value {
    date.map_or(Value::Null, |date| {
        Value::Text(date.format(DATE_FORMAT).to_string())
    })
}

pub fn set_value(values: &[String]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

pub fn opt_text_value(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |value| Value::Text(value.to_string()))
}

pub fn opt_integer_value(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

pub fn opt_real_value(value: Option<f64>) -> Value {
    value
        .filter(|value| value.is_finite())
        .map_or(Value::Null, Value::Real)
}

fn unexpected(idx: i32, expected: &str, value: &Value) -> Error {
    Error::Database(format!(
        "column {idx}: expected {expected}, found {value:?}"
    ))
}

pub fn text(row: &Row, idx: i32) -> Result<String> {
    match row.get_value(idx)? {
        Value::Text(text) => Ok(text),
        Value::Null => Ok(String::new()),
        other => Err(unexpected(idx, "text", &other)),
    }
}

pub fn opt_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Text(text) if !text.is_empty() => Ok(Some(text)),
        Value::Text(_) | Value::Null => Ok(None),
        other => Err(unexpected(idx, "text", &other)),
    }
}

pub fn integer(row: &Row, idx: i32) -> Result<i64> {
    match row.get_value(idx)? {
        Value::Integer(value) => Ok(value),
        other => Err(unexpected(idx, "integer", &other)),
    }
}

pub fn opt_integer(row: &Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Integer(value) => Ok(Some(value)),
        Value::Null => Ok(None),
        other => Err(unexpected(idx, "integer", &other)),
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn opt_real(row: &Row, idx: i32) -> Result<Option<f64>> {
    match row.get_value(idx)? {
        Value::Real(value) => Ok(Some(value)),
        Value::Integer(value) => Ok(Some(value as f64)),
        Value::Null => Ok(None),
        other => Err(unexpected(idx, "real", &other)),
    }
}

pub fn flag(row: &Row, idx: i32) -> Result<bool> {
    Ok(integer(row, idx)? != 0)
}

pub fn date(row: &Row, idx: i32) -> Result<Option<NaiveDate>> {
    Ok(opt_text(row, idx)?.and_then(|raw| NaiveDate::parse_from_str(&raw, DATE_FORMAT).ok()))
}

pub fn set(row: &Row, idx: i32) -> Result<Vec<String>> {
    let raw = text(row, idx)?;
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}
