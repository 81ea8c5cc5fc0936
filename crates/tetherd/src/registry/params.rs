//! Parameter extraction helpers for tool handlers.
//!
//! Each helper reports problems as [`ToolFailure::invalid_params`] so a
//! handler can use `?` and let the failure flow back to the client.

use serde_json::Value;
use tether_protocol::ParamMap;

use super::ToolFailure;

/// Returns the string stored under `key`.
///
/// # Errors
///
/// Fails when the key is absent or not a string.
pub fn require_str<'a>(params: &'a ParamMap, key: &str) -> Result<&'a str, ToolFailure> {
    optional_str(params, key)?
        .ok_or_else(|| ToolFailure::invalid_params(format!("missing required parameter '{key}'")))
}

/// Returns the string stored under `key`, if present.
///
/// # Errors
///
/// Fails when the key is present but not a string.
pub fn optional_str<'a>(params: &'a ParamMap, key: &str) -> Result<Option<&'a str>, ToolFailure> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.as_str())),
        Some(_) => Err(ToolFailure::invalid_params(format!(
            "parameter '{key}' must be a string"
        ))),
    }
}

/// Returns the number stored under `key`, if present.
///
/// # Errors
///
/// Fails when the key is present but not a number.
pub fn optional_f64(params: &ParamMap, key: &str) -> Result<Option<f64>, ToolFailure> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            ToolFailure::invalid_params(format!("parameter '{key}' must be a number"))
        }),
    }
}

/// Returns the boolean stored under `key`, or `default` when absent.
///
/// # Errors
///
/// Fails when the key is present but not a boolean.
pub fn optional_bool(params: &ParamMap, key: &str, default: bool) -> Result<bool, ToolFailure> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(ToolFailure::invalid_params(format!(
            "parameter '{key}' must be a boolean"
        ))),
    }
}

/// Returns the three-component vector stored under `key`, if present.
///
/// # Errors
///
/// Fails when the key is present but not an array of exactly three numbers.
pub fn optional_vec3(params: &ParamMap, key: &str) -> Result<Option<[f64; 3]>, ToolFailure> {
    let invalid =
        || ToolFailure::invalid_params(format!("parameter '{key}' must be an array of 3 numbers"));
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => match items.as_slice() {
            [x, y, z] => {
                let component = |value: &Value| value.as_f64().ok_or_else(invalid);
                Ok(Some([component(x)?, component(y)?, component(z)?]))
            }
            _ => Err(invalid()),
        },
        Some(_) => Err(invalid()),
    }
}
