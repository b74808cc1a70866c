//! Process exit statuses (BSD sysexits values) and completion-value mapping.

use serde_json::Value;

pub const EX_OK: i32 = 0;
pub const EX_USAGE: i32 = 64;
pub const EX_SOFTWARE: i32 = 70;
pub const EX_CONFIG: i32 = 78;

/// Highest status a process can report.
pub const MAX_STATUS: i32 = 255;

/// Whether a completion value carries "no opinion" about the exit status.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

/// Whether `code` can be reported as a process exit status unchanged.
pub fn is_status(code: i32) -> bool {
    (EX_OK..=MAX_STATUS).contains(&code)
}

/// Exit status carried by a completion value, if it is a status integer.
///
/// Only integers within `0..=255` count; `0` is an explicit success.
pub fn status_from_value(value: &Value) -> Option<i32> {
    value
        .as_i64()
        .filter(|n| (0..=MAX_STATUS as i64).contains(n))
        .map(|n| n as i32)
}
