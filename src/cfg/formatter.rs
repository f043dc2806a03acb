//! Renders typed values back into the config text conventions.
//!
//! Rendering must be format-exact: the locator re-scans the buffer
//! after every edit, so any whitespace or casing divergence here would
//! corrupt later lookups.

use crate::cfg::errors::PatchError;
use serde_json::Value;

pub const STRUCT_BEGIN: &str = "struct.begin";
pub const STRUCT_END: &str = "struct.end";

/// One nesting level of indentation.
pub const INDENT_SIZE: usize = 3;

pub fn indent(width: usize) -> String {
    " ".repeat(width)
}

/// Render a value as it appears on the right-hand side of `key = `.
///
/// Booleans are lowercase, numbers keep their JSON decimal text, and
/// strings are emitted literally (the format has no quoting). Objects
/// become a `struct.begin` block whose entries sit one indent unit
/// deeper than `base_indent`. Arrays and nulls have no text form.
pub fn format_value(value: &Value, base_indent: usize) -> Result<String, PatchError> {
    match value {
        Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Object(map) => {
            let inner = base_indent + INDENT_SIZE;
            let mut text = String::from(STRUCT_BEGIN);
            for (key, entry) in map {
                text.push('\n');
                text.push_str(&indent(inner));
                text.push_str(key);
                text.push_str(" = ");
                text.push_str(&format_value(entry, inner)?);
            }
            text.push('\n');
            text.push_str(&indent(base_indent));
            text.push_str(STRUCT_END);
            Ok(text)
        }
        Value::Array(_) => Err(PatchError::UnsupportedValue {
            message: "array values are not supported".to_string(),
        }),
        Value::Null => Err(PatchError::UnsupportedValue {
            message: "null has no config text form".to_string(),
        }),
    }
}
