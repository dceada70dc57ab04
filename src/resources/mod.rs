//! Resource models and per-type HTTP managers.
//!
//! Every concrete resource implements the two serialization capabilities the
//! output layer dispatches on: [`ToJson`] for machine-readable output and
//! [`ToTableRow`] for the human-readable table. Managers issue one HTTP call
//! per operation against a space-scoped path.

pub mod blueprints;
pub mod sandboxes;

use serde_json::Value;

use crate::errors::ClientError;

/// Serialize to a JSON value for `--output=json` rendering.
pub trait ToJson {
    fn to_json(&self) -> Value;
}

/// Serialize to an ordered column -> cell row for table rendering.
pub trait ToTableRow {
    fn table_row(&self) -> Vec<(String, String)>;
}

/// Anything the formatter can render in both modes.
pub trait Renderable: ToJson + ToTableRow {}

impl<T: ToJson + ToTableRow> Renderable for T {}

/// Some server responses nest the object under a `details` key.
/// Compatibility shim for the older response shape; do not extend to new
/// models.
pub(crate) fn unwrap_details(value: &Value) -> &Value {
    value.get("details").unwrap_or(value)
}

/// Extract a required string field, failing with the offending field name.
pub(crate) fn required_str(obj: &Value, field: &str) -> Result<String, ClientError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ClientError::missing_field(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwrap_details_picks_nested_shape_when_present() {
        let wrapped = json!({"details": {"name": "x"}});
        assert_eq!(unwrap_details(&wrapped)["name"], "x");

        let flat = json!({"name": "y"});
        assert_eq!(unwrap_details(&flat)["name"], "y");
    }

    #[test]
    fn required_str_names_the_missing_field() {
        let obj = json!({"other": 1});
        let err = required_str(&obj, "name").unwrap_err();
        assert!(err.to_string().contains("`name`"));
    }
}
