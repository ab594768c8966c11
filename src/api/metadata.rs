//! Module and field metadata models and parsing.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, Result};

/// One entry of the instance's module list, fetched once per session.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDescriptor {
    #[serde(rename = "module name")]
    pub name: String,
    #[serde(rename = "module display name", default)]
    pub display_name: String,
}

/// Field data types reported under `Data Type`. Only `Date` and
/// `Multi-Select` carry special handling in request building; everything
/// else passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Date,
    Dropdown,
    MultiSelect,
    Other(String),
}

impl From<&str> for FieldType {
    fn from(data_type: &str) -> Self {
        match data_type {
            "Text" => Self::Text,
            "Date" => Self::Date,
            "Dropdown" => Self::Dropdown,
            "Multi-Select" => Self::MultiSelect,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Metadata for one field of a module.
///
/// Fields without a display label are unresolvable by name; only the
/// reserved "Entity ID" passthrough reaches them.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub id: String,
    pub display_label: Option<String>,
    pub data_type: FieldType,
    pub possible_values: Option<Vec<String>>,
}

impl FieldDescriptor {
    /// Whether a user-supplied name addresses this field, by internal id or
    /// display label.
    pub fn matches(&self, name: &str) -> bool {
        match &self.display_label {
            Some(label) => self.id == name || label == name,
            None => false,
        }
    }
}

/// Resolve a user-supplied module identifier (system name or display name)
/// to the canonical system name.
pub fn resolve_module<'a>(modules: &'a [ModuleDescriptor], module: &str) -> Result<&'a str> {
    modules
        .iter()
        .find(|m| m.name == module || m.display_name == module)
        .map(|m| m.name.as_str())
        .ok_or_else(|| ApiError::ModuleNotFound(module.to_string()))
}

/// Parse the `{module}/fields?includeDetails=true` payload: a JSON object
/// mapping field id to a details object.
pub fn parse_field_descriptors(payload: &Value, url: &str) -> Result<Vec<FieldDescriptor>> {
    let map = payload
        .as_object()
        .ok_or_else(|| ApiError::MalformedResponse {
            url: url.to_string(),
            reason: "field metadata is not an object".to_string(),
        })?;

    let mut fields = Vec::with_capacity(map.len());
    for (id, details) in map {
        let display_label = details
            .get("Display Label")
            .and_then(Value::as_str)
            .map(str::to_string);
        let data_type = details
            .get("Data Type")
            .and_then(Value::as_str)
            .map(FieldType::from)
            .unwrap_or(FieldType::Other(String::new()));
        let possible_values = details
            .get("Possible Values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(value_key).collect());

        fields.push(FieldDescriptor {
            id: id.clone(),
            display_label,
            data_type,
            possible_values,
        });
    }
    Ok(fields)
}

/// String form of a value for set-membership checks against a field's
/// possible values.
pub(crate) fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_modules() -> Vec<ModuleDescriptor> {
        serde_json::from_value(json!([
            {"module name": "Contacts", "module display name": "Contacts"},
            {"module name": "Registrations", "module display name": "Event Registrations"},
        ]))
        .unwrap()
    }

    #[test]
    fn test_resolve_module_by_name() {
        let modules = sample_modules();
        assert_eq!(resolve_module(&modules, "Registrations").unwrap(), "Registrations");
    }

    #[test]
    fn test_resolve_module_by_display_name() {
        let modules = sample_modules();
        assert_eq!(
            resolve_module(&modules, "Event Registrations").unwrap(),
            "Registrations"
        );
    }

    #[test]
    fn test_resolve_module_unknown() {
        let modules = sample_modules();
        let err = resolve_module(&modules, "Leads").unwrap_err();
        assert!(matches!(err, ApiError::ModuleNotFound(m) if m == "Leads"));
    }

    #[test]
    fn test_parse_field_descriptors() {
        let payload = json!({
            "first_name": {"Display Label": "First Name", "Data Type": "Text"},
            "status_cd": {
                "Display Label": "Status",
                "Data Type": "Dropdown",
                "Possible Values": ["Active", "Inactive"]
            },
            "internal_flag": {"Data Type": "Text"}
        });

        let fields = parse_field_descriptors(&payload, "url").unwrap();
        assert_eq!(fields.len(), 3);

        let status = fields.iter().find(|f| f.id == "status_cd").unwrap();
        assert_eq!(status.data_type, FieldType::Dropdown);
        assert_eq!(
            status.possible_values.as_deref(),
            Some(["Active".to_string(), "Inactive".to_string()].as_slice())
        );
        assert!(status.matches("Status"));
        assert!(status.matches("status_cd"));
        assert!(!status.matches("status"));

        // no display label means no name resolution, even by id
        let flag = fields.iter().find(|f| f.id == "internal_flag").unwrap();
        assert!(!flag.matches("internal_flag"));
    }

    #[test]
    fn test_parse_field_descriptors_not_object() {
        let err = parse_field_descriptors(&json!([1, 2]), "url").unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse { .. }));
    }
}
