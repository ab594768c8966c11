//! Request-object construction: field-name resolution and value validation.
//!
//! The web services key requests by internal field id, while callers mostly
//! know display labels. [`RequestObject::build`] translates a label-or-id
//! keyed map into the wire shape, validating values against the module's
//! field metadata before anything touches the network.

use std::collections::HashMap;

use chrono::NaiveDate;
use log::debug;
use serde_json::{Map, Value};

use super::constants::ENTITY_ID_FIELD;
use super::metadata::{value_key, FieldDescriptor, FieldType};
use crate::error::{ApiError, Result};

/// What kind of wire request a [`RequestObject`] is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Search,
    Create,
    Update,
}

impl RequestKind {
    /// JSON key the fields map is serialized under.
    pub fn fields_key(self) -> &'static str {
        match self {
            Self::Create | Self::Update => "createFields",
            Self::Search => "searchFields",
        }
    }
}

/// A validated request body for search, create and update calls.
#[derive(Debug, Clone)]
pub struct RequestObject {
    pub kind: RequestKind,
    /// Accepted values, keyed by internal field id.
    pub fields: Map<String, Value>,
    /// Resolved return-field ids; omitted from the wire when empty.
    pub return_fields: Vec<String>,
}

impl RequestObject {
    /// Resolve and validate `fields` and `return_fields` against a module's
    /// field metadata.
    ///
    /// In strict mode an unresolvable name fails with `UnknownField`;
    /// otherwise the entry is dropped. The reserved "Entity ID" key is
    /// always accepted as-is.
    pub fn build(
        kind: RequestKind,
        metadata: &[FieldDescriptor],
        fields: &HashMap<String, Value>,
        return_fields: &[String],
        strict: bool,
        module: &str,
    ) -> Result<Self> {
        let mut checked = Map::new();
        for (name, value) in fields {
            if name == ENTITY_ID_FIELD {
                checked.insert(name.clone(), value.clone());
                continue;
            }
            match metadata.iter().find(|d| d.matches(name)) {
                Some(descriptor) => {
                    let value = check_value(descriptor, kind, name, value)?;
                    checked.insert(descriptor.id.clone(), value);
                }
                None if strict => {
                    return Err(ApiError::UnknownField {
                        field: name.clone(),
                        module: module.to_string(),
                    });
                }
                None => {
                    debug!("dropping unresolved field <{}> from {} request", name, module);
                }
            }
        }

        let mut checked_returns = Vec::new();
        for name in return_fields {
            if name == ENTITY_ID_FIELD {
                checked_returns.push(name.clone());
                continue;
            }
            match metadata.iter().find(|d| d.matches(name)) {
                Some(descriptor) => checked_returns.push(descriptor.id.clone()),
                None if strict => {
                    return Err(ApiError::UnknownField {
                        field: name.clone(),
                        module: module.to_string(),
                    });
                }
                None => {
                    debug!(
                        "dropping unresolved return field <{}> from {} request",
                        name, module
                    );
                }
            }
        }

        Ok(Self {
            kind,
            fields: checked,
            return_fields: checked_returns,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Insert a value under a raw field id, bypassing resolution.
    pub fn insert_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Serialize to the wire shape:
    /// `{"createFields"|"searchFields": {...}, "returnFields": [...]}`.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            self.kind.fields_key().to_string(),
            Value::Object(self.fields.clone()),
        );
        if !self.return_fields.is_empty() {
            body.insert(
                "returnFields".to_string(),
                Value::Array(
                    self.return_fields
                        .iter()
                        .map(|f| Value::String(f.clone()))
                        .collect(),
                ),
            );
        }
        Value::Object(body)
    }
}

fn check_value(
    descriptor: &FieldDescriptor,
    kind: RequestKind,
    name: &str,
    value: &Value,
) -> Result<Value> {
    if let Some(possible) = &descriptor.possible_values {
        // multi-select values go to the wire as a list even when a single
        // value was supplied
        let value = if descriptor.data_type == FieldType::MultiSelect && !value.is_array() {
            Value::Array(vec![value.clone()])
        } else {
            value.clone()
        };

        let members: Vec<&Value> = match &value {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };
        for member in members {
            let key = value_key(member);
            if !possible.iter().any(|p| *p == key) {
                return Err(ApiError::InvalidFieldValue {
                    field: name.to_string(),
                    value: key,
                });
            }
        }
        return Ok(value);
    }

    if kind == RequestKind::Search && descriptor.data_type == FieldType::Date {
        // dates display as MM/DD/YYYY but search filters must be ISO
        let raw = value.as_str().ok_or_else(|| ApiError::InvalidFieldValue {
            field: name.to_string(),
            value: value_key(value),
        })?;
        let date =
            NaiveDate::parse_from_str(raw, "%m/%d/%Y").map_err(|_| ApiError::InvalidFieldValue {
                field: name.to_string(),
                value: raw.to_string(),
            })?;
        return Ok(Value::String(date.format("%Y-%m-%d").to_string()));
    }

    Ok(value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_metadata() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor {
                id: "first_name".to_string(),
                display_label: Some("First Name".to_string()),
                data_type: FieldType::Text,
                possible_values: None,
            },
            FieldDescriptor {
                id: "status_cd".to_string(),
                display_label: Some("Status".to_string()),
                data_type: FieldType::Dropdown,
                possible_values: Some(vec!["Active".to_string(), "Inactive".to_string()]),
            },
            FieldDescriptor {
                id: "interests_ms".to_string(),
                display_label: Some("Interests".to_string()),
                data_type: FieldType::MultiSelect,
                possible_values: Some(vec![
                    "Math".to_string(),
                    "Music".to_string(),
                    "History".to_string(),
                ]),
            },
            FieldDescriptor {
                id: "start_date".to_string(),
                display_label: Some("Start Date".to_string()),
                data_type: FieldType::Date,
                possible_values: None,
            },
        ]
    }

    fn fields(entries: &[(&str, Value)]) -> HashMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_resolution_keys_by_internal_id() {
        let metadata = sample_metadata();
        // by display label
        let request = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &fields(&[("First Name", json!("Ada"))]),
            &[],
            true,
            "Contacts",
        )
        .unwrap();
        assert_eq!(request.fields.get("first_name"), Some(&json!("Ada")));

        // by internal id
        let request = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &fields(&[("first_name", json!("Ada"))]),
            &[],
            true,
            "Contacts",
        )
        .unwrap();
        assert_eq!(request.fields.get("first_name"), Some(&json!("Ada")));
    }

    #[test]
    fn test_multi_select_scalar_coerced_to_list() {
        let metadata = sample_metadata();
        let request = RequestObject::build(
            RequestKind::Create,
            &metadata,
            &fields(&[("Interests", json!("Music"))]),
            &[],
            true,
            "Contacts",
        )
        .unwrap();
        assert_eq!(request.fields.get("interests_ms"), Some(&json!(["Music"])));
    }

    #[test]
    fn test_value_outside_possible_values_fails() {
        let metadata = sample_metadata();
        let err = RequestObject::build(
            RequestKind::Create,
            &metadata,
            &fields(&[("Interests", json!(["Music", "Alchemy"]))]),
            &[],
            false,
            "Contacts",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::InvalidFieldValue { field, value } if field == "Interests" && value == "Alchemy"
        ));

        let err = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &fields(&[("Status", json!("Archived"))]),
            &[],
            false,
            "Contacts",
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_dropdown_scalar_stays_scalar() {
        let metadata = sample_metadata();
        let request = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &fields(&[("Status", json!("Active"))]),
            &[],
            true,
            "Contacts",
        )
        .unwrap();
        assert_eq!(request.fields.get("status_cd"), Some(&json!("Active")));
    }

    #[test]
    fn test_search_date_converted_to_iso() {
        let metadata = sample_metadata();
        let request = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &fields(&[("Start Date", json!("03/14/2021"))]),
            &[],
            true,
            "Contacts",
        )
        .unwrap();
        assert_eq!(request.fields.get("start_date"), Some(&json!("2021-03-14")));
    }

    #[test]
    fn test_create_date_left_unmodified() {
        let metadata = sample_metadata();
        let request = RequestObject::build(
            RequestKind::Create,
            &metadata,
            &fields(&[("Start Date", json!("03/14/2021"))]),
            &[],
            true,
            "Contacts",
        )
        .unwrap();
        assert_eq!(request.fields.get("start_date"), Some(&json!("03/14/2021")));
    }

    #[test]
    fn test_search_date_rejects_garbage() {
        let metadata = sample_metadata();
        let err = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &fields(&[("Start Date", json!("2021-03-14"))]),
            &[],
            true,
            "Contacts",
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_entity_id_passthrough() {
        let metadata = sample_metadata();
        let request = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &fields(&[("Entity ID", json!(12345))]),
            &["Entity ID".to_string()],
            true,
            "Contacts",
        )
        .unwrap();
        assert_eq!(request.fields.get("Entity ID"), Some(&json!(12345)));
        assert_eq!(request.return_fields, vec!["Entity ID".to_string()]);
    }

    #[test]
    fn test_strict_unknown_field_fails() {
        let metadata = sample_metadata();
        let err = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &fields(&[("Shoe Size", json!(42))]),
            &[],
            true,
            "Contacts",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::UnknownField { field, module } if field == "Shoe Size" && module == "Contacts"
        ));
    }

    #[test]
    fn test_non_strict_drops_unknown_field() {
        let metadata = sample_metadata();
        let request = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &fields(&[("Shoe Size", json!(42)), ("First Name", json!("Ada"))]),
            &["Shoe Size".to_string(), "First Name".to_string()],
            false,
            "Contacts",
        )
        .unwrap();
        assert_eq!(request.fields.len(), 1);
        assert!(request.contains_field("first_name"));
        assert_eq!(request.return_fields, vec!["first_name".to_string()]);
    }

    #[test]
    fn test_return_fields_resolve_to_ids() {
        let metadata = sample_metadata();
        let request = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &HashMap::new(),
            &["First Name".to_string(), "status_cd".to_string()],
            true,
            "Contacts",
        )
        .unwrap();
        assert_eq!(
            request.return_fields,
            vec!["first_name".to_string(), "status_cd".to_string()]
        );
    }

    #[test]
    fn test_to_body_keys_by_kind() {
        let metadata = sample_metadata();
        let request = RequestObject::build(
            RequestKind::Search,
            &metadata,
            &fields(&[("First Name", json!("Ada"))]),
            &["Entity ID".to_string()],
            true,
            "Contacts",
        )
        .unwrap();
        let body = request.to_body();
        assert_eq!(
            body.pointer("/searchFields/first_name"),
            Some(&json!("Ada"))
        );
        assert_eq!(body.get("returnFields"), Some(&json!(["Entity ID"])));

        let request = RequestObject::build(
            RequestKind::Update,
            &metadata,
            &fields(&[("First Name", json!("Ada"))]),
            &[],
            true,
            "Contacts",
        )
        .unwrap();
        let body = request.to_body();
        assert!(body.get("createFields").is_some());
        assert!(body.get("returnFields").is_none());
    }
}
