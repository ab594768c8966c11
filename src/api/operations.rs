//! Entity operations: metadata reads, CRUD, and paginated search.

use std::collections::HashMap;

use log::{debug, info};
use serde_json::Value;

use super::client::RadiusClient;
use super::constants::{params, REGISTRATIONS_MODULE};
use super::models::PagedResult;
use super::request::{RequestKind, RequestObject};
use crate::error::{ApiError, Result};

/// Fields the service requires in every Registrations update payload.
/// Omitting them triggers a server-side NullPointerException.
const REGISTRATION_REQUIRED_FIELDS: [&str; 2] = ["Participant", "Iteration Name"];

impl RadiusClient {
    /// Fetch field metadata for `module` and build a validated request
    /// object from label-or-id keyed `fields`.
    ///
    /// With `strict` set, unresolvable names fail with `UnknownField`;
    /// otherwise they are dropped from the request.
    pub async fn create_request_object(
        &self,
        module: &str,
        fields: &HashMap<String, Value>,
        kind: RequestKind,
        return_fields: &[String],
        strict: bool,
    ) -> Result<RequestObject> {
        let module = self.resolve_module(module)?.to_string();
        let metadata = self.fetch_fields(&module).await?;
        RequestObject::build(kind, &metadata, fields, return_fields, strict, &module)
    }

    /// All metadata about a module, as returned by the service.
    pub async fn get_metadata(&self, module: &str) -> Result<Value> {
        let module = self.resolve_module(module)?.to_string();
        let url = self.endpoint(&module, "");
        self.get_at(&url, Some(&module), &[]).await
    }

    /// All fields of a module, with full details when `details` is set.
    pub async fn get_all_fields(&self, module: &str, details: bool) -> Result<Value> {
        let module = self.resolve_module(module)?.to_string();
        let url = self.endpoint(&module, "fields");
        let parameters = if details {
            vec![(params::INCLUDE_DETAILS, "true".to_string())]
        } else {
            Vec::new()
        };
        self.get_at(&url, Some(&module), &parameters).await
    }

    /// Fetch one entity by id. `return_fields` restricts the returned
    /// fields; all fields come back when it is `None`.
    pub async fn get_entity(
        &self,
        module: &str,
        entity_id: &str,
        return_fields: Option<&[&str]>,
    ) -> Result<Value> {
        let module = self.resolve_module(module)?.to_string();
        let url = self.endpoint(&module, entity_id);
        let parameters = match return_fields {
            Some(fields) => vec![(params::RETURN_FIELDS, fields.join(","))],
            None => Vec::new(),
        };
        self.get_at(&url, Some(&module), &parameters).await
    }

    /// Create an entity. Returns the `entity` member of the payload: the
    /// new entity id, plus any requested return fields.
    pub async fn create_entity(&self, module: &str, request: &RequestObject) -> Result<Value> {
        let module = self.resolve_module(module)?.to_string();
        require_create_fields(request)?;

        let url = self.endpoint(&module, "");
        let payload = self
            .post_at(&url, Some(&module), Some(&request.to_body()), &[])
            .await?;
        info!("created entity in module {}", module);
        payload
            .get("entity")
            .cloned()
            .ok_or_else(|| ApiError::MalformedResponse {
                url,
                reason: "create response missing 'entity'".to_string(),
            })
    }

    /// Update an entity by id.
    ///
    /// Registrations updates must always carry the Participant and
    /// Iteration Name fields; when the caller left either out, the current
    /// values are fetched from the entity (one supplementary read) and
    /// merged into the outgoing payload.
    pub async fn update_entity(
        &self,
        module: &str,
        entity_id: &str,
        request: RequestObject,
    ) -> Result<Value> {
        let module = self.resolve_module(module)?.to_string();
        require_create_fields(&request)?;

        let mut request = request;
        if module == REGISTRATIONS_MODULE
            && REGISTRATION_REQUIRED_FIELDS
                .iter()
                .any(|f| !request.contains_field(f))
        {
            debug!(
                "filling in required Registrations fields for update of entity {}",
                entity_id
            );
            let current = self
                .get_entity(
                    REGISTRATIONS_MODULE,
                    entity_id,
                    Some(REGISTRATION_REQUIRED_FIELDS.as_slice()),
                )
                .await?;
            let entity = current
                .get("entity")
                .ok_or_else(|| ApiError::MalformedResponse {
                    url: self.endpoint(&module, entity_id),
                    reason: "entity read missing 'entity'".to_string(),
                })?;
            merge_registration_fields(&mut request, entity);
        }

        let url = self.endpoint(&module, entity_id);
        self.put_at(&url, Some(&module), &request.to_body()).await
    }

    /// Delete an entity by id. Returns the service's raw confirmation text.
    pub async fn delete_entity(&self, module: &str, entity_id: &str) -> Result<String> {
        let module = self.resolve_module(module)?.to_string();
        let url = self.endpoint(&module, entity_id);
        self.delete_at(&url).await
    }

    /// Search a module and aggregate all result pages.
    ///
    /// Pages 2..=total_pages are fetched in ascending order with the first
    /// response's continuation id; a failure on any page aborts the whole
    /// operation.
    pub async fn search_entities(
        &self,
        module: &str,
        request: &RequestObject,
    ) -> Result<Vec<Value>> {
        let module = self.resolve_module(module)?.to_string();
        let url = self.endpoint(&module, "search");
        let body = request.to_body();

        let first = PagedResult::from_payload(
            self.post_at(&url, Some(&module), Some(&body), &[]).await?,
            &url,
        )?;
        if !first.has_more() {
            return Ok(first.entities);
        }

        let total_pages = first.total_pages;
        let query_id = first.query_id(&url)?.to_string();
        let mut entities = first.entities;
        for page in 2..=total_pages {
            let parameters = [
                (params::PAGE, page.to_string()),
                (params::QUERY_ID, query_id.clone()),
            ];
            let next = PagedResult::from_payload(
                self.post_at(&url, Some(&module), Some(&body), &parameters)
                    .await?,
                &url,
            )?;
            entities.extend(next.entities);
        }
        debug!(
            "search on {} returned {} entities across {} pages",
            module,
            entities.len(),
            total_pages
        );
        Ok(entities)
    }
}

fn require_create_fields(request: &RequestObject) -> Result<()> {
    if request.kind.fields_key() != "createFields" {
        return Err(ApiError::InvalidRequest(
            "request object was built for search, not create or update".to_string(),
        ));
    }
    if request.is_empty() {
        return Err(ApiError::InvalidRequest(
            "request object has no createFields".to_string(),
        ));
    }
    Ok(())
}

/// Fill in the required Registrations fields from the current entity,
/// keeping any value the caller supplied.
fn merge_registration_fields(request: &mut RequestObject, entity: &Value) {
    for field in REGISTRATION_REQUIRED_FIELDS {
        if request.contains_field(field) {
            continue;
        }
        if let Some(value) = entity.get(field) {
            request.insert_field(field, value.clone());
        }
    }
}
