//! HTTP plumbing for the Radius web services.

use std::time::Duration;

use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;

use super::constants::{self, params, EXPORT_FILTERS_MODULE};
use super::metadata::{self, FieldDescriptor, ModuleDescriptor};
use crate::auth::Credentials;
use crate::error::{ApiError, Result};

/// Client for one Radius instance, authenticated as one user.
///
/// The instance's module list is fetched once at connection time and reused
/// for every subsequent module-name resolution; it is never refreshed for
/// the lifetime of the client.
pub struct RadiusClient {
    http: Client,
    credentials: Credentials,
    service_root: String,
    modules: Vec<ModuleDescriptor>,
}

impl RadiusClient {
    /// Connect to a Radius instance: build the HTTP client, derive the
    /// web-service root from the base URL, and fetch the module list.
    pub async fn connect(credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("radius-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        let hostname = Url::parse(&credentials.host)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .ok_or_else(|| {
                ApiError::Config(format!(
                    "base URL <{}> has no hostname; expected e.g. https://myschool.example.com",
                    credentials.host
                ))
            })?;
        let service_root = constants::service_root(&hostname);

        let mut client = Self {
            http,
            credentials,
            service_root,
            modules: Vec::new(),
        };

        info!(
            "Connecting to Radius web services at {} as {}",
            client.service_root, client.credentials.username
        );
        let root = client.service_root.clone();
        let payload = client
            .get_at(
                &root,
                None,
                &[(params::USE_SYSTEM_AND_DISPLAY_LABELS, "true".to_string())],
            )
            .await?;
        client.modules =
            serde_json::from_value(payload).map_err(|e| ApiError::MalformedResponse {
                url: client.service_root.clone(),
                reason: format!("module list: {}", e),
            })?;
        debug!("Fetched {} modules", client.modules.len());

        Ok(client)
    }

    /// Modules available in this instance.
    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    /// Resolve a module identifier (system or display name) to its
    /// canonical system name.
    pub fn resolve_module(&self, module: &str) -> Result<&str> {
        metadata::resolve_module(&self.modules, module)
    }

    /// Endpoint URL for a canonical module name, with an optional trailing
    /// segment.
    pub(crate) fn endpoint(&self, module: &str, append: &str) -> String {
        constants::module_endpoint(&self.service_root, module, append)
    }

    /// Fetch full field metadata for a canonical module name, for request
    /// building. Deliberately not cached: field definitions change more
    /// often than modules do.
    pub(crate) async fn fetch_fields(&self, module: &str) -> Result<Vec<FieldDescriptor>> {
        let url = self.endpoint(module, "fields");
        let payload = self
            .get_at(
                &url,
                Some(module),
                &[(params::INCLUDE_DETAILS, "true".to_string())],
            )
            .await?;
        metadata::parse_field_descriptors(&payload, &url)
    }

    pub(crate) async fn get_at(
        &self,
        url: &str,
        module: Option<&str>,
        parameters: &[(&str, String)],
    ) -> Result<Value> {
        debug!("GET {}", url);
        let response = self
            .request(self.http.get(url), parameters)
            .send()
            .await?;
        extract_payload(response, module).await
    }

    pub(crate) async fn post_at(
        &self,
        url: &str,
        module: Option<&str>,
        body: Option<&Value>,
        parameters: &[(&str, String)],
    ) -> Result<Value> {
        debug!("POST {}", url);
        let mut request = self.request(self.http.post(url), parameters);
        if let Some(body) = body {
            request = request.json(body);
        }
        extract_payload(request.send().await?, module).await
    }

    pub(crate) async fn put_at(
        &self,
        url: &str,
        module: Option<&str>,
        body: &Value,
    ) -> Result<Value> {
        debug!("PUT {}", url);
        let response = self
            .request(self.http.put(url), &[])
            .json(body)
            .send()
            .await?;
        extract_payload(response, module).await
    }

    /// DELETE returns the service's raw confirmation text, unparsed.
    pub(crate) async fn delete_at(&self, url: &str) -> Result<String> {
        debug!("DELETE {}", url);
        let response = self.request(self.http.delete(url), &[]).send().await?;
        Ok(response.text().await?)
    }

    fn request(&self, builder: RequestBuilder, parameters: &[(&str, String)]) -> RequestBuilder {
        let builder = builder.basic_auth(&self.credentials.username, Some(&self.credentials.password));
        if parameters.is_empty() {
            builder
        } else {
            builder.query(parameters)
        }
    }
}

/// Pull the `payload` member out of a service response, or map the response
/// onto the error taxonomy.
///
/// Success bodies carry the result under `payload`. Failure bodies carry
/// `status` and `message`, except the ExportFilters module, which tucks
/// the message under `payload["Error Message"]`.
async fn extract_payload(response: Response, module: Option<&str>) -> Result<Value> {
    let url = response.url().to_string();
    let status_code = response.status();
    let text = response.text().await?;
    let body: Option<Value> = serde_json::from_str(&text).ok();

    let Some(body) = body else {
        if status_code.is_success() {
            return Err(ApiError::MalformedResponse {
                url,
                reason: "response OK, but no JSON returned".to_string(),
            });
        }
        return Err(ApiError::Service {
            status_code: status_code.as_u16(),
            status: "unknown".to_string(),
            message: text.chars().take(200).collect(),
        });
    };

    let api_status = body.get("status").and_then(Value::as_str).unwrap_or("ok");
    if status_code.is_success() && api_status == "ok" {
        return body
            .get("payload")
            .cloned()
            .ok_or_else(|| ApiError::MalformedResponse {
                url,
                reason: "JSON returned, but does not contain expected payload".to_string(),
            });
    }

    let message = if module == Some(EXPORT_FILTERS_MODULE) {
        body.pointer("/payload/Error Message").and_then(Value::as_str)
    } else {
        body.get("message").and_then(Value::as_str)
    };
    match message {
        Some(message) => Err(ApiError::Service {
            status_code: status_code.as_u16(),
            status: api_status.to_string(),
            message: message.to_string(),
        }),
        None => Err(ApiError::MalformedResponse {
            url,
            reason: format!(
                "status not OK <{}> and JSON does not contain expected error payload",
                status_code.as_u16()
            ),
        }),
    }
}
