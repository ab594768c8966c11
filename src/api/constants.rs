//! Constants and URL helpers for the Radius web services.

/// Path prefix of the module endpoints on a Radius host.
pub const SERVICE_PATH: &str = "/crm/webservice/modules/";

/// Reserved field identifier, valid in every module without metadata lookup.
pub const ENTITY_ID_FIELD: &str = "Entity ID";

/// Module that owns export filters and their execution tasks. Its error
/// responses carry the message under `payload["Error Message"]` instead of
/// the top-level `message` every other module uses.
pub const EXPORT_FILTERS_MODULE: &str = "ExportFilters";

/// Module whose updates must always carry the Participant and Iteration
/// Name fields. See `RadiusClient::update_entity`.
pub const REGISTRATIONS_MODULE: &str = "Registrations";

/// Query-string parameter names.
pub mod params {
    pub const USE_SYSTEM_AND_DISPLAY_LABELS: &str = "useSystemAndDisplayLabels";
    pub const INCLUDE_DETAILS: &str = "includeDetails";
    pub const RETURN_FIELDS: &str = "returnFields";
    pub const PAGE: &str = "page";
    pub const QUERY_ID: &str = "queryId";
}

/// Build the web-service root URL for a hostname.
pub fn service_root(hostname: &str) -> String {
    format!("https://{}{}", hostname, SERVICE_PATH)
}

/// Build a module endpoint URL with an optional trailing segment.
pub fn module_endpoint(service_root: &str, module: &str, append: &str) -> String {
    format!("{}{}/{}", service_root, module, append)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_root() {
        assert_eq!(
            service_root("myschool.example.com"),
            "https://myschool.example.com/crm/webservice/modules/"
        );
    }

    #[test]
    fn test_module_endpoint() {
        let root = service_root("myschool.example.com");
        assert_eq!(
            module_endpoint(&root, "Contacts", "search"),
            "https://myschool.example.com/crm/webservice/modules/Contacts/search"
        );
        assert_eq!(
            module_endpoint(&root, "Contacts", ""),
            "https://myschool.example.com/crm/webservice/modules/Contacts/"
        );
    }
}
