//! Client library for the Radius CRM web services.
//!
//! Provide the username, password and base URL handed out with the web
//! services documentation; [`RadiusClient::connect`] fetches the
//! instance's module list once and every subsequent call resolves modules
//! and fields by system name or display label.
//!
//! ```no_run
//! use radius_api::{Credentials, RadiusClient, RequestKind};
//! use std::collections::HashMap;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), radius_api::ApiError> {
//! let client = RadiusClient::connect(Credentials::new(
//!     "https://myschool.example.com",
//!     "ws_user",
//!     "ws_password",
//! ))
//! .await?;
//!
//! let fields = HashMap::from([("Status".to_string(), "Active".into())]);
//! let request = client
//!     .create_request_object("Contacts", &fields, RequestKind::Search, &[], false)
//!     .await?;
//! let contacts = client.search_entities("Contacts", &request).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod error;

pub use api::{
    ExecutionTask, FieldDescriptor, FieldType, ModuleDescriptor, PagedResult, PollConfig,
    RadiusClient, RequestKind, RequestObject, TaskStatus,
};
pub use auth::Credentials;
pub use error::{ApiError, Result};
