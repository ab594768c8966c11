//! Radius Web Services API Module
//!
//! Wraps the Radius CRM web services behind a typed client: module
//! discovery, field-metadata-driven request building, entity CRUD,
//! paginated search, and export-filter execution.

pub mod client;
pub mod constants;
pub mod export;
pub mod metadata;
pub mod models;
pub mod operations;
pub mod request;

pub use client::RadiusClient;
pub use export::PollConfig;
pub use metadata::{FieldDescriptor, FieldType, ModuleDescriptor};
pub use models::{ExecutionTask, PagedResult, TaskStatus};
pub use request::{RequestKind, RequestObject};
