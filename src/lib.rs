//! Core library for the Open Source Cloud infrastructure provider.
//!
//! The crate exposes an orchestration client abstraction, an HTTP
//! implementation of it for the Open Source Cloud platform, and a single
//! catalog-driven resource adapter that manages one kind of service instance
//! per catalog entry (create → look up ports → delete).

pub mod catalog;
pub mod client;
pub mod config;
pub mod framework;
pub mod osaas;
pub mod provider;
pub mod resource;
pub mod test_support;

pub use catalog::{AttributeSpec, Catalog, CatalogError, ServiceDefinition};
pub use client::{
    AccessToken, DecodeError, InstanceParams, InstanceRecord, OrchestrationClient, PortMapping,
};
pub use config::{ConfigError, OscConfig};
pub use framework::{
    AttrValue, AttributeType, Diagnostic, Diagnostics, ProviderData, Resource, ResourceState,
    Schema, SchemaAttribute, Severity,
};
pub use osaas::{OsaasClient, OsaasError};
pub use provider::{PROVIDER_TYPE_NAME, Provider, RegisteredResource, registered_resources};
pub use resource::{InstanceResource, PlanError};
