//! Provider entry point: configuration and resource registration.
//!
//! The set of resource types is built explicitly from the [`Catalog`] every
//! time [`Provider::resources`] is called, so there is no global registration
//! list to populate.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::client::OrchestrationClient;
use crate::config::OscConfig;
use crate::framework::{AttributeType, Diagnostics, ProviderData, Resource, Schema, SchemaAttribute};
use crate::osaas::OsaasClient;
use crate::resource::InstanceResource;

/// Type name prefix of the provider.
pub const PROVIDER_TYPE_NAME: &str = "osc";

/// Constructor for one resource type.
pub type ResourceFactory = Arc<dyn Fn() -> Box<dyn Resource> + Send + Sync>;

/// One entry of the provider's resource list.
#[derive(Clone)]
pub struct RegisteredResource {
    /// Resource type name.
    pub type_name: String,
    /// Builds a fresh, unconfigured resource.
    pub factory: ResourceFactory,
}

impl std::fmt::Debug for RegisteredResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredResource")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Builds the registration list for `catalog` using client type `C`.
#[must_use]
pub fn registered_resources<C>(catalog: &Catalog) -> Vec<RegisteredResource>
where
    C: OrchestrationClient + 'static,
{
    catalog
        .iter()
        .map(|definition| {
            let definition = Arc::clone(definition);
            let type_name = definition.resource_type.clone();
            let factory: ResourceFactory = Arc::new(move || {
                Box::new(InstanceResource::<C>::new(Arc::clone(&definition))) as Box<dyn Resource>
            });
            RegisteredResource { type_name, factory }
        })
        .collect()
}

/// Open Source Cloud provider.
#[derive(Clone, Debug)]
pub struct Provider {
    catalog: Catalog,
}

impl Provider {
    /// Creates a provider exposing one resource per catalog entry.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Provider type name used as the resource type prefix.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        PROVIDER_TYPE_NAME
    }

    /// Catalog the provider was built from.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Schema of the provider configuration block.
    #[must_use]
    pub fn schema(&self) -> Schema {
        Schema {
            description: String::from("Manage Open Source Cloud service instances"),
            attributes: vec![
                SchemaAttribute::optional(
                    "personal_access_token",
                    AttributeType::String,
                    "Personal access token; falls back to OSC_PERSONAL_ACCESS_TOKEN",
                )
                .sensitive(true),
                SchemaAttribute::optional(
                    "environment",
                    AttributeType::String,
                    "Platform environment; defaults to prod",
                ),
            ],
        }
    }

    /// Builds the shared client handed to every resource.
    ///
    /// Returns `None` after recording an error diagnostic when the
    /// configuration is invalid.
    pub fn configure(&self, diags: &mut Diagnostics, config: OscConfig) -> Option<ProviderData> {
        match OsaasClient::new(config) {
            Ok(client) => {
                tracing::debug!(
                    environment = %client.config().environment,
                    resources = self.catalog.len(),
                    "provider configured"
                );
                Some(Arc::new(client) as ProviderData)
            }
            Err(err) => {
                diags.add_error("Unable to configure provider", err.to_string());
                None
            }
        }
    }

    /// Resource types backed by the Open Source Cloud client.
    #[must_use]
    pub fn resources(&self) -> Vec<RegisteredResource> {
        registered_resources::<OsaasClient>(&self.catalog)
    }

    /// Builds an unconfigured resource by type name.
    #[must_use]
    pub fn resource(&self, type_name: &str) -> Option<Box<dyn Resource>> {
        self.resources()
            .into_iter()
            .find(|entry| entry.type_name == type_name)
            .map(|entry| (entry.factory)())
    }
}
