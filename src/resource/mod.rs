//! Generic instance resource driven by a [`ServiceDefinition`].
//!
//! One [`InstanceResource`] exists per cataloged service. Create obtains a
//! service token, creates the instance, and (for services with port
//! mappings) looks up the first external endpoint. Delete obtains a token and
//! removes the instance by name. Read and update never reach the backend.
//!
//! A failure after the remote create succeeded is not rolled back: the
//! instance stays orphaned on the platform and a warning is logged.

mod plan;

use std::any::type_name;
use std::sync::Arc;

use crate::catalog::{
    EXTERNAL_IP_ATTRIBUTE, EXTERNAL_PORT_ATTRIBUTE, INSTANCE_URL_ATTRIBUTE, NAME_ATTRIBUTE,
    ServiceDefinition,
};
use crate::client::{AccessToken, OrchestrationClient, PortMapping};
use crate::framework::{
    AttrValue, AttributeType, Diagnostics, ProviderData, Resource, ResourceFuture, ResourceState,
    Schema, SchemaAttribute,
};

pub use plan::{PlanError, changed_inputs, created_state, instance_name, request_params};

/// Resource adapter for one cataloged service.
#[derive(Debug)]
pub struct InstanceResource<C> {
    definition: Arc<ServiceDefinition>,
    client: Option<Arc<C>>,
}

impl<C> InstanceResource<C>
where
    C: OrchestrationClient + 'static,
{
    /// Creates an unconfigured resource for `definition`.
    #[must_use]
    pub const fn new(definition: Arc<ServiceDefinition>) -> Self {
        Self {
            definition,
            client: None,
        }
    }

    /// Creates a resource already bound to `client`.
    #[must_use]
    pub const fn with_client(definition: Arc<ServiceDefinition>, client: Arc<C>) -> Self {
        Self {
            definition,
            client: Some(client),
        }
    }

    /// Service definition backing this resource.
    #[must_use]
    pub fn definition(&self) -> &ServiceDefinition {
        &self.definition
    }

    /// Returns `true` once provider data has been received.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn configured_client(&self, diags: &mut Diagnostics) -> Option<&C> {
        let client = self.client.as_deref();
        if client.is_none() {
            diags.add_error(
                "Provider Not Configured",
                format!(
                    "{} cannot reach the platform before the provider is configured",
                    self.definition.resource_type
                ),
            );
        }
        client
    }

    async fn token(&self, client: &C, diags: &mut Diagnostics) -> Option<AccessToken> {
        let service_id = self.definition.service_id.as_str();
        tracing::debug!(service_id, "obtaining service access token");
        match client.service_access_token(service_id).await {
            Ok(token) => Some(token),
            Err(err) => {
                diags.add_error(
                    "Failed to get service access token",
                    format!("service {service_id}: {err}"),
                );
                None
            }
        }
    }

    async fn create_instance(
        &self,
        diags: &mut Diagnostics,
        planned: ResourceState,
    ) -> Option<ResourceState> {
        let client = self.configured_client(diags)?;
        let definition = self.definition.as_ref();
        let service_id = definition.service_id.as_str();

        let params = match request_params(definition, &planned) {
            Ok(params) => params,
            Err(err) => {
                diags.add_error("Invalid Configuration", err.to_string());
                return None;
            }
        };
        let name = match instance_name(&planned) {
            Ok(name) => name.to_owned(),
            Err(err) => {
                diags.add_error("Invalid Configuration", err.to_string());
                return None;
            }
        };

        let token = self.token(client, diags).await?;

        tracing::debug!(service_id, name = %name, "creating instance");
        let record = match client.create_instance(service_id, &token, &params).await {
            Ok(record) => record,
            Err(err) => {
                diags.add_error(
                    "Failed to create instance",
                    format!("{service_id} instance {name}: {err}"),
                );
                return None;
            }
        };

        let ports = if definition.has_ports {
            match client.instance_ports(service_id, &name, &token).await {
                Ok(ports) => ports,
                Err(err) => {
                    tracing::warn!(service_id, name = %name, "instance created but ports lookup failed; instance is orphaned");
                    diags.add_error(
                        "Failed to get ports for instance",
                        format!("{service_id} instance {name}: {err}"),
                    );
                    return None;
                }
            }
        } else {
            Vec::<PortMapping>::new()
        };

        match created_state(definition, &planned, &record, &ports) {
            Ok(state) => {
                tracing::info!(service_id, name = %name, "instance created");
                Some(state)
            }
            Err(err) => {
                tracing::warn!(service_id, name = %name, "instance created but response was malformed; instance is orphaned");
                diags.add_error("Malformed create response", err.to_string());
                None
            }
        }
    }

    fn update_state(
        &self,
        diags: &mut Diagnostics,
        planned: ResourceState,
        prior: ResourceState,
    ) -> Option<ResourceState> {
        let definition = self.definition.as_ref();
        let changed = changed_inputs(definition, &planned, &prior);
        if changed.is_empty() {
            return Some(prior);
        }

        if definition.immutable || changed.iter().any(|attr| attr == NAME_ATTRIBUTE) {
            diags.add_error(
                "In-place update not supported",
                format!(
                    "{} instances cannot be modified; changing {} requires replacing the resource",
                    definition.resource_type,
                    changed.join(", ")
                ),
            );
            return None;
        }

        if let Err(err) = request_params(definition, &planned) {
            diags.add_error("Invalid Configuration", err.to_string());
            return None;
        }

        let mut next = prior;
        for attr in changed {
            let value = planned.get(&attr).cloned().unwrap_or(AttrValue::Null);
            next.insert(attr, value);
        }
        Some(next)
    }

    async fn remove_instance(&self, diags: &mut Diagnostics, state: ResourceState) -> Option<()> {
        let name = match instance_name(&state) {
            Ok(name) => name,
            Err(err) => {
                diags.add_error("Invalid State", err.to_string());
                return None;
            }
        };
        let client = self.configured_client(diags)?;
        let service_id = self.definition.service_id.as_str();

        let token = self.token(client, diags).await?;

        tracing::debug!(service_id, name, "removing instance");
        if let Err(err) = client.remove_instance(service_id, name, &token).await {
            diags.add_error(
                "Failed to remove instance",
                format!("{service_id} instance {name}: {err}"),
            );
            return None;
        }
        tracing::info!(service_id, name, "instance removed");
        Some(())
    }
}

impl<C> Resource for InstanceResource<C>
where
    C: OrchestrationClient + 'static,
{
    fn type_name(&self) -> &str {
        &self.definition.resource_type
    }

    fn schema(&self) -> Schema {
        let definition = self.definition.as_ref();
        let mut attributes = vec![
            SchemaAttribute::required(
                NAME_ATTRIBUTE,
                AttributeType::String,
                "Name of the instance",
            )
            .requires_replace(true),
        ];
        attributes.extend(definition.attributes.iter().map(|attr| {
            let base = if attr.required {
                SchemaAttribute::required(&attr.name, attr.kind, &attr.description)
            } else {
                SchemaAttribute::optional(&attr.name, attr.kind, &attr.description)
            };
            base.sensitive(attr.sensitive)
                .requires_replace(definition.immutable)
        }));
        if definition.exposes_url {
            attributes.push(SchemaAttribute::computed(
                INSTANCE_URL_ATTRIBUTE,
                AttributeType::String,
                "URL of the created instance",
            ));
        }
        if definition.has_ports {
            attributes.push(SchemaAttribute::computed(
                EXTERNAL_IP_ATTRIBUTE,
                AttributeType::String,
                "External IP of the created instance",
            ));
            attributes.push(SchemaAttribute::computed(
                EXTERNAL_PORT_ATTRIBUTE,
                AttributeType::Int32,
                "External port of the created instance",
            ));
        }
        Schema {
            description: definition.description.clone(),
            attributes,
        }
    }

    fn configure(&mut self, diags: &mut Diagnostics, data: Option<ProviderData>) {
        let Some(data) = data else {
            return;
        };
        match data.downcast::<C>() {
            Ok(client) => self.client = Some(client),
            Err(_) => diags.add_error(
                "Unexpected Resource Configure Type",
                format!(
                    "expected provider data of type {}; please report this issue to the provider developers",
                    type_name::<C>()
                ),
            ),
        }
    }

    fn create<'a>(
        &'a self,
        diags: &'a mut Diagnostics,
        planned: ResourceState,
    ) -> ResourceFuture<'a, ResourceState> {
        Box::pin(self.create_instance(diags, planned))
    }

    fn read<'a>(
        &'a self,
        _diags: &'a mut Diagnostics,
        state: ResourceState,
    ) -> ResourceFuture<'a, ResourceState> {
        Box::pin(async move { Some(state) })
    }

    fn update<'a>(
        &'a self,
        diags: &'a mut Diagnostics,
        planned: ResourceState,
        prior: ResourceState,
    ) -> ResourceFuture<'a, ResourceState> {
        Box::pin(async move { self.update_state(diags, planned, prior) })
    }

    fn delete<'a>(
        &'a self,
        diags: &'a mut Diagnostics,
        state: ResourceState,
    ) -> ResourceFuture<'a, ()> {
        Box::pin(self.remove_instance(diags, state))
    }
}
