//! Shared fixtures for instance lifecycle BDD scenarios.

use rstest::fixture;
use terraform_provider_osc::test_support::RecordingClient;
use terraform_provider_osc::{Catalog, CatalogError, Diagnostics, ResourceState};
use thiserror::Error;

/// Result of the last lifecycle call driven by a scenario.
#[derive(Clone, Debug)]
pub enum LifecycleOutcome {
    Created(Option<ResourceState>),
    Deleted(Option<()>),
}

#[derive(Clone, Debug)]
pub struct LifecycleContext {
    pub catalog: Catalog,
    pub client: RecordingClient,
    pub resource_type: Option<String>,
    pub diagnostics: Diagnostics,
    pub outcome: Option<LifecycleOutcome>,
}

#[derive(Clone, Debug, Error)]
pub enum LifecycleTestError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type LifecycleContextResult = Result<LifecycleContext, LifecycleTestError>;

#[fixture]
pub fn lifecycle_context_result() -> LifecycleContextResult {
    Ok(LifecycleContext {
        catalog: Catalog::builtin()?,
        client: RecordingClient::new(),
        resource_type: None,
        diagnostics: Diagnostics::new(),
        outcome: None,
    })
}

#[fixture]
pub fn lifecycle_context(lifecycle_context_result: LifecycleContextResult) -> LifecycleContext {
    lifecycle_context_result
        .unwrap_or_else(|err| panic!("lifecycle context fixture should initialise: {err}"))
}
