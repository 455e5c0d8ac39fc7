//! BDD step definitions for the instance lifecycle.

use std::sync::Arc;

use rstest_bdd_macros::{given, then, when};
use terraform_provider_osc::test_support::{ClientCall, RECORDED_TOKEN, RecordingClient};
use terraform_provider_osc::{
    AttrValue, Diagnostics, InstanceResource, PortMapping, Resource, ResourceState,
};
use tokio::runtime::Runtime;

use super::test_helpers::{LifecycleContext, LifecycleOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn resource_for(
    context: &LifecycleContext,
) -> Result<InstanceResource<RecordingClient>, StepError> {
    let resource_type = context
        .resource_type
        .as_deref()
        .ok_or_else(|| StepError::Assertion(String::from("no resource type configured")))?;
    let definition = context
        .catalog
        .get(resource_type)
        .cloned()
        .ok_or_else(|| StepError::Assertion(format!("{resource_type} is not cataloged")))?;
    Ok(InstanceResource::with_client(
        definition,
        Arc::new(context.client.clone()),
    ))
}

fn runtime() -> Result<Runtime, StepError> {
    Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))
}

fn created_state(context: &LifecycleContext) -> Result<&ResourceState, StepError> {
    match &context.outcome {
        Some(LifecycleOutcome::Created(Some(state))) => Ok(state),
        other => Err(StepError::Assertion(format!(
            "expected a created state, got {other:?}; diagnostics: {:?}",
            context.diagnostics
        ))),
    }
}

fn expect_attr(
    state: &ResourceState,
    attribute: &str,
    expected: &AttrValue,
) -> Result<(), StepError> {
    match state.get(attribute) {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(StepError::Assertion(format!(
            "expected {attribute} = {expected:?}, got {actual:?}"
        ))),
    }
}

#[given("a configured \"{resource_type}\" resource")]
fn configured_resource(
    mut lifecycle_context: LifecycleContext,
    resource_type: String,
) -> LifecycleContext {
    lifecycle_context.resource_type = Some(resource_type);
    lifecycle_context
}

#[given("the platform maps port \"{port}\" on \"{ip}\"")]
fn platform_maps_port(lifecycle_context: LifecycleContext, port: u16, ip: String) -> LifecycleContext {
    lifecycle_context.client.set_ports(vec![PortMapping {
        external_ip: ip,
        external_port: port,
        internal_port: Some(port),
    }]);
    lifecycle_context
}

#[given("the platform answers with URL \"{url}\"")]
fn platform_answers_with_url(lifecycle_context: LifecycleContext, url: String) -> LifecycleContext {
    lifecycle_context.client.set_url(url);
    lifecycle_context
}

#[given("instance creation fails")]
fn instance_creation_fails(lifecycle_context: LifecycleContext) -> LifecycleContext {
    lifecycle_context.client.fail_on_create();
    lifecycle_context
}

#[given("instance removal fails")]
fn instance_removal_fails(lifecycle_context: LifecycleContext) -> LifecycleContext {
    lifecycle_context.client.fail_on_remove();
    lifecycle_context
}

#[when("I create the instance \"{name}\"")]
fn create_instance(
    lifecycle_context: LifecycleContext,
    name: String,
) -> Result<LifecycleContext, StepError> {
    let resource = resource_for(&lifecycle_context)?;
    let planned = ResourceState::from([(String::from("name"), AttrValue::from(name))]);
    let mut diagnostics = Diagnostics::new();
    let state = runtime()?.block_on(resource.create(&mut diagnostics, planned));

    Ok(LifecycleContext {
        diagnostics,
        outcome: Some(LifecycleOutcome::Created(state)),
        ..lifecycle_context
    })
}

#[when("I delete the instance \"{name}\"")]
fn delete_instance(
    lifecycle_context: LifecycleContext,
    name: String,
) -> Result<LifecycleContext, StepError> {
    let resource = resource_for(&lifecycle_context)?;
    let state = ResourceState::from([(String::from("name"), AttrValue::from(name))]);
    let mut diagnostics = Diagnostics::new();
    let removed = runtime()?.block_on(resource.delete(&mut diagnostics, state));

    Ok(LifecycleContext {
        diagnostics,
        outcome: Some(LifecycleOutcome::Deleted(removed)),
        ..lifecycle_context
    })
}

#[then("the create succeeds")]
fn create_succeeds(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    created_state(lifecycle_context)?;
    if lifecycle_context.diagnostics.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "unexpected diagnostics: {:?}",
            lifecycle_context.diagnostics
        )))
    }
}

#[then("the delete succeeds")]
fn delete_succeeds(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match lifecycle_context.outcome {
        Some(LifecycleOutcome::Deleted(Some(()))) if lifecycle_context.diagnostics.is_empty() => {
            Ok(())
        }
        ref other => Err(StepError::Assertion(format!(
            "expected successful delete, got {other:?}; diagnostics: {:?}",
            lifecycle_context.diagnostics
        ))),
    }
}

#[then("the operation fails with one error diagnostic")]
fn operation_fails(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let returned_value = match lifecycle_context.outcome {
        Some(LifecycleOutcome::Created(ref state)) => state.is_some(),
        Some(LifecycleOutcome::Deleted(removed)) => removed.is_some(),
        None => return Err(StepError::Assertion(String::from("missing outcome"))),
    };
    let errors = lifecycle_context.diagnostics.errors().count();
    if !returned_value && errors == 1 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected one error and no value, got {errors} error(s); value returned: {returned_value}"
        )))
    }
}

#[then("the platform issued a token for \"{service_id}\"")]
fn token_issued(lifecycle_context: &LifecycleContext, service_id: String) -> Result<(), StepError> {
    let expected = ClientCall::ServiceAccessToken { service_id };
    let calls = lifecycle_context.client.calls();
    if calls.first() == Some(&expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected first call {expected:?}, got {calls:?}"
        )))
    }
}

#[then("the platform received a create call with name \"{name}\"")]
fn create_call_received(lifecycle_context: &LifecycleContext, name: String) -> Result<(), StepError> {
    let calls = lifecycle_context.client.calls();
    let params = calls
        .iter()
        .find_map(|call| match call {
            ClientCall::CreateInstance { params, token, .. } if token == RECORDED_TOKEN => {
                Some(params)
            }
            _ => None,
        })
        .ok_or_else(|| StepError::Assertion(format!("no create call in {calls:?}")))?;
    if params.get("name").and_then(serde_json::Value::as_str) == Some(name.as_str()) && params.len() == 1 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected create params {{\"name\": {name:?}}}, got {params:?}"
        )))
    }
}

#[then("the state records external endpoint \"{ip}\" port \"{port}\"")]
fn state_records_endpoint(
    lifecycle_context: &LifecycleContext,
    ip: String,
    port: i64,
) -> Result<(), StepError> {
    let state = created_state(lifecycle_context)?;
    expect_attr(state, "external_ip", &AttrValue::from(ip))?;
    expect_attr(state, "external_port", &AttrValue::from(port))
}

#[then("the state records no external endpoint")]
fn state_records_no_endpoint(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let state = created_state(lifecycle_context)?;
    expect_attr(state, "external_ip", &AttrValue::from(""))?;
    expect_attr(state, "external_port", &AttrValue::from(0_i64))
}

#[then("the state records instance URL \"{url}\"")]
fn state_records_url(lifecycle_context: &LifecycleContext, url: String) -> Result<(), StepError> {
    let state = created_state(lifecycle_context)?;
    expect_attr(state, "instance_url", &AttrValue::from(url))
}

#[then("no ports lookup was made")]
fn no_ports_lookup(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let calls = lifecycle_context.client.calls();
    if calls
        .iter()
        .any(|call| matches!(call, ClientCall::InstancePorts { .. }))
    {
        Err(StepError::Assertion(format!(
            "unexpected ports lookup in {calls:?}"
        )))
    } else {
        Ok(())
    }
}

#[then("no state is recorded")]
fn no_state(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match lifecycle_context.outcome {
        Some(LifecycleOutcome::Created(None)) => Ok(()),
        ref other => Err(StepError::Assertion(format!(
            "expected no state, got {other:?}"
        ))),
    }
}

#[then("the platform removed \"{name}\" from \"{service}\"")]
fn platform_removed(
    lifecycle_context: &LifecycleContext,
    name: String,
    service: String,
) -> Result<(), StepError> {
    let calls = lifecycle_context.client.calls();
    let removed: Vec<_> = calls
        .iter()
        .filter_map(|call| match call {
            ClientCall::RemoveInstance {
                service_id,
                instance_name,
                ..
            } if *service_id == service => Some(instance_name.as_str()),
            _ => None,
        })
        .collect();
    if removed == [name.as_str()] {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected exactly one removal of {name} from {service}, got {calls:?}"
        )))
    }
}
