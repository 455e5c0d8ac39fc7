//! BDD scenarios for the instance lifecycle.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContextResult, lifecycle_context_result};

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Create a valkey instance with an exposed port"
)]
fn scenario_create_with_port(lifecycle_context_result: LifecycleContextResult) {
    drop(lifecycle_context_result);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Create an instance with no port mappings"
)]
fn scenario_create_without_ports(lifecycle_context_result: LifecycleContextResult) {
    drop(lifecycle_context_result);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Surface create failures without looking up ports"
)]
fn scenario_create_failure(lifecycle_context_result: LifecycleContextResult) {
    drop(lifecycle_context_result);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Delete a valkey instance"
)]
fn scenario_delete(lifecycle_context_result: LifecycleContextResult) {
    drop(lifecycle_context_result);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Surface delete failures"
)]
fn scenario_delete_failure(lifecycle_context_result: LifecycleContextResult) {
    drop(lifecycle_context_result);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Create a URL-exposing instance"
)]
fn scenario_create_with_url(lifecycle_context_result: LifecycleContextResult) {
    drop(lifecycle_context_result);
}
