//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::client::{
    AccessToken, ClientFuture, InstanceParams, InstanceRecord, OrchestrationClient, PortMapping,
};

/// Token handed out by [`RecordingClient`].
pub const RECORDED_TOKEN: &str = "recorded-token";

/// One call observed by [`RecordingClient`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClientCall {
    /// `service_access_token(service_id)`.
    ServiceAccessToken {
        /// Service the token was requested for.
        service_id: String,
    },
    /// `create_instance(service_id, token, params)`.
    CreateInstance {
        /// Service the instance belongs to.
        service_id: String,
        /// Token passed with the call.
        token: String,
        /// Parameters sent to the backend.
        params: InstanceParams,
    },
    /// `instance_ports(service_id, instance_name, token)`.
    InstancePorts {
        /// Service the instance belongs to.
        service_id: String,
        /// Instance looked up.
        instance_name: String,
        /// Token passed with the call.
        token: String,
    },
    /// `remove_instance(service_id, instance_name, token)`.
    RemoveInstance {
        /// Service the instance belongs to.
        service_id: String,
        /// Instance removed.
        instance_name: String,
        /// Token passed with the call.
        token: String,
    },
}

/// Failures [`RecordingClient`] can be scripted to return.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RecordingError {
    /// Token acquisition failed.
    #[error("scripted token failure")]
    Token,
    /// Instance creation failed.
    #[error("scripted create failure")]
    Create,
    /// Ports lookup failed.
    #[error("scripted ports failure")]
    Ports,
    /// Instance removal failed.
    #[error("scripted remove failure")]
    Remove,
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<ClientCall>,
    ports: Vec<PortMapping>,
    url: Option<String>,
    fail_on_token: bool,
    fail_on_create: bool,
    fail_on_ports: bool,
    fail_on_remove: bool,
}

/// Orchestration client double that records every call in order.
///
/// Clones share the same recording, so a test can keep one handle while the
/// resource under test owns another.
#[derive(Clone, Debug, Default)]
pub struct RecordingClient {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingClient {
    /// Creates a client that succeeds with no ports and no URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Sets the mappings returned by the ports lookup.
    pub fn set_ports(&self, ports: Vec<PortMapping>) {
        self.with_state(|state| state.ports = ports);
    }

    /// Sets the URL carried by create responses.
    pub fn set_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.with_state(|state| state.url = Some(url));
    }

    /// Makes token acquisition fail.
    pub fn fail_on_token(&self) {
        self.with_state(|state| state.fail_on_token = true);
    }

    /// Makes instance creation fail.
    pub fn fail_on_create(&self) {
        self.with_state(|state| state.fail_on_create = true);
    }

    /// Makes the ports lookup fail.
    pub fn fail_on_ports(&self) {
        self.with_state(|state| state.fail_on_ports = true);
    }

    /// Makes instance removal fail.
    pub fn fail_on_remove(&self) {
        self.with_state(|state| state.fail_on_remove = true);
    }

    /// Returns a snapshot of all calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ClientCall> {
        self.with_state(|state| state.calls.clone())
    }
}

impl OrchestrationClient for RecordingClient {
    type Error = RecordingError;

    fn service_access_token<'a>(
        &'a self,
        service_id: &'a str,
    ) -> ClientFuture<'a, AccessToken, Self::Error> {
        Box::pin(async move {
            self.with_state(|state| {
                state.calls.push(ClientCall::ServiceAccessToken {
                    service_id: service_id.to_owned(),
                });
                if state.fail_on_token {
                    Err(RecordingError::Token)
                } else {
                    Ok(AccessToken::new(RECORDED_TOKEN))
                }
            })
        })
    }

    fn create_instance<'a>(
        &'a self,
        service_id: &'a str,
        token: &'a AccessToken,
        params: &'a InstanceParams,
    ) -> ClientFuture<'a, InstanceRecord, Self::Error> {
        Box::pin(async move {
            self.with_state(|state| {
                state.calls.push(ClientCall::CreateInstance {
                    service_id: service_id.to_owned(),
                    token: token.as_str().to_owned(),
                    params: params.clone(),
                });
                if state.fail_on_create {
                    return Err(RecordingError::Create);
                }
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                Ok(InstanceRecord {
                    name,
                    url: state.url.clone(),
                    extra: serde_json::Map::new(),
                })
            })
        })
    }

    fn instance_ports<'a>(
        &'a self,
        service_id: &'a str,
        instance_name: &'a str,
        token: &'a AccessToken,
    ) -> ClientFuture<'a, Vec<PortMapping>, Self::Error> {
        Box::pin(async move {
            self.with_state(|state| {
                state.calls.push(ClientCall::InstancePorts {
                    service_id: service_id.to_owned(),
                    instance_name: instance_name.to_owned(),
                    token: token.as_str().to_owned(),
                });
                if state.fail_on_ports {
                    Err(RecordingError::Ports)
                } else {
                    Ok(state.ports.clone())
                }
            })
        })
    }

    fn remove_instance<'a>(
        &'a self,
        service_id: &'a str,
        instance_name: &'a str,
        token: &'a AccessToken,
    ) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.with_state(|state| {
                state.calls.push(ClientCall::RemoveInstance {
                    service_id: service_id.to_owned(),
                    instance_name: instance_name.to_owned(),
                    token: token.as_str().to_owned(),
                });
                if state.fail_on_remove {
                    Err(RecordingError::Remove)
                } else {
                    Ok(())
                }
            })
        })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and cleans up variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }

    /// Removes environment variables while holding the global mutex.
    pub async fn remove_vars(keys: &[&str]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(keys.len());
        for key in keys {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::remove_var(key) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
