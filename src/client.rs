//! Client abstraction for the remote instance orchestration API.
//!
//! Resources only ever talk to the orchestrator through
//! [`OrchestrationClient`], so the HTTP implementation in [`crate::osaas`] and
//! the recording double in [`crate::test_support`] are interchangeable.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Parameter map sent with a create call, keyed by backend parameter name.
pub type InstanceParams = Map<String, Value>;

/// Short-lived credential scoped to a single service identifier.
#[derive(Clone, Eq, PartialEq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw token for use in request headers.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Instance returned by the orchestrator once creation has been accepted.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct InstanceRecord {
    /// Instance name echoed back by the orchestrator.
    pub name: String,
    /// Endpoint assigned to the instance, when the service exposes one.
    #[serde(default)]
    pub url: Option<String>,
    /// Remaining fields of the response, kept for logging and diagnostics.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstanceRecord {
    /// Decodes a loosely-typed create response.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MalformedResponse`] when `name` is missing or
    /// any known field has an unexpected type.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        serde_json::from_value(value).map_err(|err| DecodeError::MalformedResponse {
            what: String::from("instance"),
            message: err.to_string(),
        })
    }
}

/// Externally reachable endpoint assigned to an instance.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Public IP address of the mapping.
    pub external_ip: String,
    /// Public TCP port of the mapping.
    pub external_port: u16,
    /// Container port the mapping forwards to.
    #[serde(default)]
    pub internal_port: Option<u16>,
}

impl PortMapping {
    /// Decodes a ports lookup response into a list of mappings.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MalformedResponse`] when the payload is not an
    /// array of port mappings.
    pub fn list_from_value(value: Value) -> Result<Vec<Self>, DecodeError> {
        serde_json::from_value(value).map_err(|err| DecodeError::MalformedResponse {
            what: String::from("ports"),
            message: err.to_string(),
        })
    }
}

/// Errors raised while decoding orchestrator responses.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DecodeError {
    /// Raised when a response lacks an expected field or has the wrong shape.
    #[error("malformed {what} response: {message}")]
    MalformedResponse {
        /// Kind of response being decoded.
        what: String,
        /// Decoder error message.
        message: String,
    },
}

/// Future returned by client operations.
pub type ClientFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Narrow interface consumed from the orchestration platform.
pub trait OrchestrationClient: Send + Sync {
    /// Client specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Obtains an access token scoped to `service_id`.
    fn service_access_token<'a>(
        &'a self,
        service_id: &'a str,
    ) -> ClientFuture<'a, AccessToken, Self::Error>;

    /// Creates a new instance of `service_id` with the given parameters.
    fn create_instance<'a>(
        &'a self,
        service_id: &'a str,
        token: &'a AccessToken,
        params: &'a InstanceParams,
    ) -> ClientFuture<'a, InstanceRecord, Self::Error>;

    /// Lists the port mappings assigned to an instance.
    fn instance_ports<'a>(
        &'a self,
        service_id: &'a str,
        instance_name: &'a str,
        token: &'a AccessToken,
    ) -> ClientFuture<'a, Vec<PortMapping>, Self::Error>;

    /// Removes an instance by name.
    fn remove_instance<'a>(
        &'a self,
        service_id: &'a str,
        instance_name: &'a str,
        token: &'a AccessToken,
    ) -> ClientFuture<'a, (), Self::Error>;
}
