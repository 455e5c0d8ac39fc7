//! HTTP client for the Open Source Cloud orchestration API.
//!
//! Service tokens are minted by the token service using the personal access
//! token; every instance call then goes to the per-service instance API with
//! the service token in the `x-jwt` header.

mod error;
mod types;

use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value;

use crate::client::{
    AccessToken, ClientFuture, InstanceParams, InstanceRecord, OrchestrationClient, PortMapping,
};
use crate::config::OscConfig;
use types::{ServiceTokenRequest, ServiceTokenResponse};

pub use error::OsaasError;

const PAT_HEADER: &str = "x-pat-jwt";
const SERVICE_TOKEN_HEADER: &str = "x-jwt";
const PORTS_SEGMENT: &str = "ports";

/// Maximum number of body characters carried into errors and logs.
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncates a response body and strips control characters.
fn sanitize_for_log(body: &str) -> String {
    let cleaned: String = body
        .chars()
        .filter(|ch| ch.is_ascii_graphic() || *ch == ' ')
        .take(MAX_LOG_BODY_LENGTH)
        .collect();
    let total = body.chars().count();
    if total > MAX_LOG_BODY_LENGTH {
        format!("{cleaned}... [truncated, {} bytes total]", body.len())
    } else {
        cleaned
    }
}

/// Orchestration client backed by the Open Source Cloud REST API.
#[derive(Clone, Debug)]
pub struct OsaasClient {
    http: Client,
    config: OscConfig,
}

impl OsaasClient {
    /// Constructs a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OsaasError::Config`] when the configuration fails validation
    /// or the HTTP client cannot be built.
    pub fn new(config: OscConfig) -> Result<Self, OsaasError> {
        config.validate()?;
        let http = Client::builder()
            .user_agent(concat!("terraform-provider-osc/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| OsaasError::Config(format!("failed to create HTTP client: {err}")))?;
        Ok(Self { http, config })
    }

    /// Configuration the client was built from.
    #[must_use]
    pub const fn config(&self) -> &OscConfig {
        &self.config
    }

    fn instance_url(&self, service_id: &str, segments: &[&str]) -> Result<Url, OsaasError> {
        let base = self.config.api_base_url(service_id);
        let mut url = Url::parse(&base)
            .map_err(|err| OsaasError::Config(format!("invalid instance API URL {base}: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| OsaasError::Config(format!("instance API URL cannot be a base: {base}")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Value, OsaasError> {
        let transport = |err: reqwest::Error| OsaasError::Transport {
            operation: operation.to_owned(),
            message: err.to_string(),
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            let sanitized = sanitize_for_log(&body);
            tracing::error!(operation, status = status.as_u16(), body = %sanitized, "API error");
            return Err(OsaasError::Status {
                operation: operation.to_owned(),
                status: status.as_u16(),
                body: sanitized,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|err| {
            crate::client::DecodeError::MalformedResponse {
                what: operation.to_owned(),
                message: err.to_string(),
            }
            .into()
        })
    }

    async fn fetch_token(&self, service_id: &str) -> Result<AccessToken, OsaasError> {
        let url = self.config.token_url();
        tracing::debug!(service_id, url = %url, "requesting service access token");
        let request = self
            .http
            .post(&url)
            .header(
                PAT_HEADER,
                format!("Bearer {}", self.config.personal_access_token),
            )
            .json(&ServiceTokenRequest { service_id });
        let value = self.send(request, "service access token").await?;
        let response: ServiceTokenResponse = serde_json::from_value(value).map_err(|err| {
            crate::client::DecodeError::MalformedResponse {
                what: String::from("service access token"),
                message: err.to_string(),
            }
        })?;
        Ok(AccessToken::new(response.token))
    }

    async fn post_instance(
        &self,
        service_id: &str,
        token: &AccessToken,
        params: &InstanceParams,
    ) -> Result<InstanceRecord, OsaasError> {
        let url = self.instance_url(service_id, &[service_id])?;
        tracing::debug!(service_id, url = %url, "POST instance");
        let request = self
            .http
            .post(url)
            .header(SERVICE_TOKEN_HEADER, format!("Bearer {}", token.as_str()))
            .json(params);
        let value = self.send(request, "create instance").await?;
        Ok(InstanceRecord::from_value(value)?)
    }

    async fn get_ports(
        &self,
        service_id: &str,
        instance_name: &str,
        token: &AccessToken,
    ) -> Result<Vec<PortMapping>, OsaasError> {
        let url = self.instance_url(service_id, &[PORTS_SEGMENT, instance_name])?;
        tracing::debug!(service_id, instance_name, url = %url, "GET instance ports");
        let request = self
            .http
            .get(url)
            .header(SERVICE_TOKEN_HEADER, format!("Bearer {}", token.as_str()));
        let value = self.send(request, "get instance ports").await?;
        Ok(PortMapping::list_from_value(value)?)
    }

    async fn delete_instance(
        &self,
        service_id: &str,
        instance_name: &str,
        token: &AccessToken,
    ) -> Result<(), OsaasError> {
        let url = self.instance_url(service_id, &[service_id, instance_name])?;
        tracing::debug!(service_id, instance_name, url = %url, "DELETE instance");
        let request = self
            .http
            .delete(url)
            .header(SERVICE_TOKEN_HEADER, format!("Bearer {}", token.as_str()));
        self.send(request, "remove instance").await?;
        Ok(())
    }
}

impl OrchestrationClient for OsaasClient {
    type Error = OsaasError;

    fn service_access_token<'a>(
        &'a self,
        service_id: &'a str,
    ) -> ClientFuture<'a, AccessToken, Self::Error> {
        Box::pin(self.fetch_token(service_id))
    }

    fn create_instance<'a>(
        &'a self,
        service_id: &'a str,
        token: &'a AccessToken,
        params: &'a InstanceParams,
    ) -> ClientFuture<'a, InstanceRecord, Self::Error> {
        Box::pin(self.post_instance(service_id, token, params))
    }

    fn instance_ports<'a>(
        &'a self,
        service_id: &'a str,
        instance_name: &'a str,
        token: &'a AccessToken,
    ) -> ClientFuture<'a, Vec<PortMapping>, Self::Error> {
        Box::pin(self.get_ports(service_id, instance_name, token))
    }

    fn remove_instance<'a>(
        &'a self,
        service_id: &'a str,
        instance_name: &'a str,
        token: &'a AccessToken,
    ) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(self.delete_instance(service_id, instance_name, token))
    }
}
