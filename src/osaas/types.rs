//! Wire types for the service token endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ServiceTokenRequest<'a> {
    pub(super) service_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ServiceTokenResponse {
    pub(super) token: String,
}
