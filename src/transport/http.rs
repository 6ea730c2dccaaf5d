// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! `reqwest` implementation of [`AccessBackend`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::Instrument;
use url::Url;

use super::AccessBackend;
use crate::config::constants::endpoints;
use crate::config::SyncConfig;
use crate::errors::{ConfigError, FetchError};
use crate::spans;
use crate::types::access::{AccessCheckResponse, AccessRecord, ErrorResponse};
use crate::types::address::WalletAddress;
use crate::types::mint::{MintRequest, MintResponse, MintSubmission};

/// HTTP client for the backend endpoints
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Creates a backend rooted at `base_url` with a per-request timeout.
    ///
    /// Endpoint paths are joined onto `base_url`, so it should end in `/`.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a backend that reuses an existing client
    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Creates a backend from the API URL and request timeout in `config`
    pub fn from_config(config: &SyncConfig) -> Result<Self, ConfigError> {
        Self::new(config.api_base()?, config.request_timeout)
    }

    /// The base URL endpoints are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::malformed(format!("endpoint `{path}`: {e}")))
    }
}

/// Decodes a 2xx body as `R`, or maps a non-2xx `{ error }` body to a typed error
async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, FetchError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) if body.is_empty() => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            Err(_) => String::from_utf8_lossy(&body).trim().to_string(),
        };
        return Err(FetchError::from_backend_message(status.as_u16(), message));
    }

    serde_json::from_slice(&body)
        .map_err(|e| FetchError::malformed(format!("response body ({status}): {e}")))
}

#[async_trait]
impl AccessBackend for HttpBackend {
    async fn check_access(&self, address: &WalletAddress) -> Result<AccessRecord, FetchError> {
        let mut url = self.endpoint(endpoints::ACCESS_CHECK)?;
        url.query_pairs_mut()
            .append_pair("address", &address.to_lower_hex());

        async {
            let response = self.client.get(url).send().await?;
            let body: AccessCheckResponse = decode(response).await?;
            AccessRecord::try_from(body)
        }
        .instrument(spans::backend_call(endpoints::ACCESS_CHECK, address))
        .await
    }

    async fn mint(&self, address: &WalletAddress) -> Result<MintSubmission, FetchError> {
        let url = self.endpoint(endpoints::MINT)?;
        let request = MintRequest {
            address: address.to_lower_hex(),
        };

        async {
            let response = self.client.post(url).json(&request).send().await?;
            let body: MintResponse = decode(response).await?;
            MintSubmission::try_from(body)
        }
        .instrument(spans::backend_call(endpoints::MINT, address))
        .await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
