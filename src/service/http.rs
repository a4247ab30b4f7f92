// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    parse_error_detail, GenerateFromPlanRequest, GenerateRequest, GenerationResponse,
    GenerationService, PlanResponse, UpdateRequest,
};
use crate::error::NetworkError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// [`GenerationService`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpGenerationService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGenerationService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|err| {
            NetworkError::RequestFailed { status: None, message: format!("cannot build http client: {err}") }
        })?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R, NetworkError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint);
        tracing::debug!(%url, "posting to generation service");

        let response = self.client.post(&url).json(body).send().await.map_err(|err| {
            NetworkError::RequestFailed {
                status: err.status().map(|status| status.as_u16()),
                message: if err.is_timeout() {
                    "The generation service did not answer in time".to_owned()
                } else {
                    "Could not reach the generation service".to_owned()
                },
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| NetworkError::RequestFailed {
            status: Some(status.as_u16()),
            message: format!("Could not read the service response: {err}"),
        })?;

        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "generation service returned an error");
            return Err(NetworkError::RequestFailed {
                status: Some(status.as_u16()),
                message: parse_error_detail(&text).unwrap_or_default(),
            });
        }

        serde_json::from_str(&text)
            .map_err(|err| NetworkError::InvalidResponseShape { reason: err.to_string() })
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerationResponse, NetworkError> {
        self.post("api/v1/generate", request).await
    }

    async fn plan(&self, request: &GenerateRequest) -> Result<PlanResponse, NetworkError> {
        self.post("api/v1/plan", request).await
    }

    async fn generate_from_plan(
        &self,
        request: &GenerateFromPlanRequest,
    ) -> Result<GenerationResponse, NetworkError> {
        self.post("api/v1/generate-from-plan", request).await
    }

    async fn update(&self, request: &UpdateRequest) -> Result<GenerationResponse, NetworkError> {
        self.post("api/v1/update", request).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::HttpGenerationService;

    #[test]
    fn endpoints_are_joined_below_the_base_path() {
        let service =
            HttpGenerationService::new("http://localhost:8000/brain", Duration::from_secs(1)).expect("client");
        assert_eq!(service.base_url(), "http://localhost:8000/brain/");
        assert_eq!(
            service.endpoint_url("api/v1/generate-from-plan"),
            "http://localhost:8000/brain/api/v1/generate-from-plan"
        );
        assert_eq!(service.endpoint_url("/api/v1/plan"), "http://localhost:8000/brain/api/v1/plan");
    }
}
