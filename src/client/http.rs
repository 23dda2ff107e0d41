use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::error::ClientError;
use super::types::{ExecutionPage, ListCriteria};
use super::ExecutionClient;
use crate::config::TrackerConfig;
use crate::snapshot::Snapshot;

const DEFAULT_BASE_URL: &str = "https://os.deeporigin.io/api";

/// `ExecutionClient` over the platform's REST API.
pub struct HttpExecutionClient {
    client: Client,
    base_url: String,
    org_key: String,
    api_token: String,
}

impl HttpExecutionClient {
    pub fn new(org_key: String, api_token: String) -> Result<Self, ClientError> {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), org_key, api_token, Duration::from_secs(30))
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        base_url: String,
        org_key: String,
        api_token: String,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            org_key,
            api_token,
        })
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self, ClientError> {
        Self::with_base_url(
            config.base_url.clone(),
            config.org_key.clone(),
            config.api_token.clone(),
            config.request_timeout(),
        )
    }

    fn executions_url(&self) -> String {
        format!("{}/tools/{}/tools/executions", self.base_url, self.org_key)
    }

    fn execution_url(&self, id: &str) -> String {
        format!("{}/{id}", self.executions_url())
    }

    async fn patch_action(&self, id: &str, action: &str) -> Result<(), ClientError> {
        let url = format!("{}:{action}", self.execution_url(id));
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        check_status(response, id).await?;
        Ok(())
    }
}

/// Map a non-success status onto the error taxonomy; pass successes through.
async fn check_status(response: Response, id: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(id.to_string()),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            ClientError::InvalidState(message)
        }
        StatusCode::TOO_MANY_REQUESTS => ClientError::Network(format!("rate limited: {message}")),
        s if s.is_server_error() => ClientError::Network(format!("status {}: {message}", s.as_u16())),
        s => ClientError::Api {
            status: s.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl ExecutionClient for HttpExecutionClient {
    async fn get_execution(&self, id: &str) -> Result<Snapshot, ClientError> {
        let response = self
            .client
            .get(self.execution_url(id))
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let response = check_status(response, id).await?;
        decode(response).await
    }

    async fn list_executions(
        &self,
        criteria: &ListCriteria,
        page: u32,
        page_size: u32,
    ) -> Result<ExecutionPage, ClientError> {
        let mut query: Vec<(&str, String)> = vec![
            ("page", page.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(filter) = criteria.to_filter() {
            query.push(("filter", filter));
        }
        if let Some(order) = &criteria.order {
            query.push(("order", order.clone()));
        }
        let response = self
            .client
            .get(self.executions_url())
            .bearer_auth(&self.api_token)
            .query(&query)
            .send()
            .await?;
        let response = check_status(response, "").await?;
        decode(response).await
    }

    async fn confirm_execution(&self, id: &str) -> Result<(), ClientError> {
        self.patch_action(id, "confirm").await
    }

    async fn cancel_execution(&self, id: &str) -> Result<(), ClientError> {
        self.patch_action(id, "cancel").await
    }
}
