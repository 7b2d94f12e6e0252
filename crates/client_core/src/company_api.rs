use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Response,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{Record, RecordId},
    error::ApiError,
    protocol::{ApiResponse, BatchDeleteRequest},
};
use tracing::{info, warn};

use crate::{ApiConfig, Collaborator};

const COMPANIES: &str = "companies";
const API_KEY_HEADER: &str = "x-api-key";

/// REST client for the `/companies` resource.
///
/// Non-2xx statuses and unparsable bodies come back as `success: false`
/// envelopes; only transport failures are returned as `Err`.
pub struct CompanyApiClient {
    http: Client,
    config: ApiConfig,
}

impl CompanyApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            let mut value =
                HeaderValue::from_str(api_key).context("API key is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn list_companies(&self) -> Result<ApiResponse<Vec<Record>>> {
        let url = self.config.endpoint(&[COMPANIES])?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("failed to fetch companies")?;
        handle_response(response).await
    }

    pub async fn get_company(&self, id: &RecordId) -> Result<ApiResponse<Record>> {
        let url = self.company_url(id)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch company {id}"))?;
        handle_response(response).await
    }

    pub async fn create_company(&self, payload: &Record) -> Result<ApiResponse<Record>> {
        let url = self.config.endpoint(&[COMPANIES])?;
        let response = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .context("failed to create company")?;
        handle_response(response).await
    }

    pub async fn update_company(
        &self,
        id: &RecordId,
        payload: &Record,
    ) -> Result<ApiResponse<Record>> {
        let url = self.company_url(id)?;
        let response = self
            .http
            .put(url)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("failed to update company {id}"))?;
        handle_response(response).await
    }

    pub async fn delete_company(&self, id: &RecordId) -> Result<ApiResponse<Value>> {
        let url = self.company_url(id)?;
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .with_context(|| format!("failed to delete company {id}"))?;
        handle_response(response).await
    }

    pub async fn delete_companies(&self, ids: &[RecordId]) -> Result<ApiResponse<Value>> {
        let url = self.config.endpoint(&[COMPANIES])?;
        let response = self
            .http
            .delete(url)
            .json(&BatchDeleteRequest { ids: ids.to_vec() })
            .send()
            .await
            .with_context(|| format!("failed to delete {} companies", ids.len()))?;
        handle_response(response).await
    }

    fn company_url(&self, id: &RecordId) -> Result<url::Url> {
        self.config.endpoint(&[COMPANIES, &id.to_string()])
    }
}

#[async_trait]
impl Collaborator for CompanyApiClient {
    async fn create(&self, payload: &Record) -> Result<ApiResponse<Record>> {
        self.create_company(payload).await
    }

    async fn update(&self, id: &RecordId, payload: &Record) -> Result<ApiResponse<Record>> {
        self.update_company(id, payload).await
    }

    async fn remove(&self, id: &RecordId) -> Result<ApiResponse<Value>> {
        self.delete_company(id).await
    }

    fn supports_remove_batch(&self) -> bool {
        self.config.batch_delete
    }

    async fn remove_batch(&self, ids: &[RecordId]) -> Result<ApiResponse<Value>> {
        self.delete_companies(ids).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T>> {
    let status = response.status();
    let url = response.url().clone();
    let body = response
        .text()
        .await
        .with_context(|| format!("failed to read response body from {url}"))?;

    if !status.is_success() {
        let error = ApiError::from_status(status.as_u16(), error_message(status.as_u16(), &body));
        warn!(%url, status = status.as_u16(), code = ?error.code, "company api: request rejected: {}", error.message);
        return Ok(error.into());
    }

    if body.trim().is_empty() {
        info!(%url, "company api: empty response body");
        return Ok(ApiResponse::ok_empty());
    }

    match serde_json::from_str(&body) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            warn!(%url, "company api: invalid JSON response: {err}");
            Ok(ApiResponse::failure("Invalid JSON response from API"))
        }
    }
}

/// Best message for a failed response: the JSON `message`, else the HTML page
/// title, else the bare status.
fn error_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
            if let Some(message) = json.get("message").and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }

    html_title(trimmed).unwrap_or_else(|| format!("API error: {status}"))
}

fn html_title(body: &str) -> Option<String> {
    let start = body.find("<title>")? + "<title>".len();
    let len = body[start..].find("</title>")?;
    let title = body[start..start + len].trim();
    (!title.is_empty()).then(|| title.to_string())
}

#[cfg(test)]
#[path = "tests/company_api_tests.rs"]
mod tests;
