//! HTTP client for the sheetsync API.

use reqwest::{Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use sheetsync_core::util::{is_http_url, normalize_text_option};
use sheetsync_core::{ChangeRecord, Readiness};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Unexpected API response: {0}")]
    InvalidPayload(String),
}

pub type ApiResult<T> = Result<T, ApiClientError>;

#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    records: Vec<ChangeRecord>,
}

#[derive(Debug, Serialize)]
struct VisibilityRequest {
    hidden: bool,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            client: reqwest::Client::builder().build()?,
        })
    }

    pub async fn poll(&self) -> ApiResult<Readiness> {
        let mut url = self.endpoint(&["poll"])?;
        url.query_pairs_mut()
            .append_pair("action", "check_inactivity");

        let response = check_status(self.client.get(url).send().await?).await?;
        let body = response.text().await?;
        body.parse::<Readiness>()
            .map_err(|_| ApiClientError::InvalidPayload(format!("unknown readiness `{}`", body.trim())))
    }

    pub async fn journal(&self) -> ApiResult<Vec<ChangeRecord>> {
        let url = self.endpoint(&["v1", "journal"])?;
        let response = check_status(self.client.get(url).send().await?).await?;
        Ok(response.json::<RecordsResponse>().await?.records)
    }

    pub async fn drain(&self) -> ApiResult<Vec<ChangeRecord>> {
        let url = self.endpoint(&["v1", "journal", "drain"])?;
        let response = check_status(self.client.post(url).send().await?).await?;
        Ok(response.json::<RecordsResponse>().await?.records)
    }

    pub async fn set_visibility(&self, sheet: &str, hidden: bool) -> ApiResult<()> {
        let url = self.endpoint(&["v1", "sheets", sheet, "visibility"])?;
        check_status(
            self.client
                .post(url)
                .json(&VisibilityRequest { hidden })
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    /// Join path segments onto the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ApiClientError::InvalidConfiguration(format!(
                    "{} cannot be used as a base URL",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn check_status(response: Response) -> ApiResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(ApiClientError::Api(parse_api_error(status, &body)))
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let base = normalize_text_option(Some(raw)).ok_or_else(|| {
        ApiClientError::InvalidConfiguration("API URL must not be empty".to_string())
    })?;
    if !is_http_url(&base) {
        return Err(ApiClientError::InvalidConfiguration(
            "API URL must include http:// or https://".to_string(),
        ));
    }
    Url::parse(base.trim_end_matches('/'))
        .map_err(|error| ApiClientError::InvalidConfiguration(error.to_string()))
}
