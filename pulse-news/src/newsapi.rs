//! NewsAPI client for top headlines

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pulse_core::Article;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::NewsError;
use crate::source::HeadlineSource;
use crate::types::{NewsApiErrorBody, NewsApiResponse};

/// Default NewsAPI base URL
pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

/// Largest page NewsAPI serves for `top-headlines`
pub const HEADLINE_PAGE_SIZE: u32 = 100;

const REQUEST_TIMEOUT_SECS: u64 = 20;

/// NewsAPI client
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl NewsApiClient {
    /// Create a new NewsAPI client against the public endpoint
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (proxies, test servers)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, NewsError> {
        Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| NewsError::InvalidConfig(format!("Invalid base URL: {}", e)))
    }

    /// Fetch top headlines for a locale
    #[instrument(skip(self))]
    pub async fn top_headlines(
        &self,
        country: &str,
        language: &str,
        page_size: u32,
    ) -> Result<NewsApiResponse, NewsError> {
        let mut url = self.endpoint("top-headlines")?;
        url.query_pairs_mut()
            .append_pair("apiKey", &self.api_key)
            .append_pair("country", country)
            .append_pair("language", language)
            .append_pair("pageSize", &page_size.to_string());

        debug!("Requesting top headlines: country={}, language={}", country, language);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NewsError::RequestFailed(e.to_string()))?;

        Self::parse(response).await
    }

    async fn parse(response: Response) -> Result<NewsApiResponse, NewsError> {
        let status = response.status();
        if status == StatusCode::OK {
            return response
                .json::<NewsApiResponse>()
                .await
                .map_err(|e| NewsError::ParseError(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }
}

/// Build an `ApiError` from a non-200 body, using `{code, message}` when it is JSON
fn api_error(status: u16, body: &str) -> NewsError {
    match serde_json::from_str::<NewsApiErrorBody>(body) {
        Ok(parsed) => NewsError::ApiError {
            status,
            code: parsed.code,
            message: parsed
                .message
                .unwrap_or_else(|| "Upstream error".to_string()),
        },
        Err(_) => NewsError::ApiError {
            status,
            code: None,
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl HeadlineSource for NewsApiClient {
    fn name(&self) -> &str {
        "newsapi"
    }

    async fn fetch_headlines(
        &self,
        country: &str,
        language: &str,
    ) -> Result<Vec<Article>, NewsError> {
        let response = self
            .top_headlines(country, language, HEADLINE_PAGE_SIZE)
            .await?;
        let fetched_at = Utc::now();
        let received = response.articles.len();

        let mut articles = Vec::with_capacity(received);
        for record in response.articles {
            let url = record.url.clone();
            match record.into_article(fetched_at) {
                Some(article) => articles.push(article),
                None => warn!("Skipping headline with unparseable publishedAt: {}", url),
            }
        }

        info!(
            "Fetched {} headlines from NewsAPI ({} usable)",
            received,
            articles.len()
        );
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_from_json_body() {
        let err = api_error(
            401,
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
        );
        match err {
            NewsError::ApiError { status, code, message } => {
                assert_eq!(status, 401);
                assert_eq!(code.as_deref(), Some("apiKeyInvalid"));
                assert_eq!(message, "Your API key is invalid.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_from_plain_body() {
        let err = api_error(502, "Bad Gateway");
        assert_eq!(
            err.to_string(),
            "API error (status 502, code none): Bad Gateway"
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = NewsApiClient::with_base_url("k".into(), "http://localhost:9/v2/".into());
        let url = client.endpoint("top-headlines").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9/v2/top-headlines");
    }

    #[tokio::test]
    #[ignore] // Requires NEWS_API_KEY
    async fn test_fetch_live_headlines() {
        let api_key = std::env::var("NEWS_API_KEY").expect("NEWS_API_KEY not set");
        let client = NewsApiClient::new(api_key);

        let articles = client
            .fetch_headlines("us", "en")
            .await
            .expect("Failed to fetch headlines");

        assert!(!articles.is_empty());
    }
}
