use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// DNS resolution or TCP connect failed.
    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("fetch failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait MarkdownFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build markdown http client")?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
        })
    }
}

#[async_trait]
impl MarkdownFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|err| FetchError::Failed(format!("{url}: {err}")))?;

        let response = self
            .client
            .get(parsed)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/markdown,text/plain;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|err| classify_send_error(url, err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_owned()));
        }
        if !status.is_success() {
            return Err(FetchError::Failed(format!("GET {url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|err| FetchError::Failed(format!("read body of {url}: {err}")))
    }
}

fn classify_send_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_connect() {
        FetchError::Unreachable(format!("{url}: {err}"))
    } else {
        FetchError::Failed(format!("GET {url}: {err}"))
    }
}
