use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use reqwest::{StatusCode, Url};
use scraper::Html;
use tokio::time::sleep;
use url::form_urlencoded;

use crate::{
    config::{FetchConfig, SiteConfig},
    schema::Slug,
};

/// Where pages come from.
///
/// Implemented over HTTP by [`NumbersClient`]; the resolver only sees this trait.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    /// The movie page, which carries both the summary and the cast-and-crew tab.
    async fn movie_page(&self, slug: &Slug) -> anyhow::Result<Html>;

    /// Results of the site's search for `term`.
    async fn search_page(&self, term: &str) -> anyhow::Result<Html>;

    /// Script of the international box office iframe, or `None` if it could not be loaded.
    async fn international_chart(&self, slug: &Slug) -> Option<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Server returned {status} for {url}")]
    Status { url: Url, status: StatusCode },
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("Gave up on {url} after {attempts} attempts")]
    Exhausted {
        url: Url,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

pub struct NumbersClient {
    client: reqwest::Client,
    base_url: Url,
    fetch: FetchConfig,
}

impl NumbersClient {
    pub fn new(site: &SiteConfig, fetch: &FetchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&site.user_agent)
            .timeout(fetch.timeout())
            .connection_verbose(true)
            .build()?;
        Ok(Self::with_client(client, site, fetch))
    }

    pub(crate) fn with_client(
        client: reqwest::Client,
        site: &SiteConfig,
        fetch: &FetchConfig,
    ) -> Self {
        Self {
            client,
            base_url: site.base_url.clone(),
            fetch: fetch.clone(),
        }
    }

    pub fn movie_url(&self, slug: &Slug) -> anyhow::Result<Url> {
        self.join(&format!("movie/{slug}"))
    }

    pub fn search_url(&self, term: &str) -> anyhow::Result<Url> {
        let term = form_urlencoded::byte_serialize(term.as_bytes()).collect::<String>();
        self.join(&format!("search?searchterm={term}"))
    }

    pub fn international_url(&self, slug: &Slug) -> anyhow::Result<Url> {
        self.join(&format!(
            "current/cont/graphs/movie/international-iframe/{slug}"
        ))
    }

    fn join(&self, path: &str) -> anyhow::Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid path {path:?} under {}", self.base_url))
    }

    /// GETs `url`, retrying up to `max_retries` times on any failure.
    pub async fn fetch_with_retry(&self, url: Url) -> Result<String, FetchError> {
        let attempts = self.fetch.max_retries.max(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once(url.clone(), None).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("  ! {e} (retry {attempt}/{attempts})");
                    if attempt == attempts {
                        return Err(FetchError::Exhausted {
                            url,
                            attempts,
                            last: Box::new(e),
                        });
                    }
                }
            }
            attempt += 1;
            sleep(self.fetch.retry_delay()).await;
        }
    }

    async fn fetch_once(&self, url: Url, timeout: Option<Duration>) -> Result<String, FetchError> {
        let mut request = self.client.get(url.clone());
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let transport = |source| FetchError::Transport {
            url: url.clone(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        info!("GET {url} → {status}");
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            });
        }
        response.text().await.map_err(transport)
    }
}

impl PageSource for NumbersClient {
    async fn movie_page(&self, slug: &Slug) -> anyhow::Result<Html> {
        let text = self.fetch_with_retry(self.movie_url(slug)?).await?;
        Ok(Html::parse_document(&text))
    }

    async fn search_page(&self, term: &str) -> anyhow::Result<Html> {
        let text = self.fetch_with_retry(self.search_url(term)?).await?;
        Ok(Html::parse_document(&text))
    }

    async fn international_chart(&self, slug: &Slug) -> Option<String> {
        let url = self.international_url(slug).ok()?;
        match self
            .fetch_once(url, Some(self.fetch.international_timeout()))
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("  ! Could not load international data: {e}");
                None
            }
        }
    }
}
