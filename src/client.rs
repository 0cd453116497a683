use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::config::Settings;

/// HTTP client shared by the sitemap fetcher and the page extractor.
///
/// Built once per run and dropped when the run ends, which releases the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    sitemap_timeout: Duration,
    page_timeout: Duration,
}

impl HttpClient {
    pub fn new(settings: &Settings) -> reqwest::Result<Self> {
        let inner = Client::builder().user_agent(&settings.user_agent).build()?;
        Ok(HttpClient {
            inner,
            sitemap_timeout: settings.sitemap_timeout(),
            page_timeout: settings.page_timeout(),
        })
    }

    pub async fn fetch_sitemap(&self, url: &str) -> reqwest::Result<String> {
        self.get_text(url, self.sitemap_timeout).await
    }

    pub async fn fetch_page(&self, url: &str) -> reqwest::Result<String> {
        self.get_text(url, self.page_timeout).await
    }

    /// GET `url` and return its body. Non-2xx statuses are errors.
    async fn get_text(&self, url: &str, timeout: Duration) -> reqwest::Result<String> {
        debug!(url, timeout_secs = timeout.as_secs(), "GET");
        self.inner
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}
