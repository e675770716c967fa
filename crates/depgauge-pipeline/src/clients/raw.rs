//! Plain GET retrieval of raw file content (inner manifests).

use depgauge_config::HttpConfig;

use super::http::HttpClient;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RawContentClient {
    http: HttpClient,
}

impl RawContentClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn from_config(http: &HttpConfig) -> Result<Self> {
        Ok(Self::new(HttpClient::new(http)?))
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        self.http.get_text(url).await
    }
}
