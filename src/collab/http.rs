use std::time::Duration;

use async_trait::async_trait;

use crate::collab::{CollabError, ResourceFetcher};

/// Fetches assets over HTTP, resolving relative urls against `base_url`.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Result<Self, CollabError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CollabError::Fetch {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, CollabError> {
        let full = self.resolve(url);
        let fail = |message: String| CollabError::Fetch {
            url: full.clone(),
            message,
        };
        let response = self
            .client
            .get(&full)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(response.status().to_string()));
        }
        let bytes = response.bytes().await.map_err(|e| fail(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_urls_join_base() {
        let fetcher = HttpFetcher::new("https://cdn.example.org/media/").unwrap();
        assert_eq!(
            fetcher.resolve("/audio/gato.mp3"),
            "https://cdn.example.org/media/audio/gato.mp3"
        );
        assert_eq!(
            fetcher.resolve("https://other.example.org/x.mp3"),
            "https://other.example.org/x.mp3"
        );
    }
}
