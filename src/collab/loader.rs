use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::collab::{CollabError, Loader, ResourceFetcher, WordSource};
use crate::session::timers::CancellationToken;
use crate::word::{DisplayMode, Word};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceStatus {
    Loaded(usize),
    Failed(String),
}

/// Fetches word lists from a `WordSource` and warms the audio/image assets
/// they reference through a `ResourceFetcher`, caching the outcome per url.
pub struct CachingLoader {
    source: Arc<dyn WordSource>,
    fetcher: Arc<dyn ResourceFetcher>,
    display_mode: DisplayMode,
    chunk_size: usize,
    words: Mutex<HashMap<String, Vec<Word>>>,
    resources: Mutex<HashMap<String, ResourceStatus>>,
}

impl CachingLoader {
    pub fn new(
        source: Arc<dyn WordSource>,
        fetcher: Arc<dyn ResourceFetcher>,
        display_mode: DisplayMode,
        chunk_size: usize,
    ) -> Self {
        Self {
            source,
            fetcher,
            display_mode,
            chunk_size: chunk_size.max(1),
            words: Mutex::new(HashMap::new()),
            resources: Mutex::new(HashMap::new()),
        }
    }

    pub fn resource_status(&self, url: &str) -> Option<ResourceStatus> {
        self.resources.lock().get(url).cloned()
    }

    pub fn cached_words(&self, category: &str) -> Option<Vec<Word>> {
        self.words.lock().get(category).cloned()
    }

    fn urls_for(word: &Word, display_mode: DisplayMode) -> Vec<String> {
        let mut urls: Vec<String> = word.audio_urls().into_iter().map(str::to_string).collect();
        if display_mode.needs_image() {
            if let Some(image) = &word.image {
                urls.push(image.clone());
            }
        }
        urls
    }

    async fn ensure(&self, url: &str) {
        if self.resources.lock().contains_key(url) {
            return;
        }
        let status = match self.fetcher.fetch(url).await {
            Ok(bytes) => ResourceStatus::Loaded(bytes.len()),
            Err(err) => {
                warn!(url, "resource unavailable, continuing without it: {err}");
                ResourceStatus::Failed(err.to_string())
            }
        };
        self.resources.lock().insert(url.to_string(), status);
    }
}

#[async_trait]
impl Loader for CachingLoader {
    async fn load_resources_for_word(&self, word: &Word, display_mode: DisplayMode) {
        for url in Self::urls_for(word, display_mode) {
            self.ensure(&url).await;
        }
    }

    async fn preload_next_categories(&self, categories: Vec<String>, token: CancellationToken) {
        for category in categories {
            let words = match self.cached_words(&category) {
                Some(words) => words,
                None => continue,
            };
            for chunk in words.chunks(self.chunk_size) {
                if token.is_cancelled() {
                    debug!(%category, "preload cancelled");
                    return;
                }
                for word in chunk {
                    self.load_resources_for_word(word, self.display_mode).await;
                }
                tokio::task::yield_now().await;
            }
        }
    }

    async fn load_resources_for_category(&self, category: &str) -> Result<Vec<Word>, CollabError> {
        let words = self.source.fetch_category(category).await?;
        debug!(category, count = words.len(), "loaded category words");
        self.words
            .lock()
            .insert(category.to_string(), words.clone());
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::source::WordSetSource;
    use crate::word::{Category, WordSet};

    struct FlakyFetcher {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResourceFetcher for FlakyFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, CollabError> {
            self.calls.lock().push(url.to_string());
            if url.contains("missing") {
                Err(CollabError::Fetch {
                    url: url.to_string(),
                    message: "404".to_string(),
                })
            } else {
                Ok(vec![0; 8])
            }
        }
    }

    fn word(id: u64, audio: &str, image: &str) -> Word {
        let mut w = Word::new(id, "w");
        w.audio = Some(audio.to_string());
        w.image = Some(image.to_string());
        w
    }

    fn loader_with(words: Vec<Word>) -> (CachingLoader, Arc<FlakyFetcher>) {
        let set = WordSet {
            name: "t".to_string(),
            categories: vec![Category {
                name: "Animals".to_string(),
                words,
            }],
        };
        let fetcher = Arc::new(FlakyFetcher {
            calls: Mutex::new(Vec::new()),
        });
        let loader = CachingLoader::new(
            Arc::new(WordSetSource::new(set)),
            fetcher.clone(),
            DisplayMode::Image,
            2,
        );
        (loader, fetcher)
    }

    #[tokio::test]
    async fn test_failed_resource_does_not_block_word() {
        let (loader, _) = loader_with(Vec::new());
        let w = word(1, "a-missing.mp3", "a.webp");
        loader.load_resources_for_word(&w, DisplayMode::Image).await;
        assert!(matches!(
            loader.resource_status("a-missing.mp3"),
            Some(ResourceStatus::Failed(_))
        ));
        assert_eq!(loader.resource_status("a.webp"), Some(ResourceStatus::Loaded(8)));
    }

    #[tokio::test]
    async fn test_audio_mode_skips_images() {
        let (loader, fetcher) = loader_with(Vec::new());
        loader
            .load_resources_for_word(&word(1, "a.mp3", "a.webp"), DisplayMode::Audio)
            .await;
        assert_eq!(*fetcher.calls.lock(), vec!["a.mp3".to_string()]);
    }

    #[tokio::test]
    async fn test_resources_fetched_once() {
        let (loader, fetcher) = loader_with(Vec::new());
        let w = word(1, "a.mp3", "a.webp");
        loader.load_resources_for_word(&w, DisplayMode::Audio).await;
        loader.load_resources_for_word(&w, DisplayMode::Audio).await;
        assert_eq!(fetcher.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_preload_warms_cached_category() {
        let words = (0..5)
            .map(|i| word(i, &format!("{i}.mp3"), &format!("{i}.webp")))
            .collect();
        let (loader, fetcher) = loader_with(words);
        loader.load_resources_for_category("Animals").await.unwrap();
        loader
            .preload_next_categories(vec!["Animals".to_string()], CancellationToken::new())
            .await;
        assert_eq!(fetcher.calls.lock().len(), 10);
    }

    #[tokio::test]
    async fn test_cancelled_preload_fetches_nothing() {
        let words = (0..5)
            .map(|i| word(i, &format!("{i}.mp3"), &format!("{i}.webp")))
            .collect();
        let (loader, fetcher) = loader_with(words);
        loader.load_resources_for_category("Animals").await.unwrap();
        let token = CancellationToken::new();
        token.cancel();
        loader
            .preload_next_categories(vec!["Animals".to_string()], token)
            .await;
        assert!(fetcher.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_category_load_replaces_cached_list() {
        let (loader, _) = loader_with(vec![word(1, "1.mp3", "1.webp")]);
        loader.load_resources_for_category("Animals").await.unwrap();
        loader.load_resources_for_category("Animals").await.unwrap();
        assert_eq!(loader.cached_words("Animals").unwrap().len(), 1);
    }
}
