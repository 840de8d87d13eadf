//! Interfaces to the I/O and presentation layers the scheduler drives but
//! does not own: resource loading, rendering, audio playback and word data.

pub mod loader;
pub mod null;
pub mod source;

#[cfg(feature = "network")]
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::result::SessionResults;
use crate::session::timers::CancellationToken;
use crate::word::{DisplayMode, RecordingType, Word, WordId};

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("render failed: {0}")]
    Render(String),
    #[error("audio failed: {0}")]
    Audio(String),
    #[error("word source failed: {0}")]
    Source(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait Loader: Send + Sync {
    /// Resolves once the word's audio (and image, when the display mode shows
    /// one) has been fetched or has failed. Failures never propagate.
    async fn load_resources_for_word(&self, word: &Word, display_mode: DisplayMode);

    /// Best-effort warm-up of the given categories. Stops early once `token`
    /// is cancelled.
    async fn preload_next_categories(&self, categories: Vec<String>, token: CancellationToken);

    /// Fetches the words for a category, replacing any cached list for it.
    async fn load_resources_for_category(&self, category: &str) -> Result<Vec<Word>, CollabError>;
}

pub trait Renderer: Send + Sync {
    fn render_option(&self, slot: usize, word: &Word, display_mode: DisplayMode)
    -> Result<(), CollabError>;
    fn render_introduction(&self, word: &Word, repetition: usize) -> Result<(), CollabError>;
    fn set_category_label(&self, category: &str);
    fn show_loading(&self);
    fn hide_loading(&self);
    fn set_repeat_enabled(&self, enabled: bool);
    fn remove_cards_except(&self, word_id: WordId);
    fn clear_cards(&self);
    fn show_results(&self, results: &SessionResults);
}

#[async_trait]
pub trait IntroductionAudio: Send {
    async fn play_until_end(&mut self) -> Result<(), CollabError>;
    fn cleanup(&mut self);
    fn is_valid(&self) -> bool;
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn set_target_word_audio(&self, word: &Word) -> Result<(), CollabError>;

    /// Resolves when the feedback sound has finished.
    async fn play_feedback(&self, is_correct: bool, fallback_url: Option<&str>);

    fn create_introduction_audio(&self, url: &str) -> Box<dyn IntroductionAudio>;

    fn pause_all_audio(&self);

    fn select_best_audio(&self, word: &Word, priorities: &[RecordingType]) -> Option<String> {
        word.best_audio(priorities).map(str::to_string)
    }
}

/// Server-side word retrieval.
#[async_trait]
pub trait WordSource: Send + Sync {
    async fn fetch_category(&self, category: &str) -> Result<Vec<Word>, CollabError>;
}

/// Raw transport for audio and image assets.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, CollabError>;
}

#[derive(Clone)]
pub struct Collaborators {
    pub loader: Arc<dyn Loader>,
    pub renderer: Arc<dyn Renderer>,
    pub audio: Arc<dyn AudioPlayer>,
}
