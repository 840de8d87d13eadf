use async_trait::async_trait;

use crate::collab::{AudioPlayer, CollabError, IntroductionAudio, ResourceFetcher};
use crate::word::Word;

/// Audio backend for headless sessions: every clip "plays" instantly.
#[derive(Debug, Default)]
pub struct SilentAudio;

#[async_trait]
impl AudioPlayer for SilentAudio {
    async fn set_target_word_audio(&self, _word: &Word) -> Result<(), CollabError> {
        Ok(())
    }

    async fn play_feedback(&self, _is_correct: bool, _fallback_url: Option<&str>) {}

    fn create_introduction_audio(&self, url: &str) -> Box<dyn IntroductionAudio> {
        Box::new(SilentClip {
            valid: !url.is_empty(),
        })
    }

    fn pause_all_audio(&self) {}
}

struct SilentClip {
    valid: bool,
}

#[async_trait]
impl IntroductionAudio for SilentClip {
    async fn play_until_end(&mut self) -> Result<(), CollabError> {
        Ok(())
    }

    fn cleanup(&mut self) {
        self.valid = false;
    }

    fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Resolves every url to an empty payload without touching the network.
#[derive(Debug, Default)]
pub struct NoopFetcher;

#[async_trait]
impl ResourceFetcher for NoopFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, CollabError> {
        Ok(Vec::new())
    }
}
