//! Recording collaborators for unit tests.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::collab::{CollabError, Loader, Renderer};
use crate::session::result::SessionResults;
use crate::session::timers::CancellationToken;
use crate::word::{DisplayMode, Word, WordId};

/// Tracing layer that keeps the level and message of every event.
#[derive(Clone, Default)]
pub struct CapturedEvents(Arc<Mutex<Vec<(Level, String)>>>);

impl CapturedEvents {
    pub fn at(&self, level: Level) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageField::default();
        event.record(&mut message);
        self.0.lock().push((*event.metadata().level(), message.0));
    }
}

#[derive(Default)]
struct MessageField(String);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// Routes this thread's events into a fresh `CapturedEvents` until the guard
/// drops.
pub fn capture_events() -> (CapturedEvents, DefaultGuard) {
    let events = CapturedEvents::default();
    let subscriber = tracing_subscriber::registry().with(events.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (events, guard)
}

/// Resolves every resource load instantly and has no category data.
#[derive(Default)]
pub struct InstantLoader;

#[async_trait]
impl Loader for InstantLoader {
    async fn load_resources_for_word(&self, _word: &Word, _display_mode: DisplayMode) {}

    async fn preload_next_categories(&self, _categories: Vec<String>, _token: CancellationToken) {}

    async fn load_resources_for_category(&self, category: &str) -> Result<Vec<Word>, CollabError> {
        Err(CollabError::Source(format!("no words for {category}")))
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    fail_renders: AtomicBool,
    labels: Mutex<Vec<String>>,
    introductions: Mutex<Vec<(WordId, usize)>>,
    pruned: Mutex<Vec<WordId>>,
    results: Mutex<Vec<SessionResults>>,
}

impl RecordingRenderer {
    pub fn fail_renders(&self, fail: bool) {
        self.fail_renders.store(fail, Ordering::SeqCst);
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().clone()
    }

    pub fn introductions(&self) -> Vec<(WordId, usize)> {
        self.introductions.lock().clone()
    }

    pub fn pruned(&self) -> Vec<WordId> {
        self.pruned.lock().clone()
    }

    pub fn results_shown(&self) -> usize {
        self.results.lock().len()
    }
}

impl Renderer for RecordingRenderer {
    fn render_option(&self, slot: usize, _word: &Word, _display_mode: DisplayMode) -> Result<(), CollabError> {
        if self.fail_renders.load(Ordering::SeqCst) {
            return Err(CollabError::Render(format!("slot {slot} unavailable")));
        }
        Ok(())
    }

    fn render_introduction(&self, word: &Word, repetition: usize) -> Result<(), CollabError> {
        self.introductions.lock().push((word.id, repetition));
        Ok(())
    }

    fn set_category_label(&self, category: &str) {
        self.labels.lock().push(category.to_string());
    }

    fn show_loading(&self) {}

    fn hide_loading(&self) {}

    fn set_repeat_enabled(&self, _enabled: bool) {}

    fn remove_cards_except(&self, word_id: WordId) {
        self.pruned.lock().push(word_id);
    }

    fn clear_cards(&self) {}

    fn show_results(&self, results: &SessionResults) {
        self.results.lock().push(results.clone());
    }
}
