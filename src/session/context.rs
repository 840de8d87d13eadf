use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{info, warn};

use crate::collab::Collaborators;
use crate::config::Config;
use crate::session::state::SessionState;
use crate::word::DisplayMode;

/// Everything one learning session owns. Modes borrow it mutably for the
/// duration of each call, so there is exactly one writer at a time.
pub struct SessionContext {
    pub state: SessionState,
    pub config: Config,
    pub rng: SmallRng,
    pub collab: Collaborators,
}

impl SessionContext {
    pub fn new(config: Config, collab: Collaborators) -> Self {
        Self {
            state: SessionState::new(),
            config,
            rng: SmallRng::from_entropy(),
            collab,
        }
    }

    pub fn with_seed(config: Config, collab: Collaborators, seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            ..Self::new(config, collab)
        }
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.config.display_mode
    }

    /// Loads each category through the loader. Categories that fail or come
    /// back empty are left out of the rotation. Returns how many loaded.
    pub async fn load_categories(&mut self, names: &[String]) -> usize {
        let loader = self.collab.loader.clone();
        let mut loaded = 0;
        for name in names {
            match loader.load_resources_for_category(name).await {
                Ok(words) if !words.is_empty() => {
                    self.state.set_category_words(name, words);
                    loaded += 1;
                }
                Ok(_) => warn!(category = %name, "category has no words, skipping"),
                Err(err) => warn!(category = %name, "category failed to load: {err}"),
            }
        }
        info!(loaded, requested = names.len(), "categories ready");
        loaded
    }

    /// The categories that follow the current one in rotation order.
    pub fn upcoming_categories(&self, count: usize) -> Vec<String> {
        let current = self.state.current_category();
        self.state
            .category_names()
            .iter()
            .filter(|name| Some(name.as_str()) != current)
            .take(count)
            .cloned()
            .collect()
    }

    /// Fire-and-forget warm-up of the next categories, cancelled by `reset`.
    pub fn request_preload(&mut self) {
        let categories = self.upcoming_categories(self.config.preload_categories);
        if categories.is_empty() {
            return;
        }
        let loader = self.collab.loader.clone();
        let token = self.state.token();
        self.state.spawn_tracked(async move {
            loader.preload_next_categories(categories, token).await;
        });
    }
}
