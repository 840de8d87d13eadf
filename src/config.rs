use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::word::DisplayMode;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default = "default_rounds_per_category")]
    pub rounds_per_category: u32,
    #[serde(default = "default_initial_quiz_options")]
    pub initial_quiz_options: usize,
    #[serde(default = "default_max_quiz_options")]
    pub max_quiz_options: usize,
    #[serde(default = "default_repetition_min_offset")]
    pub repetition_min_offset: u32,
    #[serde(default = "default_repetition_max_offset")]
    pub repetition_max_offset: u32,
    #[serde(default = "default_preload_categories")]
    pub preload_categories: usize,
    #[serde(default = "default_preload_chunk_size")]
    pub preload_chunk_size: usize,
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: u32,
    #[serde(default = "default_max_introduced_words")]
    pub max_introduced_words: usize,
    #[serde(default = "default_min_learning_choices")]
    pub min_learning_choices: usize,
    #[serde(default = "default_max_learning_choices")]
    pub max_learning_choices: usize,
    #[serde(default = "default_text_mode_choice_cap")]
    pub text_mode_choice_cap: usize,
    #[serde(default = "default_audio_repetitions")]
    pub audio_repetitions: usize,
    #[serde(default = "default_intro_repetition_delay_ms")]
    pub intro_repetition_delay_ms: u64,
    #[serde(default = "default_intro_word_delay_ms")]
    pub intro_word_delay_ms: u64,
}

fn default_rounds_per_category() -> u32 {
    3
}
fn default_initial_quiz_options() -> usize {
    2
}
fn default_max_quiz_options() -> usize {
    6
}
fn default_repetition_min_offset() -> u32 {
    1
}
fn default_repetition_max_offset() -> u32 {
    3
}
fn default_preload_categories() -> usize {
    2
}
fn default_preload_chunk_size() -> usize {
    4
}
fn default_mastery_threshold() -> u32 {
    3
}
fn default_max_introduced_words() -> usize {
    12
}
fn default_min_learning_choices() -> usize {
    2
}
fn default_max_learning_choices() -> usize {
    6
}
fn default_text_mode_choice_cap() -> usize {
    4
}
fn default_audio_repetitions() -> usize {
    3
}
fn default_intro_repetition_delay_ms() -> u64 {
    700
}
fn default_intro_word_delay_ms() -> u64 {
    1200
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::default(),
            rounds_per_category: default_rounds_per_category(),
            initial_quiz_options: default_initial_quiz_options(),
            max_quiz_options: default_max_quiz_options(),
            repetition_min_offset: default_repetition_min_offset(),
            repetition_max_offset: default_repetition_max_offset(),
            preload_categories: default_preload_categories(),
            preload_chunk_size: default_preload_chunk_size(),
            mastery_threshold: default_mastery_threshold(),
            max_introduced_words: default_max_introduced_words(),
            min_learning_choices: default_min_learning_choices(),
            max_learning_choices: default_max_learning_choices(),
            text_mode_choice_cap: default_text_mode_choice_cap(),
            audio_repetitions: default_audio_repetitions(),
            intro_repetition_delay_ms: default_intro_repetition_delay_ms(),
            intro_word_delay_ms: default_intro_word_delay_ms(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.normalize();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexicard")
            .join("config.toml")
    }

    /// Pull hand-edited values back into ranges the schedulers can work with.
    pub fn normalize(&mut self) {
        self.rounds_per_category = self.rounds_per_category.max(1);
        self.max_quiz_options = self.max_quiz_options.max(2);
        self.initial_quiz_options = self.initial_quiz_options.clamp(2, self.max_quiz_options);
        if self.repetition_min_offset == 0 {
            self.repetition_min_offset = 1;
        }
        if self.repetition_max_offset < self.repetition_min_offset {
            self.repetition_max_offset = self.repetition_min_offset;
        }
        self.preload_chunk_size = self.preload_chunk_size.max(1);
        self.mastery_threshold = self.mastery_threshold.max(1);
        self.max_introduced_words = self.max_introduced_words.max(2);
        self.min_learning_choices = self.min_learning_choices.max(2);
        if self.max_learning_choices < self.min_learning_choices {
            self.max_learning_choices = self.min_learning_choices;
        }
        self.text_mode_choice_cap = self.text_mode_choice_cap.max(self.min_learning_choices);
        self.audio_repetitions = self.audio_repetitions.max(1);
    }

    /// Inclusive range of rounds a missed quiz word waits before resurfacing.
    pub fn repetition_offsets(&self) -> (u32, u32) {
        (self.repetition_min_offset, self.repetition_max_offset)
    }

    pub fn intro_repetition_delay(&self) -> Duration {
        Duration::from_millis(self.intro_repetition_delay_ms)
    }

    pub fn intro_word_delay(&self) -> Duration {
        Duration::from_millis(self.intro_word_delay_ms)
    }

    /// Upper bound on answer cards in learn mode for the given display mode.
    pub fn learning_choice_ceiling(&self, display_mode: DisplayMode) -> usize {
        match display_mode {
            DisplayMode::Text => self.max_learning_choices.min(self.text_mode_choice_cap),
            _ => self.max_learning_choices,
        }
    }
}
