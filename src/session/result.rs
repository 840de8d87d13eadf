use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::word::WordId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionResults {
    pub mode: String,
    pub correct_on_first_try: u32,
    pub incorrect: Vec<WordId>,
    #[serde(default)]
    pub rounds_played: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl SessionResults {
    pub fn empty(mode: &str) -> Self {
        Self {
            mode: mode.to_string(),
            correct_on_first_try: 0,
            incorrect: Vec::new(),
            rounds_played: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn from_tally(
        mode: &str,
        tally: &AnswerTally,
        rounds_played: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            mode: mode.to_string(),
            correct_on_first_try: tally.correct_on_first_try,
            incorrect: tally.incorrect.iter().copied().collect(),
            rounds_played,
            started_at,
            finished_at: None,
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at.get_or_insert_with(Utc::now);
        self
    }

    pub fn accuracy(&self) -> f64 {
        if self.rounds_played == 0 {
            return 100.0;
        }
        (self.correct_on_first_try as f64 / self.rounds_played as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// First-try correctness bookkeeping shared by both modes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnswerTally {
    pub correct_on_first_try: u32,
    pub incorrect: BTreeSet<WordId>,
}

impl AnswerTally {
    pub fn mark_incorrect(&mut self, id: WordId) {
        self.incorrect.insert(id);
    }

    /// Credits a first-try answer only for words never missed this session
    /// and answered without a wrong attempt this turn.
    pub fn record_correct(&mut self, id: WordId, turn_had_wrong: bool) -> bool {
        if turn_had_wrong || self.incorrect.contains(&id) {
            return false;
        }
        self.correct_on_first_try += 1;
        true
    }

    pub fn was_missed(&self, id: WordId) -> bool {
        self.incorrect.contains(&id)
    }
}
