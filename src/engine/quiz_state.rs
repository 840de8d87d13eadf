use std::collections::HashMap;

use rand::Rng;

use crate::session::result::AnswerTally;
use crate::util;
use crate::word::{Word, WordId};

#[derive(Clone, Debug, PartialEq)]
pub struct RepetitionEntry {
    pub word: Word,
    pub reappear_round: u32,
}

/// Quiz-mode scheduler state. Lives for one activation of quiz mode.
#[derive(Clone, Debug, Default)]
pub struct QuizState {
    wrong_indexes: Vec<usize>,
    repetition_queues: HashMap<String, Vec<RepetitionEntry>>,
    results: AnswerTally,
}

impl QuizState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn wrong_indexes(&self) -> &[usize] {
        &self.wrong_indexes
    }

    /// Records a wrongly chosen option slot for this round and returns how
    /// many distinct slots have been missed.
    pub fn push_wrong_index(&mut self, slot: usize) -> usize {
        if !self.wrong_indexes.contains(&slot) {
            self.wrong_indexes.push(slot);
        }
        self.wrong_indexes.len()
    }

    pub fn clear_wrong_indexes(&mut self) {
        self.wrong_indexes.clear();
    }

    pub fn queue(&self, category: &str) -> &[RepetitionEntry] {
        self.repetition_queues
            .get(category)
            .map(|q| q.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_queued(&self, category: &str, id: WordId) -> bool {
        self.queue(category).iter().any(|e| e.word.id == id)
    }

    /// Inserts unless the word is already waiting in this category's queue.
    pub fn enqueue_repetition(&mut self, category: &str, word: &Word, reappear_round: u32) -> bool {
        let queue = self
            .repetition_queues
            .entry(category.to_string())
            .or_default();
        if queue.iter().any(|e| e.word.id == word.id) {
            return false;
        }
        queue.push(RepetitionEntry {
            word: word.clone(),
            reappear_round,
        });
        true
    }

    /// Queues `word` to resurface a random `min..=max` rounds after
    /// `current_round`.
    pub fn schedule_repetition<R: Rng + ?Sized>(
        &mut self,
        category: &str,
        word: &Word,
        current_round: u32,
        (min, max): (u32, u32),
        rng: &mut R,
    ) -> bool {
        if self.is_queued(category, word.id) {
            return false;
        }
        let offset = util::random_int(rng, min, max);
        self.enqueue_repetition(category, word, current_round + offset)
    }

    pub fn has_due_entry(&self, category: &str, round: u32) -> bool {
        self.queue(category).iter().any(|e| e.reappear_round <= round)
    }

    /// Removes and returns the first entry matching `pred`.
    pub fn take_entry<F>(&mut self, category: &str, pred: F) -> Option<RepetitionEntry>
    where
        F: Fn(&RepetitionEntry) -> bool,
    {
        let queue = self.repetition_queues.get_mut(category)?;
        let pos = queue.iter().position(pred)?;
        Some(queue.remove(pos))
    }

    pub fn results(&self) -> &AnswerTally {
        &self.results
    }

    pub fn mark_incorrect(&mut self, id: WordId) {
        self.results.mark_incorrect(id);
    }

    pub fn record_correct(&mut self, id: WordId, turn_had_wrong: bool) -> bool {
        self.results.record_correct(id, turn_had_wrong)
    }
}
