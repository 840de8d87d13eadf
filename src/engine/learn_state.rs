use std::collections::{HashMap, HashSet, VecDeque};

use rand::Rng;

use crate::util;
use crate::word::WordId;

pub const MIN_CHOICES: usize = 2;

/// Learn-mode scheduler state. Lives for one activation of learn mode.
#[derive(Clone, Debug)]
pub struct LearnState {
    words_to_introduce: VecDeque<WordId>,
    introduced_word_ids: Vec<WordId>,
    word_correct_counts: HashMap<WordId, u32>,
    wrong_answer_queue: VecDeque<WordId>,
    words_answered_since_last_intro: HashSet<WordId>,
    learning_choice_count: usize,
    learning_correct_streak: u32,
}

impl LearnState {
    pub fn new() -> Self {
        Self {
            words_to_introduce: VecDeque::new(),
            introduced_word_ids: Vec::new(),
            word_correct_counts: HashMap::new(),
            wrong_answer_queue: VecDeque::new(),
            words_answered_since_last_intro: HashSet::new(),
            learning_choice_count: MIN_CHOICES,
            learning_correct_streak: 0,
        }
    }

    /// Starts a fresh session over `ids`, shuffled once.
    pub fn seed<R: Rng + ?Sized>(&mut self, ids: Vec<WordId>, rng: &mut R) {
        *self = Self::new();
        let mut ids = ids;
        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(*id));
        util::shuffle(rng, &mut ids);
        self.words_to_introduce = ids.into();
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn words_to_introduce(&self) -> &VecDeque<WordId> {
        &self.words_to_introduce
    }

    pub fn introduced_word_ids(&self) -> &[WordId] {
        &self.introduced_word_ids
    }

    pub fn introduced_count(&self) -> usize {
        self.introduced_word_ids.len()
    }

    pub fn total_words(&self) -> usize {
        self.words_to_introduce.len() + self.introduced_word_ids.len()
    }

    /// Dequeues the next word, appends it to the introduced list and starts a
    /// new answer cycle.
    pub fn introduce_next(&mut self) -> Option<WordId> {
        let id = self.words_to_introduce.pop_front()?;
        self.introduced_word_ids.push(id);
        self.words_answered_since_last_intro.clear();
        Some(id)
    }

    pub fn mark_answered(&mut self, id: WordId) {
        self.words_answered_since_last_intro.insert(id);
    }

    pub fn everyone_answered_this_cycle(&self) -> bool {
        self.introduced_word_ids
            .iter()
            .all(|id| self.words_answered_since_last_intro.contains(id))
    }

    pub fn correct_count(&self, id: WordId) -> u32 {
        self.word_correct_counts.get(&id).copied().unwrap_or(0)
    }

    pub fn record_correct(&mut self, id: WordId) -> u32 {
        let count = self.word_correct_counts.entry(id).or_insert(0);
        *count += 1;
        *count
    }

    pub fn is_mastered(&self, id: WordId, threshold: u32) -> bool {
        self.correct_count(id) >= threshold
    }

    pub fn all_introduced_mastered(&self, threshold: u32) -> bool {
        self.introduced_word_ids
            .iter()
            .all(|&id| self.is_mastered(id, threshold))
    }

    pub fn mastered_count(&self, threshold: u32) -> usize {
        self.introduced_word_ids
            .iter()
            .filter(|&&id| self.is_mastered(id, threshold))
            .count()
    }

    pub fn wrong_answer_queue(&self) -> &VecDeque<WordId> {
        &self.wrong_answer_queue
    }

    pub fn has_pending_wrongs(&self) -> bool {
        !self.wrong_answer_queue.is_empty()
    }

    pub fn enqueue_wrong(&mut self, id: WordId) -> bool {
        if self.wrong_answer_queue.contains(&id) {
            return false;
        }
        self.wrong_answer_queue.push_back(id);
        true
    }

    pub fn remove_wrong(&mut self, id: WordId) {
        self.wrong_answer_queue.retain(|&w| w != id);
    }

    pub fn learning_choice_count(&self) -> usize {
        self.learning_choice_count
    }

    pub fn set_learning_choice_count(&mut self, count: usize) {
        self.learning_choice_count = count;
    }

    pub fn learning_correct_streak(&self) -> u32 {
        self.learning_correct_streak
    }

    pub fn extend_streak(&mut self) -> u32 {
        self.learning_correct_streak += 1;
        self.learning_correct_streak
    }

    pub fn break_streak(&mut self) {
        self.learning_correct_streak = 0;
    }

    /// Side-effect-free completion check: nothing left to introduce, nothing
    /// owed for remediation, and every introduced word mastered.
    pub fn is_finished(&self, threshold: u32) -> bool {
        self.words_to_introduce.is_empty()
            && self.wrong_answer_queue.is_empty()
            && self.all_introduced_mastered(threshold)
    }

    pub fn progress(&self, threshold: u32) -> f64 {
        let total = self.total_words();
        if total == 0 {
            return 0.0;
        }
        self.mastered_count(threshold) as f64 / total as f64
    }
}

impl Default for LearnState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_seed_dedups_and_keeps_members() {
        let mut learn = LearnState::new();
        let mut rng = SmallRng::seed_from_u64(1);
        learn.seed(vec![1, 2, 2, 3], &mut rng);
        let mut queued: Vec<_> = learn.words_to_introduce().iter().copied().collect();
        queued.sort();
        assert_eq!(queued, vec![1, 2, 3]);
    }

    #[test]
    fn test_introduction_clears_answer_cycle() {
        let mut learn = LearnState::new();
        let mut rng = SmallRng::seed_from_u64(1);
        learn.seed(vec![1, 2], &mut rng);
        let first = learn.introduce_next().unwrap();
        learn.mark_answered(first);
        assert!(learn.everyone_answered_this_cycle());
        learn.introduce_next().unwrap();
        assert!(!learn.everyone_answered_this_cycle());
        assert!(learn.introduce_next().is_none());
        assert_eq!(learn.introduced_count(), 2);
    }

    #[test]
    fn test_wrong_queue_dedups_and_keeps_order() {
        let mut learn = LearnState::new();
        assert!(learn.enqueue_wrong(4));
        assert!(learn.enqueue_wrong(2));
        assert!(!learn.enqueue_wrong(4));
        assert_eq!(learn.wrong_answer_queue().iter().copied().collect::<Vec<_>>(), vec![4, 2]);
        learn.remove_wrong(4);
        assert_eq!(learn.wrong_answer_queue().front(), Some(&2));
    }

    #[test]
    fn test_mastery_threshold() {
        let mut learn = LearnState::new();
        let mut rng = SmallRng::seed_from_u64(1);
        learn.seed(vec![7], &mut rng);
        learn.introduce_next();
        learn.record_correct(7);
        learn.record_correct(7);
        assert!(!learn.is_mastered(7, 3));
        assert!(!learn.is_finished(3));
        learn.record_correct(7);
        assert!(learn.is_mastered(7, 3));
        assert!(learn.is_finished(3));
        assert_eq!(learn.progress(3), 1.0);
    }

    #[test]
    fn test_pending_wrong_blocks_finish() {
        let mut learn = LearnState::new();
        let mut rng = SmallRng::seed_from_u64(1);
        learn.seed(vec![7], &mut rng);
        learn.introduce_next();
        for _ in 0..3 {
            learn.record_correct(7);
        }
        learn.enqueue_wrong(7);
        assert!(!learn.is_finished(3));
    }
}
