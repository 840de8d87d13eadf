use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::config::Config;
use crate::engine::learn_state::LearnState;
use crate::session::state::SessionState;
use crate::util;
use crate::word::{DisplayMode, Word, WordId};

const BOOTSTRAP_WORDS: usize = 2;

/// Streak thresholds mapped to answer-card counts, highest first.
const STREAK_CHOICES: &[(u32, usize)] = &[(13, 6), (10, 5), (6, 4), (3, 3)];

#[derive(Clone, Debug, PartialEq)]
pub enum LearnItem {
    Introduce(Vec<Word>),
    Practice(Word),
}

impl LearnItem {
    pub fn is_introduction(&self) -> bool {
        matches!(self, LearnItem::Introduce(_))
    }
}

/// Next learn-mode item: an introduction while the learner is ready for a new
/// word, otherwise a practice word with wrong answers served first. `None`
/// once every word is introduced, mastered and nothing is owed.
pub fn select_learning_mode_word<R: Rng + ?Sized>(
    learn: &mut LearnState,
    state: &mut SessionState,
    words: &HashMap<WordId, Word>,
    config: &Config,
    rng: &mut R,
) -> Option<LearnItem> {
    if learn.introduced_count() < BOOTSTRAP_WORDS {
        if let Some(item) = introduce(learn, words) {
            return Some(item);
        }
    }

    let has_pending_wrongs = learn.has_pending_wrongs();
    let everyone_answered = learn.everyone_answered_this_cycle();
    let nothing_left = learn.words_to_introduce().is_empty();
    let all_completed = learn.all_introduced_mastered(config.mastery_threshold);

    if nothing_left && !has_pending_wrongs && all_completed {
        debug!(introduced = learn.introduced_count(), "learn session complete");
        return None;
    }

    if !has_pending_wrongs
        && everyone_answered
        && !nothing_left
        && learn.introduced_count() < config.max_introduced_words
    {
        if let Some(item) = introduce(learn, words) {
            return Some(item);
        }
    }

    let id = pick_practice_id(learn, state.last_word_shown_id(), rng)?;
    let word = words.get(&id)?.clone();
    learn.mark_answered(id);
    state.set_last_word_shown(Some(id));
    Some(LearnItem::Practice(word))
}

fn introduce(learn: &mut LearnState, words: &HashMap<WordId, Word>) -> Option<LearnItem> {
    while let Some(id) = learn.introduce_next() {
        match words.get(&id) {
            Some(word) => {
                debug!(word = id, introduced = learn.introduced_count(), "introducing word");
                return Some(LearnItem::Introduce(vec![word.clone()]));
            }
            None => warn!(word = id, "queued word has no data, skipping"),
        }
    }
    None
}

fn pick_practice_id<R: Rng + ?Sized>(
    learn: &LearnState,
    last: Option<WordId>,
    rng: &mut R,
) -> Option<WordId> {
    let introduced = learn.introduced_word_ids();
    let others: Vec<WordId> = introduced
        .iter()
        .copied()
        .filter(|&id| Some(id) != last)
        .collect();

    if let Some(&head) = learn.wrong_answer_queue().front() {
        if let Some(&wrong) = learn
            .wrong_answer_queue()
            .iter()
            .find(|&&id| Some(id) != last)
        {
            return Some(wrong);
        }
        return others.choose(rng).copied().or(Some(head));
    }

    others
        .choose(rng)
        .copied()
        .or_else(|| introduced.first().copied())
}

pub fn choice_count_for_streak(streak: u32) -> usize {
    STREAK_CHOICES
        .iter()
        .find(|&&(threshold, _)| streak >= threshold)
        .map(|&(_, choices)| choices)
        .unwrap_or(2)
}

/// Caps `count` by the display ceiling and the number of introduced words,
/// never dropping below the configured minimum.
pub fn clamp_choice_count(
    count: usize,
    introduced: usize,
    config: &Config,
    display_mode: DisplayMode,
) -> usize {
    count
        .min(config.learning_choice_ceiling(display_mode))
        .min(introduced)
        .max(config.min_learning_choices)
}

/// Updates mastery, remediation and the adaptive choice count after an answer.
pub fn record_answer_result(
    learn: &mut LearnState,
    id: WordId,
    is_correct: bool,
    turn_had_wrong: bool,
    config: &Config,
    display_mode: DisplayMode,
) {
    let target = if is_correct {
        learn.record_correct(id);
        if !turn_had_wrong {
            learn.remove_wrong(id);
        }
        let streak = learn.extend_streak();
        choice_count_for_streak(streak).min(config.max_learning_choices)
    } else {
        learn.enqueue_wrong(id);
        learn.break_streak();
        learn
            .learning_choice_count()
            .saturating_sub(1)
            .max(config.min_learning_choices)
    };
    let count = clamp_choice_count(target, learn.introduced_count(), config, display_mode);
    learn.set_learning_choice_count(count);
}

/// The target plus distractors drawn from other introduced words, shuffled.
pub fn fill_learning_options<R: Rng + ?Sized>(
    learn: &LearnState,
    target: &Word,
    words: &HashMap<WordId, Word>,
    rng: &mut R,
) -> Vec<Word> {
    let mut pool: Vec<&Word> = learn
        .introduced_word_ids()
        .iter()
        .filter(|&&id| id != target.id)
        .filter_map(|id| words.get(id))
        .collect();
    util::shuffle(rng, &mut pool);

    let needed = learn.learning_choice_count().saturating_sub(1);
    let mut options: Vec<Word> = pool.into_iter().take(needed).cloned().collect();
    options.push(target.clone());
    util::shuffle(rng, &mut options);
    options
}
