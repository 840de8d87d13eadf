use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::Config;
use crate::engine::quiz_state::QuizState;
use crate::session::state::SessionState;
use crate::word::Word;

#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub word: Word,
    pub category: String,
}

/// Picks this round's target, rotating categories round-robin once the current
/// one has used up its dwell budget and has nothing due for repetition.
pub fn select_target_word_and_category<R: Rng + ?Sized>(
    state: &mut SessionState,
    quiz: &mut QuizState,
    config: &Config,
    rng: &mut R,
) -> Option<Target> {
    if state.category_names().is_empty() {
        return None;
    }

    let category = match state.current_category().map(str::to_string) {
        Some(current) if !state.is_first_round() => {
            let round = state.round_count();
            let stay = quiz.has_due_entry(&current, round)
                || state.category_round_count(&current) < config.rounds_per_category;
            if stay {
                current
            } else {
                state.rotate_category(&current);
                let next = state.category_names()[0].clone();
                debug!(from = %current, to = %next, "rotating category");
                next
            }
        }
        _ => state.category_names().choose(rng).cloned()?,
    };

    if let Some(word) = select_target_word(state, quiz, &category, rng) {
        return Some(Target { word, category });
    }
    select_word_from_next_category(state, quiz, rng)
}

/// Chooses a word within `category`, preferring due repetitions, then unused
/// words, then whatever is left. Never returns the word shown last round
/// unless the repetition queue head is the only candidate.
pub fn select_target_word<R: Rng + ?Sized>(
    state: &mut SessionState,
    quiz: &mut QuizState,
    category: &str,
    rng: &mut R,
) -> Option<Word> {
    let round = state.round_count();
    let last = state.last_word_shown_id();

    let word = if let Some(entry) =
        quiz.take_entry(category, |e| e.reappear_round <= round && Some(e.word.id) != last)
    {
        debug!(category, word = entry.word.id, "resurfacing repetition");
        Some(entry.word)
    } else {
        let unused: Vec<&Word> = state
            .words_in(category)
            .iter()
            .filter(|w| !state.is_used(w.id) && Some(w.id) != last)
            .collect();
        match unused.choose(rng) {
            Some(word) => Some((*word).clone()),
            None => fallback_word(state, quiz, category, rng),
        }
    }?;

    state.record_selection(category, &word);
    Some(word)
}

fn fallback_word<R: Rng + ?Sized>(
    state: &SessionState,
    quiz: &mut QuizState,
    category: &str,
    rng: &mut R,
) -> Option<Word> {
    let last = state.last_word_shown_id();
    if let Some(entry) = quiz.take_entry(category, |e| Some(e.word.id) != last) {
        return Some(entry.word);
    }
    let others: Vec<&Word> = state
        .words_in(category)
        .iter()
        .filter(|w| Some(w.id) != last)
        .collect();
    if let Some(word) = others.choose(rng) {
        return Some((*word).clone());
    }
    quiz.take_entry(category, |_| true).map(|e| e.word)
}

/// Scans every category in rotation order and returns the first that can
/// produce a word.
pub fn select_word_from_next_category<R: Rng + ?Sized>(
    state: &mut SessionState,
    quiz: &mut QuizState,
    rng: &mut R,
) -> Option<Target> {
    let names = state.category_names().to_vec();
    for category in names {
        if let Some(word) = select_target_word(state, quiz, &category, rng) {
            return Some(Target { word, category });
        }
    }
    debug!("no category could supply a target word");
    None
}
