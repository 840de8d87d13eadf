use std::collections::HashSet;

use rand::Rng;

use crate::config::Config;
use crate::engine::quiz_state::QuizState;
use crate::session::state::SessionState;
use crate::util;
use crate::word::Word;

const MIN_OPTIONS: usize = 2;

fn max_options(state: &SessionState, category: &str, config: &Config) -> usize {
    config
        .max_quiz_options
        .min(state.words_in(category).len())
        .max(MIN_OPTIONS)
}

/// The category's stored option count, bounded to `[2, max]`.
pub fn stored_option_count(state: &SessionState, category: &str, config: &Config) -> usize {
    let max = max_options(state, category, config);
    state
        .option_count(category)
        .unwrap_or(config.initial_quiz_options)
        .clamp(MIN_OPTIONS, max)
}

/// Adapts the option count for `category` to the round just played: one fewer
/// card after any miss, one more after a clean round (except the very first).
/// Clears the round's wrong indexes and persists the new count.
pub fn calculate_number_of_options(
    state: &mut SessionState,
    quiz: &mut QuizState,
    category: &str,
    config: &Config,
) -> usize {
    let max = max_options(state, category, config);
    let mut count = stored_option_count(state, category, config);

    if !quiz.wrong_indexes().is_empty() {
        count = count.saturating_sub(1);
    } else if !state.is_first_round() {
        count += 1;
    }
    quiz.clear_wrong_indexes();

    let count = count.clamp(MIN_OPTIONS, max);
    state.set_option_count(category, count);
    count
}

/// The target plus `count - 1` distractors, shuffled. Distractors come from
/// the target's category first and never repeat the target's label.
pub fn fill_quiz_options<R: Rng + ?Sized>(
    state: &SessionState,
    target: &Word,
    category: &str,
    count: usize,
    rng: &mut R,
) -> Vec<Word> {
    let needed = count.saturating_sub(1);
    let mut taken: HashSet<u64> = HashSet::from([target.id]);
    let mut labels: HashSet<&str> = HashSet::from([target.label()]);
    let mut options = Vec::with_capacity(count);

    let mut pools: Vec<Vec<&Word>> = vec![state.words_in(category).iter().collect()];
    pools.push(
        state
            .category_names()
            .iter()
            .filter(|name| name.as_str() != category)
            .flat_map(|name| state.words_in(name).iter())
            .collect(),
    );

    for mut pool in pools {
        util::shuffle(rng, &mut pool);
        for word in pool {
            if options.len() >= needed {
                break;
            }
            if taken.contains(&word.id) || labels.contains(word.label()) {
                continue;
            }
            taken.insert(word.id);
            labels.insert(word.label());
            options.push(word.clone());
        }
    }

    options.push(target.clone());
    util::shuffle(rng, &mut options);
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn state_with(category: &str, count: u64) -> SessionState {
        let mut state = SessionState::new();
        let words = (0..count).map(|i| Word::new(i, &format!("w{i}"))).collect();
        state.set_category_words(category, words);
        state
    }

    #[test]
    fn test_first_round_keeps_initial_count() {
        let mut state = state_with("A", 6);
        let mut quiz = QuizState::new();
        let config = Config::default();
        assert_eq!(calculate_number_of_options(&mut state, &mut quiz, "A", &config), 2);
    }

    #[test]
    fn test_clean_round_adds_an_option() {
        let mut state = state_with("A", 6);
        state.complete_first_round();
        let mut quiz = QuizState::new();
        let config = Config::default();
        assert_eq!(calculate_number_of_options(&mut state, &mut quiz, "A", &config), 3);
        assert_eq!(calculate_number_of_options(&mut state, &mut quiz, "A", &config), 4);
        assert_eq!(state.option_count("A"), Some(4));
    }

    #[test]
    fn test_miss_removes_an_option_and_clears_indexes() {
        let mut state = state_with("A", 6);
        state.complete_first_round();
        state.set_option_count("A", 4);
        let mut quiz = QuizState::new();
        quiz.push_wrong_index(2);
        let config = Config::default();
        assert_eq!(calculate_number_of_options(&mut state, &mut quiz, "A", &config), 3);
        assert!(quiz.wrong_indexes().is_empty());
    }

    #[test]
    fn test_count_never_leaves_bounds() {
        let mut state = state_with("A", 4);
        state.complete_first_round();
        let mut quiz = QuizState::new();
        let config = Config::default();
        for _ in 0..10 {
            calculate_number_of_options(&mut state, &mut quiz, "A", &config);
        }
        assert_eq!(state.option_count("A"), Some(4));
        for _ in 0..10 {
            quiz.push_wrong_index(0);
            calculate_number_of_options(&mut state, &mut quiz, "A", &config);
        }
        assert_eq!(state.option_count("A"), Some(2));
    }

    #[test]
    fn test_fill_contains_target_once_and_requested_size() {
        let state = state_with("A", 6);
        let mut rng = SmallRng::seed_from_u64(11);
        let target = state.words_in("A")[2].clone();
        let options = fill_quiz_options(&state, &target, "A", 4, &mut rng);
        assert_eq!(options.len(), 4);
        assert_eq!(options.iter().filter(|w| w.id == target.id).count(), 1);
        let ids: HashSet<u64> = options.iter().map(|w| w.id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_fill_borrows_from_other_categories() {
        let mut state = state_with("A", 2);
        state.set_category_words("B", vec![Word::new(50, "x"), Word::new(51, "y")]);
        let mut rng = SmallRng::seed_from_u64(1);
        let target = state.words_in("A")[0].clone();
        let options = fill_quiz_options(&state, &target, "A", 4, &mut rng);
        assert_eq!(options.len(), 4);
    }

    #[test]
    fn test_fill_skips_duplicate_labels() {
        let mut state = SessionState::new();
        state.set_category_words(
            "A",
            vec![Word::new(1, "same"), Word::new(2, "same"), Word::new(3, "other")],
        );
        let mut rng = SmallRng::seed_from_u64(5);
        let target = state.words_in("A")[0].clone();
        let options = fill_quiz_options(&state, &target, "A", 3, &mut rng);
        assert_eq!(options.len(), 2);
        assert!(options.iter().all(|w| w.id != 2));
    }
}
