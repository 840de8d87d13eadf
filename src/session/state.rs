use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::session::error::SessionError;
use crate::session::flow::FlowState;
use crate::session::timers::{CancellationToken, TimeoutId, TimeoutRegistry};
use crate::word::{Word, WordId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowTransition {
    pub from: FlowState,
    pub to: FlowState,
    pub reason: String,
    pub forced: bool,
}

pub type FlowListener = Box<dyn Fn(&FlowTransition) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Flow state machine plus the round-scoped bookkeeping shared by every mode
/// of one learning session.
pub struct SessionState {
    flow_state: FlowState,
    widget_active: bool,
    token: CancellationToken,
    timeouts: TimeoutRegistry,
    listeners: Vec<(ListenerId, FlowListener)>,
    next_listener_id: u64,

    category_names: Vec<String>,
    words_by_category: HashMap<String, Vec<Word>>,
    current_category: Option<String>,

    used_word_ids: HashSet<WordId>,
    last_word_shown_id: Option<WordId>,
    category_round_counts: HashMap<String, u32>,
    category_option_counts: HashMap<String, usize>,
    round_count: u32,
    is_first_round: bool,
    turn_had_wrong: bool,
    current_target: Option<Word>,
    current_options: Vec<Word>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            flow_state: FlowState::Idle,
            widget_active: false,
            token: CancellationToken::new(),
            timeouts: TimeoutRegistry::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            category_names: Vec::new(),
            words_by_category: HashMap::new(),
            current_category: None,
            used_word_ids: HashSet::new(),
            last_word_shown_id: None,
            category_round_counts: HashMap::new(),
            category_option_counts: HashMap::new(),
            round_count: 0,
            is_first_round: true,
            turn_had_wrong: false,
            current_target: None,
            current_options: Vec::new(),
        }
    }

    // --- Flow ---

    pub fn flow_state(&self) -> FlowState {
        self.flow_state
    }

    pub fn can_transition_to(&self, target: FlowState) -> bool {
        self.flow_state.can_transition_to(target)
    }

    pub fn transition_to(&mut self, target: FlowState, reason: &str) -> bool {
        if !self.can_transition_to(target) {
            warn!(
                from = %self.flow_state,
                to = %target,
                reason,
                "rejected illegal flow transition"
            );
            return false;
        }
        self.apply_transition(target, reason, false);
        true
    }

    /// Like `transition_to`, but reports a rejected move as an error.
    pub fn try_transition_to(&mut self, target: FlowState, reason: &str) -> Result<(), SessionError> {
        let from = self.flow_state;
        if self.transition_to(target, reason) {
            Ok(())
        } else {
            Err(SessionError::IllegalTransition { from, to: target })
        }
    }

    /// Bypasses the adjacency table. Reserved for error recovery.
    pub fn force_transition_to(&mut self, target: FlowState, reason: &str) {
        if !self.can_transition_to(target) {
            warn!(from = %self.flow_state, to = %target, reason, "forcing flow transition");
        }
        self.apply_transition(target, reason, true);
    }

    fn apply_transition(&mut self, target: FlowState, reason: &str, forced: bool) {
        let transition = FlowTransition {
            from: self.flow_state,
            to: target,
            reason: reason.to_string(),
            forced,
        };
        self.flow_state = target;
        debug!(from = %transition.from, to = %target, reason, forced, "flow transition");
        self.notify(&transition);
    }

    fn notify(&self, transition: &FlowTransition) {
        for (id, listener) in &self.listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(transition))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(listener = id.0, to = %transition.to, "flow listener failed: {err:#}");
                }
                Err(_) => {
                    error!(listener = id.0, to = %transition.to, "flow listener panicked");
                }
            }
        }
    }

    pub fn add_listener(&mut self, listener: FlowListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn can_start_quiz_round(&self) -> bool {
        self.flow_state == FlowState::QuizReady
    }

    pub fn can_process_answer(&self) -> bool {
        self.flow_state == FlowState::ShowingQuestion
    }

    pub fn can_introduce_words(&self) -> bool {
        self.can_transition_to(FlowState::IntroducingWords)
    }

    pub fn can_switch_mode(&self) -> bool {
        self.can_transition_to(FlowState::SwitchingMode)
    }

    pub fn is_introducing(&self) -> bool {
        self.flow_state == FlowState::IntroducingWords
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.flow_state, FlowState::Idle | FlowState::Closing)
    }

    pub fn widget_active(&self) -> bool {
        self.widget_active
    }

    pub fn set_widget_active(&mut self, active: bool) {
        self.widget_active = active;
    }

    // --- Cancellation & timeouts ---

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// True when a continuation started under `token` may still mutate state
    /// expected to be in `expected`.
    pub fn is_current(&self, token: &CancellationToken, expected: FlowState) -> bool {
        !token.is_cancelled() && self.flow_state == expected
    }

    pub fn add_timeout<F>(&mut self, delay: Duration, task: F) -> TimeoutId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.timeouts.add_timeout(delay, task)
    }

    pub fn spawn_tracked<F>(&mut self, task: F) -> TimeoutId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.timeouts.spawn(task)
    }

    pub fn clear_timeout(&mut self, id: TimeoutId) -> bool {
        self.timeouts.clear_timeout(id)
    }

    pub fn clear_active_timeouts(&mut self) -> usize {
        self.timeouts.clear_all()
    }

    pub fn active_timeouts(&self) -> usize {
        self.timeouts.active_count()
    }

    /// Cancels all in-flight work and clears round-scoped bookkeeping. The
    /// flow state, listeners and loaded categories survive.
    pub fn reset(&mut self) {
        self.token.cancel();
        let cancelled = self.clear_active_timeouts();
        if cancelled > 0 {
            debug!(cancelled, "reset cancelled pending timeouts");
        }

        self.used_word_ids.clear();
        self.last_word_shown_id = None;
        self.category_round_counts.clear();
        self.category_option_counts.clear();
        self.current_category = None;
        self.round_count = 0;
        self.is_first_round = true;
        self.turn_had_wrong = false;
        self.current_target = None;
        self.current_options.clear();

        self.token = CancellationToken::new();
    }

    // --- Categories ---

    pub fn category_names(&self) -> &[String] {
        &self.category_names
    }

    /// Replaces any words already stored under `name`. Empty categories are
    /// dropped from the rotation.
    pub fn set_category_words(&mut self, name: &str, words: Vec<Word>) {
        if words.is_empty() {
            self.words_by_category.remove(name);
            self.category_names.retain(|n| n != name);
            return;
        }
        if !self.category_names.iter().any(|n| n == name) {
            self.category_names.push(name.to_string());
        }
        self.words_by_category.insert(name.to_string(), words);
    }

    /// Drops every loaded category from the rotation.
    pub fn clear_categories(&mut self) {
        self.category_names.clear();
        self.words_by_category.clear();
        self.current_category = None;
    }

    pub fn words_in(&self, category: &str) -> &[Word] {
        self.words_by_category
            .get(category)
            .map(|w| w.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_content(&self) -> bool {
        self.words_by_category.values().any(|w| !w.is_empty())
    }

    /// Every word across categories in rotation order, first occurrence wins.
    pub fn all_words(&self) -> Vec<Word> {
        let mut seen = HashSet::new();
        self.category_names
            .iter()
            .flat_map(|name| self.words_in(name).iter())
            .filter(|w| seen.insert(w.id))
            .cloned()
            .collect()
    }

    pub fn find_word(&self, id: WordId) -> Option<&Word> {
        self.words_by_category
            .values()
            .flat_map(|words| words.iter())
            .find(|w| w.id == id)
    }

    pub fn current_category(&self) -> Option<&str> {
        self.current_category.as_deref()
    }

    pub fn set_current_category(&mut self, category: &str) {
        self.current_category = Some(category.to_string());
    }

    /// Moves `category` to the back of the rotation and resets its round
    /// counter.
    pub fn rotate_category(&mut self, category: &str) {
        if let Some(pos) = self.category_names.iter().position(|n| n == category) {
            let name = self.category_names.remove(pos);
            self.category_names.push(name);
        }
        self.category_round_counts.remove(category);
    }

    // --- Round bookkeeping ---

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn begin_round(&mut self) -> u32 {
        self.round_count += 1;
        self.turn_had_wrong = false;
        self.round_count
    }

    pub fn is_first_round(&self) -> bool {
        self.is_first_round
    }

    pub fn complete_first_round(&mut self) {
        self.is_first_round = false;
    }

    pub fn mark_turn_wrong(&mut self) {
        self.turn_had_wrong = true;
    }

    pub fn turn_had_wrong(&self) -> bool {
        self.turn_had_wrong
    }

    pub fn category_round_count(&self, category: &str) -> u32 {
        self.category_round_counts.get(category).copied().unwrap_or(0)
    }

    pub fn option_count(&self, category: &str) -> Option<usize> {
        self.category_option_counts.get(category).copied()
    }

    pub fn set_option_count(&mut self, category: &str, count: usize) {
        self.category_option_counts.insert(category.to_string(), count);
    }

    pub fn used_word_ids(&self) -> &HashSet<WordId> {
        &self.used_word_ids
    }

    pub fn is_used(&self, id: WordId) -> bool {
        self.used_word_ids.contains(&id)
    }

    pub fn last_word_shown_id(&self) -> Option<WordId> {
        self.last_word_shown_id
    }

    pub fn set_last_word_shown(&mut self, id: Option<WordId>) {
        self.last_word_shown_id = id;
    }

    /// Bookkeeping for a word chosen as a quiz target.
    pub fn record_selection(&mut self, category: &str, word: &Word) {
        self.last_word_shown_id = Some(word.id);
        self.used_word_ids.insert(word.id);
        *self
            .category_round_counts
            .entry(category.to_string())
            .or_insert(0) += 1;
        self.current_category = Some(category.to_string());
    }

    pub fn set_question(&mut self, target: Word, options: Vec<Word>) {
        self.current_target = Some(target);
        self.current_options = options;
    }

    pub fn current_target(&self) -> Option<&Word> {
        self.current_target.as_ref()
    }

    pub fn current_options(&self) -> &[Word] {
        &self.current_options
    }

    pub fn retain_only_target_option(&mut self) {
        if let Some(target_id) = self.current_target.as_ref().map(|t| t.id) {
            self.current_options.retain(|w| w.id == target_id);
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
