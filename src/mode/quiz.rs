use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::engine::quiz_options::{calculate_number_of_options, fill_quiz_options, stored_option_count};
use crate::engine::quiz_selection::select_target_word_and_category;
use crate::engine::QuizState;
use crate::mode::round;
use crate::mode::{DisplayConfig, Interaction, Mode, ModeError, RoundItem, RoundOutcome};
use crate::session::{CancellationToken, SessionContext};
use crate::session::flow::FlowState;
use crate::session::result::SessionResults;

/// Misses in one round after which only the target card stays on screen.
const REVEAL_AFTER_MISSES: usize = 2;

/// Category-rotating quiz with spaced repetition of missed words.
pub struct QuizMode {
    quiz: QuizState,
    rounds_played: u32,
    started_at: DateTime<Utc>,
}

impl QuizMode {
    pub fn new() -> Self {
        Self {
            quiz: QuizState::new(),
            rounds_played: 0,
            started_at: Utc::now(),
        }
    }

    pub fn quiz_state(&self) -> &QuizState {
        &self.quiz
    }

    async fn setup_round(
        &mut self,
        ctx: &mut SessionContext,
        token: &CancellationToken,
    ) -> Result<RoundOutcome, ModeError> {
        ctx.state.begin_round();
        match ctx.state.current_category().map(str::to_string) {
            Some(category) => {
                calculate_number_of_options(&mut ctx.state, &mut self.quiz, &category, &ctx.config);
            }
            None => self.quiz.clear_wrong_indexes(),
        }

        let Some(RoundItem::Quiz(target)) = self.next_item(ctx) else {
            info!(rounds = self.rounds_played, "quiz has no more targets");
            return Ok(round::show_results(ctx, self.results()));
        };
        ctx.request_preload();

        let count = stored_option_count(&ctx.state, &target.category, &ctx.config);
        ctx.collab.renderer.set_category_label(&target.category);
        let options = fill_quiz_options(&ctx.state, &target.word, &target.category, count, &mut ctx.rng);
        debug!(
            category = %target.category,
            word = target.word.id,
            options = options.len(),
            round = ctx.state.round_count(),
            "quiz round ready"
        );
        round::present_question(ctx, token, target.word, options).await
    }

    async fn on_correct(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError> {
        let Some(target) = round::answerable_target(ctx, "correct-answer") else {
            return Ok(RoundOutcome::Skipped);
        };
        let token = ctx.state.token();
        ctx.state
            .transition_to(FlowState::ProcessingAnswer, "correct answer");

        let turn_had_wrong = ctx.state.turn_had_wrong();
        self.quiz.record_correct(target.id, turn_had_wrong);
        if turn_had_wrong {
            if let Some(category) = ctx.state.current_category().map(str::to_string) {
                self.quiz.schedule_repetition(
                    &category,
                    &target,
                    ctx.state.round_count(),
                    ctx.config.repetition_offsets(),
                    &mut ctx.rng,
                );
            }
        }
        self.rounds_played += 1;
        ctx.state.complete_first_round();

        if !round::play_feedback(ctx, &token, true, &target).await {
            return Ok(RoundOutcome::Aborted);
        }
        ctx.collab.renderer.clear_cards();
        ctx.state.transition_to(FlowState::QuizReady, "next round");
        self.start_round(ctx).await
    }

    async fn on_wrong(&mut self, ctx: &mut SessionContext, slot: usize) -> Result<RoundOutcome, ModeError> {
        let Some(target) = round::answerable_target(ctx, "wrong-answer") else {
            return Ok(RoundOutcome::Skipped);
        };
        let token = ctx.state.token();

        ctx.state.mark_turn_wrong();
        self.quiz.mark_incorrect(target.id);
        if let Some(category) = ctx.state.current_category().map(str::to_string) {
            self.quiz.schedule_repetition(
                &category,
                &target,
                ctx.state.round_count(),
                ctx.config.repetition_offsets(),
                &mut ctx.rng,
            );
        }

        if self.quiz.push_wrong_index(slot) == REVEAL_AFTER_MISSES {
            debug!(word = target.id, "second miss, revealing target");
            ctx.collab.renderer.remove_cards_except(target.id);
            ctx.state.retain_only_target_option();
        }

        if !round::play_feedback(ctx, &token, false, &target).await {
            return Ok(RoundOutcome::Aborted);
        }
        Ok(RoundOutcome::Question)
    }
}

impl Default for QuizMode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mode for QuizMode {
    async fn initialize(&mut self, _ctx: &mut SessionContext) -> Result<(), ModeError> {
        *self = Self::new();
        Ok(())
    }

    async fn start(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError> {
        if !ctx.state.has_content() {
            info!("no categories loaded, nothing to quiz");
            return Ok(round::show_results(ctx, self.results()));
        }
        ctx.state.transition_to(FlowState::QuizReady, "quiz started");
        self.start_round(ctx).await
    }

    async fn cleanup(&mut self, _ctx: &mut SessionContext) -> Result<(), ModeError> {
        self.quiz.reset();
        Ok(())
    }

    async fn start_round(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError> {
        if !ctx.state.can_start_quiz_round() {
            debug!(state = %ctx.state.flow_state(), "start_round outside QUIZ_READY");
            return Ok(RoundOutcome::Skipped);
        }
        let token = ctx.state.token();
        match self.setup_round(ctx, &token).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => Ok(round::recover(ctx, &token, &err)),
        }
    }

    fn next_item(&mut self, ctx: &mut SessionContext) -> Option<RoundItem> {
        select_target_word_and_category(&mut ctx.state, &mut self.quiz, &ctx.config, &mut ctx.rng)
            .map(RoundItem::Quiz)
    }

    async fn handle_interaction(
        &mut self,
        ctx: &mut SessionContext,
        interaction: Interaction,
    ) -> Result<RoundOutcome, ModeError> {
        match interaction {
            Interaction::CorrectAnswer => self.on_correct(ctx).await,
            Interaction::WrongAnswer { slot } => self.on_wrong(ctx, slot).await,
            Interaction::Select { slot } => match round::resolve_selection(ctx, slot)? {
                Interaction::CorrectAnswer => self.on_correct(ctx).await,
                Interaction::WrongAnswer { slot } => self.on_wrong(ctx, slot).await,
                other => Err(ModeError::UnsupportedInteraction(format!("{other:?}"))),
            },
            Interaction::ReplayAudio => round::replay_audio(ctx).await,
        }
    }

    fn display_config(&self) -> DisplayConfig {
        DisplayConfig {
            show_repeat_button: true,
            show_progress_bar: false,
            show_category: true,
            show_mode_switcher: true,
            show_interaction_type: true,
        }
    }

    fn results(&self) -> SessionResults {
        SessionResults::from_tally(
            self.mode_name(),
            self.quiz.results(),
            self.rounds_played,
            self.started_at,
        )
    }

    fn mode_name(&self) -> &'static str {
        "quiz"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::Collaborators;
    use crate::collab::null::SilentAudio;
    use crate::config::Config;
    use crate::test_support::{InstantLoader, RecordingRenderer, capture_events};
    use crate::word::Word;
    use std::sync::Arc;

    fn context(categories: &[(&str, u64)]) -> (SessionContext, Arc<RecordingRenderer>) {
        let renderer = Arc::new(RecordingRenderer::default());
        let collab = Collaborators {
            loader: Arc::new(InstantLoader::default()),
            renderer: renderer.clone(),
            audio: Arc::new(SilentAudio),
        };
        let mut ctx = SessionContext::with_seed(Config::default(), collab, 3);
        let mut next_id = 1;
        for &(name, count) in categories {
            let words = (0..count)
                .map(|i| Word::new(next_id + i, &format!("{name}-{i}")))
                .collect();
            next_id += count;
            ctx.state.set_category_words(name, words);
        }
        ctx.state.transition_to(FlowState::Loading, "test");
        (ctx, renderer)
    }

    fn wrong_slot(ctx: &SessionContext, skip: Option<usize>) -> usize {
        let target = ctx.state.current_target().unwrap().id;
        ctx.state
            .current_options()
            .iter()
            .enumerate()
            .find(|(slot, w)| w.id != target && Some(*slot) != skip)
            .map(|(slot, _)| slot)
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_shows_first_question() {
        let (mut ctx, renderer) = context(&[("Animals", 5)]);
        let mut quiz = QuizMode::new();
        assert_eq!(quiz.start(&mut ctx).await.unwrap(), RoundOutcome::Question);
        assert_eq!(ctx.state.flow_state(), FlowState::ShowingQuestion);
        assert_eq!(ctx.state.current_options().len(), 2);
        assert_eq!(renderer.labels(), vec!["Animals".to_string()]);
        assert_eq!(ctx.state.used_word_ids().len(), 1);
    }

    #[tokio::test]
    async fn test_second_miss_prunes_to_target() {
        let (mut ctx, renderer) = context(&[("Animals", 6)]);
        ctx.config.initial_quiz_options = 4;
        let mut quiz = QuizMode::new();
        quiz.start(&mut ctx).await.unwrap();
        assert_eq!(ctx.state.current_options().len(), 4);

        let first = wrong_slot(&ctx, None);
        quiz.handle_interaction(&mut ctx, Interaction::WrongAnswer { slot: first })
            .await
            .unwrap();
        assert_eq!(ctx.state.current_options().len(), 4);
        assert!(renderer.pruned().is_empty());

        let second = wrong_slot(&ctx, Some(first));
        quiz.handle_interaction(&mut ctx, Interaction::WrongAnswer { slot: second })
            .await
            .unwrap();
        let target = ctx.state.current_target().unwrap().id;
        assert_eq!(ctx.state.current_options().len(), 1);
        assert_eq!(renderer.pruned(), vec![target]);
        assert_eq!(ctx.state.flow_state(), FlowState::ShowingQuestion);
    }

    #[tokio::test]
    async fn test_correct_answer_advances_and_grows_options() {
        let (mut ctx, _) = context(&[("Animals", 5)]);
        let mut quiz = QuizMode::new();
        quiz.start(&mut ctx).await.unwrap();
        let outcome = quiz
            .handle_interaction(&mut ctx, Interaction::CorrectAnswer)
            .await
            .unwrap();
        assert_eq!(outcome, RoundOutcome::Question);
        assert_eq!(ctx.state.round_count(), 2);
        assert_eq!(ctx.state.current_options().len(), 3);
        assert_eq!(quiz.results().correct_on_first_try, 1);
    }

    #[tokio::test]
    async fn test_missed_word_is_requeued_without_credit() {
        let (mut ctx, _) = context(&[("Animals", 5)]);
        let mut quiz = QuizMode::new();
        quiz.start(&mut ctx).await.unwrap();
        let target = ctx.state.current_target().unwrap().id;
        let slot = wrong_slot(&ctx, None);
        quiz.handle_interaction(&mut ctx, Interaction::WrongAnswer { slot })
            .await
            .unwrap();
        quiz.handle_interaction(&mut ctx, Interaction::CorrectAnswer)
            .await
            .unwrap();

        let results = quiz.results();
        assert_eq!(results.correct_on_first_try, 0);
        assert_eq!(results.incorrect, vec![target]);
        assert_eq!(
            quiz.quiz_state()
                .queue("Animals")
                .iter()
                .filter(|e| e.word.id == target)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_answer_outside_question_is_ignored() {
        let (mut ctx, _) = context(&[("Animals", 5)]);
        let mut quiz = QuizMode::new();
        let outcome = quiz
            .handle_interaction(&mut ctx, Interaction::CorrectAnswer)
            .await
            .unwrap();
        assert_eq!(outcome, RoundOutcome::Skipped);
        assert_eq!(ctx.state.flow_state(), FlowState::Loading);
    }

    #[tokio::test]
    async fn test_empty_session_goes_to_results() {
        let (mut ctx, renderer) = context(&[]);
        let mut quiz = QuizMode::new();
        assert_eq!(quiz.start(&mut ctx).await.unwrap(), RoundOutcome::Completed);
        assert_eq!(ctx.state.flow_state(), FlowState::ShowingResults);
        assert_eq!(renderer.results_shown(), 1);
    }

    #[tokio::test]
    async fn test_render_failure_recovers_to_quiz_ready() {
        let (mut ctx, renderer) = context(&[("Animals", 5)]);
        renderer.fail_renders(true);
        let mut quiz = QuizMode::new();
        let (events, guard) = capture_events();
        assert_eq!(quiz.start(&mut ctx).await.unwrap(), RoundOutcome::Recovered);
        assert_eq!(ctx.state.flow_state(), FlowState::QuizReady);
        drop(guard);
        let errors = events.at(tracing::Level::ERROR);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("round setup failed"));

        renderer.fail_renders(false);
        assert_eq!(quiz.start_round(&mut ctx).await.unwrap(), RoundOutcome::Question);
    }
}
