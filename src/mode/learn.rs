use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::engine::learn_selection::{
    LearnItem, fill_learning_options, record_answer_result, select_learning_mode_word,
};
use crate::engine::{LearnState, Target};
use crate::mode::round;
use crate::mode::{DisplayConfig, Interaction, Mode, ModeError, RoundItem, RoundOutcome};
use crate::session::SessionContext;
use crate::session::flow::FlowState;
use crate::session::result::{AnswerTally, SessionResults};
use crate::session::timers::{CancellationToken, pause};
use crate::word::{RecordingType, Word, WordId};

/// Introduces words a few at a time and drills them until each is mastered.
pub struct LearnMode {
    learn: LearnState,
    words: HashMap<WordId, Word>,
    tally: AnswerTally,
    rounds_played: u32,
    started_at: DateTime<Utc>,
}

impl LearnMode {
    pub fn new() -> Self {
        Self {
            learn: LearnState::new(),
            words: HashMap::new(),
            tally: AnswerTally::default(),
            rounds_played: 0,
            started_at: Utc::now(),
        }
    }

    pub fn learn_state(&self) -> &LearnState {
        &self.learn
    }

    /// Plays rounds until one leaves the learner something to answer.
    /// Introductions chain straight into the next round.
    pub async fn run_rounds(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError> {
        loop {
            match self.play_round(ctx).await? {
                RoundOutcome::Introduced => continue,
                outcome => return Ok(outcome),
            }
        }
    }

    async fn play_round(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError> {
        if !ctx.state.can_start_quiz_round() {
            debug!(state = %ctx.state.flow_state(), "round requested outside QUIZ_READY");
            return Ok(RoundOutcome::Skipped);
        }
        let token = ctx.state.token();
        match self.setup_round(ctx, &token).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => Ok(round::recover(ctx, &token, &err)),
        }
    }

    async fn setup_round(
        &mut self,
        ctx: &mut SessionContext,
        token: &CancellationToken,
    ) -> Result<RoundOutcome, ModeError> {
        ctx.state.begin_round();
        match self.next_item(ctx) {
            None => {
                info!(
                    introduced = self.learn.introduced_count(),
                    rounds = self.rounds_played,
                    "every word mastered"
                );
                Ok(round::show_results(ctx, self.results()))
            }
            Some(RoundItem::Introduce(words)) => self.introduce(ctx, token, &words).await,
            Some(RoundItem::Practice(word) | RoundItem::Quiz(Target { word, .. })) => {
                let options = fill_learning_options(&self.learn, &word, &self.words, &mut ctx.rng);
                debug!(
                    word = word.id,
                    options = options.len(),
                    streak = self.learn.learning_correct_streak(),
                    "learn practice ready"
                );
                round::present_question(ctx, token, word, options).await
            }
        }
    }

    async fn introduce(
        &mut self,
        ctx: &mut SessionContext,
        token: &CancellationToken,
        words: &[Word],
    ) -> Result<RoundOutcome, ModeError> {
        if !ctx
            .state
            .transition_to(FlowState::IntroducingWords, "introducing words")
        {
            return Ok(RoundOutcome::Skipped);
        }
        ctx.collab.renderer.clear_cards();
        ctx.collab.renderer.set_repeat_enabled(false);

        if !self.play_introductions(ctx, token, words).await? {
            debug!("introduction interrupted");
            return Ok(RoundOutcome::Aborted);
        }
        ctx.state
            .transition_to(FlowState::QuizReady, "introduction finished");
        Ok(RoundOutcome::Introduced)
    }

    /// Plays each word's audio a few times, alternating recording variants,
    /// with pauses in between. Returns `false` as soon as the session moves
    /// on without us.
    async fn play_introductions(
        &mut self,
        ctx: &mut SessionContext,
        token: &CancellationToken,
        words: &[Word],
    ) -> Result<bool, ModeError> {
        let renderer = ctx.collab.renderer.clone();
        let loader = ctx.collab.loader.clone();
        let audio = ctx.collab.audio.clone();
        let display_mode = ctx.display_mode();

        for word in words {
            if !ctx.state.is_current(token, FlowState::IntroducingWords) {
                return Ok(false);
            }
            loader.load_resources_for_word(word, display_mode).await;

            let variants = introduction_order(ctx.config.audio_repetitions, &mut ctx.rng);
            for (repetition, variant) in variants.iter().enumerate() {
                if !ctx.state.is_current(token, FlowState::IntroducingWords) {
                    return Ok(false);
                }
                renderer.render_introduction(word, repetition)?;

                if let Some(url) = audio.select_best_audio(word, &variant_priorities(*variant)) {
                    let mut clip = audio.create_introduction_audio(&url);
                    if clip.is_valid() {
                        if let Err(err) = clip.play_until_end().await {
                            warn!(word = word.id, "introduction audio failed: {err}");
                        }
                    }
                    clip.cleanup();
                }

                if repetition + 1 < variants.len()
                    && !pause(token, ctx.config.intro_repetition_delay()).await
                {
                    return Ok(false);
                }
            }

            if !pause(token, ctx.config.intro_word_delay()).await {
                return Ok(false);
            }
        }
        Ok(ctx.state.is_current(token, FlowState::IntroducingWords))
    }

    async fn on_correct(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError> {
        let Some(target) = round::answerable_target(ctx, "correct-answer") else {
            return Ok(RoundOutcome::Skipped);
        };
        let token = ctx.state.token();
        ctx.state
            .transition_to(FlowState::ProcessingAnswer, "correct answer");

        let turn_had_wrong = ctx.state.turn_had_wrong();
        record_answer_result(
            &mut self.learn,
            target.id,
            true,
            turn_had_wrong,
            &ctx.config,
            ctx.config.display_mode,
        );
        self.tally.record_correct(target.id, turn_had_wrong);
        self.rounds_played += 1;
        ctx.state.complete_first_round();

        if !round::play_feedback(ctx, &token, true, &target).await {
            return Ok(RoundOutcome::Aborted);
        }
        ctx.collab.renderer.clear_cards();
        ctx.state.transition_to(FlowState::QuizReady, "next round");
        self.run_rounds(ctx).await
    }

    async fn on_wrong(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError> {
        let Some(target) = round::answerable_target(ctx, "wrong-answer") else {
            return Ok(RoundOutcome::Skipped);
        };
        let token = ctx.state.token();

        ctx.state.mark_turn_wrong();
        record_answer_result(
            &mut self.learn,
            target.id,
            false,
            true,
            &ctx.config,
            ctx.config.display_mode,
        );
        self.tally.mark_incorrect(target.id);

        if !round::play_feedback(ctx, &token, false, &target).await {
            return Ok(RoundOutcome::Aborted);
        }
        Ok(RoundOutcome::Question)
    }
}

impl Default for LearnMode {
    fn default() -> Self {
        Self::new()
    }
}

/// Recording variants for each repetition, alternating from a random start.
pub fn introduction_order<R: Rng + ?Sized>(repetitions: usize, rng: &mut R) -> Vec<RecordingType> {
    let mut variant = if rng.gen_bool(0.5) {
        RecordingType::Introduction
    } else {
        RecordingType::Isolation
    };
    let mut order = Vec::with_capacity(repetitions);
    for _ in 0..repetitions {
        order.push(variant);
        variant = match variant {
            RecordingType::Introduction => RecordingType::Isolation,
            _ => RecordingType::Introduction,
        };
    }
    order
}

fn variant_priorities(variant: RecordingType) -> [RecordingType; 3] {
    match variant {
        RecordingType::Introduction => [
            RecordingType::Introduction,
            RecordingType::Isolation,
            RecordingType::Question,
        ],
        _ => [
            RecordingType::Isolation,
            RecordingType::Introduction,
            RecordingType::Question,
        ],
    }
}

#[async_trait]
impl Mode for LearnMode {
    async fn initialize(&mut self, ctx: &mut SessionContext) -> Result<(), ModeError> {
        *self = Self::new();
        let words = ctx.state.all_words();
        let ids = words.iter().map(|w| w.id).collect();
        self.words = words.into_iter().map(|w| (w.id, w)).collect();
        self.learn.seed(ids, &mut ctx.rng);
        info!(words = self.words.len(), "learn session seeded");
        Ok(())
    }

    async fn start(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError> {
        if self.words.is_empty() {
            info!("no words loaded, nothing to learn");
            return Ok(round::show_results(ctx, self.results()));
        }
        ctx.state.transition_to(FlowState::QuizReady, "learn started");
        self.run_rounds(ctx).await
    }

    async fn cleanup(&mut self, _ctx: &mut SessionContext) -> Result<(), ModeError> {
        self.learn.reset();
        Ok(())
    }

    async fn start_round(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError> {
        self.run_rounds(ctx).await
    }

    fn next_item(&mut self, ctx: &mut SessionContext) -> Option<RoundItem> {
        let item = select_learning_mode_word(
            &mut self.learn,
            &mut ctx.state,
            &self.words,
            &ctx.config,
            &mut ctx.rng,
        )?;
        Some(match item {
            LearnItem::Introduce(words) => RoundItem::Introduce(words),
            LearnItem::Practice(word) => RoundItem::Practice(word),
        })
    }

    async fn handle_interaction(
        &mut self,
        ctx: &mut SessionContext,
        interaction: Interaction,
    ) -> Result<RoundOutcome, ModeError> {
        match interaction {
            Interaction::CorrectAnswer => self.on_correct(ctx).await,
            Interaction::WrongAnswer { .. } => self.on_wrong(ctx).await,
            Interaction::Select { slot } => match round::resolve_selection(ctx, slot)? {
                Interaction::CorrectAnswer => self.on_correct(ctx).await,
                _ => self.on_wrong(ctx).await,
            },
            Interaction::ReplayAudio => round::replay_audio(ctx).await,
        }
    }

    fn is_complete(&self, ctx: &SessionContext) -> bool {
        self.learn.is_finished(ctx.config.mastery_threshold) && !ctx.state.is_first_round()
    }

    fn progress(&self, ctx: &SessionContext) -> Option<f64> {
        Some(self.learn.progress(ctx.config.mastery_threshold))
    }

    fn display_config(&self) -> DisplayConfig {
        DisplayConfig {
            show_repeat_button: true,
            show_progress_bar: true,
            show_category: false,
            show_mode_switcher: true,
            show_interaction_type: false,
        }
    }

    fn results(&self) -> SessionResults {
        SessionResults::from_tally(
            self.mode_name(),
            &self.tally,
            self.rounds_played,
            self.started_at,
        )
    }

    fn mode_name(&self) -> &'static str {
        "learn"
    }
}
