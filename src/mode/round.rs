use tracing::{debug, error, warn};

use crate::mode::{Interaction, ModeError, RoundOutcome};
use crate::session::SessionContext;
use crate::session::flow::FlowState;
use crate::session::result::SessionResults;
use crate::session::timers::CancellationToken;
use crate::word::Word;

/// Loads the target's media (then the distractors'), renders the cards and
/// moves the session to `ShowingQuestion`. The question is never shown before
/// the target's resources have settled.
pub async fn present_question(
    ctx: &mut SessionContext,
    token: &CancellationToken,
    target: Word,
    options: Vec<Word>,
) -> Result<RoundOutcome, ModeError> {
    let renderer = ctx.collab.renderer.clone();
    let loader = ctx.collab.loader.clone();
    let audio = ctx.collab.audio.clone();
    let display_mode = ctx.display_mode();

    renderer.show_loading();
    renderer.set_repeat_enabled(false);
    loader.load_resources_for_word(&target, display_mode).await;
    for option in options.iter().filter(|w| w.id != target.id) {
        loader.load_resources_for_word(option, display_mode).await;
    }
    if !ctx.state.is_current(token, FlowState::QuizReady) {
        debug!(word = target.id, "discarding stale question setup");
        return Ok(RoundOutcome::Aborted);
    }

    renderer.clear_cards();
    for (slot, word) in options.iter().enumerate() {
        renderer.render_option(slot, word, display_mode)?;
    }
    ctx.state.set_question(target.clone(), options);

    audio.set_target_word_audio(&target).await?;
    if !ctx.state.is_current(token, FlowState::QuizReady) {
        return Ok(RoundOutcome::Aborted);
    }

    renderer.hide_loading();
    renderer.set_repeat_enabled(true);
    ctx.state
        .transition_to(FlowState::ShowingQuestion, "question ready");
    Ok(RoundOutcome::Question)
}

/// Error recovery for a failed round setup: log, then force the session back
/// to `QuizReady` so the next `start_round` retries. Stale chains are left
/// alone.
pub fn recover(ctx: &mut SessionContext, token: &CancellationToken, err: &ModeError) -> RoundOutcome {
    if token.is_cancelled() {
        return RoundOutcome::Aborted;
    }
    error!("round setup failed, returning to QUIZ_READY: {err}");
    ctx.collab.renderer.hide_loading();
    ctx.state
        .force_transition_to(FlowState::QuizReady, "round setup failed");
    RoundOutcome::Recovered
}

pub fn show_results(ctx: &mut SessionContext, results: SessionResults) -> RoundOutcome {
    if !ctx.state.transition_to(FlowState::ShowingResults, "no more items") {
        return RoundOutcome::Skipped;
    }
    ctx.collab.renderer.clear_cards();
    ctx.collab.renderer.set_repeat_enabled(false);
    ctx.collab.renderer.show_results(&results.finish());
    RoundOutcome::Completed
}

/// Plays answer feedback and reports whether the session is still where it
/// was when playback started.
pub async fn play_feedback(
    ctx: &mut SessionContext,
    token: &CancellationToken,
    is_correct: bool,
    target: &Word,
) -> bool {
    let expected = ctx.state.flow_state();
    let audio = ctx.collab.audio.clone();
    audio.play_feedback(is_correct, target.audio.as_deref()).await;
    ctx.state.is_current(token, expected)
}

/// Turns a raw card pick into a correct or wrong answer.
pub fn resolve_selection(ctx: &SessionContext, slot: usize) -> Result<Interaction, ModeError> {
    let option = ctx
        .state
        .current_options()
        .get(slot)
        .ok_or(ModeError::InvalidSlot(slot))?;
    let is_target = ctx.state.current_target().map(|t| t.id) == Some(option.id);
    Ok(if is_target {
        Interaction::CorrectAnswer
    } else {
        Interaction::WrongAnswer { slot }
    })
}

pub async fn replay_audio(ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError> {
    let Some(target) = ctx.state.current_target().cloned() else {
        return Ok(RoundOutcome::Skipped);
    };
    if !ctx.state.can_process_answer() {
        return Ok(RoundOutcome::Skipped);
    }
    let audio = ctx.collab.audio.clone();
    audio.set_target_word_audio(&target).await?;
    Ok(RoundOutcome::Question)
}

/// The current target if an answer can be processed right now.
pub fn answerable_target(ctx: &SessionContext, action: &str) -> Option<Word> {
    if !ctx.state.can_process_answer() {
        warn!(action, state = %ctx.state.flow_state(), "answer ignored outside SHOWING_QUESTION");
        return None;
    }
    ctx.state.current_target().cloned()
}
