use tracing::{error, info, warn};

use crate::mode::{DisplayConfig, Interaction, Mode, ModeError, ModeKind, RoundOutcome};
use crate::session::result::SessionResults;
use crate::session::{CancellationToken, FlowState, SessionContext, SessionState};

/// Host-facing owner of one learning session: the shared context plus
/// whichever mode is currently driving it.
pub struct Controller {
    ctx: SessionContext,
    mode: Option<Box<dyn Mode>>,
    kind: Option<ModeKind>,
}

impl Controller {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            mode: None,
            kind: None,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.ctx
    }

    pub fn state(&self) -> &SessionState {
        &self.ctx.state
    }

    pub fn mode_kind(&self) -> Option<ModeKind> {
        self.kind
    }

    /// The token in-flight work is checked against. Cancelling it stops the
    /// current chain at its next continuation.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.ctx.state.token()
    }

    /// Loads `categories` and starts `kind` on them. An active session is
    /// torn down first and its categories replaced.
    pub async fn open(&mut self, categories: &[String], kind: ModeKind) -> Result<RoundOutcome, ModeError> {
        if self.ctx.state.is_active() && !self.leave_active(kind, "session reopened").await {
            return Ok(RoundOutcome::Skipped);
        }
        self.ctx.state.set_widget_active(true);
        self.ctx
            .state
            .try_transition_to(FlowState::Loading, "session opened")?;
        self.ctx.collab.renderer.show_loading();
        self.ctx.state.clear_categories();
        let loaded = self.ctx.load_categories(categories).await;
        info!(loaded, mode = %kind, "session opened");
        self.activate(kind).await
    }

    /// Tears down the active mode and starts `kind` over the same categories.
    pub async fn switch_mode(&mut self, kind: ModeKind) -> Result<RoundOutcome, ModeError> {
        if !self.leave_active(kind, "mode switch").await {
            return Ok(RoundOutcome::Skipped);
        }
        self.ctx.state.set_widget_active(true);
        self.ctx
            .state
            .try_transition_to(FlowState::Loading, "mode switch")?;
        self.activate(kind).await
    }

    pub async fn dispatch(&mut self, interaction: Interaction) -> Result<RoundOutcome, ModeError> {
        let mode = self.mode.as_mut().ok_or(ModeError::Inactive)?;
        mode.handle_interaction(&mut self.ctx, interaction).await
    }

    /// Retries the next round after a setup failure left the session in
    /// `QuizReady`.
    pub async fn resume(&mut self) -> Result<RoundOutcome, ModeError> {
        let mode = self.mode.as_mut().ok_or(ModeError::Inactive)?;
        mode.start_round(&mut self.ctx).await
    }

    /// Closes the session and returns the final results of the active mode.
    pub async fn close(&mut self) -> Option<SessionResults> {
        let results = self.mode.as_ref().map(|m| m.results().finish());
        if !self
            .ctx
            .state
            .transition_to(FlowState::Closing, "session closed")
        {
            self.ctx
                .state
                .force_transition_to(FlowState::Closing, "session closed");
        }
        self.teardown().await;
        self.kind = None;
        self.ctx.state.set_widget_active(false);
        self.ctx.state.transition_to(FlowState::Idle, "session closed");
        results
    }

    pub fn results(&self) -> Option<SessionResults> {
        self.mode.as_ref().map(|m| m.results())
    }

    pub fn is_complete(&self) -> bool {
        self.mode
            .as_ref()
            .is_some_and(|m| m.is_complete(&self.ctx))
    }

    pub fn progress(&self) -> Option<f64> {
        self.mode.as_ref().and_then(|m| m.progress(&self.ctx))
    }

    pub fn display_config(&self) -> Option<DisplayConfig> {
        self.mode.as_ref().map(|m| m.display_config())
    }

    async fn activate(&mut self, kind: ModeKind) -> Result<RoundOutcome, ModeError> {
        let mut mode = kind.build();
        mode.initialize(&mut self.ctx).await?;
        self.kind = Some(kind);
        let outcome = mode.start(&mut self.ctx).await;
        self.mode = Some(mode);
        outcome
    }

    /// Moves through `SwitchingMode` and tears the current mode down. False
    /// when the mode or the flow state refuses the switch.
    async fn leave_active(&mut self, to: ModeKind, reason: &str) -> bool {
        if let Some(mode) = &self.mode {
            if !mode.can_switch_from(&self.ctx) {
                warn!(from = mode.mode_name(), %to, "mode refused switch");
                return false;
            }
        }
        if self.ctx.state.flow_state() != FlowState::Idle
            && !self.ctx.state.transition_to(FlowState::SwitchingMode, reason)
        {
            return false;
        }
        info!(from = ?self.kind, %to, reason, "switching mode");
        self.teardown().await;
        true
    }

    async fn teardown(&mut self) {
        self.ctx.collab.audio.pause_all_audio();
        if let Some(mut mode) = self.mode.take() {
            if let Err(err) = mode.cleanup(&mut self.ctx).await {
                error!(mode = mode.mode_name(), "cleanup failed: {err}");
            }
        }
        self.ctx.state.reset();
        self.ctx.collab.renderer.clear_cards();
    }
}
