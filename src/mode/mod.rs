//! Learning modes. Each mode drives the session's flow state through its
//! round lifecycle on top of its own scheduler state.

pub mod learn;
pub mod quiz;
pub mod round;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collab::CollabError;
use crate::engine::Target;
use crate::session::SessionContext;
use crate::session::error::SessionError;
use crate::session::result::SessionResults;
use crate::word::Word;

pub use learn::LearnMode;
pub use quiz::QuizMode;

#[derive(Debug, Error)]
pub enum ModeError {
    #[error("unsupported interaction: {0}")]
    UnsupportedInteraction(String),
    #[error("interaction {0} needs an option slot")]
    MissingSlot(String),
    #[error("no answer option in slot {0}")]
    InvalidSlot(usize),
    #[error("no mode is active")]
    Inactive,
    #[error("unknown mode {0:?} (expected quiz or learn)")]
    UnknownMode(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Collab(#[from] CollabError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    CorrectAnswer,
    WrongAnswer { slot: usize },
    /// A raw card pick; the mode decides whether it was right.
    Select { slot: usize },
    ReplayAudio,
}

impl Interaction {
    pub fn from_action(action: &str, slot: Option<usize>) -> Result<Self, ModeError> {
        match action {
            "correct-answer" => Ok(Interaction::CorrectAnswer),
            "wrong-answer" => slot
                .map(|slot| Interaction::WrongAnswer { slot })
                .ok_or_else(|| ModeError::MissingSlot(action.to_string())),
            "select" => slot
                .map(|slot| Interaction::Select { slot })
                .ok_or_else(|| ModeError::MissingSlot(action.to_string())),
            "replay-audio" => Ok(Interaction::ReplayAudio),
            other => Err(ModeError::UnsupportedInteraction(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RoundItem {
    Quiz(Target),
    Practice(Word),
    Introduce(Vec<Word>),
}

/// Where a round-driving call left the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    /// A question is on screen, waiting for the learner.
    Question,
    /// An introduction sequence finished; the next round can start.
    Introduced,
    /// Nothing left to ask; results are showing.
    Completed,
    /// Round setup failed and the session was forced back to `QuizReady`.
    Recovered,
    /// The session was reset or switched while this call was suspended.
    Aborted,
    /// The call arrived in a flow state that does not accept it.
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub show_repeat_button: bool,
    pub show_progress_bar: bool,
    pub show_category: bool,
    pub show_mode_switcher: bool,
    pub show_interaction_type: bool,
}

#[async_trait]
pub trait Mode: Send {
    async fn initialize(&mut self, ctx: &mut SessionContext) -> Result<(), ModeError>;

    async fn start(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError>;

    async fn cleanup(&mut self, _ctx: &mut SessionContext) -> Result<(), ModeError> {
        Ok(())
    }

    /// Plays the next round from `QuizReady`. Also the retry path after a
    /// round setup failure forced the session back there.
    async fn start_round(&mut self, ctx: &mut SessionContext) -> Result<RoundOutcome, ModeError>;

    /// Advances the scheduler and returns the next item, or `None` when the
    /// mode has nothing left to present.
    fn next_item(&mut self, ctx: &mut SessionContext) -> Option<RoundItem>;

    async fn handle_interaction(
        &mut self,
        ctx: &mut SessionContext,
        interaction: Interaction,
    ) -> Result<RoundOutcome, ModeError>;

    fn can_switch_from(&self, _ctx: &SessionContext) -> bool {
        true
    }

    fn is_complete(&self, _ctx: &SessionContext) -> bool {
        false
    }

    /// Share of the session's material mastered so far, for modes that
    /// track it.
    fn progress(&self, _ctx: &SessionContext) -> Option<f64> {
        None
    }

    fn display_config(&self) -> DisplayConfig;

    fn results(&self) -> SessionResults {
        SessionResults::empty(self.mode_name())
    }

    fn mode_name(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Quiz,
    Learn,
}

impl ModeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeKind::Quiz => "quiz",
            ModeKind::Learn => "learn",
        }
    }

    pub fn build(self) -> Box<dyn Mode> {
        match self {
            ModeKind::Quiz => Box::new(QuizMode::new()),
            ModeKind::Learn => Box::new(LearnMode::new()),
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeKind {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quiz" => Ok(ModeKind::Quiz),
            "learn" => Ok(ModeKind::Learn),
            other => Err(ModeError::UnknownMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_parse() {
        assert_eq!(
            Interaction::from_action("correct-answer", None).unwrap(),
            Interaction::CorrectAnswer
        );
        assert_eq!(
            Interaction::from_action("wrong-answer", Some(2)).unwrap(),
            Interaction::WrongAnswer { slot: 2 }
        );
        assert!(matches!(
            Interaction::from_action("wrong-answer", None),
            Err(ModeError::MissingSlot(_))
        ));
        assert!(matches!(
            Interaction::from_action("shrug", None),
            Err(ModeError::UnsupportedInteraction(_))
        ));
    }

    #[test]
    fn test_mode_kind_builds_named_mode() {
        for kind in [ModeKind::Quiz, ModeKind::Learn] {
            assert_eq!(kind.build().mode_name(), kind.as_str());
            assert_eq!(kind.as_str().parse::<ModeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_mode_name_is_a_parse_error() {
        match "flashcards".parse::<ModeKind>() {
            Err(ModeError::UnknownMode(name)) => assert_eq!(name, "flashcards"),
            other => panic!("expected UnknownMode, got {other:?}"),
        }
    }
}
