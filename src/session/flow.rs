use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::session::error::SessionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    Idle,
    Loading,
    QuizReady,
    ShowingQuestion,
    IntroducingWords,
    ProcessingAnswer,
    ShowingResults,
    SwitchingMode,
    Closing,
}

impl FlowState {
    pub fn all() -> &'static [FlowState] {
        &[
            FlowState::Idle,
            FlowState::Loading,
            FlowState::QuizReady,
            FlowState::ShowingQuestion,
            FlowState::IntroducingWords,
            FlowState::ProcessingAnswer,
            FlowState::ShowingResults,
            FlowState::SwitchingMode,
            FlowState::Closing,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlowState::Idle => "IDLE",
            FlowState::Loading => "LOADING",
            FlowState::QuizReady => "QUIZ_READY",
            FlowState::ShowingQuestion => "SHOWING_QUESTION",
            FlowState::IntroducingWords => "INTRODUCING_WORDS",
            FlowState::ProcessingAnswer => "PROCESSING_ANSWER",
            FlowState::ShowingResults => "SHOWING_RESULTS",
            FlowState::SwitchingMode => "SWITCHING_MODE",
            FlowState::Closing => "CLOSING",
        }
    }

    /// Targets reachable from this state through a regular transition.
    pub fn allowed_targets(self) -> &'static [FlowState] {
        use FlowState::*;
        match self {
            Idle => &[Loading, Closing],
            Loading => &[
                QuizReady,
                IntroducingWords,
                ShowingResults,
                SwitchingMode,
                Closing,
            ],
            QuizReady => &[
                ShowingQuestion,
                IntroducingWords,
                ShowingResults,
                SwitchingMode,
                Closing,
            ],
            ShowingQuestion => &[ProcessingAnswer, SwitchingMode, Closing],
            IntroducingWords => &[QuizReady, SwitchingMode, Closing],
            ProcessingAnswer => &[QuizReady, ShowingResults, SwitchingMode, Closing],
            ShowingResults => &[SwitchingMode, Closing, Idle],
            SwitchingMode => &[Loading, Closing],
            Closing => &[Idle],
        }
    }

    pub fn can_transition_to(self, target: FlowState) -> bool {
        self.allowed_targets().contains(&target)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowState {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlowState::all()
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| SessionError::UnknownFlowState(s.to_string()))
    }
}
