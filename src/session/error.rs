use thiserror::Error;

use crate::session::flow::FlowState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("illegal flow transition {from} -> {to}")]
    IllegalTransition { from: FlowState, to: FlowState },
    #[error("unknown flow state: {0}")]
    UnknownFlowState(String),
}
