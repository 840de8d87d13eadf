pub mod context;
pub mod error;
pub mod flow;
pub mod result;
pub mod state;
pub mod timers;

pub use context::SessionContext;
pub use error::SessionError;
pub use flow::FlowState;
pub use state::{FlowListener, FlowTransition, ListenerId, SessionState};
pub use timers::CancellationToken;
