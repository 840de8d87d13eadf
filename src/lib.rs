// Library target holds the session engine; the binary in main.rs is a thin
// terminal host around `Controller`. Benchmarks and integration tests import
// through here as well.

pub mod collab;
pub mod config;
pub mod controller;
pub mod engine;
pub mod mode;
pub mod session;
pub mod ui;
pub mod util;
pub mod word;

#[cfg(test)]
mod test_support;

pub use controller::Controller;
pub use mode::{Interaction, ModeKind, RoundOutcome};
pub use session::{FlowState, SessionContext};
