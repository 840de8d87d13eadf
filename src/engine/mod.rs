pub mod learn_selection;
pub mod learn_state;
pub mod quiz_options;
pub mod quiz_selection;
pub mod quiz_state;

pub use learn_selection::LearnItem;
pub use learn_state::LearnState;
pub use quiz_selection::Target;
pub use quiz_state::{QuizState, RepetitionEntry};
