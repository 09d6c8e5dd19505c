//! Answer generation grounded in retrieved campaign notes

pub mod prompt;
pub mod synthesizer;

pub use prompt::PromptBuilder;
pub use synthesizer::AnswerSynthesizer;
