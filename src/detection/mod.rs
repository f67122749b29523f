pub mod history;
pub mod trigger;

pub use history::{KwsResult, ResultHistory};
pub use trigger::{TriggerDetector, TriggerPolicy};
