pub mod classify;
pub mod format;
pub mod gather;
pub mod orchestrator;
pub mod plan;
pub mod synthesize;

pub use classify::PRESET_QUESTIONS;
pub use gather::{CannedSource, ContextSource, PriceFeedSource};
pub use orchestrator::{Analysis, run_analysis};
