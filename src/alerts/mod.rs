// Alert rules and the engine that evaluates them

mod engine;
mod rules;

pub use engine::{AlertEngine, DEFAULT_DEDUP_WINDOW_SECS};
pub use rules::AlertRuleSet;
