mod eval;
mod trainer;

pub use eval::{evaluate, EvalReport};
pub use trainer::{split_batch, EpochStats, SentimentTrainer};
