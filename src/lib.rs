// Library exports for use in binaries and integration tests

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod model;
pub mod training;

// Re-export commonly used types
pub use config::{ModelConfig, TrainConfig};
pub use data::{BucketSampler, Example, WordTokenizer, WorkerPool};
pub use model::SentimentModel;
pub use training::{evaluate, EvalReport, SentimentTrainer};
