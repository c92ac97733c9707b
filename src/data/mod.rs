mod batcher;
mod dataset;
mod preprocess;
mod sampler;
mod tokenizer;
mod workers;

pub use batcher::{collate, collate_indices, ReviewBatch};
pub use dataset::{Example, RawReview, ReviewDataset};
pub use preprocess::{preprocess_review, preprocess_reviews, PreprocessError};
pub use sampler::BucketSampler;
pub use tokenizer::{Tokenizer, WordTokenizer, PAD_ID, UNK_ID};
pub use workers::WorkerPool;
