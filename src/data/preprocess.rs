use thiserror::Error;
use tracing::info;

use super::dataset::{Example, RawReview};
use super::tokenizer::Tokenizer;
use super::workers::WorkerPool;
use crate::config::DataConfig;

#[derive(Debug, Error)]
pub enum PreprocessError {
    /// Empty token sequences would break masked mean pooling downstream,
    /// so they are rejected before they can reach the bucketer.
    #[error("review {index} tokenized to an empty sequence")]
    EmptyExample { index: usize },
}

/// Turn one raw review into a training example.
///
/// The token sequence is clipped to `clip_max` before vocabulary lookup;
/// unknown words resolve to the unknown id rather than failing. Ratings
/// strictly above the threshold are positive.
pub fn preprocess_review<T: Tokenizer + ?Sized>(
    review: &RawReview,
    index: usize,
    tokenizer: &T,
    config: &DataConfig,
) -> Result<Example, PreprocessError> {
    let mut tokens = tokenizer.tokenize(&review.text);
    tokens.truncate(config.clip_max);

    if tokens.is_empty() {
        return Err(PreprocessError::EmptyExample { index });
    }

    let ids = tokenizer.lookup(&tokens);
    let label = i64::from(review.rating > config.rating_threshold);

    Ok(Example::new(ids, label))
}

/// Preprocess a whole split on the worker pool. Output is index-aligned
/// with the input; the first empty example aborts the run.
pub fn preprocess_reviews<T: Tokenizer>(
    reviews: &[RawReview],
    tokenizer: &T,
    config: &DataConfig,
    pool: &WorkerPool,
) -> Result<Vec<Example>, PreprocessError> {
    let results = pool.map(reviews, |index, review| {
        preprocess_review(review, index, tokenizer, config)
    });

    let examples: Vec<Example> = results.into_iter().collect::<Result<_, _>>()?;

    info!(
        "Preprocessed {} reviews on {} workers",
        examples.len(),
        pool.workers()
    );

    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tokenizer::WordTokenizer;

    fn fixture() -> (WordTokenizer, DataConfig) {
        let tokenizer =
            WordTokenizer::from_corpus(["this movie is amazing truly awful boring"], 100);
        (tokenizer, DataConfig::default())
    }

    #[test]
    fn test_length_matches_token_count() {
        let (tokenizer, config) = fixture();
        let review = RawReview {
            text: "This movie is amazing".to_string(),
            rating: 9,
        };

        let example = preprocess_review(&review, 0, &tokenizer, &config).unwrap();
        assert_eq!(example.length, 4);
        assert_eq!(example.tokens.len(), 4);
        assert_eq!(example.label, 1);
    }

    #[test]
    fn test_clipping_bounds_length() {
        let (tokenizer, mut config) = fixture();
        config.clip_max = 3;
        let review = RawReview {
            text: "this movie is amazing truly".to_string(),
            rating: 2,
        };

        let example = preprocess_review(&review, 0, &tokenizer, &config).unwrap();
        assert_eq!(example.length, 3);
        assert_eq!(example.label, 0);
    }

    #[test]
    fn test_unknown_words_never_fail() {
        let (tokenizer, config) = fixture();
        let review = RawReview {
            text: "unseen vocabulary everywhere".to_string(),
            rating: 10,
        };

        let example = preprocess_review(&review, 0, &tokenizer, &config).unwrap();
        assert!(example.tokens.iter().all(|&id| id == tokenizer.unk_id()));
    }

    #[test]
    fn test_empty_review_rejected() {
        let (tokenizer, config) = fixture();
        let review = RawReview {
            text: "   ".to_string(),
            rating: 7,
        };

        let err = preprocess_review(&review, 3, &tokenizer, &config).unwrap_err();
        assert!(matches!(err, PreprocessError::EmptyExample { index: 3 }));
    }

    #[test]
    fn test_parallel_output_is_index_aligned() {
        let (tokenizer, config) = fixture();
        let reviews: Vec<RawReview> = (0..50)
            .map(|i| RawReview {
                text: if i % 2 == 0 {
                    "this movie is amazing".to_string()
                } else {
                    "truly awful".to_string()
                },
                rating: if i % 2 == 0 { 9 } else { 1 },
            })
            .collect();

        let pool = WorkerPool::new(4);
        let examples = preprocess_reviews(&reviews, &tokenizer, &config, &pool).unwrap();

        assert_eq!(examples.len(), 50);
        for (i, example) in examples.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(example.length, 4);
                assert_eq!(example.label, 1);
            } else {
                assert_eq!(example.length, 2);
                assert_eq!(example.label, 0);
            }
        }
    }
}
