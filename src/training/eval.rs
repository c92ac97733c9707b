use anyhow::Result;
use burn::nn::loss::BinaryCrossEntropyLossConfig;
use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;

use crate::data::{collate_indices, BucketSampler, Example, PAD_ID};
use crate::model::SentimentModel;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalReport {
    pub avg_loss: f32,
    pub accuracy: f32,
    pub examples: usize,
}

/// Run the model over the evaluation set once, in deterministic order,
/// without touching parameters or gradients.
///
/// Predictions use the 0.5 probability threshold, i.e. logit > 0. Run this
/// with the model on a non-autodiff backend (`model.valid()`).
pub fn evaluate<B: Backend>(
    model: &SentimentModel<B>,
    examples: &[Example],
    sampler: &BucketSampler,
    device: &B::Device,
) -> Result<EvalReport> {
    anyhow::ensure!(!examples.is_empty(), "evaluation set is empty");

    let loss_fn = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(device);

    let mut total_loss = 0.0f64;
    let mut correct = 0i64;
    let mut total = 0usize;

    for indices in sampler.iter_eval() {
        let batch = collate_indices::<B>(examples, &indices, PAD_ID, device);
        let batch_size = batch.batch_size();

        let logits = model.forward(batch.tokens, batch.lengths);
        let loss = loss_fn.forward(logits.clone(), batch.labels.clone());

        // Per-batch mean scaled back to a sum so the final average is over
        // examples, not batches.
        total_loss += loss.into_scalar().elem::<f64>() * batch_size as f64;

        let predictions = logits.greater_elem(0.0).int();
        correct += predictions
            .equal(batch.labels)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();
        total += batch_size;
    }

    Ok(EvalReport {
        avg_loss: (total_loss / total as f64) as f32,
        accuracy: correct as f32 / total as f32,
        examples: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BucketConfig, ModelConfig};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn fixture() -> (SentimentModel<TestBackend>, Vec<Example>, BucketSampler) {
        let device = Default::default();
        <TestBackend as Backend>::seed(&device, 3);

        let config = ModelConfig {
            vocab_size: 32,
            embed_size: 8,
            hidden_size: 8,
            num_layers: 1,
            ..Default::default()
        };
        let model = SentimentModel::new(&config, &device);

        let examples: Vec<Example> = (0..20)
            .map(|i| Example::new(vec![2 + (i % 5) as i64; 2 + i % 6], (i % 2) as i64))
            .collect();
        let lengths: Vec<usize> = examples.iter().map(|e| e.length).collect();
        let sampler = BucketSampler::new(&lengths, &BucketConfig::default(), 4, 0);

        (model, examples, sampler)
    }

    #[test]
    fn test_empty_eval_set_is_fatal() {
        let (model, _, sampler) = fixture();
        let device = Default::default();

        assert!(evaluate(&model, &[], &sampler, &device).is_err());
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let (model, examples, sampler) = fixture();
        let device = Default::default();

        let a = evaluate(&model, &examples, &sampler, &device).unwrap();
        let b = evaluate(&model, &examples, &sampler, &device).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.examples, 20);
    }

    #[test]
    fn test_metrics_are_bounded() {
        let (model, examples, sampler) = fixture();
        let device = Default::default();

        let report = evaluate(&model, &examples, &sampler, &device).unwrap();
        assert!(report.avg_loss.is_finite());
        assert!((0.0..=1.0).contains(&report.accuracy));
    }
}
