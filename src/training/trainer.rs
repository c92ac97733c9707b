use anyhow::Result;
use burn::grad_clipping::GradientClippingConfig;
use burn::module::Module;
use burn::nn::loss::BinaryCrossEntropyLossConfig;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsAccumulator, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use std::time::Instant;
use tracing::info;

use crate::config::TrainConfig;
use crate::data::{collate_indices, BucketSampler, Example, ReviewBatch, PAD_ID};
use crate::model::SentimentModel;

/// Aggregate statistics for one finished training epoch.
#[derive(Clone, Debug)]
pub struct EpochStats {
    pub avg_loss: f32,
    pub examples: usize,
    pub words: usize,
    pub seconds: f64,
}

impl EpochStats {
    pub fn words_per_sec(&self) -> f64 {
        if self.seconds > 0.0 {
            self.words as f64 / self.seconds
        } else {
            0.0
        }
    }
}

pub struct SentimentTrainer<B: AutodiffBackend> {
    model: SentimentModel<B>,
    optimizer: OptimizerAdaptor<Adam, SentimentModel<B>, B>,
    config: TrainConfig,
    devices: Vec<B::Device>,
}

impl<B: AutodiffBackend> SentimentTrainer<B> {
    pub fn new(model: SentimentModel<B>, config: TrainConfig, devices: Vec<B::Device>) -> Self {
        assert!(!devices.is_empty(), "at least one device is required");

        let optimizer = AdamConfig::new()
            .with_grad_clipping(
                config
                    .training
                    .grad_clip_norm
                    .map(GradientClippingConfig::Norm),
            )
            .init::<B, SentimentModel<B>>();

        Self {
            model,
            optimizer,
            config,
            devices,
        }
    }

    /// One optimizer step over one batch.
    ///
    /// The batch is split into one shard per device; every shard runs its
    /// own forward and backward pass, gradients are reduced by summation,
    /// and the optimizer steps exactly once. The returned loss is the sum
    /// of per-shard means, matching the reference weighting even when the
    /// split is uneven.
    pub fn train_step(&mut self, batch: &ReviewBatch<B>) -> f32 {
        let shards = split_batch(batch, self.devices.len());

        let mut accumulator = GradientsAccumulator::new();
        let mut loss_total = 0.0f32;

        for (shard, device) in shards.into_iter().zip(&self.devices) {
            let model = self.model.clone().fork(device);
            let loss_fn = BinaryCrossEntropyLossConfig::new()
                .with_logits(true)
                .init(device);

            let logits = model.forward(
                shard.tokens.to_device(device),
                shard.lengths.to_device(device),
            );
            let loss = loss_fn.forward(logits, shard.labels.to_device(device));

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            accumulator.accumulate(&model, grads);

            loss_total += loss.into_scalar().elem::<f32>();
        }

        // Single synchronization point: all shard gradients are in.
        let grads = accumulator.grads();
        self.model = self
            .optimizer
            .step(self.config.learning_rate(), self.model.clone(), grads);

        loss_total
    }

    /// One full pass over the training examples in bucketed batch order.
    pub fn train_epoch(
        &mut self,
        examples: &[Example],
        sampler: &BucketSampler,
        epoch: usize,
    ) -> Result<EpochStats> {
        anyhow::ensure!(!examples.is_empty(), "training set is empty");

        let primary = self.devices[0].clone();
        let log_every = self.config.log_every();
        let num_batches = sampler.num_batches();
        let started = Instant::now();

        let mut interval_loss = 0.0f32;
        let mut interval_words = 0usize;
        let mut interval_started = Instant::now();

        let mut epoch_loss = 0.0f32;
        let mut epoch_words = 0usize;
        let mut epoch_examples = 0usize;

        for (step, indices) in sampler.iter_epoch(epoch).enumerate() {
            let batch = collate_indices::<B>(examples, &indices, PAD_ID, &primary);
            let words = batch.num_words();
            let loss = self.train_step(&batch);

            interval_loss += loss;
            interval_words += words;
            epoch_loss += loss;
            epoch_words += words;
            epoch_examples += indices.len();

            if (step + 1) % log_every == 0 {
                let elapsed = interval_started.elapsed().as_secs_f64();
                let wps = if elapsed > 0.0 {
                    interval_words as f64 / elapsed
                } else {
                    0.0
                };
                info!(
                    "Epoch {} batch {}/{}: loss = {:.6}, {:.0} words/sec",
                    epoch,
                    step + 1,
                    num_batches,
                    interval_loss / log_every as f32,
                    wps
                );
                interval_loss = 0.0;
                interval_words = 0;
                interval_started = Instant::now();
            }
        }

        let seconds = started.elapsed().as_secs_f64();
        let batches = num_batches.max(1);

        Ok(EpochStats {
            avg_loss: epoch_loss / batches as f32,
            examples: epoch_examples,
            words: epoch_words,
            seconds,
        })
    }

    pub fn model(&self) -> &SentimentModel<B> {
        &self.model
    }

    pub fn into_model(self) -> SentimentModel<B> {
        self.model
    }
}

/// Split a batch into `num_shards` shards along the batch dimension.
///
/// The split is even when possible; otherwise the remainder is spread one
/// example at a time over the leading shards. Shards that would be empty
/// (batch smaller than the device count) are not emitted.
pub fn split_batch<B: AutodiffBackend>(
    batch: &ReviewBatch<B>,
    num_shards: usize,
) -> Vec<ReviewBatch<B>> {
    let batch_size = batch.batch_size();
    let seq_len = batch.tokens.dims()[1];
    let num_shards = num_shards.min(batch_size).max(1);

    let base = batch_size / num_shards;
    let remainder = batch_size % num_shards;

    let mut shards = Vec::with_capacity(num_shards);
    let mut start = 0;

    for shard_idx in 0..num_shards {
        let size = base + usize::from(shard_idx < remainder);
        let end = start + size;

        shards.push(ReviewBatch {
            tokens: batch.tokens.clone().slice([start..end, 0..seq_len]),
            labels: batch.labels.clone().slice([start..end]),
            lengths: batch.lengths.clone().slice([start..end]),
        });

        start = end;
    }

    shards
}
