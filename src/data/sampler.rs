use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::config::BucketConfig;

/// Length-bucketed batch sampler.
///
/// Examples are partitioned into buckets of similar length so padding waste
/// stays low, and shorter buckets get proportionally larger batch sizes so
/// the padded token volume per batch stays roughly bounded. Each call to
/// [`iter_epoch`](Self::iter_epoch) yields one full pass over every example
/// exactly once, shuffled within and across buckets; [`iter_eval`]
/// (Self::iter_eval) is the deterministic in-order variant.
#[derive(Debug, Clone)]
pub struct BucketSampler {
    /// Ascending representative lengths, one per bucket. The last key is
    /// the maximum observed length.
    keys: Vec<usize>,
    batch_sizes: Vec<usize>,
    /// Example indices per bucket, in dataset order.
    buckets: Vec<Vec<usize>>,
    seed: u64,
}

impl BucketSampler {
    /// Build a sampler from cached example lengths.
    ///
    /// Bucket keys are quantiles of the length distribution, which skews
    /// buckets toward the (typically more numerous) short sequences.
    /// `bucket_ratio` scales batch sizes up for short buckets; the batch
    /// size never drops below `batch_size`.
    pub fn new(lengths: &[usize], config: &BucketConfig, batch_size: usize, seed: u64) -> Self {
        assert!(!lengths.is_empty(), "cannot bucket an empty dataset");
        assert!(batch_size > 0, "batch_size must be > 0");

        let keys = quantile_keys(lengths, config.num_buckets);
        let max_key = *keys.last().expect("at least one bucket key");

        let batch_sizes: Vec<usize> = keys
            .iter()
            .map(|&key| {
                let scaled =
                    (batch_size as f64 * config.bucket_ratio * max_key as f64 / key as f64) as usize;
                scaled.max(batch_size)
            })
            .collect();

        let mut buckets = vec![Vec::new(); keys.len()];
        for (index, &length) in lengths.iter().enumerate() {
            buckets[bucket_for(&keys, length)].push(index);
        }

        debug!(
            "Bucket keys: {:?}, batch sizes: {:?}, occupancy: {:?}",
            keys,
            batch_sizes,
            buckets.iter().map(Vec::len).collect::<Vec<_>>()
        );

        Self {
            keys,
            batch_sizes,
            buckets,
            seed,
        }
    }

    pub fn keys(&self) -> &[usize] {
        &self.keys
    }

    /// Bucket key assigned to an example of the given length.
    pub fn key_for(&self, length: usize) -> usize {
        self.keys[bucket_for(&self.keys, length)]
    }

    /// Total number of batches in one pass.
    pub fn num_batches(&self) -> usize {
        self.buckets
            .iter()
            .zip(&self.batch_sizes)
            .map(|(bucket, &bs)| bucket.len().div_ceil(bs))
            .sum()
    }

    /// One shuffled pass over all examples. The shuffle is reproducible:
    /// it depends only on the sampler seed and the epoch number.
    pub fn iter_epoch(&self, epoch: usize) -> impl Iterator<Item = Vec<usize>> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
        let mut batches = Vec::with_capacity(self.num_batches());

        for (bucket, &bs) in self.buckets.iter().zip(&self.batch_sizes) {
            let mut indices = bucket.clone();
            indices.shuffle(&mut rng);
            for chunk in indices.chunks(bs) {
                batches.push(chunk.to_vec());
            }
        }

        batches.shuffle(&mut rng);
        batches.into_iter()
    }

    /// One deterministic, in-order pass for evaluation.
    pub fn iter_eval(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        self.buckets
            .iter()
            .zip(&self.batch_sizes)
            .flat_map(|(bucket, &bs)| bucket.chunks(bs).map(<[usize]>::to_vec))
    }
}

/// Quantile-based bucket keys, ascending and deduplicated. The last key
/// always equals the maximum length so in-range assignment never fails.
fn quantile_keys(lengths: &[usize], num_buckets: usize) -> Vec<usize> {
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let mut keys: Vec<usize> = (1..=num_buckets)
        .map(|i| sorted[(n * i).div_ceil(num_buckets).min(n) - 1])
        .collect();
    keys.dedup();
    keys
}

/// First bucket whose key covers `length`; oversized lengths clamp into the
/// last bucket rather than being dropped.
fn bucket_for(keys: &[usize], length: usize) -> usize {
    keys.partition_point(|&key| key < length)
        .min(keys.len() - 1)
}
