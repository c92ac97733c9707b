use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub vocab_size: usize,
    pub embed_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub dropout: f64,
    /// When set, the embedding + encoder weights are loaded from this
    /// artifact directory instead of being randomly initialized.
    pub pretrained_dir: Option<PathBuf>,
    /// Keep the pretrained block fixed and train only the head.
    pub freeze_encoder: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            vocab_size: 20_000,
            embed_size: 200,
            hidden_size: 200,
            num_layers: 2,
            dropout: 0.1,
            pretrained_dir: None,
            freeze_encoder: false,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) {
        assert!(self.vocab_size > 2, "vocab_size must exceed the reserved ids");
        assert!(self.embed_size > 0, "embed_size must be > 0");
        assert!(self.hidden_size > 0, "hidden_size must be > 0");
        assert!(self.num_layers > 0, "num_layers must be > 0");
        assert!(
            (0.0..1.0).contains(&self.dropout),
            "dropout must be within [0, 1)"
        );
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Token sequences are clipped to this many tokens before lookup.
    pub clip_max: usize,
    /// Ratings strictly above this are labeled positive.
    pub rating_threshold: u8,
    /// Worker count for preprocessing; defaults to available cores.
    pub workers: Option<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            clip_max: 500,
            rating_threshold: 5,
            workers: None,
        }
    }
}

impl DataConfig {
    pub fn validate(&self) {
        assert!(self.clip_max > 0, "clip_max must be > 0");
        if let Some(workers) = self.workers {
            assert!(workers > 0, "workers must be > 0 when set");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    pub num_buckets: usize,
    /// Scales batch size up for short buckets so padded token volume per
    /// batch stays roughly constant. 0 disables the scaling.
    pub bucket_ratio: f64,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            num_buckets: 10,
            bucket_ratio: 0.5,
        }
    }
}

impl BucketConfig {
    pub fn validate(&self) {
        assert!(self.num_buckets > 0, "num_buckets must be > 0");
        assert!(
            (0.0..=1.0).contains(&self.bucket_ratio),
            "bucket_ratio must be within [0, 1]"
        );
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub batch_size: usize,
    pub num_epochs: usize,
    pub learning_rate: f64,
    pub num_devices: usize,
    /// Global gradient-norm bound; None disables clipping.
    pub grad_clip_norm: Option<f32>,
    pub log_every: usize,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            num_epochs: 1,
            learning_rate: 5e-3,
            num_devices: 1,
            grad_clip_norm: None,
            log_every: 100,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) {
        assert!(self.batch_size > 0, "batch_size must be > 0");
        assert!(self.num_epochs > 0, "num_epochs must be > 0");
        assert!(self.learning_rate > 0.0, "learning_rate must be > 0");
        assert!(self.num_devices > 0, "num_devices must be > 0");
        assert!(self.log_every > 0, "log_every must be > 0");
        if let Some(norm) = self.grad_clip_norm {
            assert!(norm > 0.0, "grad_clip_norm must be > 0 when set");
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub model: ModelConfig,
    pub data: DataConfig,
    pub bucket: BucketConfig,
    pub training: TrainingConfig,
}

impl TrainConfig {
    pub fn validate(&self) {
        self.model.validate();
        self.data.validate();
        self.bucket.validate();
        self.training.validate();
    }

    pub fn batch_size(&self) -> usize {
        self.training.batch_size
    }

    pub fn num_epochs(&self) -> usize {
        self.training.num_epochs
    }

    pub fn learning_rate(&self) -> f64 {
        self.training.learning_rate
    }

    pub fn log_every(&self) -> usize {
        self.training.log_every
    }

    pub fn seed(&self) -> u64 {
        self.training.seed
    }
}

impl fmt::Display for TrainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
