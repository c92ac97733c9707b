use anyhow::{Context, Result};
use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::backend::Backend;
use std::path::Path;
use tracing::info;

use super::encoder::FeatureEncoder;
use crate::config::ModelConfig;
use crate::data::{Tokenizer, WordTokenizer};

const ENCODER_FILE: &str = "encoder";
const VOCAB_FILE: &str = "vocab.json";

/// A pretrained language-model block: the encoder weights together with the
/// vocabulary they were trained against.
pub struct PretrainedBundle<B: Backend> {
    pub encoder: FeatureEncoder<B>,
    pub vocab: WordTokenizer,
}

/// Load a pretrained encoder + vocabulary from an artifact directory.
///
/// With `pretrained` off, only the vocabulary is read and the encoder is
/// freshly initialized — useful for ablations against random weights.
pub fn load_pretrained<B: Backend>(
    dir: &Path,
    config: &ModelConfig,
    pretrained: bool,
    device: &B::Device,
) -> Result<PretrainedBundle<B>> {
    let vocab = WordTokenizer::load(&dir.join(VOCAB_FILE))
        .with_context(|| format!("Failed to load pretrained vocabulary from {:?}", dir))?;

    anyhow::ensure!(
        vocab.vocab_size() <= config.vocab_size,
        "pretrained vocabulary ({} entries) exceeds configured vocab_size ({})",
        vocab.vocab_size(),
        config.vocab_size
    );

    let encoder = FeatureEncoder::<B>::new(config, device);
    let encoder = if pretrained {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(dir.join(ENCODER_FILE), device)
            .with_context(|| format!("Failed to load pretrained encoder from {:?}", dir))?;
        info!("Loaded pretrained encoder weights from {:?}", dir);
        encoder.load_record(record)
    } else {
        info!("Pretrained weights disabled; encoder randomly initialized");
        encoder
    };

    Ok(PretrainedBundle { encoder, vocab })
}

/// Write an encoder + vocabulary artifact directory.
pub fn save_pretrained<B: Backend>(
    encoder: &FeatureEncoder<B>,
    vocab: &WordTokenizer,
    dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create artifact directory: {:?}", dir))?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(encoder.clone().into_record(), dir.join(ENCODER_FILE))
        .with_context(|| "Failed to save encoder weights")?;

    vocab.save(&dir.join(VOCAB_FILE))?;

    info!("Pretrained artifact written to {:?}", dir);
    Ok(())
}
