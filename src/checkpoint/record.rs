use anyhow::{Context, Result};
use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::TrainConfig;
use crate::data::WordTokenizer;
use crate::model::SentimentModel;

/// Checkpoint metadata written next to the model weights.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointData {
    pub epoch: usize,
    pub config: TrainConfig,
    pub model_file: String,
    pub tokenizer_file: String,
}

/// Save model weights, the tokenizer, and training metadata for one epoch.
pub fn save_checkpoint<B: Backend>(
    model: &SentimentModel<B>,
    tokenizer: &WordTokenizer,
    epoch: usize,
    config: &TrainConfig,
    checkpoint_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(checkpoint_dir)
        .with_context(|| format!("Failed to create checkpoint directory: {:?}", checkpoint_dir))?;

    let checkpoint_name = format!("checkpoint_epoch_{}", epoch);

    let model_file = format!("{}_model", checkpoint_name);
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(
            model.clone().into_record(),
            checkpoint_dir.join(&model_file),
        )
        .with_context(|| "Failed to save model weights")?;

    let tokenizer_file = format!("{}_vocab.json", checkpoint_name);
    tokenizer.save(&checkpoint_dir.join(&tokenizer_file))?;

    let checkpoint_data = CheckpointData {
        epoch,
        config: config.clone(),
        model_file,
        tokenizer_file,
    };

    let metadata_path = checkpoint_dir.join(checkpoint_name).with_extension("json");
    let metadata_json = serde_json::to_string_pretty(&checkpoint_data)
        .with_context(|| "Failed to serialize checkpoint metadata")?;

    fs::write(&metadata_path, metadata_json)
        .with_context(|| format!("Failed to write checkpoint metadata: {:?}", metadata_path))?;

    info!("Checkpoint saved for epoch {}: {:?}", epoch, metadata_path);

    Ok(metadata_path)
}

/// Restore a model, its tokenizer, and the config it was trained with.
pub fn load_checkpoint<B: Backend>(
    checkpoint_path: &Path,
    device: &B::Device,
) -> Result<(SentimentModel<B>, WordTokenizer, usize, TrainConfig)> {
    let metadata_json = fs::read_to_string(checkpoint_path)
        .with_context(|| format!("Failed to read checkpoint file: {:?}", checkpoint_path))?;

    let checkpoint_data: CheckpointData = serde_json::from_str(&metadata_json)
        .with_context(|| "Failed to parse checkpoint metadata")?;

    info!("Loading checkpoint from epoch {}", checkpoint_data.epoch);

    let checkpoint_dir = checkpoint_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid checkpoint path"))?;

    let tokenizer = WordTokenizer::load(&checkpoint_dir.join(&checkpoint_data.tokenizer_file))?;

    let model = SentimentModel::<B>::new(&checkpoint_data.config.model, device);

    let model_path = checkpoint_dir.join(&checkpoint_data.model_file);
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(model_path.clone(), device)
        .with_context(|| format!("Failed to load model weights from: {:?}", model_path))?;

    let model = model.load_record(record);

    info!("Model weights loaded successfully");

    Ok((
        model,
        tokenizer,
        checkpoint_data.epoch,
        checkpoint_data.config,
    ))
}

/// List all available checkpoints in a directory, sorted by epoch.
pub fn list_checkpoints(checkpoint_dir: &Path) -> Result<Vec<(PathBuf, usize)>> {
    if !checkpoint_dir.exists() {
        warn!("Checkpoint directory does not exist: {:?}", checkpoint_dir);
        return Ok(Vec::new());
    }

    let mut checkpoints = Vec::new();

    for entry in WalkDir::new(checkpoint_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            if let Ok(metadata_json) = fs::read_to_string(path) {
                if let Ok(checkpoint_data) = serde_json::from_str::<CheckpointData>(&metadata_json)
                {
                    checkpoints.push((path.to_path_buf(), checkpoint_data.epoch));
                }
            }
        }
    }

    checkpoints.sort_by_key(|(_, epoch)| *epoch);

    Ok(checkpoints)
}
