use anyhow::{Context, Result};
use burn::backend::Autodiff;
use burn::module::AutodiffModule;
use burn_ndarray::NdArray;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sentiment_model::checkpoint::{load_checkpoint, save_checkpoint};
use sentiment_model::config::TrainConfig;
use sentiment_model::data::{
    preprocess_reviews, BucketSampler, Example, ReviewDataset, Tokenizer, WordTokenizer,
    WorkerPool,
};
use sentiment_model::model::{load_pretrained, SentimentModel};
use sentiment_model::training::{evaluate, SentimentTrainer};

type Backend = Autodiff<NdArray<f32>>;
type InferenceBackend = NdArray<f32>;

#[derive(Debug, Parser)]
#[command(author, version, about = "Sentiment classifier fine-tuning CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fine-tune the sentiment model on a review dataset
    Train(TrainArgs),
    /// Evaluate a saved checkpoint on the test split
    Eval(EvalArgs),
}

#[derive(Debug, Args)]
struct TrainArgs {
    /// Path to configuration JSON file
    #[arg(long)]
    config: PathBuf,
    /// Dataset root with train/{pos,neg} and test/{pos,neg} subdirectories
    #[arg(long)]
    data_dir: PathBuf,
    /// Directory for per-epoch checkpoints
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: PathBuf,
}

#[derive(Debug, Args)]
struct EvalArgs {
    /// Path to checkpoint metadata JSON
    #[arg(long)]
    checkpoint: PathBuf,
    /// Dataset root containing the test split
    #[arg(long)]
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Eval(args) => eval_command(args),
    }
}

fn preprocess_split(
    dataset: &ReviewDataset,
    tokenizer: &WordTokenizer,
    config: &TrainConfig,
    pool: &WorkerPool,
) -> Result<Vec<Example>> {
    let examples = preprocess_reviews(dataset.reviews(), tokenizer, &config.data, pool)
        .context("Preprocessing failed")?;
    Ok(examples)
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Loading configuration from: {:?}", args.config);

    let config_str = fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read config file: {:?}", args.config))?;

    let config: TrainConfig =
        serde_json::from_str(&config_str).with_context(|| "Failed to parse config JSON")?;
    config.validate();

    info!(
        "Model config: embed_size={}, hidden_size={}, num_layers={}, vocab_size={}",
        config.model.embed_size,
        config.model.hidden_size,
        config.model.num_layers,
        config.model.vocab_size
    );

    let device = Default::default();
    <Backend as burn::tensor::backend::Backend>::seed(&device, config.seed());
    let devices = vec![device; config.training.num_devices];

    info!("Loading dataset from {:?}", args.data_dir);
    let train_set = ReviewDataset::from_dir(&args.data_dir, "train")?;
    let test_set = ReviewDataset::from_dir(&args.data_dir, "test")?;

    // Vocabulary and encoder either come from a pretrained artifact or are
    // built fresh from the training split.
    let (model, tokenizer) = match &config.model.pretrained_dir {
        Some(dir) => {
            let bundle = load_pretrained::<Backend>(dir, &config.model, true, &devices[0])?;
            let model = SentimentModel::with_encoder(bundle.encoder, &config.model, &devices[0]);
            (model, bundle.vocab)
        }
        None => {
            let tokenizer = WordTokenizer::from_corpus(
                train_set.reviews().iter().map(|r| r.text.as_str()),
                config.model.vocab_size,
            );
            info!("Built vocabulary with {} entries", tokenizer.vocab_size());
            let model = SentimentModel::<Backend>::new(&config.model, &devices[0]);
            (model, tokenizer)
        }
    };

    let pool = match config.data.workers {
        Some(workers) => WorkerPool::new(workers),
        None => WorkerPool::with_available_parallelism(),
    };

    let train_examples = preprocess_split(&train_set, &tokenizer, &config, &pool)?;
    let test_examples = preprocess_split(&test_set, &tokenizer, &config, &pool)?;

    let train_lengths: Vec<usize> = train_examples.iter().map(|e| e.length).collect();
    let test_lengths: Vec<usize> = test_examples.iter().map(|e| e.length).collect();

    let train_sampler = BucketSampler::new(
        &train_lengths,
        &config.bucket,
        config.batch_size(),
        config.seed(),
    );
    let eval_sampler = BucketSampler::new(
        &test_lengths,
        &config.bucket,
        config.batch_size(),
        config.seed(),
    );

    info!(
        "Training on {} examples ({} batches/epoch), evaluating on {}",
        train_examples.len(),
        train_sampler.num_batches(),
        test_examples.len()
    );

    let mut trainer = SentimentTrainer::new(model, config.clone(), devices.clone());

    for epoch in 0..config.num_epochs() {
        let stats = trainer.train_epoch(&train_examples, &train_sampler, epoch)?;
        info!(
            "Epoch {} done: avg loss = {:.6}, {} examples, {:.0} words/sec",
            epoch,
            stats.avg_loss,
            stats.examples,
            stats.words_per_sec()
        );

        let report = evaluate(
            &trainer.model().valid(),
            &test_examples,
            &eval_sampler,
            &devices[0],
        )?;
        info!(
            "Epoch {} eval: loss = {:.6}, accuracy = {:.4}",
            epoch, report.avg_loss, report.accuracy
        );

        save_checkpoint(
            trainer.model(),
            &tokenizer,
            epoch,
            &config,
            &args.checkpoint_dir,
        )?;
    }

    info!("Training completed!");
    Ok(())
}

fn eval_command(args: EvalArgs) -> Result<()> {
    let device = Default::default();

    let (model, tokenizer, epoch, config) =
        load_checkpoint::<InferenceBackend>(&args.checkpoint, &device)?;
    info!("Evaluating checkpoint from epoch {}", epoch);

    let test_set = ReviewDataset::from_dir(&args.data_dir, "test")?;

    let pool = match config.data.workers {
        Some(workers) => WorkerPool::new(workers),
        None => WorkerPool::with_available_parallelism(),
    };
    let examples = preprocess_split(&test_set, &tokenizer, &config, &pool)?;

    let lengths: Vec<usize> = examples.iter().map(|e| e.length).collect();
    let sampler = BucketSampler::new(&lengths, &config.bucket, config.batch_size(), config.seed());

    let report = evaluate(&model, &examples, &sampler, &device)?;
    info!(
        "Eval: loss = {:.6}, accuracy = {:.4} over {} examples",
        report.avg_loss, report.accuracy, report.examples
    );

    Ok(())
}
