use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Lstm, LstmConfig};
use burn::tensor::{backend::Backend, Int, Tensor};

use crate::config::ModelConfig;

/// Embedding plus multi-layer recurrent encoder: sequence in, sequence out,
/// fixed hidden width.
///
/// This is the unit that pretrained artifacts carry; the classification
/// head is never part of it.
#[derive(Module, Debug)]
pub struct FeatureEncoder<B: Backend> {
    embedding: Embedding<B>,
    dropout: Dropout,
    layers: Vec<Lstm<B>>,
}

impl<B: Backend> FeatureEncoder<B> {
    pub fn new(config: &ModelConfig, device: &B::Device) -> Self {
        config.validate();

        let embedding = EmbeddingConfig::new(config.vocab_size, config.embed_size).init(device);
        let dropout = DropoutConfig::new(config.dropout).init();

        let mut layers = Vec::with_capacity(config.num_layers);
        for layer in 0..config.num_layers {
            let d_input = if layer == 0 {
                config.embed_size
            } else {
                config.hidden_size
            };
            layers.push(LstmConfig::new(d_input, config.hidden_size, true).init(device));
        }

        Self {
            embedding,
            dropout,
            layers,
        }
    }

    /// Encode `[batch, seq_len]` token ids into per-timestep hidden states
    /// `[batch, seq_len, hidden_size]`.
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let embedded = self.embedding.forward(tokens);
        let mut hidden = self.dropout.forward(embedded);

        for layer in &self.layers {
            let (output, _state) = layer.forward(hidden, None);
            hidden = output;
        }

        hidden
    }
}
