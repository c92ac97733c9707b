use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::{activation::sigmoid, backend::Backend, Int, Tensor};

use super::encoder::FeatureEncoder;
use crate::config::ModelConfig;

/// Binary sentiment classifier: a feature encoder composed with a freshly
/// initialized linear head over a masked mean pool of the encoder output.
#[derive(Module, Debug)]
pub struct SentimentModel<B: Backend> {
    encoder: FeatureEncoder<B>,
    dropout: Dropout,
    head: Linear<B>,
}

impl<B: Backend> SentimentModel<B> {
    pub fn new(config: &ModelConfig, device: &B::Device) -> Self {
        let encoder = FeatureEncoder::new(config, device);
        Self::with_encoder(encoder, config, device)
    }

    /// Attach a new head to an existing (typically pretrained) encoder.
    pub fn with_encoder(
        encoder: FeatureEncoder<B>,
        config: &ModelConfig,
        device: &B::Device,
    ) -> Self {
        let encoder = if config.freeze_encoder {
            encoder.no_grad()
        } else {
            encoder
        };
        let dropout = DropoutConfig::new(config.dropout).init();
        let head = LinearConfig::new(config.hidden_size, 1).init(device);

        Self {
            encoder,
            dropout,
            head,
        }
    }

    /// Forward pass producing one raw logit per example.
    ///
    /// `tokens` is `[batch, seq_len]` padded; `lengths` holds each row's
    /// true length and must be >= 1 everywhere (preprocessing rejects empty
    /// examples, so padded rows never reduce a divisor to zero).
    pub fn forward(&self, tokens: Tensor<B, 2, Int>, lengths: Tensor<B, 1>) -> Tensor<B, 1> {
        let [batch_size, _seq_len] = tokens.dims();

        let encoded = self.encoder.forward(tokens);
        let pooled = masked_mean(encoded, lengths);
        let pooled = self.dropout.forward(pooled);

        self.head.forward(pooled).reshape([batch_size])
    }

    /// Inference: sigmoid over the logit, probability of positive sentiment.
    pub fn predict(&self, tokens: Tensor<B, 2, Int>, lengths: Tensor<B, 1>) -> Tensor<B, 1> {
        sigmoid(self.forward(tokens, lengths))
    }

    pub fn encoder(&self) -> &FeatureEncoder<B> {
        &self.encoder
    }
}

/// Mean over the time axis counting only valid timesteps.
///
/// Positions at or beyond a row's valid length are zeroed before summing,
/// and the sum is divided by the valid length rather than the padded
/// sequence length.
pub fn masked_mean<B: Backend>(encoded: Tensor<B, 3>, lengths: Tensor<B, 1>) -> Tensor<B, 2> {
    let [batch_size, seq_len, hidden] = encoded.dims();
    let device = encoded.device();

    let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
        .float()
        .reshape([1, seq_len])
        .repeat_dim(0, batch_size);
    let bounds = lengths.clone().reshape([batch_size, 1]).repeat_dim(1, seq_len);
    let mask = positions.lower(bounds).float();

    let masked = encoded * mask.reshape([batch_size, seq_len, 1]).repeat_dim(2, hidden);
    let summed = masked.sum_dim(1).reshape([batch_size, hidden]);

    summed / lengths.reshape([batch_size, 1]).repeat_dim(1, hidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn small_config() -> ModelConfig {
        ModelConfig {
            vocab_size: 50,
            embed_size: 8,
            hidden_size: 12,
            num_layers: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_masked_mean_ignores_padding() {
        let device = Default::default();
        // All-ones hidden states, valid length 3 of 5: the pooled value
        // must be exactly 1, not 3/5.
        let encoded = Tensor::<TestBackend, 3>::ones([1, 5, 4], &device);
        let lengths = Tensor::<TestBackend, 1>::from_floats([3.0], &device);

        let pooled = masked_mean(encoded, lengths);
        assert_eq!(pooled.dims(), [1, 4]);

        let values = pooled.into_data().to_vec::<f32>().unwrap();
        for value in values {
            assert!((value - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_masked_mean_per_row_divisors() {
        let device = Default::default();
        let encoded = Tensor::<TestBackend, 3>::ones([2, 4, 2], &device);
        let lengths = Tensor::<TestBackend, 1>::from_floats([4.0, 1.0], &device);

        let values = masked_mean(encoded, lengths)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        // Both rows pool to 1 despite different valid lengths.
        assert!(values.iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_forward_yields_finite_logit_per_example() {
        let device = Default::default();
        <TestBackend as burn::tensor::backend::Backend>::seed(&device, 42);

        let model = SentimentModel::<TestBackend>::new(&small_config(), &device);
        // "This movie is amazing": four known token ids.
        let tokens =
            Tensor::<TestBackend, 1, Int>::from_ints([2, 3, 4, 5], &device).reshape([1, 4]);
        let lengths = Tensor::<TestBackend, 1>::from_floats([4.0], &device);

        let logit = model
            .forward(tokens.clone(), lengths.clone())
            .into_data()
            .to_vec::<f32>()
            .unwrap()[0];
        assert!(logit.is_finite());

        let prob = model.predict(tokens, lengths).into_data().to_vec::<f32>().unwrap()[0];
        assert!(prob > 0.0 && prob < 1.0);
    }

    #[test]
    fn test_padding_does_not_change_logit() {
        let device = Default::default();
        <TestBackend as burn::tensor::backend::Backend>::seed(&device, 7);

        let model = SentimentModel::<TestBackend>::new(&small_config(), &device);
        let lengths = Tensor::<TestBackend, 1>::from_floats([3.0], &device);

        let bare =
            Tensor::<TestBackend, 1, Int>::from_ints([5, 6, 7], &device).reshape([1, 3]);
        let padded =
            Tensor::<TestBackend, 1, Int>::from_ints([5, 6, 7, 0, 0], &device).reshape([1, 5]);

        let a = model
            .forward(bare, lengths.clone())
            .into_data()
            .to_vec::<f32>()
            .unwrap()[0];
        let b = model.forward(padded, lengths).into_data().to_vec::<f32>().unwrap()[0];

        assert!((a - b).abs() < 1e-5);
    }
}
