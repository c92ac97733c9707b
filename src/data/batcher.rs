use burn::tensor::{backend::Backend, ElementConversion, Int, Tensor};

use super::dataset::Example;

/// A collated batch: token ids padded to the batch max length, labels, and
/// the true (unpadded) lengths used for masking downstream.
#[derive(Clone, Debug)]
pub struct ReviewBatch<B: Backend> {
    /// [batch_size, max_len_in_batch]
    pub tokens: Tensor<B, 2, Int>,
    /// [batch_size]
    pub labels: Tensor<B, 1, Int>,
    /// [batch_size], floating point so it can divide the pooled sum.
    pub lengths: Tensor<B, 1>,
}

impl<B: Backend> ReviewBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.tokens.dims()[0]
    }

    /// Sum of true lengths, for throughput accounting.
    pub fn num_words(&self) -> usize {
        self.lengths.clone().sum().into_scalar().elem::<f64>() as usize
    }
}

/// Pad every sequence in the batch to the batch max length with `pad_id`,
/// left-aligned, and stack labels and lengths into flat tensors. Sequences
/// were already clipped during preprocessing; nothing is truncated here.
pub fn collate<B: Backend>(
    examples: &[&Example],
    pad_id: i64,
    device: &B::Device,
) -> ReviewBatch<B> {
    assert!(!examples.is_empty(), "cannot collate an empty batch");

    let batch_size = examples.len();
    let max_len = examples
        .iter()
        .map(|e| e.length)
        .max()
        .expect("non-empty batch");

    let mut padded = Vec::with_capacity(batch_size * max_len);
    let mut labels = Vec::with_capacity(batch_size);
    let mut lengths = Vec::with_capacity(batch_size);

    for example in examples {
        padded.extend_from_slice(&example.tokens);
        padded.extend(std::iter::repeat(pad_id).take(max_len - example.length));
        labels.push(example.label);
        lengths.push(example.length as f32);
    }

    let tokens = Tensor::<B, 1, Int>::from_ints(padded.as_slice(), device)
        .reshape([batch_size, max_len]);
    let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);
    let lengths = Tensor::<B, 1>::from_floats(lengths.as_slice(), device);

    ReviewBatch {
        tokens,
        labels,
        lengths,
    }
}

/// Collate the examples selected by a sampler batch.
pub fn collate_indices<B: Backend>(
    examples: &[Example],
    indices: &[usize],
    pad_id: i64,
    device: &B::Device,
) -> ReviewBatch<B> {
    let selected: Vec<&Example> = indices.iter().map(|&i| &examples[i]).collect();
    collate(&selected, pad_id, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Example;
    use crate::data::tokenizer::PAD_ID;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn batch_fixture() -> Vec<Example> {
        vec![
            Example::new(vec![2, 3, 4, 5, 6], 1),
            Example::new(vec![7, 8], 0),
            Example::new(vec![9, 10, 11], 1),
        ]
    }

    #[test]
    fn test_padding_fills_with_pad_id() {
        let examples = batch_fixture();
        let refs: Vec<&Example> = examples.iter().collect();
        let device = Default::default();

        let batch = collate::<TestBackend>(&refs, PAD_ID, &device);
        assert_eq!(batch.tokens.dims(), [3, 5]);

        let rows = batch.tokens.into_data().to_vec::<i64>().unwrap();
        for (i, example) in examples.iter().enumerate() {
            let row = &rows[i * 5..(i + 1) * 5];
            assert_eq!(&row[..example.length], example.tokens.as_slice());
            assert!(row[example.length..].iter().all(|&id| id == PAD_ID));
        }
    }

    #[test]
    fn test_lengths_match_unpadded_lengths() {
        let examples = batch_fixture();
        let refs: Vec<&Example> = examples.iter().collect();
        let device = Default::default();

        let batch = collate::<TestBackend>(&refs, PAD_ID, &device);
        let lengths = batch.lengths.into_data().to_vec::<f32>().unwrap();
        assert_eq!(lengths, vec![5.0, 2.0, 3.0]);

        let labels = batch.labels.into_data().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![1, 0, 1]);
    }

    #[test]
    fn test_collate_indices_selects_examples() {
        let examples = batch_fixture();
        let device = Default::default();

        let batch = collate_indices::<TestBackend>(&examples, &[2, 0], PAD_ID, &device);
        assert_eq!(batch.batch_size(), 2);
        assert_eq!(batch.num_words(), 8);
    }
}
