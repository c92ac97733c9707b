pub mod encoder;
pub mod pretrained;
pub mod sentiment;

pub use encoder::FeatureEncoder;
pub use pretrained::{load_pretrained, save_pretrained, PretrainedBundle};
pub use sentiment::{masked_mean, SentimentModel};
