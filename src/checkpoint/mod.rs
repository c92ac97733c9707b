mod record;

pub use record::{list_checkpoints, load_checkpoint, save_checkpoint, CheckpointData};
