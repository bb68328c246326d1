//! Audio buffers, ingestion, resampling, and output encoding

pub mod buffer;
pub mod decoder;
pub mod encoder;
pub mod resample;

pub use buffer::AudioBuffer;
pub use decoder::decode;
pub use encoder::{encode, EncodeOutcome, OutputFormat, OutputTarget};
pub use resample::resample;
