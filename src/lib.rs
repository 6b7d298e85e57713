pub mod coding;
pub mod decoder;
pub mod dsp;
pub mod erasure;
pub mod message;
pub mod sync;
pub mod tracing_init;
pub mod visual;

pub use decoder::{Channel, Decoder, DecoderError, Status};
pub use erasure::EraseRecoverer;
pub use visual::VisualBuffers;
