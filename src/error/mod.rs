pub mod decode;
pub mod encode;

pub use decode::{DecodeError, DecodeResult, RecordField};
pub use encode::EncodeError;
