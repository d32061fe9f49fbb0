mod decoder;
mod format;
mod model;
mod schema;


pub use decoder::{decode, decode_lenient, InferenceDecoder};
pub use format::InferenceFormat;
pub use model::{BoundingBox, Detection, ParsedInference, Perception};
