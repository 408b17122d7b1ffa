//! Source and generated image types.

mod types;

#[cfg(test)]
pub(crate) use types::fixtures;
pub use types::{AspectChoice, GeneratedImage, GenerationMetadata, ImageFormat, SourceImage};
