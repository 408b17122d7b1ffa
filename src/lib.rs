#![warn(missing_docs)]
//! Reimagine - turn a reference image and a prompt into a new image.
//!
//! Generation runs in two chained stages: a vision model describes the
//! uploaded image in light of the prompt, then an image model synthesizes a
//! new picture from that description and the prompt.
//!
//! # Quick Start
//!
//! ```no_run
//! use reimagine::{AspectChoice, OpenAiClient, Session, SourceImage};
//!
//! #[tokio::main]
//! async fn main() -> reimagine::Result<()> {
//!     let session = Session::builder()
//!         .openai(OpenAiClient::builder().build())
//!         .build()?;
//!
//!     session.upload(Some(SourceImage::from_path("photo.jpg").await?));
//!     session.set_prompt("turn it into a vintage travel poster");
//!     session.set_aspect(AspectChoice::Landscape);
//!
//!     session.generate().await?;
//!     if let Some(path) = session.download(".").await? {
//!         println!("saved {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The API key is read from `OPENAI_API_KEY` (or `VITE_OPENAI_API_KEY`) at
//! every generation attempt.

pub mod config;
mod error;
pub mod image;
pub mod providers;
pub mod service;
pub mod session;

// Re-export error types at crate root
pub use error::{ReimagineError, Result, ServiceKind};

pub use config::{ApiKey, Config, Credentials};
pub use image::{AspectChoice, GeneratedImage, GenerationMetadata, ImageFormat, SourceImage};
pub use providers::{OpenAiClient, OpenAiClientBuilder};
pub use service::{DescriptionRequest, DescriptionService, SynthesisRequest, SynthesisService};
pub use session::{GenerationState, Notice, Session, SessionBuilder, SessionObserver, View};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{ReimagineError, Result};
    pub use crate::image::{AspectChoice, GeneratedImage, SourceImage};
    pub use crate::providers::OpenAiClient;
    pub use crate::session::{Session, SessionObserver};
}
