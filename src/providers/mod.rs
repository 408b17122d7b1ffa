//! Service implementations.

mod openai;

pub use openai::{OpenAiClient, OpenAiClientBuilder};
