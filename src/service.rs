//! Traits for the two external collaborators and their request types.

use crate::config::ApiKey;
use crate::error::Result;
use crate::image::{AspectChoice, GeneratedImage};
use async_trait::async_trait;

/// Ask for a description of an image, modulated by the user's prompt.
#[derive(Debug, Clone)]
pub struct DescriptionRequest {
    /// The user's prompt.
    pub prompt: String,
    /// The source image as a `data:` URL.
    pub image_data_url: String,
}

impl DescriptionRequest {
    /// Text part of the chat message sent alongside the image.
    pub fn instruction(&self) -> String {
        format!("Describe this image and apply user prompt: {}", self.prompt)
    }
}

/// Ask for a new image based on a description and the user's prompt.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Description returned by the first stage.
    pub description: String,
    /// The user's prompt.
    pub prompt: String,
    /// Requested aspect.
    pub aspect: AspectChoice,
}

impl SynthesisRequest {
    /// Prompt actually sent to the synthesis service.
    pub fn composed_prompt(&self) -> String {
        format!(
            "Based on this: {}. Modify with: {}",
            self.description.trim(),
            self.prompt
        )
    }
}

/// First stage: image + prompt in, natural-language description out.
#[async_trait]
pub trait DescriptionService: Send + Sync {
    /// Returns the description text.
    async fn describe(&self, key: &ApiKey, request: &DescriptionRequest) -> Result<String>;
}

/// Second stage: composed prompt + size in, image out.
#[async_trait]
pub trait SynthesisService: Send + Sync {
    /// Returns the decoded generated image.
    async fn synthesize(&self, key: &ApiKey, request: &SynthesisRequest) -> Result<GeneratedImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_embeds_prompt() {
        let request = DescriptionRequest {
            prompt: "make it cyberpunk".into(),
            image_data_url: "data:image/png;base64,AAAA".into(),
        };
        assert_eq!(
            request.instruction(),
            "Describe this image and apply user prompt: make it cyberpunk"
        );
    }

    #[test]
    fn test_composed_prompt() {
        let request = SynthesisRequest {
            description: "A cat on a sofa.\n".into(),
            prompt: "oil painting".into(),
            aspect: AspectChoice::Square,
        };
        assert_eq!(
            request.composed_prompt(),
            "Based on this: A cat on a sofa.. Modify with: oil painting"
        );
    }
}
