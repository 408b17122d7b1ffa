//! Session state, generation state machine, and the single render function.

use crate::image::{AspectChoice, GeneratedImage, SourceImage};
use std::fmt;
use std::sync::Arc;

/// Where the current (or last) generation stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenerationState {
    /// Nothing has been generated yet.
    #[default]
    Idle,
    /// Converting the source image to a data URL.
    Encoding,
    /// Waiting on the description service.
    AwaitingDescription,
    /// Waiting on the synthesis service.
    AwaitingSynthesis,
    /// Last generation stored a new image.
    Succeeded,
    /// Last generation failed; the reason is user-facing.
    Failed(String),
}

impl GenerationState {
    /// True while a generation is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Encoding | Self::AwaitingDescription | Self::AwaitingSynthesis
        )
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Encoding => write!(f, "encoding image"),
            Self::AwaitingDescription => write!(f, "describing image"),
            Self::AwaitingSynthesis => write!(f, "generating image"),
            Self::Succeeded => write!(f, "done"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Everything the page holds.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Last uploaded reference image.
    pub source: Option<SourceImage>,
    /// Transformation prompt, as typed.
    pub prompt: String,
    /// Output aspect choice.
    pub aspect: AspectChoice,
    /// Most recent successful result.
    pub generated: Option<Arc<GeneratedImage>>,
    /// Where the current or last generation stands.
    pub generation: GenerationState,
}

impl SessionState {
    /// Source image and a non-empty prompt are both present.
    pub fn has_inputs(&self) -> bool {
        self.source.is_some() && !self.prompt.is_empty()
    }

    /// True while a generation is in flight.
    pub fn is_busy(&self) -> bool {
        self.generation.is_busy()
    }

    /// Copies out the inputs of a generation, if both are present.
    pub fn capture_inputs(&self) -> Option<(SourceImage, String, AspectChoice)> {
        match &self.source {
            Some(source) if self.has_inputs() => {
                Some((source.clone(), self.prompt.clone(), self.aspect))
            }
            _ => None,
        }
    }
}

/// What a front-end should display for a given state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Preview label for the selected source image.
    pub source_label: Option<String>,
    /// Prompt field contents.
    pub prompt: String,
    /// Selected aspect choice.
    pub aspect: AspectChoice,
    /// A generation is in flight.
    pub busy: bool,
    /// Submit control enablement.
    pub submit_enabled: bool,
    /// Label on the submit control.
    pub submit_label: &'static str,
    /// Human-readable generation state.
    pub status: String,
    /// Download control visibility.
    pub download_visible: bool,
    /// Summary of the held generated image.
    pub generated_label: Option<String>,
}

/// Builds the view for a state.
pub fn render(state: &SessionState) -> View {
    let busy = state.is_busy();

    let source_label = state.source.as_ref().map(|source| {
        format!(
            "{} ({}, {} bytes)",
            source.name().unwrap_or("uploaded image"),
            source.format().mime_type(),
            source.size()
        )
    });

    let generated_label = state.generated.as_ref().map(|image| {
        let mut label = format!("{} image, {} bytes", image.format.extension(), image.size());
        if let Some(ms) = image.metadata.duration_ms {
            label.push_str(&format!(", {ms}ms"));
        }
        label
    });

    View {
        source_label,
        prompt: state.prompt.clone(),
        aspect: state.aspect,
        busy,
        submit_enabled: !busy && state.has_inputs(),
        submit_label: if busy { "Generating..." } else { "Generate Image" },
        status: state.generation.to_string(),
        download_visible: state.generated.is_some(),
        generated_label,
    }
}

/// A user-visible, blocking notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Trigger without an image or prompt.
    MissingInput,
    /// Trigger while a generation is in flight.
    Busy,
    /// Generation failed.
    Failed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput => write!(f, "Please provide both image and prompt."),
            Self::Busy => write!(f, "A generation is already in progress."),
            Self::Failed(reason) => write!(f, "Error generating image: {reason}"),
        }
    }
}

/// Receives re-renders and notices from a session.
pub trait SessionObserver: Send + Sync {
    /// Called after every state change, in order, with the session's state
    /// locked. Must not call back into the session.
    fn render(&self, view: &View);

    /// Called when the user must be told something.
    fn notify(&self, notice: &Notice);
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn render(&self, _view: &View) {}

    fn notify(&self, _notice: &Notice) {}
}
