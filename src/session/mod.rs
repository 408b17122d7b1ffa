//! The page-level session: inputs, the describe-then-synthesize
//! orchestration, and the download helper.
//!
//! A [`Session`] is cheap to clone and safe to share with spawned tasks.
//! At most one generation runs at a time: the trigger takes the only permit
//! of an in-flight semaphore and is rejected while it is held. Inputs are
//! captured by value when a generation starts, so edits made mid-flight only
//! affect the next one.

mod download;
mod state;

pub use download::{download_filename, save_to_dir, DOWNLOAD_PREFIX};
pub use state::{
    render, GenerationState, Notice, NullObserver, SessionObserver, SessionState, View,
};

use crate::config::Credentials;
use crate::error::{ReimagineError, Result};
use crate::image::{AspectChoice, GeneratedImage, SourceImage};
use crate::providers::OpenAiClient;
use crate::service::{DescriptionRequest, DescriptionService, SynthesisRequest, SynthesisService};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Builder for Session.
#[derive(Default)]
pub struct SessionBuilder {
    describer: Option<Arc<dyn DescriptionService>>,
    synthesizer: Option<Arc<dyn SynthesisService>>,
    credentials: Credentials,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl SessionBuilder {
    /// Creates a new builder with no services and env-sourced credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses one OpenAI client for both stages, with its configured credentials.
    pub fn openai(mut self, client: OpenAiClient) -> Self {
        self.credentials = client.config().credentials.clone();
        let client = Arc::new(client);
        let describer: Arc<dyn DescriptionService> = client.clone();
        let synthesizer: Arc<dyn SynthesisService> = client;
        self.describer = Some(describer);
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Sets the description service.
    pub fn description_service(mut self, service: Arc<dyn DescriptionService>) -> Self {
        self.describer = Some(service);
        self
    }

    /// Sets the synthesis service.
    pub fn synthesis_service(mut self, service: Arc<dyn SynthesisService>) -> Self {
        self.synthesizer = Some(service);
        self
    }

    /// Sets where the API key is read from.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the observer receiving re-renders and notices.
    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Builds the session.
    pub fn build(self) -> Result<Session> {
        let describer = self
            .describer
            .ok_or_else(|| ReimagineError::Config("no description service configured".into()))?;
        let synthesizer = self
            .synthesizer
            .ok_or_else(|| ReimagineError::Config("no synthesis service configured".into()))?;

        Ok(Session {
            inner: Arc::new(Inner {
                state: Mutex::new(SessionState::default()),
                in_flight: Arc::new(Semaphore::new(1)),
                describer,
                synthesizer,
                credentials: self.credentials,
                observer: self.observer.unwrap_or_else(|| Arc::new(NullObserver)),
            }),
        })
    }
}

struct Inner {
    state: Mutex<SessionState>,
    in_flight: Arc<Semaphore>,
    describer: Arc<dyn DescriptionService>,
    synthesizer: Arc<dyn SynthesisService>,
    credentials: Credentials,
    observer: Arc<dyn SessionObserver>,
}

/// One user's page: selected image, prompt, aspect and the latest result.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Creates a new `SessionBuilder`.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Stores a newly selected image; `None` (nothing selected) is a no-op.
    pub fn upload(&self, image: Option<SourceImage>) {
        let Some(image) = image else {
            return;
        };
        tracing::debug!(
            name = image.name().unwrap_or("-"),
            bytes = image.size(),
            "source image selected"
        );
        self.update(|state| state.source = Some(image));
    }

    /// Replaces the prompt.
    pub fn set_prompt(&self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.update(|state| state.prompt = prompt);
    }

    /// Replaces the aspect choice.
    pub fn set_aspect(&self, aspect: AspectChoice) {
        self.update(|state| state.aspect = aspect);
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    /// Rendered view of the current state.
    pub fn view(&self) -> View {
        render(&self.lock())
    }

    /// The held generated image, if any.
    pub fn generated(&self) -> Option<Arc<GeneratedImage>> {
        self.lock().generated.clone()
    }

    /// True while a generation is in flight.
    pub fn is_busy(&self) -> bool {
        self.lock().is_busy()
    }

    /// Runs one describe-then-synthesize generation from the current inputs.
    ///
    /// Failures are reported to the observer as a [`Notice`] and recorded in
    /// the state; the returned error is for programmatic callers. The held
    /// image only changes on success.
    pub async fn generate(&self) -> Result<()> {
        let inputs = self.lock().capture_inputs();
        let Some((source, prompt, aspect)) = inputs else {
            tracing::warn!("generation requested without both image and prompt");
            self.inner.observer.notify(&Notice::MissingInput);
            return Err(ReimagineError::InvalidInput(
                "both an image and a prompt are required".into(),
            ));
        };

        let Ok(permit) = self.inner.in_flight.clone().try_acquire_owned() else {
            tracing::warn!("generation requested while another is in flight");
            self.inner.observer.notify(&Notice::Busy);
            return Err(ReimagineError::Busy);
        };
        let _in_flight = InFlight {
            session: self.clone(),
            _permit: permit,
        };

        let start = Instant::now();
        match self.run_pipeline(source, prompt, aspect).await {
            Ok(mut image) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                image.metadata.duration_ms = Some(elapsed_ms);
                tracing::info!(bytes = image.size(), elapsed_ms, "generation succeeded");
                self.update(|state| {
                    state.generated = Some(Arc::new(image));
                    state.generation = GenerationState::Succeeded;
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "generation failed");
                let reason = e.to_string();
                self.update(|state| state.generation = GenerationState::Failed(reason.clone()));
                self.inner.observer.notify(&Notice::Failed(reason));
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        source: SourceImage,
        prompt: String,
        aspect: AspectChoice,
    ) -> Result<GeneratedImage> {
        self.set_generation(GenerationState::Encoding);
        let image_data_url = tokio::task::spawn_blocking(move || source.to_data_url())
            .await
            .map_err(|e| ReimagineError::Internal(format!("image encoding failed: {e}")))?;

        let key = self.inner.credentials.resolve()?;

        self.set_generation(GenerationState::AwaitingDescription);
        let description = self
            .inner
            .describer
            .describe(
                &key,
                &DescriptionRequest {
                    prompt: prompt.clone(),
                    image_data_url,
                },
            )
            .await?;
        tracing::info!(chars = description.len(), "received image description");

        self.set_generation(GenerationState::AwaitingSynthesis);
        self.inner
            .synthesizer
            .synthesize(
                &key,
                &SynthesisRequest {
                    description,
                    prompt,
                    aspect,
                },
            )
            .await
    }

    /// Saves the held image into `dir` under a timestamped name.
    ///
    /// Returns `Ok(None)` when nothing has been generated yet.
    pub async fn download(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let Some(image) = self.generated() else {
            return Ok(None);
        };
        let path = save_to_dir(&image, dir.as_ref(), SystemTime::now()).await?;
        Ok(Some(path))
    }

    fn set_generation(&self, generation: GenerationState) {
        tracing::debug!(state = %generation, "generation state changed");
        self.update(|state| state.generation = generation);
    }

    /// Applies `f` and renders while still holding the lock, so observers
    /// see views in the order the changes happened.
    fn update(&self, f: impl FnOnce(&mut SessionState)) {
        let mut state = self.lock();
        f(&mut state);
        self.inner.observer.render(&render(&state));
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the in-flight permit; on drop, a generation that never reached a
/// resting state (e.g. its future was cancelled) is marked failed.
struct InFlight {
    session: Session,
    _permit: OwnedSemaphorePermit,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.session.is_busy() {
            tracing::warn!("generation abandoned before completion");
            self.session.update(|state| {
                if state.is_busy() {
                    state.generation = GenerationState::Failed("generation cancelled".into());
                }
            });
        }
    }
}
