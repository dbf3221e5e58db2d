use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;

use crate::api::{GenerateRequest, SpeechBackend};
use crate::audio::GeneratedAudio;
use crate::catalog::VoiceCatalog;
use crate::error::AppError;

/// What the user has picked in the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub text_prompt: String,
    pub language: Option<String>,
    pub voice_name: Option<String>,
}

/// State and actions behind the speech form.
///
/// Network work runs on background threads; the owner calls [`poll`](Self::poll)
/// regularly (once per frame in the UI) to pick up results. Failures of either
/// request are logged and otherwise leave the form as it was.
pub struct FormController {
    backend: Arc<dyn SpeechBackend>,
    catalog: Option<VoiceCatalog>,
    selection: Selection,
    generated: Option<GeneratedAudio>,
    mounted: bool,
    catalog_task: Option<BackgroundTask<VoiceCatalog>>,
    generate_task: Option<BackgroundTask<GeneratedAudio>>,
}

impl FormController {
    pub fn new(backend: Arc<dyn SpeechBackend>) -> Self {
        Self {
            backend,
            catalog: None,
            selection: Selection::default(),
            generated: None,
            mounted: false,
            catalog_task: None,
            generate_task: None,
        }
    }

    /// Starts the one-off catalog fetch. Later calls do nothing.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        let backend = self.backend.clone();
        self.catalog_task = Some(BackgroundTask::spawn(move || backend.available_voices()));
    }

    /// Collects finished background work. Returns true when state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        if let Some(task) = &mut self.catalog_task {
            if let Some(result) = task.try_take() {
                self.catalog_task = None;
                changed = true;
                match result {
                    Ok(catalog) => self.apply_catalog(catalog),
                    Err(err) => log::error!("Error fetching available voices: {err}"),
                }
            }
        }

        if let Some(task) = &mut self.generate_task {
            if let Some(result) = task.try_take() {
                self.generate_task = None;
                changed = true;
                match result {
                    Ok(audio) => self.replace_audio(audio),
                    Err(err) => log::error!("Error generating audio: {err}"),
                }
            }
        }

        changed
    }

    fn apply_catalog(&mut self, catalog: VoiceCatalog) {
        if catalog.is_empty() {
            log::warn!("Voice catalog is empty");
        } else {
            log::info!("Loaded voice catalog with {} languages", catalog.len());
        }
        let language = catalog.first_language().map(str::to_string);
        let voice = language
            .as_deref()
            .and_then(|lang| catalog.default_voice_for(lang))
            .map(str::to_string);
        self.selection.language = language;
        self.selection.voice_name = voice;
        self.catalog = Some(catalog);
    }

    /// Switches language and resets the voice to that language's first preset.
    pub fn select_language(&mut self, language: &str) -> bool {
        let Some(catalog) = &self.catalog else {
            log::warn!("Ignoring language {language:?}: voice catalog not loaded");
            return false;
        };
        if !catalog.contains_language(language) {
            log::warn!("Ignoring unknown language {language:?}");
            return false;
        }
        self.selection.voice_name = catalog.default_voice_for(language).map(str::to_string);
        self.selection.language = Some(language.to_string());
        true
    }

    pub fn select_voice(&mut self, voice: &str) -> bool {
        let valid = match (&self.catalog, self.selection.language.as_deref()) {
            (Some(catalog), Some(language)) => catalog.contains_voice(language, voice),
            _ => false,
        };
        if !valid {
            log::warn!("Ignoring voice {voice:?} for language {:?}", self.selection.language);
            return false;
        }
        self.selection.voice_name = Some(voice.to_string());
        true
    }

    pub fn text_prompt_mut(&mut self) -> &mut String {
        &mut self.selection.text_prompt
    }

    /// Sends the current selection for synthesis.
    ///
    /// Returns false without touching the network while a request is in flight.
    pub fn generate(&mut self) -> bool {
        if self.is_busy() {
            log::debug!("Generate ignored: a request is already in flight");
            return false;
        }
        let request = GenerateRequest {
            text_prompt: self.selection.text_prompt.clone(),
            language: self.selection.language.clone().unwrap_or_default(),
            voice_name: self.selection.voice_name.clone().unwrap_or_default(),
        };
        let backend = self.backend.clone();
        self.generate_task = Some(BackgroundTask::spawn(move || {
            let bytes = backend.generate_audio(&request)?;
            log::info!("Received {} bytes of generated audio", bytes.len());
            GeneratedAudio::from_bytes(bytes)
        }));
        true
    }

    fn replace_audio(&mut self, audio: GeneratedAudio) {
        if let Some(previous) = self.generated.take() {
            previous.release();
        }
        log::debug!("Staged generated audio at {}", audio.path().display());
        self.generated = Some(audio);
    }

    /// Writes the generated audio to `dest`. Does nothing when there is none yet.
    pub fn download_to(&self, dest: &Path) -> Result<Option<u64>, AppError> {
        let Some(audio) = &self.generated else {
            return Ok(None);
        };
        let written = audio.save_to(dest)?;
        log::info!("Saved {written} bytes to {}", dest.display());
        Ok(Some(written))
    }

    pub fn is_busy(&self) -> bool {
        self.generate_task.is_some()
    }

    pub fn is_loading_catalog(&self) -> bool {
        self.catalog_task.is_some()
    }

    pub fn catalog(&self) -> Option<&VoiceCatalog> {
        self.catalog.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn generated(&self) -> Option<&GeneratedAudio> {
        self.generated.as_ref()
    }
}

struct BackgroundTask<T> {
    receiver: Option<mpsc::Receiver<Result<T, AppError>>>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    fn spawn<F>(task: F) -> Self
    where
        F: FnOnce() -> Result<T, AppError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = task();
            let _ = tx.send(result);
        });
        Self { receiver: Some(rx) }
    }

    fn try_take(&mut self) -> Option<Result<T, AppError>> {
        let rx = self.receiver.as_ref()?;
        match rx.try_recv() {
            Ok(result) => {
                self.receiver = None;
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.receiver = None;
                Some(Err(AppError::Message(
                    "Background task ended without a result".to_string(),
                )))
            }
        }
    }
}
