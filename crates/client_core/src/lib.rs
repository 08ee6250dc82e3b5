use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use shared::{
    domain::{HistoryEntry, PredictionResult},
    error::WorkflowError,
    protocol::SavePredictionRequest,
};
use tokio::{runtime::Handle, sync::broadcast, task::JoinSet};
use tracing::{info, warn};

pub mod api;
pub mod diagnostics;
pub mod history;
pub mod presentation;
pub mod selection;

pub use api::{ApiClientError, DetectorApi, PredictionBackend, DEFAULT_API_URL};
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use history::SessionHistory;
pub use selection::{ImageFile, PreviewData, SelectedImage};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Empty,
    Selected,
    Submitting,
    Resulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    StateChanged(WorkflowState),
    Notice(Notice),
    PredictionCompleted(HistoryEntry),
}

/// A classification request handed out by [`WorkflowController::begin_predict`].
#[derive(Debug, Clone)]
pub struct PredictTicket {
    generation: u64,
    image: ImageFile,
}

impl PredictTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn image(&self) -> &ImageFile {
        &self.image
    }

    pub async fn send(self, backend: &dyn PredictionBackend) -> PredictOutcome {
        let result = backend.predict(&self.image).await;
        PredictOutcome {
            generation: self.generation,
            image_name: self.image.name().to_string(),
            result,
        }
    }
}

#[derive(Debug)]
pub struct PredictOutcome {
    generation: u64,
    image_name: String,
    result: Result<PredictionResult, ApiClientError>,
}

impl PredictOutcome {
    pub fn new(
        ticket: &PredictTicket,
        result: Result<PredictionResult, ApiClientError>,
    ) -> Self {
        Self {
            generation: ticket.generation,
            image_name: ticket.image.name().to_string(),
            result,
        }
    }
}

/// Drives one upload/predict/save cycle at a time and owns the session
/// history. Every selection, clear and prediction start bumps `generation`;
/// outcomes carrying an older generation are dropped.
pub struct WorkflowController {
    backend: Arc<dyn PredictionBackend>,
    diagnostics: Arc<dyn Diagnostics>,
    state: WorkflowState,
    selected: Option<SelectedImage>,
    result: Option<PredictionResult>,
    history: SessionHistory,
    picker_value: Option<PathBuf>,
    drag_active: bool,
    generation: u64,
    events: broadcast::Sender<WorkflowEvent>,
    persistence: JoinSet<()>,
}

impl WorkflowController {
    pub fn new(backend: Arc<dyn PredictionBackend>) -> Self {
        Self::with_diagnostics(backend, Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(
        backend: Arc<dyn PredictionBackend>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            diagnostics,
            state: WorkflowState::Empty,
            selected: None,
            result: None,
            history: SessionHistory::default(),
            picker_value: None,
            drag_active: false,
            generation: 0,
            events,
            persistence: JoinSet::new(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == WorkflowState::Submitting
    }

    pub fn selected(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Path currently shown by the file picker, if the selection came from one.
    pub fn picker_value(&self) -> Option<&Path> {
        self.picker_value.as_deref()
    }

    pub fn is_drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn backend(&self) -> Arc<dyn PredictionBackend> {
        Arc::clone(&self.backend)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Validates and applies a new selection. A rejected file leaves the
    /// controller untouched; an accepted one replaces the selection and drops
    /// the previous result.
    pub fn select_image(&mut self, file: ImageFile) -> Result<(), WorkflowError> {
        let selected = match SelectedImage::new(file) {
            Ok(selected) => selected,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };

        info!(
            image = selected.file().name(),
            mime_type = selected.file().mime_type(),
            size_bytes = selected.file().size(),
            "image selected"
        );
        self.generation += 1;
        self.selected = Some(selected);
        self.result = None;
        self.set_state(WorkflowState::Selected);
        Ok(())
    }

    /// File-picker entry point: reads `path` and selects it.
    pub async fn select_path(&mut self, path: &Path) -> Result<(), WorkflowError> {
        let file = match selection::read_image_file(path).await {
            Ok(file) => file,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };
        self.select_image(file)?;
        self.picker_value = Some(path.to_path_buf());
        Ok(())
    }

    pub fn drag_over(&mut self) {
        self.drag_active = true;
    }

    pub fn drag_leave(&mut self) {
        self.drag_active = false;
    }

    /// Only the first dropped file is considered; an empty drop does nothing.
    pub fn drop_files(
        &mut self,
        files: impl IntoIterator<Item = ImageFile>,
    ) -> Result<(), WorkflowError> {
        self.drag_active = false;
        match files.into_iter().next() {
            Some(file) => self.select_image(file),
            None => Ok(()),
        }
    }

    /// Moves to `Submitting` and hands out the request to send. Starting a new
    /// request while one is in flight supersedes the older one.
    pub fn begin_predict(&mut self) -> Result<PredictTicket, WorkflowError> {
        let Some(selected) = &self.selected else {
            let err = WorkflowError::NoSelection;
            self.report(&err);
            return Err(err);
        };

        let image = selected.file().clone();
        self.generation += 1;
        self.set_state(WorkflowState::Submitting);
        Ok(PredictTicket {
            generation: self.generation,
            image,
        })
    }

    /// Applies the outcome of a request started by [`Self::begin_predict`].
    /// Returns `Ok(None)` when the request was superseded.
    pub fn complete_predict(
        &mut self,
        outcome: PredictOutcome,
    ) -> Result<Option<PredictionResult>, WorkflowError> {
        if outcome.generation != self.generation {
            self.diagnostics
                .stale_outcome_discarded(outcome.generation, self.generation);
            return Ok(None);
        }

        let result = match outcome.result {
            Ok(result) => result,
            Err(err) => {
                warn!(image = %outcome.image_name, "prediction failed: {err}");
                self.set_state(WorkflowState::Selected);
                let err = WorkflowError::PredictionFailed(err.to_string());
                self.report(&err);
                return Err(err);
            }
        };

        self.result = Some(result.clone());
        let entry = HistoryEntry::new(result.clone(), outcome.image_name);
        self.history.record(entry.clone());
        self.set_state(WorkflowState::Resulted);

        self.spawn_persistence(SavePredictionRequest {
            label: result.label.clone(),
            confidence: result.confidence,
            image_name: entry.image_name.clone(),
        });

        self.emit(WorkflowEvent::PredictionCompleted(entry));
        self.notify(NoticeLevel::Success, "Prediction completed!");
        Ok(Some(result))
    }

    /// Runs a full classification round trip for the current selection.
    pub async fn predict(&mut self) -> Result<PredictionResult, WorkflowError> {
        let ticket = self.begin_predict()?;
        let backend = self.backend();
        let outcome = ticket.send(backend.as_ref()).await;
        self.complete_predict(outcome)?
            .ok_or_else(|| WorkflowError::PredictionFailed("request superseded".into()))
    }

    /// Returns to `Empty`. Any request still in flight is ignored when it
    /// resolves.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.selected = None;
        self.result = None;
        self.picker_value = None;
        self.drag_active = false;
        self.set_state(WorkflowState::Empty);
    }

    /// Waits for every save started so far. Only needed before shutting the
    /// runtime down; the workflow itself never waits on persistence.
    pub async fn settle_persistence(&mut self) {
        while let Some(joined) = self.persistence.join_next().await {
            if let Err(err) = joined {
                warn!("persistence task did not finish: {err}");
            }
        }
    }

    fn spawn_persistence(&mut self, request: SavePredictionRequest) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                image = %request.image_name,
                "no async runtime available, prediction not saved"
            );
            return;
        };

        let backend = Arc::clone(&self.backend);
        let diagnostics = Arc::clone(&self.diagnostics);
        while self.persistence.try_join_next().is_some() {}
        self.persistence.spawn_on(
            async move {
                match backend.save(&request).await {
                    Ok(()) => diagnostics.persistence_succeeded(&request),
                    Err(err) => diagnostics.persistence_failed(&request, &err),
                }
            },
            &runtime,
        );
    }

    fn set_state(&mut self, state: WorkflowState) {
        if self.state != state {
            self.state = state;
            self.emit(WorkflowEvent::StateChanged(state));
        }
    }

    fn report(&self, err: &WorkflowError) {
        warn!("{err}");
        self.notify(NoticeLevel::Error, err.notice());
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        self.emit(WorkflowEvent::Notice(Notice {
            level,
            message: message.to_string(),
        }));
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Drop for WorkflowController {
    fn drop(&mut self) {
        // Saves outlive the controller.
        self.persistence.detach_all();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
