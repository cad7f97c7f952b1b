//! Controller layer: workflow events, reducer-driven state transitions, and
//! orchestration of the network tasks behind them.

pub mod events;
pub mod orchestration;
pub mod reducer;

use std::sync::Arc;

use shared::domain::{Action, HistoryEntry};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::{AbortHandle, JoinError},
};
use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings,
    error::ClientError,
    gateway::{HttpGateway, RecognitionGateway},
    types::{Generation, UploadOutcome, VideoCandidate, VideoSelection},
    upload::UploadCoordinator,
};
use events::{Reduction, WorkflowEvent};
use orchestration::{InflightTasks, OperationKind};
use reducer::{reduce, Stage, WorkflowState};

/// State shared with spawned network tasks so their results are applied even
/// if the caller stops awaiting.
struct ControllerCore {
    state: watch::Sender<WorkflowState>,
    inflight: Mutex<InflightTasks>,
}

impl ControllerCore {
    fn dispatch(&self, event: WorkflowEvent) -> Result<Reduction, ClientError> {
        let name = event.name();
        let mut outcome = Ok(Reduction::Stale);
        self.state.send_if_modified(|state| {
            outcome = reduce(state, event);
            matches!(&outcome, Ok(reduction) if !reduction.is_stale())
        });

        match &outcome {
            Ok(Reduction::Stale) => debug!(event = name, "discarded stale result"),
            Ok(_) => debug!(event = name, "applied workflow event"),
            Err(err) => debug!(event = name, "rejected workflow event: {err}"),
        }
        outcome
    }

    /// Tracks a freshly spawned task. The caller holds the `inflight` lock from
    /// before the spawn, so a superseding selection either sees this task or
    /// has already bumped the generation, in which case the task is aborted
    /// here.
    fn track_task(
        &self,
        inflight: &mut InflightTasks,
        kind: OperationKind,
        generation: Generation,
        handle: AbortHandle,
    ) {
        inflight.track(kind, generation, handle);
        let current = self.state.borrow().generation();
        if inflight.abort_superseded(current) > 0 {
            debug!(
                operation = kind.as_str(),
                generation = generation.0,
                "transfer superseded before it was tracked"
            );
        }
    }

    /// Applies a terminal result. Returns the error to surface to the caller,
    /// or `Ok` if the operation succeeded or its result was discarded.
    fn settle(
        &self,
        operation: &'static str,
        applied: WorkflowEvent,
        failure: Option<ClientError>,
    ) -> Result<(), ClientError> {
        let reduction = self.dispatch(applied)?;
        match failure {
            Some(err) if !reduction.is_stale() => {
                warn!(operation, "operation failed: {err}");
                Err(err)
            }
            _ => Ok(()),
        }
    }
}

/// Single source of truth for the upload → predict → results workflow and the
/// history panel. Operations take `&self`; share it behind an `Arc` to forward
/// intents from several places.
pub struct WorkflowController {
    core: Arc<ControllerCore>,
    gateway: Arc<dyn RecognitionGateway>,
    uploads: UploadCoordinator,
    max_upload_bytes: Option<u64>,
}

impl WorkflowController {
    pub fn new(gateway: Arc<dyn RecognitionGateway>) -> Self {
        let (state, _) = watch::channel(WorkflowState::default());
        Self {
            core: Arc::new(ControllerCore {
                state,
                inflight: Mutex::new(InflightTasks::default()),
            }),
            uploads: UploadCoordinator::new(Arc::clone(&gateway)),
            gateway,
            max_upload_bytes: None,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        let gateway = HttpGateway::new(settings)?;
        Ok(Self::new(Arc::new(gateway)).with_upload_limit(settings.max_upload_bytes))
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: Option<u64>) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn snapshot(&self) -> WorkflowState {
        self.core.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.core.state.subscribe()
    }

    /// Installs a new selection. A rejected candidate leaves the previous
    /// selection and stage untouched. Any in-flight upload or prediction
    /// becomes stale and is aborted.
    pub async fn select_file(&self, candidate: VideoCandidate) -> Result<(), ClientError> {
        let selection = match VideoSelection::validate(candidate, self.max_upload_bytes) {
            Ok(selection) => selection,
            Err(err) => {
                warn!("rejected file selection: {err}");
                return Err(err);
            }
        };
        info!(
            file = selection.file_name(),
            media_type = selection.media_type(),
            size = selection.size(),
            "video selected"
        );
        self.core.dispatch(WorkflowEvent::FileSelected(selection))?;
        self.abort_superseded().await;
        Ok(())
    }

    /// Drops the current selection and returns to `Idle`.
    pub async fn clear_selection(&self) -> Result<(), ClientError> {
        self.core.dispatch(WorkflowEvent::SelectionCleared)?;
        self.abort_superseded().await;
        Ok(())
    }

    pub async fn start_upload(&self) -> Result<(), ClientError> {
        let Reduction::UploadReady {
            generation,
            selection,
        } = self.core.dispatch(WorkflowEvent::UploadStarted)?
        else {
            return Ok(());
        };
        info!(
            generation = generation.0,
            file = selection.file_name(),
            size = selection.size(),
            "starting upload"
        );

        let core = Arc::clone(&self.core);
        let uploads = self.uploads.clone();
        let mut inflight = self.core.inflight.lock().await;
        let task = tokio::spawn(async move {
            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
            let transfer = uploads.upload(&selection, progress_tx);
            tokio::pin!(transfer);

            let result = loop {
                tokio::select! {
                    biased;
                    Some(percent) = progress_rx.recv() => {
                        let _ = core.dispatch(WorkflowEvent::UploadProgressed { generation, percent });
                    }
                    result = &mut transfer => break result,
                }
            };
            while let Ok(percent) = progress_rx.try_recv() {
                let _ = core.dispatch(WorkflowEvent::UploadProgressed {
                    generation,
                    percent,
                });
            }
            core.inflight
                .lock()
                .await
                .release(OperationKind::Upload, generation);

            settle_upload(&core, generation, result)
        });
        self.core.track_task(
            &mut inflight,
            OperationKind::Upload,
            generation,
            task.abort_handle(),
        );
        drop(inflight);

        let joined = task.await;
        self.core
            .inflight
            .lock()
            .await
            .release(OperationKind::Upload, generation);

        match joined {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => {
                debug!(generation = generation.0, "superseded upload was aborted");
                Ok(())
            }
            Err(err) => settle_upload(
                &self.core,
                generation,
                Err(task_failure(OperationKind::Upload, err)),
            ),
        }
    }

    pub async fn start_prediction(&self) -> Result<(), ClientError> {
        let Reduction::PredictionReady {
            generation,
            video_url,
        } = self.core.dispatch(WorkflowEvent::PredictionStarted)?
        else {
            return Ok(());
        };
        info!(generation = generation.0, video_url = %video_url, "starting prediction");

        let core = Arc::clone(&self.core);
        let gateway = Arc::clone(&self.gateway);
        let mut inflight = self.core.inflight.lock().await;
        let task = tokio::spawn(async move {
            let result = gateway.predict(&video_url).await;
            core.inflight
                .lock()
                .await
                .release(OperationKind::Prediction, generation);
            settle_prediction(&core, generation, result)
        });
        self.core.track_task(
            &mut inflight,
            OperationKind::Prediction,
            generation,
            task.abort_handle(),
        );
        drop(inflight);

        let joined = task.await;
        self.core
            .inflight
            .lock()
            .await
            .release(OperationKind::Prediction, generation);

        match joined {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => {
                debug!(generation = generation.0, "superseded prediction was aborted");
                Ok(())
            }
            Err(err) => settle_prediction(
                &self.core,
                generation,
                Err(task_failure(OperationKind::Prediction, err)),
            ),
        }
    }

    /// Uploads the current selection and, if that upload is still current
    /// when it finishes, requests a prediction for it.
    pub async fn upload_and_predict(&self) -> Result<(), ClientError> {
        self.start_upload().await?;
        let uploaded = self.core.state.borrow().stage == Stage::Uploaded;
        if !uploaded {
            return Ok(());
        }
        self.start_prediction().await
    }

    /// Flips panel visibility. Opening the panel with an empty cache fetches
    /// the history.
    pub async fn toggle_history(&self) -> Result<(), ClientError> {
        self.core.dispatch(WorkflowEvent::HistoryToggled)?;
        let should_fetch = {
            let state = self.core.state.borrow();
            state.history_visible
                && state.history.is_empty()
                && !state.loading_history
                && !state.deleting_history
        };
        if should_fetch {
            self.fetch_history().await?;
        }
        Ok(())
    }

    /// Replaces the cached history with the server's list. A failure keeps the
    /// previous cache.
    pub async fn fetch_history(&self) -> Result<(), ClientError> {
        self.core.dispatch(WorkflowEvent::HistoryLoadStarted)?;

        let core = Arc::clone(&self.core);
        let gateway = Arc::clone(&self.gateway);
        let task = tokio::spawn(async move {
            match gateway.list_history().await {
                Ok(entries) => {
                    info!(count = entries.len(), "history loaded");
                    core.dispatch(WorkflowEvent::HistoryLoaded(entries))
                        .map(|_| ())
                }
                Err(err) => {
                    let message = format!("history fetch failed: {err}");
                    core.settle(
                        "history",
                        WorkflowEvent::HistoryLoadFailed(message),
                        Some(err),
                    )
                }
            }
        });

        match task.await {
            Ok(result) => result,
            Err(err) => {
                let err = ClientError::Transport(format!("history task failed: {err}"));
                self.core.settle(
                    "history",
                    WorkflowEvent::HistoryLoadFailed(format!("history fetch failed: {err}")),
                    Some(err),
                )
            }
        }
    }

    /// Deletes all server-side history. Confirmation is the caller's job.
    pub async fn delete_history(&self) -> Result<(), ClientError> {
        self.core.dispatch(WorkflowEvent::HistoryDeleteStarted)?;

        let core = Arc::clone(&self.core);
        let gateway = Arc::clone(&self.gateway);
        let task = tokio::spawn(async move {
            match gateway.clear_history().await {
                Ok(()) => {
                    info!("history deleted");
                    core.dispatch(WorkflowEvent::HistoryDeleted).map(|_| ())
                }
                Err(err) => {
                    let message = format!("history delete failed: {err}");
                    core.settle(
                        "history",
                        WorkflowEvent::HistoryDeleteFailed(message),
                        Some(err),
                    )
                }
            }
        });

        match task.await {
            Ok(result) => result,
            Err(err) => {
                let err = ClientError::Transport(format!("history task failed: {err}"));
                self.core.settle(
                    "history",
                    WorkflowEvent::HistoryDeleteFailed(format!("history delete failed: {err}")),
                    Some(err),
                )
            }
        }
    }

    /// Shows a history entry as the current result without any network call.
    pub async fn select_history_entry(&self, entry: HistoryEntry) -> Result<(), ClientError> {
        info!(id = %entry.id, "history entry selected");
        self.core
            .dispatch(WorkflowEvent::HistoryEntrySelected(entry))?;
        self.abort_superseded().await;
        Ok(())
    }

    /// Selects a cached history entry by the textual form of its id.
    pub async fn select_history_by_id(&self, id: &str) -> Result<HistoryEntry, ClientError> {
        let entry = self
            .core
            .state
            .borrow()
            .history
            .find_by_display_id(id)
            .cloned()
            .ok_or_else(|| ClientError::validation(format!("no history entry with id '{id}'")))?;
        self.select_history_entry(entry.clone()).await?;
        Ok(entry)
    }

    async fn abort_superseded(&self) {
        let current = self.core.state.borrow().generation();
        self.core.inflight.lock().await.abort_superseded(current);
    }
}

fn settle_upload(
    core: &ControllerCore,
    generation: Generation,
    result: Result<UploadOutcome, ClientError>,
) -> Result<(), ClientError> {
    match result {
        Ok(outcome) => core.settle(
            "upload",
            WorkflowEvent::UploadSucceeded {
                generation,
                outcome,
            },
            None,
        ),
        Err(err) => core.settle(
            "upload",
            WorkflowEvent::UploadFailed {
                generation,
                message: format!("upload failed: {err}"),
            },
            Some(err),
        ),
    }
}

fn settle_prediction(
    core: &ControllerCore,
    generation: Generation,
    result: Result<Vec<Action>, ClientError>,
) -> Result<(), ClientError> {
    match result {
        Ok(actions) => {
            info!(generation = generation.0, count = actions.len(), "prediction received");
            core.settle(
                "prediction",
                WorkflowEvent::PredictionSucceeded {
                    generation,
                    actions,
                },
                None,
            )
        }
        Err(err) => core.settle(
            "prediction",
            WorkflowEvent::PredictionFailed {
                generation,
                message: format!("prediction failed: {err}"),
            },
            Some(err),
        ),
    }
}

fn task_failure(operation: OperationKind, err: JoinError) -> ClientError {
    ClientError::Transport(format!("{} task failed: {err}", operation.as_str()))
}

#[cfg(test)]
#[path = "../tests/controller_tests.rs"]
mod tests;
