//! The workflow state aggregate and its transition function.

use shared::domain::{Action, HistoryEntry};

use crate::{
    controller::events::{Reduction, WorkflowEvent},
    error::ClientError,
    history::HistoryCache,
    types::{Generation, UploadOutcome, VideoSelection},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    Selected,
    Uploading,
    Uploaded,
    Predicting,
    Results,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Selected => "selected",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Predicting => "predicting",
            Self::Results => "results",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub stage: Stage,
    pub selection: Option<VideoSelection>,
    pub upload_outcome: Option<UploadOutcome>,
    pub upload_progress: u8,
    /// `None` until a prediction completes; an empty list is a real result.
    pub prediction: Option<Vec<Action>>,
    pub error_message: Option<String>,
    pub history_visible: bool,
    pub history: HistoryCache,
    /// Set only while the displayed prediction came from history.
    pub selected_history_entry: Option<HistoryEntry>,
    pub loading_history: bool,
    pub deleting_history: bool,
    generation: Generation,
}

impl WorkflowState {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_uploading(&self) -> bool {
        self.stage == Stage::Uploading
    }

    pub fn is_predicting(&self) -> bool {
        self.stage == Stage::Predicting
    }

    fn supersede(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.generation
    }

    fn reset_run(&mut self) {
        self.upload_outcome = None;
        self.upload_progress = 0;
        self.prediction = None;
        self.error_message = None;
        self.selected_history_entry = None;
    }

    fn ensure_idle_network(&self) -> Result<(), ClientError> {
        if self.is_uploading() {
            return Err(ClientError::validation("an upload is already in progress"));
        }
        if self.is_predicting() {
            return Err(ClientError::validation("a prediction is already in progress"));
        }
        Ok(())
    }

    fn ensure_history_idle(&self) -> Result<(), ClientError> {
        if self.loading_history {
            return Err(ClientError::validation("history is already loading"));
        }
        if self.deleting_history {
            return Err(ClientError::validation("history is being deleted"));
        }
        Ok(())
    }

    fn is_current(&self, generation: Generation, stage: Stage) -> bool {
        self.generation == generation && self.stage == stage
    }
}

/// Applies `event` to `state`. Rejected intents return an error and leave
/// `state` untouched; results for a superseded generation return
/// [`Reduction::Stale`].
pub fn reduce(state: &mut WorkflowState, event: WorkflowEvent) -> Result<Reduction, ClientError> {
    match event {
        WorkflowEvent::FileSelected(selection) => {
            state.supersede();
            state.reset_run();
            state.selection = Some(selection);
            state.stage = Stage::Selected;
            Ok(Reduction::Applied)
        }
        WorkflowEvent::SelectionCleared => {
            state.supersede();
            state.reset_run();
            state.selection = None;
            state.stage = Stage::Idle;
            Ok(Reduction::Applied)
        }
        WorkflowEvent::UploadStarted => {
            state.ensure_idle_network()?;
            let selection = state
                .selection
                .clone()
                .ok_or_else(|| ClientError::validation("select a video file first"))?;
            let generation = state.supersede();
            state.reset_run();
            state.stage = Stage::Uploading;
            Ok(Reduction::UploadReady {
                generation,
                selection,
            })
        }
        WorkflowEvent::UploadProgressed {
            generation,
            percent,
        } => {
            if !state.is_current(generation, Stage::Uploading) {
                return Ok(Reduction::Stale);
            }
            state.upload_progress = state.upload_progress.max(percent.min(100));
            Ok(Reduction::Applied)
        }
        WorkflowEvent::UploadSucceeded {
            generation,
            outcome,
        } => {
            if !state.is_current(generation, Stage::Uploading) {
                return Ok(Reduction::Stale);
            }
            state.upload_outcome = Some(outcome);
            state.upload_progress = 100;
            state.stage = Stage::Uploaded;
            Ok(Reduction::Applied)
        }
        WorkflowEvent::UploadFailed {
            generation,
            message,
        } => {
            if !state.is_current(generation, Stage::Uploading) {
                return Ok(Reduction::Stale);
            }
            state.upload_progress = 0;
            state.error_message = Some(message);
            state.stage = Stage::Selected;
            Ok(Reduction::Applied)
        }
        WorkflowEvent::PredictionStarted => {
            state.ensure_idle_network()?;
            let video_url = state
                .upload_outcome
                .as_ref()
                .map(|outcome| outcome.video_url.clone())
                .ok_or_else(|| {
                    ClientError::validation("upload a video before requesting a prediction")
                })?;
            let generation = state.supersede();
            state.prediction = None;
            state.error_message = None;
            state.selected_history_entry = None;
            state.stage = Stage::Predicting;
            Ok(Reduction::PredictionReady {
                generation,
                video_url,
            })
        }
        WorkflowEvent::PredictionSucceeded {
            generation,
            actions,
        } => {
            if !state.is_current(generation, Stage::Predicting) {
                return Ok(Reduction::Stale);
            }
            state.prediction = Some(actions);
            state.stage = Stage::Results;
            Ok(Reduction::Applied)
        }
        WorkflowEvent::PredictionFailed {
            generation,
            message,
        } => {
            if !state.is_current(generation, Stage::Predicting) {
                return Ok(Reduction::Stale);
            }
            state.error_message = Some(message);
            state.stage = Stage::Uploaded;
            Ok(Reduction::Applied)
        }
        WorkflowEvent::HistoryToggled => {
            state.history_visible = !state.history_visible;
            Ok(Reduction::Applied)
        }
        WorkflowEvent::HistoryLoadStarted => {
            state.ensure_history_idle()?;
            state.loading_history = true;
            state.error_message = None;
            Ok(Reduction::Applied)
        }
        WorkflowEvent::HistoryLoaded(entries) => {
            state.loading_history = false;
            state.history.replace_all(entries);
            Ok(Reduction::Applied)
        }
        WorkflowEvent::HistoryLoadFailed(message) => {
            state.loading_history = false;
            state.error_message = Some(message);
            Ok(Reduction::Applied)
        }
        WorkflowEvent::HistoryDeleteStarted => {
            state.ensure_history_idle()?;
            state.deleting_history = true;
            state.error_message = None;
            Ok(Reduction::Applied)
        }
        WorkflowEvent::HistoryDeleted => {
            state.deleting_history = false;
            state.history.clear();
            state.selected_history_entry = None;
            Ok(Reduction::Applied)
        }
        WorkflowEvent::HistoryDeleteFailed(message) => {
            state.deleting_history = false;
            state.error_message = Some(message);
            Ok(Reduction::Applied)
        }
        WorkflowEvent::HistoryEntrySelected(entry) => {
            state.supersede();
            state.reset_run();
            state.upload_outcome = Some(UploadOutcome::new(entry.video_url.clone()));
            state.prediction = Some(entry.predicted_actions.clone());
            state.selected_history_entry = Some(entry);
            state.stage = Stage::Results;
            Ok(Reduction::Applied)
        }
    }
}

#[cfg(test)]
#[path = "../tests/reducer_tests.rs"]
mod tests;
