//! Events fed into the workflow reducer and what applying them produced.

use shared::domain::{Action, HistoryEntry};

use crate::types::{Generation, UploadOutcome, VideoSelection};

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    FileSelected(VideoSelection),
    SelectionCleared,
    UploadStarted,
    UploadProgressed {
        generation: Generation,
        percent: u8,
    },
    UploadSucceeded {
        generation: Generation,
        outcome: UploadOutcome,
    },
    UploadFailed {
        generation: Generation,
        message: String,
    },
    PredictionStarted,
    PredictionSucceeded {
        generation: Generation,
        actions: Vec<Action>,
    },
    PredictionFailed {
        generation: Generation,
        message: String,
    },
    HistoryToggled,
    HistoryLoadStarted,
    HistoryLoaded(Vec<HistoryEntry>),
    HistoryLoadFailed(String),
    HistoryDeleteStarted,
    HistoryDeleted,
    HistoryDeleteFailed(String),
    HistoryEntrySelected(HistoryEntry),
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FileSelected(_) => "file_selected",
            Self::SelectionCleared => "selection_cleared",
            Self::UploadStarted => "upload_started",
            Self::UploadProgressed { .. } => "upload_progressed",
            Self::UploadSucceeded { .. } => "upload_succeeded",
            Self::UploadFailed { .. } => "upload_failed",
            Self::PredictionStarted => "prediction_started",
            Self::PredictionSucceeded { .. } => "prediction_succeeded",
            Self::PredictionFailed { .. } => "prediction_failed",
            Self::HistoryToggled => "history_toggled",
            Self::HistoryLoadStarted => "history_load_started",
            Self::HistoryLoaded(_) => "history_loaded",
            Self::HistoryLoadFailed(_) => "history_load_failed",
            Self::HistoryDeleteStarted => "history_delete_started",
            Self::HistoryDeleted => "history_deleted",
            Self::HistoryDeleteFailed(_) => "history_delete_failed",
            Self::HistoryEntrySelected(_) => "history_entry_selected",
        }
    }
}

/// Outcome of reducing one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    Applied,
    /// The event belonged to a superseded generation and was discarded.
    Stale,
    UploadReady {
        generation: Generation,
        selection: VideoSelection,
    },
    PredictionReady {
        generation: Generation,
        video_url: String,
    },
}

impl Reduction {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}
