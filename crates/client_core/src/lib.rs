//! Client-side workflow for uploading a video, requesting an action
//! recognition prediction over it, and browsing the prediction history.

pub mod config;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod history;
pub mod types;
pub mod upload;

pub use config::{load_settings, ClientSettings, Endpoints};
pub use controller::{
    events::{Reduction, WorkflowEvent},
    reducer::{Stage, WorkflowState},
    WorkflowController,
};
pub use error::ClientError;
pub use gateway::{HttpGateway, RecognitionGateway};
pub use history::HistoryCache;
pub use types::{Generation, UploadOutcome, VideoCandidate, VideoSelection};
pub use upload::{ProgressReporter, UploadCoordinator};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
