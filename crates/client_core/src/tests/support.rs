//! In-process gateway double shared by the controller and upload tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use shared::domain::{Action, HistoryEntry, HistoryId};
use tokio::sync::Notify;

use crate::{
    error::ClientError,
    gateway::RecognitionGateway,
    types::{UploadOutcome, VideoCandidate, VideoSelection},
    upload::ProgressReporter,
};

pub const UPLOADED_URL: &str = "https://cdn/x.mp4";

pub struct FakeGateway {
    upload_result: Mutex<Result<UploadOutcome, ClientError>>,
    upload_progress: Mutex<Vec<(u64, u64)>>,
    predict_result: Mutex<Result<Vec<Action>, ClientError>>,
    history_result: Mutex<Result<Vec<HistoryEntry>, ClientError>>,
    clear_result: Mutex<Result<(), ClientError>>,
    upload_gate: Option<Arc<Notify>>,
    upload_completion_gate: Option<Arc<Notify>>,
    predict_gate: Option<Arc<Notify>>,
    pub upload_calls: AtomicUsize,
    pub predict_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub clear_calls: AtomicUsize,
    pub predicted_urls: Mutex<Vec<String>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            upload_result: Mutex::new(Ok(UploadOutcome::new(UPLOADED_URL))),
            upload_progress: Mutex::new(Vec::new()),
            predict_result: Mutex::new(Ok(Vec::new())),
            history_result: Mutex::new(Ok(Vec::new())),
            clear_result: Mutex::new(Ok(())),
            upload_gate: None,
            upload_completion_gate: None,
            predict_gate: None,
            upload_calls: AtomicUsize::new(0),
            predict_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
            predicted_urls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    /// Uploads wait for `gate.notify_one()` before reporting progress.
    pub fn gate_uploads(mut self, gate: Arc<Notify>) -> Self {
        self.upload_gate = Some(gate);
        self
    }

    /// Uploads report their progress, then wait for `gate.notify_one()`
    /// before returning.
    pub fn hold_upload_completion(mut self, gate: Arc<Notify>) -> Self {
        self.upload_completion_gate = Some(gate);
        self
    }

    pub fn gate_predictions(mut self, gate: Arc<Notify>) -> Self {
        self.predict_gate = Some(gate);
        self
    }

    pub fn set_upload(&self, result: Result<UploadOutcome, ClientError>) {
        *self.upload_result.lock().expect("lock") = result;
    }

    pub fn set_upload_progress(&self, steps: Vec<(u64, u64)>) {
        *self.upload_progress.lock().expect("lock") = steps;
    }

    pub fn set_prediction(&self, result: Result<Vec<Action>, ClientError>) {
        *self.predict_result.lock().expect("lock") = result;
    }

    pub fn set_history(&self, result: Result<Vec<HistoryEntry>, ClientError>) {
        *self.history_result.lock().expect("lock") = result;
    }

    pub fn set_clear(&self, result: Result<(), ClientError>) {
        *self.clear_result.lock().expect("lock") = result;
    }

    pub fn network_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
            + self.predict_calls.load(Ordering::SeqCst)
            + self.list_calls.load(Ordering::SeqCst)
            + self.clear_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionGateway for FakeGateway {
    async fn upload_video(
        &self,
        _selection: &VideoSelection,
        progress: ProgressReporter,
    ) -> Result<UploadOutcome, ClientError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.upload_gate {
            gate.notified().await;
        }
        let steps = self.upload_progress.lock().expect("lock").clone();
        for (sent, total) in steps {
            progress.report(sent, total);
        }
        if let Some(gate) = &self.upload_completion_gate {
            gate.notified().await;
        }
        self.upload_result.lock().expect("lock").clone()
    }

    async fn predict(&self, video_url: &str) -> Result<Vec<Action>, ClientError> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        self.predicted_urls
            .lock()
            .expect("lock")
            .push(video_url.to_string());
        if let Some(gate) = &self.predict_gate {
            gate.notified().await;
        }
        self.predict_result.lock().expect("lock").clone()
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.history_result.lock().expect("lock").clone()
    }

    async fn clear_history(&self) -> Result<(), ClientError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.clear_result.lock().expect("lock").clone()
    }
}

pub fn video(name: &str, size: usize) -> VideoCandidate {
    VideoCandidate::new(name, "video/mp4", vec![7; size])
}

pub fn history_entry(id: i64, labels: &[&str]) -> HistoryEntry {
    HistoryEntry {
        id: HistoryId::Number(id),
        video_url: format!("https://cdn/history-{id}.mp4"),
        predicted_actions: labels.iter().map(|label| Action::new(*label)).collect(),
        created_at: "2024-05-01T10:20:30Z".into(),
    }
}

pub fn server_error(status: u16, message: &str) -> ClientError {
    ClientError::Server {
        status,
        message: Some(message.to_string()),
    }
}
