//! Upload coordination: a single transfer of the selected video with
//! percentage progress delivered over a channel.

use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use tokio::sync::mpsc;
use tracing::info;

use crate::{
    error::ClientError,
    gateway::RecognitionGateway,
    types::{UploadOutcome, VideoSelection},
};

/// Highest percentage reported while the server has not yet accepted the
/// upload. 100 is reserved for success.
pub const IN_FLIGHT_PROGRESS_CAP: u8 = 99;

/// Byte-count sink handed to the transport. Converts counts into a
/// non-decreasing percentage and forwards only strictly larger values.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    sink: mpsc::UnboundedSender<u8>,
    last: Arc<AtomicU8>,
}

impl ProgressReporter {
    pub fn new(sink: mpsc::UnboundedSender<u8>) -> Self {
        Self {
            sink,
            last: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn report(&self, sent: u64, total: u64) {
        self.forward(in_flight_percent(sent, total));
    }

    pub fn last_reported(&self) -> u8 {
        self.last.load(Ordering::Acquire)
    }

    fn complete(&self) {
        self.forward(100);
    }

    fn forward(&self, percent: u8) {
        let previous = self.last.fetch_max(percent, Ordering::AcqRel);
        if percent > previous {
            let _ = self.sink.send(percent);
        }
    }
}

fn in_flight_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = u128::from(sent.min(total)) * 100 / u128::from(total);
    percent.min(u128::from(IN_FLIGHT_PROGRESS_CAP)) as u8
}

#[derive(Clone)]
pub struct UploadCoordinator {
    gateway: Arc<dyn RecognitionGateway>,
}

impl UploadCoordinator {
    pub fn new(gateway: Arc<dyn RecognitionGateway>) -> Self {
        Self { gateway }
    }

    /// Uploads `selection`, sending percentages to `progress`. The sequence is
    /// non-decreasing, stays within 0..=99 while in flight and ends with 100
    /// only when the upload succeeds.
    pub async fn upload(
        &self,
        selection: &VideoSelection,
        progress: mpsc::UnboundedSender<u8>,
    ) -> Result<UploadOutcome, ClientError> {
        let reporter = ProgressReporter::new(progress);
        let outcome = self
            .gateway
            .upload_video(selection, reporter.clone())
            .await?;
        reporter.complete();
        info!(
            file = selection.file_name(),
            video_url = %outcome.video_url,
            "upload accepted"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
