//! Bookkeeping for the network tasks the controller has in flight.

use tokio::task::AbortHandle;
use tracing::debug;

use crate::types::Generation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Upload,
    Prediction,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Prediction => "prediction",
        }
    }
}

struct TrackedTask {
    generation: Generation,
    handle: AbortHandle,
}

/// At most one upload and one prediction task, each tagged with the
/// generation that started it.
#[derive(Default)]
pub struct InflightTasks {
    upload: Option<TrackedTask>,
    prediction: Option<TrackedTask>,
}

impl InflightTasks {
    fn slot(&mut self, kind: OperationKind) -> &mut Option<TrackedTask> {
        match kind {
            OperationKind::Upload => &mut self.upload,
            OperationKind::Prediction => &mut self.prediction,
        }
    }

    pub fn track(&mut self, kind: OperationKind, generation: Generation, handle: AbortHandle) {
        if let Some(previous) = self.slot(kind).replace(TrackedTask { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Forgets the task for `kind` if it still belongs to `generation`.
    pub fn release(&mut self, kind: OperationKind, generation: Generation) {
        let slot = self.slot(kind);
        if slot
            .as_ref()
            .is_some_and(|task| task.generation == generation)
        {
            *slot = None;
        }
    }

    /// Aborts every tracked task older than `current`. Returns how many were
    /// aborted.
    pub fn abort_superseded(&mut self, current: Generation) -> usize {
        let mut aborted = 0;
        for kind in [OperationKind::Upload, OperationKind::Prediction] {
            let slot = self.slot(kind);
            if slot.as_ref().is_some_and(|task| task.generation < current) {
                if let Some(task) = slot.take() {
                    task.handle.abort();
                    debug!(
                        operation = kind.as_str(),
                        generation = task.generation.0,
                        "aborted superseded transfer"
                    );
                    aborted += 1;
                }
            }
        }
        aborted
    }

    pub fn is_tracking(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Upload => self.upload.is_some(),
            OperationKind::Prediction => self.prediction.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_task() -> tokio::task::JoinHandle<()> {
        tokio::spawn(std::future::pending::<()>())
    }

    #[tokio::test]
    async fn superseded_tasks_are_aborted() {
        let mut inflight = InflightTasks::default();
        let upload = pending_task();
        let prediction = pending_task();
        inflight.track(OperationKind::Upload, Generation(1), upload.abort_handle());
        inflight.track(
            OperationKind::Prediction,
            Generation(2),
            prediction.abort_handle(),
        );

        assert_eq!(inflight.abort_superseded(Generation(2)), 1);

        assert!(upload.await.expect_err("aborted").is_cancelled());
        assert!(!inflight.is_tracking(OperationKind::Upload));
        assert!(inflight.is_tracking(OperationKind::Prediction));
        prediction.abort();
    }

    #[tokio::test]
    async fn release_ignores_other_generations() {
        let mut inflight = InflightTasks::default();
        let task = pending_task();
        inflight.track(OperationKind::Upload, Generation(3), task.abort_handle());

        inflight.release(OperationKind::Upload, Generation(2));
        assert!(inflight.is_tracking(OperationKind::Upload));

        inflight.release(OperationKind::Upload, Generation(3));
        assert!(!inflight.is_tracking(OperationKind::Upload));
        task.abort();
    }

    #[tokio::test]
    async fn tracking_a_new_task_aborts_the_previous_one() {
        let mut inflight = InflightTasks::default();
        let first = pending_task();
        let second = pending_task();
        inflight.track(OperationKind::Prediction, Generation(1), first.abort_handle());
        inflight.track(OperationKind::Prediction, Generation(1), second.abort_handle());

        assert!(first.await.expect_err("aborted").is_cancelled());
        assert_eq!(inflight.abort_superseded(Generation(1)), 0);
        second.abort();
    }
}
