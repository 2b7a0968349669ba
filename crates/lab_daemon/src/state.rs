use lab_assist::{Assistant, ChatCompletionClient};
use lab_core::{EventEnvelope, LabContent, LabState};
use lab_world::SnapshotStore;
use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct LabSession {
    pub state: LabState,
    pub rng: ChaCha8Rng,
}

pub type SharedLab = Arc<Mutex<LabSession>>;
pub type EventTx = broadcast::Sender<Vec<EventEnvelope>>;

/// Shared across handlers. `S` is the completion service; tests swap in a
/// canned one.
pub struct AppState<S = ChatCompletionClient> {
    pub lab: SharedLab,
    pub content: Arc<LabContent>,
    pub assistant: Arc<Assistant<S, ChaCha8Rng>>,
    pub event_tx: EventTx,
    pub snapshots: Arc<SnapshotStore>,
}

// Manual impl: derive would demand `S: Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            lab: Arc::clone(&self.lab),
            content: Arc::clone(&self.content),
            assistant: Arc::clone(&self.assistant),
            event_tx: self.event_tx.clone(),
            snapshots: Arc::clone(&self.snapshots),
        }
    }
}
