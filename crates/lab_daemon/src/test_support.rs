use std::path::Path;
use std::sync::Arc;

use lab_assist::{Assistant, CompletionService, ServiceError};
use lab_core::test_fixtures::{base_content, make_rng};
use lab_core::LabState;
use lab_world::SnapshotStore;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::state::{AppState, LabSession};

type Hook = Box<dyn Fn() + Send + Sync>;

/// Completion service with a fixed reply and an optional side effect that
/// runs while the call is in flight.
pub struct Canned {
    reply: Result<String, ServiceError>,
    hook: Mutex<Option<Hook>>,
}

impl Canned {
    pub fn failing() -> Self {
        Self {
            reply: Err(ServiceError::Unavailable),
            hook: Mutex::new(None),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            hook: Mutex::new(None),
        }
    }

    pub fn on_call(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hook.lock() = Some(Box::new(hook));
    }
}

impl CompletionService for Canned {
    async fn complete(&self, _prompt: &str) -> Result<String, ServiceError> {
        if let Some(hook) = self.hook.lock().as_ref() {
            hook();
        }
        self.reply.clone()
    }
}

pub fn make_test_state<S: CompletionService>(service: S) -> AppState<S> {
    make_test_state_in(service, &std::env::temp_dir().join("lab_daemon_tests"))
}

pub fn make_test_state_in<S: CompletionService>(service: S, data_dir: &Path) -> AppState<S> {
    let (event_tx, _) = tokio::sync::broadcast::channel(64);
    AppState {
        lab: Arc::new(Mutex::new(LabSession {
            state: LabState::default(),
            rng: make_rng(),
        })),
        content: Arc::new(base_content()),
        assistant: Arc::new(Assistant::new(service, ChaCha8Rng::seed_from_u64(7))),
        event_tx,
        snapshots: Arc::new(SnapshotStore::new(data_dir)),
    }
}
