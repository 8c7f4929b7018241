use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::event::{EditorEvent, EventHandler};

/// Logs every event at debug level
#[derive(Debug, Default)]
pub struct LogEventHandler;

impl EventHandler for LogEventHandler {
    fn handle_event(&mut self, event: &EditorEvent) {
        debug!("Editor event: {event:?}");
    }
}

/// Keeps a shared copy of every event it receives. Clones share one log, so
/// one clone can be subscribed while another is read.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<EditorEvent>>>,
}

impl EventRecorder {
    pub fn events(&self) -> Vec<EditorEvent> {
        self.events.lock().clone()
    }

    /// Take everything recorded so far
    pub fn drain(&self) -> Vec<EditorEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventHandler for EventRecorder {
    fn handle_event(&mut self, event: &EditorEvent) {
        self.events.lock().push(event.clone());
    }
}
