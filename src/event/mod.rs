mod bus;
mod events;
mod handlers;

pub use bus::EventBus;
pub use events::{EditorEvent, LayerEvent, PublishEvent};
pub use handlers::{EventRecorder, LogEventHandler};

/// Receives every event emitted on an [`EventBus`]
pub trait EventHandler: Send {
    fn handle_event(&mut self, event: &EditorEvent);
}
