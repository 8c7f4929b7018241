use std::cell::RefCell;

use crate::event::{EditorEvent, EventHandler};

/// Broadcasts editor events to the page around the editor: sidebar
/// controls, notifications and logging
pub struct EventBus {
    handlers: RefCell<Vec<Box<dyn EventHandler>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handlers.borrow().len()))
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.handlers.borrow_mut().push(handler);
    }

    /// Deliver `event` to every handler in subscription order
    pub fn emit(&self, event: EditorEvent) {
        for handler in self.handlers.borrow_mut().iter_mut() {
            handler.handle_event(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventRecorder, PublishEvent};

    #[test]
    fn test_emit_reaches_all_handlers_in_order() {
        let bus = EventBus::new();
        let first = EventRecorder::default();
        let second = EventRecorder::default();
        bus.subscribe(Box::new(first.clone()));
        bus.subscribe(Box::new(second.clone()));

        bus.emit(EditorEvent::Publish(PublishEvent::Started { title: "t1".to_owned() }));
        bus.emit(EditorEvent::Publish(PublishEvent::Failed { message: "boom".to_owned() }));

        assert_eq!(bus.handler_count(), 2);
        assert_eq!(first.events(), second.events());
        assert_eq!(first.events().len(), 2);
    }
}
