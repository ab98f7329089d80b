//! Events delivered to the hardware.

use std::any::Any;
use std::fmt;
use tagvm_types::EventId;

/// An event deliverable to a hardware host.
///
/// Events are **passive data**: an integer kind resolving to a handler in an
/// [`EventLibrary`](crate::EventLibrary), plus whatever payload that handler
/// understands. Payloads are opaque to the hardware; handlers recover them by
/// downcasting through [`Event::as_any`].
pub trait Event: fmt::Debug + Any {
    /// Library id of this event's kind.
    fn kind(&self) -> EventId;

    /// Payload access for handlers and dispatchers.
    fn as_any(&self) -> &dyn Any;
}

/// Minimal event carrying only its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseEvent {
    /// The event kind.
    pub id: EventId,
}

impl BaseEvent {
    /// Create an event of the given kind.
    pub fn new(id: EventId) -> Self {
        Self { id }
    }
}

impl Event for BaseEvent {
    fn kind(&self) -> EventId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
