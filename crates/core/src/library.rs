//! Event registry: resolves event kinds to handlers and trigger dispatchers.

use crate::event::Event;
use std::collections::HashMap;
use std::fmt;
use tagvm_types::EventId;
use thiserror::Error;
use tracing::trace;

/// Handler invoked when a hardware host processes an event.
///
/// Handlers run in the calling context with full mutable access to the
/// hardware; they may spawn threads and enqueue further events freely.
pub type HandlerFn<H> = Box<dyn Fn(&mut H, &dyn Event) + Send + Sync>;

/// Dispatcher invoked when a hardware host emits (triggers) an event outward.
/// Triggering fans out to every dispatcher registered for the kind.
pub type DispatchFn<H> = Box<dyn Fn(&mut H, &dyn Event) + Send + Sync>;

/// Errors from event registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Each event name may be registered once.
    #[error("event name {0:?} is already registered")]
    DuplicateName(String),
}

struct EventDef<H> {
    name: String,
    handler: HandlerFn<H>,
    dispatchers: Vec<DispatchFn<H>>,
}

/// Registry of the event kinds a hardware type knows about.
///
/// Handling routes an event to its single registered handler; triggering
/// fans out to every registered dispatch function (host → world). The
/// registry is immutable once shared, so one library can serve many hosts.
pub struct EventLibrary<H> {
    events: Vec<EventDef<H>>,
    name_index: HashMap<String, EventId>,
}

impl<H> EventLibrary<H> {
    /// Create an empty library.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            name_index: HashMap::new(),
        }
    }

    /// Number of registered event kinds.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no event kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Register a new event kind and return its id.
    pub fn register_event(
        &mut self,
        name: impl Into<String>,
        handler: HandlerFn<H>,
    ) -> Result<EventId, RegistryError> {
        let name = name.into();
        if self.name_index.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        let id = EventId::from_index(self.events.len());
        self.name_index.insert(name.clone(), id);
        self.events.push(EventDef {
            name,
            handler,
            dispatchers: Vec::new(),
        });
        Ok(id)
    }

    /// Attach a dispatch function to an already-registered kind.
    ///
    /// Panics if `id` is not registered.
    pub fn add_dispatch_fun(&mut self, id: EventId, dispatcher: DispatchFn<H>) {
        self.def_mut(id).dispatchers.push(dispatcher);
    }

    /// Look up a kind by registered name.
    pub fn event_id(&self, name: &str) -> Option<EventId> {
        self.name_index.get(name).copied()
    }

    /// Name of a registered kind.
    ///
    /// Panics if `id` is not registered.
    pub fn name(&self, id: EventId) -> &str {
        &self.def(id).name
    }

    /// Deliver an event to its registered handler, synchronously.
    ///
    /// Panics if the event's kind is not registered.
    pub fn handle_event(&self, hardware: &mut H, event: &dyn Event) {
        let def = self.def(event.kind());
        trace!(event = %event.kind(), name = %def.name, "handling event");
        (def.handler)(hardware, event);
    }

    /// Emit an event outward through every dispatcher registered for its
    /// kind.
    ///
    /// Panics if the event's kind is not registered.
    pub fn trigger_event(&self, hardware: &mut H, event: &dyn Event) {
        let def = self.def(event.kind());
        trace!(
            event = %event.kind(),
            name = %def.name,
            dispatchers = def.dispatchers.len(),
            "triggering event"
        );
        for dispatcher in &def.dispatchers {
            dispatcher(hardware, event);
        }
    }

    fn def(&self, id: EventId) -> &EventDef<H> {
        self.events
            .get(id.index())
            .unwrap_or_else(|| panic!("event kind {id} is not registered"))
    }

    fn def_mut(&mut self, id: EventId) -> &mut EventDef<H> {
        self.events
            .get_mut(id.index())
            .unwrap_or_else(|| panic!("event kind {id} is not registered"))
    }
}

impl<H> Default for EventLibrary<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for EventLibrary<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLibrary")
            .field(
                "events",
                &self.events.iter().map(|def| &def.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
