//! Named-event dispatch for pipeline instrumentation
//!
//! ## Table of Contents
//! - **EventKind**: Vocabulary of lifecycle and validation events
//! - **Listener**: Trait for event consumers
//! - **EventSource**: Declared vocabulary plus ordered synchronous fan-out
//! - **DispatchListener**: One listener, many kinds, enum-keyed dispatch table
//!
//! Dispatch is synchronous and in-stack: listeners for one event fire
//! strictly after the raising stage finished writing to the pipe, and
//! strictly before the next stage runs. Using an event kind the source never
//! declared is a configuration fault, not a runtime condition.

use crate::error::{Result, RiskError};
use crate::pipe::Pipe;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Events a pipeline can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Whole-run scan started
    Start,
    /// Whole-run scan finished
    Stop,
    /// A site's pipe satisfied the active specification
    ValidationSucceeded,
    /// A site's pipe failed the active specification
    ValidationFailed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Start => "start",
            EventKind::Stop => "stop",
            EventKind::ValidationSucceeded => "validation-succeeded",
            EventKind::ValidationFailed => "validation-failed",
        };
        write!(f, "{}", name)
    }
}

/// Trait for event consumers
///
/// Listeners receive the shared pipe for the computation that raised the
/// event. Implementations needing state use interior mutability, since
/// dispatch hands out `&self`.
pub trait Listener: Send + Sync {
    /// Handle one raised event
    fn on_event(&self, event: EventKind, pipe: &Pipe);
}

impl<F> Listener for F
where
    F: Fn(EventKind, &Pipe) + Send + Sync,
{
    fn on_event(&self, event: EventKind, pipe: &Pipe) {
        self(event, pipe)
    }
}

/// Type alias for a shared listener
pub type BoxedListener = Arc<dyn Listener>;

/// A named-event source with a declared vocabulary
///
/// `declare` registers the legal event kinds for the instance; `on` and
/// `raise` reject kinds outside that vocabulary.
#[derive(Default)]
pub struct EventSource {
    vocabulary: HashSet<EventKind>,
    listeners: HashMap<EventKind, Vec<BoxedListener>>,
}

impl EventSource {
    /// Create a source with an empty vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source that can raise the given kinds
    pub fn with_vocabulary(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        let mut source = Self::new();
        source.declare(kinds);
        source
    }

    /// Add kinds to the legal vocabulary
    pub fn declare(&mut self, kinds: impl IntoIterator<Item = EventKind>) {
        self.vocabulary.extend(kinds);
    }

    /// Whether the source declared the given kind
    pub fn declares(&self, kind: EventKind) -> bool {
        self.vocabulary.contains(&kind)
    }

    /// Register a listener for a declared kind
    pub fn on(&mut self, kind: EventKind, listener: BoxedListener) -> Result<()> {
        if !self.declares(kind) {
            return Err(RiskError::config(format!(
                "listener registered for undeclared event '{}'",
                kind
            )));
        }
        self.listeners.entry(kind).or_default().push(listener);
        Ok(())
    }

    /// Raise an event, invoking listeners in registration order
    pub fn raise(&self, kind: EventKind, pipe: &Pipe) -> Result<()> {
        if !self.declares(kind) {
            return Err(RiskError::config(format!(
                "raised undeclared event '{}'",
                kind
            )));
        }
        if let Some(listeners) = self.listeners.get(&kind) {
            for listener in listeners {
                listener.on_event(kind, pipe);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("vocabulary", &self.vocabulary)
            .field(
                "listeners",
                &self
                    .listeners
                    .iter()
                    .map(|(k, v)| (*k, v.len()))
                    .collect::<HashMap<_, _>>(),
            )
            .finish()
    }
}

/// One listener object routing different kinds to different handlers
///
/// Routing is an enum-keyed dispatch table; kinds with no registered handler
/// are ignored.
#[derive(Default)]
pub struct DispatchListener {
    handlers: HashMap<EventKind, Box<dyn Fn(&Pipe) + Send + Sync>>,
}

impl DispatchListener {
    /// Create a dispatcher with no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for one kind, replacing any previous one
    pub fn handle(
        mut self,
        kind: EventKind,
        handler: impl Fn(&Pipe) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(kind, Box::new(handler));
        self
    }
}

impl Listener for DispatchListener {
    fn on_event(&self, event: EventKind, pipe: &Pipe) {
        if let Some(handler) = self.handlers.get(&event) {
            handler(pipe);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Region, Site};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pipe() -> Pipe {
        let site = Site::new(1.0, 1.0).unwrap();
        Pipe::new(site, Region::single_cell_region(site))
    }

    #[test]
    fn test_undeclared_event_registration_fails() {
        let mut source = EventSource::with_vocabulary([EventKind::Start]);
        let listener: BoxedListener = Arc::new(|_: EventKind, _: &Pipe| {});
        assert!(source.on(EventKind::Start, listener.clone()).is_ok());
        assert!(source.on(EventKind::Stop, listener).is_err());
    }

    #[test]
    fn test_raising_undeclared_event_fails() {
        let source = EventSource::with_vocabulary([EventKind::Start]);
        assert!(source.raise(EventKind::Start, &pipe()).is_ok());
        assert!(source.raise(EventKind::Stop, &pipe()).is_err());
    }

    #[test]
    fn test_listeners_fire_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut source = EventSource::with_vocabulary([EventKind::Start]);
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            source
                .on(
                    EventKind::Start,
                    Arc::new(move |_: EventKind, _: &Pipe| order.lock().push(tag)),
                )
                .unwrap();
        }

        source.raise(EventKind::Start, &pipe()).unwrap();
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dispatch_listener_routes_by_kind() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));

        let dispatcher = {
            let started = started.clone();
            let stopped = stopped.clone();
            DispatchListener::new()
                .handle(EventKind::Start, move |_| {
                    started.fetch_add(1, Ordering::SeqCst);
                })
                .handle(EventKind::Stop, move |_| {
                    stopped.fetch_add(1, Ordering::SeqCst);
                })
        };

        let mut source =
            EventSource::with_vocabulary([EventKind::Start, EventKind::Stop, EventKind::ValidationFailed]);
        let dispatcher: BoxedListener = Arc::new(dispatcher);
        source.on(EventKind::Start, dispatcher.clone()).unwrap();
        source.on(EventKind::Stop, dispatcher.clone()).unwrap();
        source
            .on(EventKind::ValidationFailed, dispatcher)
            .unwrap();

        let p = pipe();
        source.raise(EventKind::Start, &p).unwrap();
        source.raise(EventKind::Start, &p).unwrap();
        source.raise(EventKind::Stop, &p).unwrap();
        // no handler registered for this kind: ignored
        source.raise(EventKind::ValidationFailed, &p).unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }
}
