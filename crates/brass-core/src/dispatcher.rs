//! Event dispatcher for the Brass runtime.
//!
//! The [`EventDispatcher`] is a pub/sub broker. Listeners register for one or
//! more [`EventKind`]s; [`EventDispatcher::trigger`] fans an event out to every
//! listener of its kind.
//!
//! # Delivery
//!
//! - Each listener runs in its own Tokio task. `trigger` returns once the tasks
//!   are spawned, never waiting for them to finish.
//! - A listener that returns an error or panics is logged with the event kind
//!   attached; siblings and the caller are unaffected.
//! - There is no ordering between listeners of the same event.
//! - Events whose sender identity is on the ignore list reach no listener.
//!
//! ```rust,ignore
//! use brass_core::{EventDispatcher, EventKind, Event};
//!
//! let dispatcher = EventDispatcher::new();
//! dispatcher.register_listener(EventKind::ChatMessage, |event| async move {
//!     tracing::info!(text = %event.text, "chat");
//!     Ok(())
//! });
//!
//! dispatcher.trigger(Event::new(EventKind::ChatMessage).text("hi"));
//! ```

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{Instrument, Level, debug, error, span, trace, warn};

use crate::event::{Event, EventKind};

/// Future returned by a listener.
pub type ListenerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A type-erased listener.
pub type Listener = Arc<dyn Fn(Arc<Event>) -> ListenerFuture + Send + Sync>;

/// Wraps an async closure into a [`Listener`].
pub fn into_listener<F, Fut>(f: F) -> Listener
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |event| f(event).boxed())
}

/// Extracts a printable message from a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// The central pub/sub broker.
///
/// # Thread Safety
///
/// `EventDispatcher` is `Send + Sync`; registration and triggering may happen
/// concurrently from any task. Listeners are never unregistered.
#[derive(Default)]
pub struct EventDispatcher {
    /// Listeners by kind. Duplicates are allowed.
    listeners: RwLock<HashMap<EventKind, Vec<Listener>>>,
    /// Identities whose events are dropped before dispatch.
    black_list: RwLock<HashSet<String>>,
}

impl EventDispatcher {
    /// Creates a dispatcher with no listeners and an empty ignore list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for a single kind.
    pub fn register_listener<F, Fut>(&self, kind: EventKind, f: F)
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_boxed(&[kind], into_listener(f));
    }

    /// Registers one listener for several kinds.
    ///
    /// The listener is invoked once per matching event, whichever of the
    /// kinds it carries.
    pub fn register_multi_listener<F, Fut>(&self, kinds: &[EventKind], f: F)
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_boxed(kinds, into_listener(f));
    }

    /// Registers a pre-built listener for the given kinds.
    pub fn register_boxed(&self, kinds: &[EventKind], listener: Listener) {
        let mut listeners = self.listeners.write();
        let mut seen = HashSet::new();
        for kind in kinds {
            if seen.insert(*kind) {
                listeners
                    .entry(*kind)
                    .or_default()
                    .push(Arc::clone(&listener));
            }
        }
        debug!(kinds = ?kinds, "Listener registered");
    }

    /// Replaces the ignore list.
    pub fn set_black_list<I, S>(&self, identities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: HashSet<String> = identities
            .into_iter()
            .map(Into::into)
            .filter(|id| !id.is_empty())
            .collect();
        debug!(count = list.len(), "Ignore list updated");
        *self.black_list.write() = list;
    }

    /// Returns true if events from `identity` are dropped.
    ///
    /// Matching is exact; an empty identity is never ignored.
    pub fn is_ignored(&self, identity: &str) -> bool {
        !identity.is_empty() && self.black_list.read().contains(identity)
    }

    /// Returns the number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }

    /// Fans `event` out to every listener of its kind.
    ///
    /// Must be called from within a Tokio runtime. Returns the number of
    /// listener tasks that were spawned; zero if the sender is ignored.
    pub fn trigger(&self, event: Event) -> usize {
        if self.is_ignored(&event.identity) {
            debug!(
                kind = %event.kind,
                nick = %event.nick,
                identity = %event.identity,
                "Dropping event from ignored identity"
            );
            return 0;
        }

        let kind = event.kind;
        let listeners: Vec<Listener> = match self.listeners.read().get(&kind) {
            Some(list) => list.clone(),
            None => {
                trace!(kind = %kind, "No listeners for event");
                return 0;
            }
        };

        let event = Arc::new(event);
        for (index, listener) in listeners.iter().enumerate() {
            let event = Arc::clone(&event);
            let listener = Arc::clone(listener);
            let span = span!(Level::DEBUG, "listener", kind = %kind, index);

            let task = AssertUnwindSafe(async move { listener(event).await }).catch_unwind();
            tokio::spawn(
                async move {
                    match task.await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            warn!(kind = %kind, error = %e, "Listener failed");
                        }
                        Err(payload) => {
                            error!(
                                kind = %kind,
                                panic = %panic_message(payload.as_ref()),
                                "Listener panicked"
                            );
                        }
                    }
                }
                .instrument(span),
            );
        }

        listeners.len()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read();
        f.debug_struct("EventDispatcher")
            .field("kinds", &listeners.len())
            .field("ignored", &self.black_list.read().len())
            .finish()
    }
}
