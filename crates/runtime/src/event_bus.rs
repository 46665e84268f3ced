use std::cell::RefCell;
use std::rc::Rc;

use foundation::ids::OriginToken;
use tracing::trace;

/// Error type returned by subscriber callbacks.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Subscriber callback. Invoked synchronously from [`EventBus::publish`].
pub type Callback = Rc<dyn Fn(&Event) -> Result<(), HandlerError>>;

/// Positional payload carried by an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    /// Snapshot of a filter dimension after a change.
    Keys(Vec<String>),
    /// Newly active group.
    Group(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub sender: OriginToken,
    pub payload: Payload,
}

impl Event {
    /// Whether `token` originated this event.
    pub fn is_from(&self, token: &OriginToken) -> bool {
        &self.sender == token
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("subscriber `{namespace}` failed while handling `{event}`")]
    Handler {
        event: String,
        namespace: String,
        #[source]
        source: HandlerError,
    },
}

struct Subscription {
    event: String,
    namespace: String,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    subscriptions: Vec<Subscription>,
}

/// Namespaced publish/subscribe channel.
///
/// Cloning yields another handle to the same registry. One process-wide
/// instance is available through [`EventBus::global`]; separate instances are
/// useful to isolate tests.
///
/// Ordering contract:
/// - Callbacks for one event name run in subscription order.
/// - Re-subscribing an existing `(event, namespace)` pair replaces the callback
///   and moves it to the end of that order.
/// - A dispatch works on the subscriptions present when `publish` was called.
///   Callbacks may subscribe, unsubscribe or publish while it runs.
///
/// The bus never filters by sender. Subscribers compare [`Event::sender`] with
/// their own token and ignore events they originated; a subscriber that
/// republishes the same event without that check recurses without bound.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<Registry>>,
}

thread_local! {
    static GLOBAL: EventBus = EventBus::new();
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the process-wide bus.
    pub fn global() -> Self {
        GLOBAL.with(Clone::clone)
    }

    pub fn subscribe<F>(&self, event: &str, namespace: &str, callback: F)
    where
        F: Fn(&Event) -> Result<(), HandlerError> + 'static,
    {
        let mut registry = self.inner.borrow_mut();
        registry
            .subscriptions
            .retain(|s| !(s.event == event && s.namespace == namespace));
        registry.subscriptions.push(Subscription {
            event: event.to_string(),
            namespace: namespace.to_string(),
            callback: Rc::new(callback),
        });
        trace!(event, namespace, "subscribed");
    }

    /// Removes every subscription registered under `namespace`.
    ///
    /// Returns the number of removed subscriptions.
    pub fn unsubscribe(&self, namespace: &str) -> usize {
        let mut registry = self.inner.borrow_mut();
        let before = registry.subscriptions.len();
        registry.subscriptions.retain(|s| s.namespace != namespace);
        before - registry.subscriptions.len()
    }

    /// Removes the single subscription for `(event, namespace)`.
    ///
    /// Returns `true` if a subscription was removed.
    pub fn unsubscribe_event(&self, event: &str, namespace: &str) -> bool {
        let mut registry = self.inner.borrow_mut();
        let before = registry.subscriptions.len();
        registry
            .subscriptions
            .retain(|s| !(s.event == event && s.namespace == namespace));
        before != registry.subscriptions.len()
    }

    /// Invokes every callback registered for `event`.
    ///
    /// The first callback error stops the dispatch and is returned. Returns the
    /// number of callbacks invoked otherwise.
    pub fn publish(
        &self,
        event: &str,
        sender: &OriginToken,
        payload: Payload,
    ) -> Result<usize, PublishError> {
        let targets: Vec<(String, Callback)> = {
            let registry = self.inner.borrow();
            registry
                .subscriptions
                .iter()
                .filter(|s| s.event == event)
                .map(|s| (s.namespace.clone(), Rc::clone(&s.callback)))
                .collect()
        };

        trace!(event, sender = %sender, subscribers = targets.len(), "publish");

        let message = Event {
            name: event.to_string(),
            sender: sender.clone(),
            payload,
        };
        for (namespace, callback) in &targets {
            callback(&message).map_err(|source| PublishError::Handler {
                event: event.to_string(),
                namespace: namespace.clone(),
                source,
            })?;
        }
        Ok(targets.len())
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .subscriptions
            .iter()
            .filter(|s| s.event == event)
            .count()
    }

    /// Namespaces subscribed to `event`, in dispatch order.
    pub fn namespaces(&self, event: &str) -> Vec<String> {
        self.inner
            .borrow()
            .subscriptions
            .iter()
            .filter(|s| s.event == event)
            .map(|s| s.namespace.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().subscriptions.is_empty()
    }

    /// Whether both handles point at the same registry.
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("subscriptions", &registry.subscriptions.len())
            .finish()
    }
}
