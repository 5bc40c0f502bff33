//! Expiration callbacks and the registry that fans out to them.

use std::sync::Arc;

use parking_lot::RwLock;

/// Callback invoked when a tracked object's slot is reached.
///
/// Listeners run synchronously on the driver thread, once per expiration
/// event, in registration order. Implementations must not perform
/// long-blocking work: every millisecond spent here delays subsequent ticks.
/// A panic inside a listener is caught and logged by the driver; it never
/// aborts the fan-out to other listeners or stops the tick loop.
///
/// Any `Fn(&E) + Send + Sync` closure is a listener:
///
/// ```
/// use std::sync::Arc;
/// use wheeltimer::ExpirationListener;
///
/// let listener: Arc<dyn ExpirationListener<String>> =
///     Arc::new(|session: &String| println!("{session} idled out"));
/// ```
pub trait ExpirationListener<E>: Send + Sync {
    /// Called with the expired object.
    fn expired(&self, element: &E);
}

impl<E, F> ExpirationListener<E> for F
where
    F: Fn(&E) + Send + Sync,
{
    fn expired(&self, element: &E) {
        self(element);
    }
}

/// Registration-ordered listener collection, safe to mutate while a fan-out
/// is in progress.
///
/// The backing storage is copy-on-write: notification iterates an `Arc`
/// snapshot, so a listener added mid-fan-out is simply absent from that
/// snapshot and present in all later ones, and a removed listener may still
/// see the fan-out already underway but none after. Removal matches by
/// `Arc` identity, not by value.
pub(crate) struct ListenerRegistry<E> {
    listeners: RwLock<Arc<[Arc<dyn ExpirationListener<E>>]>>,
}

impl<E> ListenerRegistry<E> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new().into()),
        }
    }

    pub(crate) fn add(&self, listener: Arc<dyn ExpirationListener<E>>) {
        let mut current = self.listeners.write();
        let mut next: Vec<_> = current.iter().cloned().collect();
        next.push(listener);
        *current = next.into();
    }

    /// Removes a previously registered listener, matched by `Arc` identity.
    /// Returns whether it was found.
    pub(crate) fn remove(&self, listener: &Arc<dyn ExpirationListener<E>>) -> bool {
        let mut current = self.listeners.write();
        let next: Vec<_> = current
            .iter()
            .filter(|registered| !Arc::ptr_eq(registered, listener))
            .cloned()
            .collect();
        let found = next.len() < current.len();
        if found {
            *current = next.into();
        }
        found
    }

    /// Snapshot for one fan-out; unaffected by concurrent registry changes.
    pub(crate) fn snapshot(&self) -> Arc<[Arc<dyn ExpirationListener<E>>]> {
        self.listeners.read().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }
}

impl<E> std::fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .finish()
    }
}
