//! Typed publish/subscribe used by the cart and session stores.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
}

pub struct Subscribers<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: 'static> Subscribers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`; it stays registered until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.callbacks.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    lock(&registry).callbacks.retain(|(cb_id, _)| *cb_id != id);
                }
            })),
        }
    }

    /// Calls every callback in registration order. The registry lock is not
    /// held while callbacks run, so a callback may subscribe or publish.
    pub fn publish(&self, event: &T) {
        let callbacks: Vec<Callback<T>> = lock(&self.registry)
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by [`Subscribers::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Keeps the callback registered for the lifetime of the publisher.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
