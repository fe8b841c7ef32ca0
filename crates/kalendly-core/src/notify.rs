use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

pub type Listener<T> = Rc<dyn Fn(&T)>;

trait Detach {
    fn detach(&mut self, id: u64) -> bool;
}

struct Registry<T> {
    next_id: u64,
    entries: BTreeMap<u64, Listener<T>>,
}

impl<T> Detach for Registry<T> {
    fn detach(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }
}

/// Set of callbacks keyed by registration id.
///
/// Notification runs over a copy of the set taken up front, so a callback may
/// add or remove listeners (itself included) without disturbing the round in
/// progress. Listeners added during a round are first called on the next one.
pub struct Listeners<T> {
    registry: Rc<RefCell<Registry<T>>>,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: BTreeMap::new(),
            })),
        }
    }

    pub fn add(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.insert(id, Rc::new(listener));
            id
        };
        trace!(id, "listener registered");

        let handle: Rc<RefCell<dyn Detach>> = self.registry.clone();
        Subscription {
            id,
            registry: Rc::downgrade(&handle),
        }
    }

    /// Calls every listener once; returns how many were called.
    pub fn notify(&self, subject: &T) -> usize {
        let snapshot: Vec<Listener<T>> = self.registry.borrow().entries.values().cloned().collect();
        for listener in &snapshot {
            listener(subject);
        }
        snapshot.len()
    }

    /// Drops every listener; returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut registry = self.registry.borrow_mut();
        let removed = registry.entries.len();
        registry.entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.registry.borrow().entries.len())
            .finish()
    }
}

/// Handle for one registered listener. Dropping it leaves the listener
/// registered; call [`Subscription::unsubscribe`] to remove it.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<dyn Detach>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Removes the listener. Only the first call on a live registry returns
    /// `true`; later calls do nothing.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let removed = registry.borrow_mut().detach(self.id);
        trace!(id = self.id, removed, "listener unsubscribed");
        removed
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
