use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Listener<E> = Rc<dyn Fn(&E)>;

struct Registry<E> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, Listener<E>)>>,
}

/// Listener list shared by a component and the subscriptions it hands out.
pub struct Observers<E> {
    registry: Rc<Registry<E>>,
}

/// Handle returned by [`Observers::subscribe`].
pub struct Subscription<E> {
    id: u64,
    registry: Weak<Registry<E>>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Observers {
            registry: Rc::new(Registry {
                next_id: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> Subscription<E> {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        self.registry
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn notify(&self, event: &E) {
        // Snapshot first so listeners may subscribe or unsubscribe while being called.
        let listeners: Vec<Listener<E>> = self
            .registry
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Subscription<E> {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .listeners
                .borrow_mut()
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_reaches_every_listener_until_unsubscribed() {
        let observers: Observers<u32> = Observers::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let a = {
            let seen = Rc::clone(&seen);
            observers.subscribe(move |v| seen.borrow_mut().push(("a", *v)))
        };
        let _b = {
            let seen = Rc::clone(&seen);
            observers.subscribe(move |v| seen.borrow_mut().push(("b", *v)))
        };
        observers.notify(&1);
        a.unsubscribe();
        observers.notify(&2);
        assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 1), ("b", 2)]);
        assert_eq!(observers.len(), 1);
    }

    #[test]
    fn unsubscribe_after_owner_dropped_is_harmless() {
        let observers: Observers<()> = Observers::new();
        let sub = observers.subscribe(|_| {});
        drop(observers);
        sub.unsubscribe();
    }
}
