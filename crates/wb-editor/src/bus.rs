//! In-process publish/subscribe channel.
//!
//! Delivery is synchronous: `publish` returns after every listener ran.
//! Dropping the [`Subscription`] handle unregisters its listener.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Listener<E> = Rc<dyn Fn(&E)>;

pub struct EventBus<E> {
    listeners: Rc<RefCell<Vec<Listener<E>>>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Register `listener`; it stays active while the returned handle lives.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> Subscription<E> {
        let listener: Listener<E> = Rc::new(listener);
        self.listeners.borrow_mut().push(Rc::clone(&listener));
        Subscription {
            listener,
            listeners: Rc::clone(&self.listeners),
        }
    }

    /// Deliver `event` to every listener registered at call time.
    ///
    /// Listeners may subscribe, unsubscribe or publish again while running;
    /// those changes apply to the next publish.
    pub fn publish(&self, event: &E) {
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            (listener)(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

pub struct Subscription<E> {
    listener: Listener<E>,
    listeners: Rc<RefCell<Vec<Listener<E>>>>,
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|item| !Rc::ptr_eq(item, &self.listener));
    }
}
