//! Attribution-completion listeners.
//!
//! The presentation layer registers listeners before attribution starts so it
//! can defer rendering decisions until identifiers have been persisted.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Listener = Box<dyn FnOnce()>;

#[derive(Default)]
struct Registry {
    listeners: Vec<Listener>,
    notified: bool,
}

/// Single-threaded listener list. Clones share the same list.
#[derive(Clone, Default)]
pub struct CompletionNotifier {
    registry: Rc<RefCell<Registry>>,
}

impl CompletionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. After `notify` has run, the listener runs at once.
    pub fn register(&self, listener: impl FnOnce() + 'static) {
        let mut registry = self.registry.borrow_mut();
        if registry.notified {
            drop(registry);
            listener();
            return;
        }
        registry.listeners.push(Box::new(listener));
    }

    /// Run every pending listener once, in registration order.
    pub fn notify(&self) {
        let listeners = {
            let mut registry = self.registry.borrow_mut();
            registry.notified = true;
            std::mem::take(&mut registry.listeners)
        };
        for listener in listeners {
            listener();
        }
    }
}

impl fmt::Debug for CompletionNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("CompletionNotifier")
            .field("pending", &registry.listeners.len())
            .field("notified", &registry.notified)
            .finish()
    }
}
