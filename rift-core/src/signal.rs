//! Change-notification signals.
//!
//! Gameplay components announce state changes (health lost, inventory
//! mutated, conversation moved) through a [`Signal`]: an explicit list of
//! independent listeners, fired in registration order with no return value.
//! Listeners cannot be removed individually; a component drops all of its
//! listeners when it is dropped.

use std::fmt;

/// A fire-and-forget notification with no payload.
#[derive(Default)]
pub struct Signal {
    listeners: Vec<Box<dyn FnMut() + Send>>,
}

impl Signal {
    /// Create a signal with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners fire in registration order.
    pub fn connect(&mut self, listener: impl FnMut() + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Fire every listener once.
    pub fn emit(&mut self) {
        for listener in &mut self.listeners {
            listener();
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
