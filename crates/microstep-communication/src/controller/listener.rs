//! Passive line observers
//!
//! Controllers print lines nobody asked for: boot banners after the
//! reset-on-connect, status chatter, alarms. The session's I/O thread hands
//! each such line to every registered listener.

use parking_lot::RwLock;
use std::sync::Arc;

/// Receives unsolicited lines from the controller
pub trait LineListener: Send + Sync {
    /// Called on the session's I/O thread for each complete line
    fn on_line(&self, line: &str);

    /// Called once if the I/O thread loses the link
    fn on_link_lost(&self, _reason: &str) {}
}

impl<F> LineListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_line(&self, line: &str) {
        self(line)
    }
}

/// Shared list of listeners, readable from the I/O thread
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<RwLock<Vec<Arc<dyn LineListener>>>>,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn add(&self, listener: Arc<dyn LineListener>) {
        self.listeners.write().push(listener);
    }

    /// Drop all listeners
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether no listeners are registered
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    pub(crate) fn notify_line(&self, line: &str) {
        tracing::info!("Device: {}", line);
        for listener in self.listeners.read().iter() {
            listener.on_line(line);
        }
    }

    pub(crate) fn notify_link_lost(&self, reason: &str) {
        for listener in self.listeners.read().iter() {
            listener.on_link_lost(reason);
        }
    }
}
