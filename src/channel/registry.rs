//! Type-keyed handler registry

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// Callback invoked with an inbound message's payload.
pub type Handler = Arc<dyn Fn(Value) + Send + Sync>;

/// Maps message-type strings to exactly one handler each.
///
/// Registration replaces: registering a handler for a type that already
/// has one silently drops the old one (last writer wins). Hosts that need
/// fan-out should multiplex inside their own handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any existing one.
    pub fn register(&self, kind: impl Into<String>, handler: impl Fn(Value) + Send + Sync + 'static) {
        let kind = kind.into();
        let replaced = self
            .handlers
            .write()
            .insert(kind.clone(), Arc::new(handler))
            .is_some();
        if replaced {
            tracing::debug!(%kind, "replaced existing handler");
        }
    }

    /// Remove the handler for `kind`. Returns whether one was registered.
    pub fn unregister(&self, kind: &str) -> bool {
        self.handlers.write().remove(kind).is_some()
    }

    /// Invoke the handler for `kind` with `payload`. Returns whether a
    /// handler was registered; unhandled messages are the caller's to drop.
    pub fn dispatch(&self, kind: &str, payload: Value) -> bool {
        // Clone the handler out so the lock is not held during the call.
        let handler = self.handlers.read().get(kind).cloned();
        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn dispatches_to_registered_handler() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.register("chat_message", move |v| sink.lock().push(v));

        assert!(registry.dispatch("chat_message", json!({"message": "Hi"})));
        assert_eq!(seen.lock().as_slice(), [json!({"message": "Hi"})]);
    }

    #[test]
    fn unknown_type_is_not_handled() {
        let registry = HandlerRegistry::new();
        assert!(!registry.dispatch("typing_indicator", json!({})));
    }

    #[test]
    fn last_registration_wins() {
        let registry = HandlerRegistry::new();
        let first = Arc::new(Mutex::new(0u32));
        let second = Arc::new(Mutex::new(0u32));

        let counter = Arc::clone(&first);
        registry.register("chat_message", move |_| *counter.lock() += 1);
        let counter = Arc::clone(&second);
        registry.register("chat_message", move |_| *counter.lock() += 1);

        registry.dispatch("chat_message", json!({}));
        assert_eq!(*first.lock(), 0);
        assert_eq!(*second.lock(), 1);
    }

    #[test]
    fn unregister_removes_handler() {
        let registry = HandlerRegistry::new();
        registry.register("chat_message", |_| {});
        assert!(registry.unregister("chat_message"));
        assert!(!registry.unregister("chat_message"));
        assert!(!registry.dispatch("chat_message", json!({})));
    }
}
