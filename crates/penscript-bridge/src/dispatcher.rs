// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Publish/subscribe fan-out of engine messages.
//
// Delivery is synchronous and in registration order. The subscriber list is
// snapshotted before delivery, so callbacks may subscribe or unsubscribe
// (including themselves) without deadlocking.

use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use penscript_core::EngineMessage;

type Callback = Arc<dyn Fn(&EngineMessage) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

/// Shared subscriber registry.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<Mutex<Subscribers>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&EngineMessage) + Send + Sync + 'static,
    {
        let id = match self.inner.lock() {
            Ok(mut subs) => {
                subs.next_id += 1;
                let id = subs.next_id;
                subs.entries.push((id, Arc::new(callback)));
                id
            }
            // Poisoned: nothing will ever be published again anyway.
            Err(_) => 0,
        };
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub fn publish(&self, message: &EngineMessage) {
        let snapshot: Vec<Callback> = match self.inner.lock() {
            Ok(subs) => subs.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            Err(_) => return,
        };
        debug!(kind = message.kind(), subscribers = snapshot.len(), "publishing");
        for callback in snapshot {
            callback(message);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().map(|s| s.entries.len()).unwrap_or(0)
    }
}

/// Registration handle. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if let Ok(mut subs) = registry.lock() {
            subs.entries.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(dispatcher: &Dispatcher, log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Subscription {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        dispatcher.subscribe(move |msg| {
            log.lock().unwrap().push(format!("{tag}:{}", msg.kind()));
        })
    }

    #[test]
    fn delivers_in_registration_order() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _a = recorder(&dispatcher, &log, "a");
        let _b = recorder(&dispatcher, &log, "b");
        dispatcher.publish(&EngineMessage::WebviewReady);
        assert_eq!(*log.lock().unwrap(), vec!["a:WEBVIEW_READY", "b:WEBVIEW_READY"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&dispatcher, &log, "a");
        let _b = recorder(&dispatcher, &log, "b");
        a.unsubscribe();
        dispatcher.publish(&EngineMessage::WebviewReady);
        assert_eq!(*log.lock().unwrap(), vec!["b:WEBVIEW_READY"]);
        assert_eq!(dispatcher.subscriber_count(), 1);
    }

    #[test]
    fn callback_may_subscribe_during_delivery() {
        let dispatcher = Dispatcher::new();
        let inner = dispatcher.clone();
        let held = Arc::new(Mutex::new(Vec::new()));
        let held_cb = Arc::clone(&held);
        let _outer = dispatcher.subscribe(move |_| {
            held_cb.lock().unwrap().push(inner.subscribe(|_| {}));
        });
        dispatcher.publish(&EngineMessage::WebviewReady);
        assert_eq!(dispatcher.subscriber_count(), 2);
    }
}
