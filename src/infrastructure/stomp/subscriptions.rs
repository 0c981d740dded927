use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::debug;

use super::connection::Outbound;
use super::error::{StompError, StompResult};
use super::frame::Frame;
use crate::domain::ports::{MessageHandler, SubscriptionHandle};

struct Entry {
    topic: String,
    handler: MessageHandler,
}

/// Subscriptions that outlive individual connections, plus the writer queue
/// of the live connection if there is one.
///
/// Callers keep it behind one mutex so that registration, replay and
/// delivery never interleave.
pub struct SubscriptionRegistry {
    next_id: u64,
    entries: BTreeMap<u64, Entry>,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
}

impl SubscriptionRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
            outbound: None,
        }
    }

    /// Registers a handler. The SUBSCRIBE frame goes out now if a link is
    /// attached, otherwise on the next [`attach`](Self::attach).
    pub fn add(&mut self, topic: &str, handler: MessageHandler) -> SubscriptionHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            Entry {
                topic: topic.to_string(),
                handler,
            },
        );
        if let Some(tx) = &self.outbound
            && tx.send(Outbound::Frame(Frame::subscribe(id, topic))).is_err()
        {
            debug!(subscription = id, %topic, "Link closed, SUBSCRIBE deferred to next attach");
        }
        SubscriptionHandle::new(id)
    }

    /// Drops a handler. Returns false for unknown handles.
    pub fn remove(&mut self, handle: SubscriptionHandle) -> bool {
        let Some(entry) = self.entries.remove(&handle.id()) else {
            return false;
        };
        if let Some(tx) = &self.outbound
            && tx.send(Outbound::Frame(Frame::unsubscribe(handle.id()))).is_err()
        {
            debug!(subscription = handle.id(), "Link closed, UNSUBSCRIBE not sent");
        }
        debug!(subscription = handle.id(), topic = %entry.topic, "Removed subscription");
        true
    }

    /// Binds a fresh link and queues a SUBSCRIBE for every registered topic.
    /// Returns how many were replayed.
    pub fn attach(&mut self, tx: mpsc::UnboundedSender<Outbound>) -> usize {
        for (id, entry) in &self.entries {
            if tx.send(Outbound::Frame(Frame::subscribe(*id, &entry.topic))).is_err() {
                debug!(subscription = id, topic = %entry.topic, "Link closed during replay");
            }
        }
        self.outbound = Some(tx);
        self.entries.len()
    }

    pub fn detach(&mut self) {
        self.outbound = None;
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.outbound.is_some()
    }

    /// Queues a frame on the live link.
    ///
    /// # Errors
    ///
    /// Returns `StompError::NotConnected` when no link is attached.
    pub fn send(&self, frame: Frame) -> StompResult<()> {
        self.outbound
            .as_ref()
            .ok_or(StompError::NotConnected)?
            .send(Outbound::Frame(frame))
            .map_err(|_| StompError::NotConnected)
    }

    /// Runs the handler for `id`. Returns false if it was removed.
    pub fn deliver(&self, id: u64, body: &str) -> bool {
        match self.entries.get(&id) {
            Some(entry) => {
                (entry.handler)(body);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording() -> (MessageHandler, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: MessageHandler = Box::new(move |body: &str| sink.lock().push(body.to_string()));
        (handler, seen)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(Outbound::Frame(frame)) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_subscribe_while_detached_is_deferred_then_replayed() {
        let mut registry = SubscriptionRegistry::new();
        let (handler, _) = recording();
        let handle = registry.add("/topic/a", handler);
        assert_eq!(handle.id(), 1);

        let (tx, mut rx) = mpsc::unbounded_channel();
        assert_eq!(registry.attach(tx), 1);
        let frames = drain(&mut rx);
        assert_eq!(frames, vec![Frame::subscribe(1, "/topic/a")]);
    }

    #[test]
    fn test_replay_after_reattach_has_no_duplicates() {
        let mut registry = SubscriptionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.attach(tx);
        let (h1, _) = recording();
        let (h2, _) = recording();
        registry.add("/topic/a", h1);
        let gone = registry.add("/topic/b", h2);
        registry.remove(gone);
        assert_eq!(drain(&mut rx).len(), 3);

        registry.detach();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.attach(tx);
        assert_eq!(drain(&mut rx), vec![Frame::subscribe(1, "/topic/a")]);
    }

    #[test]
    fn test_delivery_stops_after_remove() {
        let mut registry = SubscriptionRegistry::new();
        let (handler, seen) = recording();
        let handle = registry.add("/topic/a", handler);

        assert!(registry.deliver(handle.id(), "one"));
        assert!(registry.remove(handle));
        assert!(!registry.deliver(handle.id(), "two"));
        assert!(!registry.remove(handle));
        assert_eq!(*seen.lock(), vec!["one".to_string()]);
    }

    #[test]
    fn test_send_requires_attached_link() {
        let mut registry = SubscriptionRegistry::new();
        assert!(matches!(
            registry.send(Frame::send("/app/x", "{}")),
            Err(StompError::NotConnected)
        ));

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.attach(tx);
        registry.send(Frame::send("/app/x", "{}")).unwrap();
        assert_eq!(drain(&mut rx).len(), 1);
        assert!(registry.is_attached());
    }

    #[test]
    fn test_closed_link_keeps_registrations_for_next_attach() {
        let mut registry = SubscriptionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.attach(tx);
        drop(rx);

        let (h1, _) = recording();
        let (h2, _) = recording();
        let kept = registry.add("/topic/a", h1);
        let gone = registry.add("/topic/b", h2);
        assert!(registry.remove(gone));
        assert_eq!(registry.len(), 1);

        registry.detach();
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert_eq!(registry.attach(tx), 1);
        assert_eq!(drain(&mut rx), vec![Frame::subscribe(kept.id(), "/topic/a")]);
    }
}
