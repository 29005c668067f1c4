//! Event queue with batching.

use crate::types::Payload;
use crate::Error;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Outcome delivered to each queued event.
pub type DeliveryResult = Result<Option<Value>, Error>;

/// Completion handle for one queued event.
///
/// Resolves exactly once: with the response body when its batch was
/// accepted, with the batch error otherwise, or with `Ok(None)` when the
/// client is disabled. Dropping it does not affect delivery.
#[derive(Debug)]
pub struct Delivery {
    message_id: Option<String>,
    rx: oneshot::Receiver<DeliveryResult>,
}

impl Delivery {
    /// Handle for an event that will never be sent.
    pub(crate) fn resolved(result: DeliveryResult) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self {
            message_id: None,
            rx,
        }
    }

    /// Message id of the queued payload. `None` for disabled clients.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }
}

impl Future for Delivery {
    type Output = DeliveryResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(Error::Dropped)))
    }
}

/// Sending half of a [`Delivery`].
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<DeliveryResult>,
}

impl Completion {
    /// Resolve the paired [`Delivery`]. Consumes `self`, so it happens once.
    pub fn resolve(self, result: DeliveryResult) {
        // The caller may have dropped its handle.
        let _ = self.tx.send(result);
    }
}

/// A payload waiting to be sent, paired with its completion handle.
#[derive(Debug)]
pub struct QueueItem {
    pub(crate) payload: Payload,
    completion: Completion,
}

impl QueueItem {
    /// Pair a payload with a fresh completion handle.
    pub fn new(payload: Payload) -> (Self, Delivery) {
        let (tx, rx) = oneshot::channel();
        let delivery = Delivery {
            message_id: Some(payload.message_id.clone()),
            rx,
        };
        let item = Self {
            payload,
            completion: Completion { tx },
        };
        (item, delivery)
    }

    pub fn into_parts(self) -> (Payload, Completion) {
        (self.payload, self.completion)
    }
}

/// FIFO queue of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    items: VecDeque<QueueItem>,
}

impl EventQueue {
    /// Create a new event queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item to the tail.
    pub fn enqueue(&mut self, item: QueueItem) {
        self.items.push_back(item);
    }

    /// Get the number of items in the queue.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove up to `max` items from the head, stamping their `sentAt`.
    pub fn take_batch(&mut self, max: usize, sent_at: DateTime<Utc>) -> Vec<QueueItem> {
        let count = max.min(self.items.len());
        self.items
            .drain(..count)
            .map(|mut item| {
                item.payload.sent_at = Some(sent_at);
                item
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::payload::build_payload;
    use crate::types::EventType;
    use serde_json::json;

    fn make_test_item(id: i32) -> (QueueItem, Delivery) {
        let event = Event::from_value(json!({
            "event": format!("event_{}", id),
            "userId": "usr_1",
            "messageId": format!("msg_{}", id),
        }));
        QueueItem::new(build_payload(EventType::Track, &event))
    }

    fn ids(items: &[QueueItem]) -> Vec<&str> {
        items.iter().map(|i| i.payload.message_id.as_str()).collect()
    }

    #[test]
    fn test_enqueue_and_len() {
        let mut queue = EventQueue::new();

        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());

        queue.enqueue(make_test_item(1).0);
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_empty());

        queue.enqueue(make_test_item(2).0);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_take_batch_is_fifo_prefix() {
        let mut queue = EventQueue::new();
        for i in 1..=3 {
            queue.enqueue(make_test_item(i).0);
        }

        let batch = queue.take_batch(2, Utc::now());

        assert_eq!(ids(&batch), vec!["msg_1", "msg_2"]);
        assert_eq!(queue.len(), 1);

        let rest = queue.take_batch(2, Utc::now());
        assert_eq!(ids(&rest), vec!["msg_3"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_take_batch_stamps_sent_at() {
        let mut queue = EventQueue::new();
        queue.enqueue(make_test_item(1).0);
        let now = Utc::now();

        let batch = queue.take_batch(10, now);

        assert_eq!(batch[0].payload.sent_at, Some(now));
    }

    #[tokio::test]
    async fn test_resolve_delivers_result() {
        let (item, delivery) = make_test_item(1);
        assert_eq!(delivery.message_id(), Some("msg_1"));

        let (_, completion) = item.into_parts();
        completion.resolve(Ok(Some(json!({"ok": true}))));

        assert_eq!(delivery.await.unwrap(), Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_dropped_item_yields_dropped_error() {
        let (item, delivery) = make_test_item(1);
        drop(item);

        assert!(matches!(delivery.await, Err(Error::Dropped)));
    }

    #[tokio::test]
    async fn test_resolved_delivery() {
        let delivery = Delivery::resolved(Ok(None));
        assert!(delivery.message_id().is_none());
        assert_eq!(delivery.await.unwrap(), None);
    }
}
