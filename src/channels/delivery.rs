//! Delivery queue — fire-and-forget reply dispatch.
//!
//! The router enqueues replies once their state is durable; a background
//! task drains the queue through the transport in order. A slow or failing
//! transport never blocks event ingestion. Each reply gets one send attempt.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::channels::Transport;
use crate::error::RouterError;
use crate::moderation::Reply;

/// Sending half of the delivery queue.
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    tx: mpsc::UnboundedSender<Reply>,
}

impl DeliveryQueue {
    /// Create a queue and the receiver the delivery task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Reply>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, reply: Reply) -> Result<(), RouterError> {
        self.tx.send(reply).map_err(|_| RouterError::DeliveryClosed)
    }
}

/// Spawn the task that sends queued replies through `transport`.
pub fn spawn_delivery_task(
    transport: Arc<dyn Transport>,
    mut rx: mpsc::UnboundedReceiver<Reply>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            let (chat, content) = reply.into_parts();
            match transport.send(&chat, content).await {
                Ok(()) => debug!(chat = %chat, transport = transport.name(), "Reply sent"),
                Err(e) => warn!(chat = %chat, error = %e, "Reply dropped"),
            }
        }
        info!("Delivery queue closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::channels::{EventStream, OutgoingContent};
    use crate::error::ChannelError;
    use crate::identity::ChatId;

    /// Fails every other send.
    #[derive(Default)]
    struct FlakyTransport {
        calls: Mutex<u32>,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn start(&self) -> Result<EventStream, ChannelError> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn send(&self, _chat: &ChatId, content: OutgoingContent) -> Result<(), ChannelError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls % 2 == 0 {
                return Err(ChannelError::SendFailed {
                    name: "flaky".into(),
                    reason: "boom".into(),
                });
            }
            self.sent.lock().unwrap().push(content.text);
            Ok(())
        }
    }

    #[tokio::test]
    async fn sends_in_order_and_survives_failures() {
        let transport = Arc::new(FlakyTransport::default());
        let (queue, rx) = DeliveryQueue::new();
        let handle = spawn_delivery_task(transport.clone(), rx);

        let chat = ChatId::new("1203@g.us");
        for text in ["one", "two", "three"] {
            queue.enqueue(Reply::new(&chat, text)).unwrap();
        }
        drop(queue);
        handle.await.unwrap();

        // "two" failed once and is not retried.
        assert_eq!(*transport.sent.lock().unwrap(), vec!["one", "three"]);
        assert_eq!(*transport.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn enqueue_after_task_exit_is_an_error() {
        let (queue, rx) = DeliveryQueue::new();
        drop(rx);
        let result = queue.enqueue(Reply::new(&ChatId::new("1203@g.us"), "hi"));
        assert!(matches!(result, Err(RouterError::DeliveryClosed)));
    }
}
