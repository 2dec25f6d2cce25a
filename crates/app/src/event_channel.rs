//! Per-event broadcast channel backed by a tokio [`broadcast`] channel.
//!
//! Buffering policy: every channel is a bounded ring buffer. Publishing never
//! waits for subscribers. A subscriber that falls more than `capacity` values
//! behind loses the oldest ones; the loss is logged and the subscriber resumes
//! with the oldest value still buffered. Subscribers only receive values
//! published *after* they subscribed.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

use servient_domain::content::Content;

/// Multicast channel carrying the encoded values of one event.
///
/// Only the registry holds the channel; subscribers hold receivers. Closing
/// (or dropping) the channel ends every subscription once the values already
/// published have been drained.
#[derive(Debug)]
pub struct EventChannel {
    event: String,
    sender: broadcast::Sender<Content>,
}

impl EventChannel {
    /// Create a channel buffering up to `capacity` values per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; callers validate it first.
    #[must_use]
    pub fn new(event: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            event: event.into(),
            sender,
        }
    }

    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Publish to all current subscribers, returning how many there are.
    ///
    /// Succeeds even when nobody is subscribed (the value is simply dropped).
    pub fn publish(&self, content: Content) -> usize {
        // broadcast::send fails only when there are zero receivers.
        self.sender.send(content).unwrap_or(0)
    }

    /// Subscribe to values published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            event: self.event.clone(),
            receiver: self.sender.subscribe(),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Close the channel. Current subscribers observe the end of the stream.
    pub fn close(self) {
        tracing::debug!(
            event = %self.event,
            subscribers = self.sender.receiver_count(),
            "closing event channel"
        );
    }
}

/// A live subscription to one event. Dropping it unsubscribes.
#[derive(Debug)]
pub struct EventSubscription {
    event: String,
    receiver: broadcast::Receiver<Content>,
}

impl EventSubscription {
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Wait for the next value, or `None` once the channel is closed.
    pub async fn next(&mut self) -> Option<Content> {
        loop {
            match self.receiver.recv().await {
                Ok(content) => return Some(content),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        event = %self.event,
                        skipped,
                        "event subscriber lagged, oldest values were dropped"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Turn the subscription into a stream that ends when the channel closes.
    pub fn into_stream(self) -> impl Stream<Item = Content> + Send + 'static {
        let event = self.event;
        BroadcastStream::new(self.receiver).filter_map(move |result| match result {
            Ok(content) => Some(content),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(
                    event = %event,
                    skipped,
                    "event stream lagged, oldest values were dropped"
                );
                None
            }
        })
    }

    /// Stop receiving values.
    pub fn unsubscribe(self) {
        tracing::debug!(event = %self.event, "event subscription dropped");
    }
}
