use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

type SubscriptionStore<E> = Arc<Mutex<Vec<(Box<dyn Fn(&E) -> bool + Send>, UnboundedSender<E>)>>>;

/// Handle used to publish events; cheap to clone, shares the subscriber list
/// with the `EventHub` it was created from.
#[derive(Clone)]
pub struct EventSender<E: Clone> {
    subscriptions: SubscriptionStore<E>,
}

impl<E: Clone> EventSender<E> {
    /// Delivers `event` to every subscriber whose filter matches it.
    ///
    /// Best-effort: a subscriber whose receiver has been dropped is silently
    /// removed rather than causing the send to fail.
    pub async fn send(&self, event: E) {
        let mut subscriptions = self.subscriptions.lock().await;
        subscriptions.retain(|(filter, sender)| {
            if filter(&event) {
                sender.send(event.clone()).is_ok()
            } else {
                true
            }
        });
    }
}

pub struct EventSubscription<E>(UnboundedReceiver<E>);

impl<E> EventSubscription<E> {
    pub async fn recv(&mut self) -> Option<E> {
        self.0.recv().await
    }
}

pub struct EventHub<E: Clone + Send> {
    subscriptions: SubscriptionStore<E>,
}

impl<E: Clone + Send + 'static> EventHub<E> {
    pub fn setup() -> (Self, EventSender<E>) {
        let subscriptions = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                subscriptions: subscriptions.clone(),
            },
            EventSender { subscriptions },
        )
    }

    pub async fn subscribe<F: Fn(&E) -> bool + Send + 'static>(
        &self,
        filter: F,
    ) -> EventSubscription<E> {
        let (sender, receiver) = unbounded_channel();
        let mut subscriptions = self.subscriptions.lock().await;
        subscriptions.push((Box::new(filter), sender));
        EventSubscription(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_matching_subscribers_only() {
        let (hub, sender) = EventHub::<i32>::setup();
        let mut evens = hub.subscribe(|e| e % 2 == 0).await;
        let mut all = hub.subscribe(|_| true).await;

        sender.send(1).await;
        sender.send(2).await;

        assert_eq!(all.recv().await, Some(1));
        assert_eq!(all.recv().await, Some(2));
        assert_eq!(evens.recv().await, Some(2));
    }

    #[tokio::test]
    async fn dropped_subscriber_is_removed_on_next_send() {
        let (hub, sender) = EventHub::<i32>::setup();
        {
            let _sub = hub.subscribe(|_| true).await;
        }
        // subscriber dropped; next send should not panic and should prune it
        sender.send(1).await;
        sender.send(2).await;
    }
}
