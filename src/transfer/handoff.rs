//! Rendezvous channel between the scanner and the submitter
//!
//! A send completes only once the receiver has taken the item, so the
//! producer can never run ahead of the consumer. Both ends watch a shared
//! [`CancellationToken`] while they wait.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Why a hand-off could not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffError {
    /// The shared token was cancelled while waiting
    Cancelled,
    /// The other end was dropped
    Closed,
}

type Slot<T> = (T, oneshot::Sender<()>);

/// Sending half of a hand-off channel
#[derive(Debug)]
pub struct HandoffSender<T> {
    tx: mpsc::Sender<Slot<T>>,
}

/// Receiving half of a hand-off channel
#[derive(Debug)]
pub struct HandoffReceiver<T> {
    rx: mpsc::Receiver<Slot<T>>,
}

/// Create a hand-off channel with no buffering
pub fn handoff<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    // One slot parks the item; the ack makes the send synchronous
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

impl<T> HandoffSender<T> {
    /// Hand `item` to the receiver, waiting until it has been taken
    ///
    /// Cancellation is checked before the item is offered, so a cancelled
    /// token never lets another item through.
    pub async fn send(&self, item: T, cancel: &CancellationToken) -> Result<(), HandoffError> {
        if cancel.is_cancelled() {
            return Err(HandoffError::Cancelled);
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HandoffError::Cancelled),
            sent = self.tx.send((item, ack_tx)) => {
                sent.map_err(|_| HandoffError::Closed)?;
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HandoffError::Cancelled),
            ack = ack_rx => ack.map_err(|_| HandoffError::Closed),
        }
    }
}

impl<T> HandoffReceiver<T> {
    /// Take the next item
    ///
    /// # Returns
    /// * `Ok(Some(item))` - An item was handed over
    /// * `Ok(None)` - The sender is gone and nothing is pending
    /// * `Err(HandoffError::Cancelled)` - The token fired first
    pub async fn recv(&mut self, cancel: &CancellationToken) -> Result<Option<T>, HandoffError> {
        if cancel.is_cancelled() {
            return Err(HandoffError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HandoffError::Cancelled),
            slot = self.rx.recv() => Ok(slot.map(|(item, ack)| {
                // Sender may have been cancelled meanwhile; the item is still ours
                let _ = ack.send(());
                item
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_items_arrive_in_order() {
        let (tx, mut rx) = handoff();
        let token = CancellationToken::new();

        let producer_token = token.clone();
        let producer = tokio::spawn(async move {
            for i in 0..3 {
                tx.send(i, &producer_token).await.unwrap();
            }
        });

        let mut received = Vec::new();
        while let Some(i) = rx.recv(&token).await.unwrap() {
            received.push(i);
        }
        producer.await.unwrap();
        assert_eq!(received, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_send_waits_for_receiver() {
        let (tx, mut rx) = handoff();
        let token = CancellationToken::new();
        let completed = Arc::new(AtomicUsize::new(0));

        let producer_token = token.clone();
        let producer_completed = completed.clone();
        let producer = tokio::spawn(async move {
            tx.send("a", &producer_token).await.unwrap();
            producer_completed.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 0, "send returned before recv");

        assert_eq!(rx.recv(&token).await.unwrap(), Some("a"));
        producer.await.unwrap();
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_unblocks_waiting_sender() {
        let (tx, _rx) = handoff();
        let token = CancellationToken::new();

        let producer_token = token.clone();
        let producer = tokio::spawn(async move { tx.send(1, &producer_token).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        assert_eq!(producer.await.unwrap(), Err(HandoffError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_unblocks_waiting_receiver() {
        let (_tx, mut rx) = handoff::<u32>();
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(rx.recv(&token).await, Err(HandoffError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_sender_ends_stream() {
        let (tx, mut rx) = handoff::<u32>();
        drop(tx);
        let token = CancellationToken::new();
        assert_eq!(rx.recv(&token).await, Ok(None));
    }

    #[tokio::test]
    async fn test_dropped_receiver_closes_sender() {
        let (tx, rx) = handoff();
        drop(rx);
        let token = CancellationToken::new();
        assert_eq!(tx.send(1, &token).await, Err(HandoffError::Closed));
    }
}
