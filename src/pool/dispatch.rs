//! Unbuffered handoff between submitters and workers.
//!
//! A submission is an [`Offer`] placed in a single-slot channel. The submitter
//! stays suspended until some worker claims the offer, so nothing queues up
//! beyond the one offer in flight. Either side may win a race to the offer:
//! a worker claims it, or the submitter withdraws it on cancellation. Exactly
//! one of them gets the request.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// A URL travelling from a submitter to a worker.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// Cancellation of the batch this request belongs to
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffError {
    /// The batch token fired before any worker took the request
    Cancelled,
    /// The pool is shutting down
    Closed,
}

struct Offer {
    slot: Mutex<Option<(FetchRequest, oneshot::Sender<()>)>>,
}

impl Offer {
    fn new(request: FetchRequest, taken: oneshot::Sender<()>) -> Self {
        Self {
            slot: Mutex::new(Some((request, taken))),
        }
    }

    /// Worker side. `None` if the submitter already withdrew, or if the
    /// batch was cancelled; a cancelled offer stays in the slot for the
    /// submitter to withdraw.
    fn claim(&self) -> Option<FetchRequest> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|(request, _)| request.cancel.is_cancelled())
        {
            return None;
        }
        let (request, taken) = slot.take()?;
        let _ = taken.send(());
        Some(request)
    }

    /// Submitter side. `true` if the request was still unclaimed.
    fn withdraw(&self) -> bool {
        self.take().is_some()
    }

    fn take(&self) -> Option<(FetchRequest, oneshot::Sender<()>)> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

pub fn dispatch_channel(shutdown: CancellationToken) -> (DispatchSender, DispatchReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (
        DispatchSender { tx, shutdown },
        DispatchReceiver {
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        },
    )
}

#[derive(Clone)]
pub struct DispatchSender {
    tx: mpsc::Sender<Arc<Offer>>,
    shutdown: CancellationToken,
}

impl DispatchSender {
    /// Suspend until a worker has taken `request`.
    ///
    /// On error the request was not delivered to any worker.
    pub async fn handoff(&self, request: FetchRequest) -> Result<(), HandoffError> {
        let cancel = request.cancel.clone();

        let permit = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(HandoffError::Closed),
            _ = cancel.cancelled() => return Err(HandoffError::Cancelled),
            permit = self.tx.reserve() => permit.map_err(|_| HandoffError::Closed)?,
        };

        let (taken_tx, taken_rx) = oneshot::channel();
        let offer = Arc::new(Offer::new(request, taken_tx));
        permit.send(offer.clone());

        tokio::select! {
            biased;
            taken = taken_rx => taken.map_err(|_| HandoffError::Closed),
            _ = self.shutdown.cancelled() => settle(&offer, HandoffError::Closed),
            _ = cancel.cancelled() => settle(&offer, HandoffError::Cancelled),
        }
    }
}

/// A worker may have claimed the offer just as we gave up on it.
fn settle(offer: &Offer, err: HandoffError) -> Result<(), HandoffError> {
    if offer.withdraw() {
        Err(err)
    } else {
        Ok(())
    }
}

/// Shared by all workers; each received offer goes to exactly one of them.
#[derive(Clone)]
pub struct DispatchReceiver {
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Arc<Offer>>>>,
}

impl DispatchReceiver {
    /// Next claimed request, or `None` once every sender is gone.
    pub async fn recv(&self) -> Option<FetchRequest> {
        loop {
            let offer = {
                let mut rx = self.rx.lock().await;
                rx.recv().await?
            };
            if let Some(request) = offer.claim() {
                return Some(request);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(url: &str, cancel: &CancellationToken) -> FetchRequest {
        FetchRequest {
            url: url.to_string(),
            cancel: cancel.clone(),
        }
    }

    #[tokio::test]
    async fn test_handoff_waits_for_receiver() {
        let (tx, rx) = dispatch_channel(CancellationToken::new());
        let batch = CancellationToken::new();

        let submit = tokio::spawn({
            let batch = batch.clone();
            async move { tx.handoff(request("http://a.test/", &batch)).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!submit.is_finished(), "handoff must block until received");

        let received = rx.recv().await.unwrap();
        assert_eq!(received.url, "http://a.test/");
        assert_eq!(submit.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_cancel_withdraws_pending_offer() {
        let (tx, rx) = dispatch_channel(CancellationToken::new());
        let batch = CancellationToken::new();

        let submit = tokio::spawn({
            let batch = batch.clone();
            async move { tx.handoff(request("http://a.test/", &batch)).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        batch.cancel();
        assert_eq!(submit.await.unwrap(), Err(HandoffError::Cancelled));

        // the withdrawn offer is skipped; the channel then reports closed
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_releases_submitter() {
        let shutdown = CancellationToken::new();
        let (tx, _rx) = dispatch_channel(shutdown.clone());
        let batch = CancellationToken::new();

        let submit = tokio::spawn(async move { tx.handoff(request("http://a.test/", &batch)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        assert_eq!(submit.await.unwrap(), Err(HandoffError::Closed));
    }

    #[tokio::test]
    async fn test_each_request_delivered_once() {
        let (tx, rx) = dispatch_channel(CancellationToken::new());
        let batch = CancellationToken::new();

        let mut consumers = Vec::new();
        for _ in 0..4 {
            let rx = rx.clone();
            consumers.push(tokio::spawn(async move {
                let mut got = Vec::new();
                while let Some(request) = rx.recv().await {
                    got.push(request.url);
                }
                got
            }));
        }
        drop(rx);

        for i in 0..50 {
            tx.handoff(request(&format!("http://a.test/{i}"), &batch))
                .await
                .unwrap();
        }
        drop(tx);

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 50);
    }

    #[test]
    fn test_cancelled_offer_is_left_for_submitter() {
        let batch = CancellationToken::new();
        let (taken_tx, mut taken_rx) = oneshot::channel();
        let offer = Offer::new(request("http://a.test/", &batch), taken_tx);

        batch.cancel();
        assert!(offer.claim().is_none());
        assert!(offer.withdraw());
        assert!(taken_rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_batch_never_reaches_receiver() {
        let (tx, rx) = dispatch_channel(CancellationToken::new());
        let batch = CancellationToken::new();

        let submit = tokio::spawn({
            let batch = batch.clone();
            async move { tx.handoff(request("http://a.test/", &batch)).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // cancel, then race a receiver against the submitter's withdrawal
        batch.cancel();
        let received = rx.recv().await;

        assert!(received.is_none());
        assert_eq!(submit.await.unwrap(), Err(HandoffError::Cancelled));
    }

    #[test]
    fn test_claim_and_withdraw_are_exclusive() {
        let (taken_tx, mut taken_rx) = oneshot::channel();
        let offer = Offer::new(request("http://a.test/", &CancellationToken::new()), taken_tx);

        assert!(offer.claim().is_some());
        assert!(!offer.withdraw());
        assert!(offer.claim().is_none());
        assert_eq!(taken_rx.try_recv(), Ok(()));
    }
}
