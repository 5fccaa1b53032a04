//! # Insertion Notifications
//!
//! `InsertionStream` is the subscriber side of the mempool's insertion
//! channel. It only yields entries for its chain id. A subscriber that falls
//! behind loses notifications; the count is kept so the consumer can fall
//! back to listing the mempool.

use shared_types::{ChainId, MempoolTransaction};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

/// Stream of newly inserted mempool entries for one chain.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
#[derive(Debug)]
pub struct InsertionStream {
    chain_id: ChainId,
    inner: BroadcastStream<MempoolTransaction>,
    missed: u64,
}

impl InsertionStream {
    /// Wrap a broadcast receiver, filtering on `chain_id`.
    pub fn new(chain_id: ChainId, receiver: broadcast::Receiver<MempoolTransaction>) -> Self {
        Self {
            chain_id,
            inner: BroadcastStream::new(receiver),
            missed: 0,
        }
    }

    /// Chain this stream follows.
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Receive the next inserted entry. Cancel safe.
    ///
    /// # Returns
    ///
    /// - `Some(entry)` - The next entry for this chain
    /// - `None` - The store was dropped
    pub async fn recv(&mut self) -> Option<MempoolTransaction> {
        self.next().await
    }

    /// Notifications dropped since the last call. Resets the counter.
    pub fn take_missed(&mut self) -> u64 {
        std::mem::take(&mut self.missed)
    }
}

impl Stream for InsertionStream {
    type Item = MempoolTransaction;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                None => return Poll::Ready(None),
                Some(Err(BroadcastStreamRecvError::Lagged(count))) => {
                    warn!(
                        chain_id = self.chain_id,
                        lagged = count,
                        "Insertion subscriber lagged, notifications dropped"
                    );
                    self.missed += count;
                }
                Some(Ok(entry)) if entry.chain_id() == self.chain_id => {
                    return Poll::Ready(Some(entry))
                }
                // Another chain's entry.
                Some(Ok(_)) => {}
            }
        }
    }
}
