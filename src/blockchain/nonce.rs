//! Nonce sequencing for a single signing account.
//!
//! # Responsibilities
//! - Hand out strictly increasing nonces to concurrent submitters
//! - Reset the counter from the node's pending transaction count
//!
//! Resynchronization is not serialized against [`NonceSequencer::issue`]. A
//! resync racing a fresh issuance can hand out a nonce the node will reject
//! again; the submitter recovers from that with another resync.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::observability::metrics;
use crate::resilience::{backoff, BackoffError, BoxError, Context, Parameters};

#[derive(Debug, Default)]
pub struct NonceSequencer {
    next: AtomicU64,
}

impl NonceSequencer {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Take the next nonce. Never hands out the same value twice between
    /// resyncs.
    pub fn issue(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The value the next [`issue`](Self::issue) will return.
    pub fn current(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Overwrite the counter with an authoritative value.
    pub fn reset(&self, nonce: u64) {
        self.next.store(nonce, Ordering::SeqCst);
    }

    /// Fetch the authoritative nonce through the backoff engine and reset
    /// the counter to it.
    pub async fn resynchronize<E, F, Fut>(
        &self,
        ctx: &Context,
        params: &Parameters,
        fetch: F,
    ) -> Result<u64, BackoffError>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = Result<u64, E>>,
        E: Into<BoxError>,
    {
        match backoff::run(ctx, params, fetch).await {
            Ok(nonce) => {
                let previous = self.next.swap(nonce, Ordering::SeqCst);
                tracing::info!(previous, nonce, "Nonce resynchronized");
                metrics::record_nonce_resync(true);
                Ok(nonce)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to resynchronize nonce");
                metrics::record_nonce_resync(false);
                Err(err)
            }
        }
    }
}
