//! Shutdown coordination for the faucet.

use tokio_util::sync::CancellationToken;

use crate::resilience::Context;

/// Coordinator for graceful shutdown.
///
/// Every request context derives from [`Shutdown::context`], so triggering
/// shutdown cancels in-flight retry sequences as well as the listener.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Root execution context, cancelled on shutdown.
    pub fn context(&self) -> Context {
        Context::from_token(self.token.clone())
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }
}
