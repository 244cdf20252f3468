use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{B256, U256};
use thiserror::Error;

use shared::web3::contracts::core::error::ContractError;

use crate::notifications::{Notification, NotificationSink};

#[derive(Debug, Error)]
pub enum TxError {
    #[error("operation already pending")]
    AlreadyPending,
    #[error("transaction submission failed: {0}")]
    Submit(String),
    #[error("transaction failed: {0}")]
    Confirm(String),
    #[error("no confirmation after {0:?}")]
    ConfirmTimeout(Duration),
    #[error("deposit of {amount} exceeds pool cap {cap}")]
    DepositCapExceeded { amount: U256, cap: U256 },
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// One signed-transaction operation with a pending flag around it.
///
/// `is_pending` is true from the start of `execute` until the returned future
/// settles, on every path: success, submit failure, revert, or timeout. While
/// a call is in flight, further invocations are rejected with
/// [`TxError::AlreadyPending`].
pub struct TxOperation {
    label: String,
    pending: Arc<AtomicBool>,
    sink: Arc<dyn NotificationSink>,
    confirm_timeout: Duration,
}

/// Resets the pending flag on every exit path out of `execute`.
struct PendingGuard(Arc<AtomicBool>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TxOperation {
    pub fn new(
        label: impl Into<String>,
        sink: Arc<dyn NotificationSink>,
        confirm_timeout: Duration,
    ) -> Self {
        Self {
            label: label.into(),
            pending: Arc::new(AtomicBool::new(false)),
            sink,
            confirm_timeout,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Runs one submit-then-confirm cycle.
    ///
    /// `submit` signs and broadcasts the transaction, yielding the hash and a
    /// future resolving once the transaction mines. The hash is announced
    /// through the notification sink exactly once; confirmation and failure
    /// produce no notification, only the returned result. The confirmation
    /// wait is bounded by the configured timeout so a stalled node cannot
    /// leave the operation pending forever.
    pub async fn execute<S, Fut, C>(&self, submit: S) -> Result<B256, TxError>
    where
        S: FnOnce() -> Fut,
        Fut: Future<Output = Result<(B256, C), TxError>>,
        C: Future<Output = Result<B256, TxError>>,
    {
        if self
            .pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TxError::AlreadyPending);
        }
        let _guard = PendingGuard(self.pending.clone());

        let (hash, confirmation) = match submit().await {
            Ok(submitted) => submitted,
            Err(e) => {
                log::error!("{}: {e}", self.label);
                return Err(e);
            }
        };

        self.sink.enqueue(Notification::tx_submitted(hash));
        log::info!("{}: transaction {hash} submitted", self.label);

        match tokio::time::timeout(self.confirm_timeout, confirmation).await {
            Ok(Ok(confirmed)) => {
                log::info!("{}: transaction {confirmed} confirmed", self.label);
                Ok(confirmed)
            }
            Ok(Err(e)) => {
                log::error!("{}: {e}", self.label);
                Err(e)
            }
            Err(_) => {
                log::error!(
                    "{}: no confirmation for {hash} after {:?}",
                    self.label,
                    self.confirm_timeout
                );
                Err(TxError::ConfirmTimeout(self.confirm_timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{MemorySink, Variant};
    use std::future::{pending, ready, Ready};

    fn hash() -> B256 {
        B256::repeat_byte(0xab)
    }

    type MockSubmitted = (B256, Ready<Result<B256, TxError>>);

    #[tokio::test]
    async fn success_notifies_once_and_clears_pending() {
        let sink = MemorySink::new();
        let op = TxOperation::new("deposit usdt", sink.clone(), Duration::from_secs(1));

        let result = op
            .execute(|| async { Ok((hash(), ready(Ok(hash())))) })
            .await;

        assert_eq!(result.unwrap(), hash());
        assert!(!op.is_pending());

        let entries = sink.entries();
        assert_eq!(entries.len(), 1, "exactly one submitted notification");
        assert_eq!(entries[0].message, hash().to_string());
        assert_eq!(entries[0].variant, Variant::Success);
    }

    #[tokio::test]
    async fn submit_failure_clears_pending_without_notifying() {
        let sink = MemorySink::new();
        let op = TxOperation::new("withdraw usdt", sink.clone(), Duration::from_secs(1));

        let result = op
            .execute(|| async {
                Err::<MockSubmitted, _>(TxError::Submit("user rejected".to_string()))
            })
            .await;

        assert!(matches!(result, Err(TxError::Submit(_))));
        assert!(!op.is_pending());
        assert!(sink.entries().is_empty());
    }

    #[tokio::test]
    async fn revert_propagates_and_produces_no_extra_notification() {
        let sink = MemorySink::new();
        let op = TxOperation::new("exit usdt", sink.clone(), Duration::from_secs(1));

        let result = op
            .execute(|| async {
                Ok((
                    hash(),
                    ready(Err(TxError::Confirm("execution reverted".to_string()))),
                ))
            })
            .await;

        assert!(matches!(result, Err(TxError::Confirm(_))));
        assert!(!op.is_pending());
        assert_eq!(sink.entries().len(), 1, "only the submitted notification");
    }

    #[tokio::test]
    async fn stalled_confirmation_times_out_and_clears_pending() {
        let sink = MemorySink::new();
        let op = TxOperation::new("claim usdt", sink.clone(), Duration::from_millis(50));

        let result = op
            .execute(|| async { Ok((hash(), pending::<Result<B256, TxError>>())) })
            .await;

        assert!(matches!(result, Err(TxError::ConfirmTimeout(_))));
        assert!(!op.is_pending());
        assert_eq!(sink.entries().len(), 1);
    }

    #[tokio::test]
    async fn reentrant_invocation_is_rejected_while_pending() {
        let sink = MemorySink::new();
        let op = Arc::new(TxOperation::new(
            "deposit busd",
            sink.clone(),
            Duration::from_secs(1),
        ));

        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel();

        let first_op = op.clone();
        let first = tokio::spawn(async move {
            first_op
                .execute(|| async move {
                    started_tx.send(()).unwrap();
                    Ok((hash(), async move {
                        release_rx.await.unwrap();
                        Ok(hash())
                    }))
                })
                .await
        });

        started_rx.await.unwrap();
        assert!(op.is_pending());

        let second = op
            .execute(|| async { Ok((hash(), ready(Ok(hash())))) })
            .await;
        assert!(matches!(second, Err(TxError::AlreadyPending)));

        release_tx.send(()).unwrap();
        first.await.unwrap().unwrap();
        assert!(!op.is_pending());
        assert_eq!(sink.entries().len(), 1, "rejected call must not notify");
    }
}
