use crate::{
    entry::AuditEntry,
    error::{AuditError, Result},
    store::{AuditQuery, AuditStore},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

/// Bounded retry/backoff for the durable writer.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
        }
    }
}

enum AuditMessage {
    Entry(AuditEntry),
    Flush(oneshot::Sender<()>),
}

/// The audit log facade handed to every component that mutates state.
///
/// `record` enqueues onto a bounded channel drained by an independent
/// worker task, so the producer is never blocked beyond the local
/// buffering step. Backpressure policy is bounded-block: a full queue
/// raises a `warn!` alert and the producer waits for capacity rather than
/// dropping the entry. Queries read the underlying store directly.
#[derive(Clone)]
pub struct AuditLog {
    tx: mpsc::Sender<AuditMessage>,
    store: Arc<dyn AuditStore>,
}

impl AuditLog {
    /// Start the drain worker and return the producer facade.
    pub fn spawn(store: Arc<dyn AuditStore>, queue_capacity: usize, retry: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        tokio::spawn(drain(rx, store.clone(), retry));
        Self { tx, store }
    }

    /// Record one entry. Never fails the triggering business operation:
    /// worker loss is escalated through tracing, not returned.
    pub async fn record(&self, entry: AuditEntry) {
        match self.tx.try_send(AuditMessage::Entry(entry)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!("audit queue full; producer blocking for capacity");
                if self.tx.send(message).await.is_err() {
                    error!("audit worker terminated; entry lost");
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("audit worker terminated; entry lost");
            }
        }
    }

    /// Wait until every entry enqueued before this call has been handed to
    /// the store. Used at shutdown and by tests.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(AuditMessage::Flush(ack_tx))
            .await
            .map_err(|_| AuditError::WorkerGone)?;
        ack_rx.await.map_err(|_| AuditError::WorkerGone)
    }

    /// Query the ledger, ascending by event timestamp.
    pub async fn query(&self, filter: &AuditQuery) -> Result<Vec<AuditEntry>> {
        self.store.query(filter).await
    }
}

async fn drain(
    mut rx: mpsc::Receiver<AuditMessage>,
    store: Arc<dyn AuditStore>,
    retry: RetryPolicy,
) {
    while let Some(message) = rx.recv().await {
        match message {
            AuditMessage::Entry(entry) => append_with_retry(store.as_ref(), entry, &retry).await,
            AuditMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("audit drain worker stopped");
}

async fn append_with_retry(store: &dyn AuditStore, entry: AuditEntry, retry: &RetryPolicy) {
    let mut backoff = retry.base_backoff;
    let attempts = retry.max_attempts.max(1);
    for attempt in 1..=attempts {
        match store.append(entry.clone()).await {
            Ok(()) => {
                if attempt > 1 {
                    debug!(entry_id = %entry.id, attempt, "audit entry persisted after retry");
                }
                return;
            }
            Err(err) if attempt < attempts => {
                warn!(entry_id = %entry.id, attempt, %err, "audit append failed; retrying");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(err) => {
                // Operational alert: the business transaction is not rolled back.
                error!(entry_id = %entry.id, %err, "audit entry could not be persisted after retries");
            }
        }
    }
}
