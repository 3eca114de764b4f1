use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Work for the verification workers. Jobs carry only the transaction id; the
/// worker re-reads the row and claims a payout before sending it, so a
/// duplicate or stale job is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum VerificationJob {
    Deposit { transaction_id: i64 },
    Payout { transaction_id: i64 },
}

impl VerificationJob {
    pub fn transaction_id(&self) -> i64 {
        match self {
            VerificationJob::Deposit { transaction_id }
            | VerificationJob::Payout { transaction_id } => *transaction_id,
        }
    }
}

/// Sending half of the bounded verification queue.
#[derive(Debug, Clone)]
pub struct VerificationQueue {
    sender: mpsc::Sender<VerificationJob>,
}

pub fn verification_queue(
    capacity: usize,
) -> (VerificationQueue, mpsc::Receiver<VerificationJob>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (VerificationQueue { sender }, receiver)
}

impl VerificationQueue {
    /// Hand a job to the workers without blocking the caller.
    ///
    /// A full queue parks the job on a background task. A closed queue drops
    /// it; the transaction stays `PENDING` and is picked up by recovery.
    pub fn enqueue(&self, job: VerificationJob) {
        match self.sender.try_send(job) {
            Ok(()) => debug!("Queued {:?}", job),
            Err(TrySendError::Full(job)) => {
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    if sender.send(job).await.is_err() {
                        warn!("Verification queue closed, dropping {:?}", job);
                    }
                });
            }
            Err(TrySendError::Closed(job)) => {
                warn!("Verification queue closed, dropping {:?}", job);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
