//! Pending/processing queues and the transaction lifecycle state machine.
//!
//! A transaction is live in exactly one of `pending` (FIFO, not yet
//! submitted) or `processing` (awaiting finalization). Failures move it into
//! a retry pool outside the live set; confirmation removes it outright.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::codec::Call;
use crate::{Address, TxId};

/// Lifecycle of a queued transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Enqueued, not yet handed to the gateway.
    Pending,
    /// Accepted by the node, awaiting finalization.
    Submitted,
    /// Finalized without a failure event. Terminal.
    Confirmed,
    /// Rejected, failed on-chain, or aborted. Eligible for retry.
    Failed,
}

/// A pending or in-flight submission.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TxId,
    pub submitter: Address,
    pub call: Call,
    pub nonce: u64,
    pub status: TxStatus,
    pub retry_count: u32,
}

/// Misuse of the queue state machine.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum QueueError {
    NotFound,
    NotPending,
    NotProcessing,
}

pub(crate) type QueueResult<T> = Result<T, QueueError>;

/// The two live queues plus the failed-transaction retry pool.
#[derive(Debug, Default)]
pub struct QueueState {
    pending: VecDeque<Transaction>,
    processing: HashMap<TxId, Transaction>,
    failed: Vec<Transaction>,
}

impl QueueState {
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn processing_len(&self) -> usize {
        self.processing.len()
    }

    pub fn failed_len(&self) -> usize {
        self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.processing.is_empty() && self.failed.is_empty()
    }

    /// Append to the pending FIFO.
    pub fn push_pending(&mut self, tx: Transaction) {
        self.pending.push_back(tx);
    }

    /// Head of the pending FIFO, the next transaction to submit.
    pub fn peek_pending(&self) -> Option<&Transaction> {
        self.pending.front()
    }

    /// Look a transaction up in any queue, including the retry pool.
    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.pending
            .iter()
            .find(|tx| &*tx.id == id)
            .or_else(|| self.processing.get(id))
            .or_else(|| self.failed.iter().find(|tx| &*tx.id == id))
    }

    /// Apply a status transition.
    ///
    /// A terminal status removes the transaction from the live queues.
    /// Unknown ids are a no-op: the transaction may have already retired.
    pub fn set_status(&mut self, id: &str, status: TxStatus) {
        let result = match status {
            TxStatus::Submitted => self.mark_submitted(id),
            TxStatus::Confirmed => self.mark_confirmed(id).map(|_| ()),
            TxStatus::Failed => self.mark_failed(id),
            // Pending is an initial state; retries re-enqueue explicitly.
            TxStatus::Pending => Ok(()),
        };
        match result {
            Ok(()) => {}
            Err(QueueError::NotFound) => {
                debug!(id, ?status, "status for retired transaction ignored");
            }
            Err(err) => {
                warn!(id, ?status, ?err, "illegal queue transition ignored");
            }
        }
    }

    /// Move a transaction from `pending` into `processing`.
    pub(crate) fn mark_submitted(&mut self, id: &str) -> QueueResult<()> {
        let Some(idx) = self.pending.iter().position(|tx| &*tx.id == id) else {
            return if self.get(id).is_some() {
                Err(QueueError::NotPending)
            } else {
                Err(QueueError::NotFound)
            };
        };
        let mut tx = self
            .pending
            .remove(idx)
            .expect("position came from the same queue");
        tx.status = TxStatus::Submitted;
        self.processing.insert(tx.id.clone(), tx);
        Ok(())
    }

    /// Remove a finalized transaction from `processing`.
    pub(crate) fn mark_confirmed(&mut self, id: &str) -> QueueResult<Transaction> {
        match self.processing.remove(id) {
            Some(mut tx) => {
                tx.status = TxStatus::Confirmed;
                Ok(tx)
            }
            None => {
                if self.get(id).is_some() {
                    Err(QueueError::NotProcessing)
                } else {
                    Err(QueueError::NotFound)
                }
            }
        }
    }

    /// Move a transaction from either live queue into the retry pool.
    pub(crate) fn mark_failed(&mut self, id: &str) -> QueueResult<()> {
        let mut tx = if let Some(idx) = self.pending.iter().position(|tx| &*tx.id == id) {
            self.pending
                .remove(idx)
                .expect("position came from the same queue")
        } else if let Some(tx) = self.processing.remove(id) {
            tx
        } else {
            return Err(QueueError::NotFound);
        };
        tx.status = TxStatus::Failed;
        self.failed.push(tx);
        Ok(())
    }

    /// Drain the retry pool.
    pub(crate) fn take_failed(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.failed)
    }
}
