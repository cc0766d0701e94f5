use crate::{Address, TxId};

/// Alias for `Result` with [`Error`] as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by the engine.
///
/// None of these are fatal to the process: every variant is either surfaced
/// to the caller or handled by the retry and reconciliation machinery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Enqueue was attempted with an empty account pool.
    #[error("no signing accounts configured")]
    NoAccounts,

    /// The gateway could not establish a session with the node.
    #[error("failed to connect to {url}")]
    ConnectFailed {
        url: String,
        #[source]
        source: jsonrpsee::core::client::Error,
    },

    /// The node or transport refused the extrinsic before accepting it for
    /// gossip. The assigned nonce never reached the chain.
    #[error("extrinsic rejected at submission: {0}")]
    SubmitRejected(String),

    /// The extrinsic was included on-chain but its dispatch failed. The
    /// assigned nonce was consumed.
    #[error("extrinsic {id} failed on-chain")]
    ExtrinsicFailed { id: TxId },

    /// The submitting account is no longer present in the pool.
    #[error("account {0} not found")]
    AccountMissing(Address),

    /// A transaction exhausted its retry budget.
    #[error("transaction {id} dropped after {retries} retries")]
    RetriesExhausted { id: TxId, retries: u32 },

    /// An operation that needs the gateway ran before `initialize`.
    #[error("gateway not initialized")]
    NotInitialized,

    /// Building or signing the extrinsic failed locally.
    #[error("extrinsic encoding failed: {0}")]
    Codec(String),

    /// Transport-level RPC failure.
    #[error(transparent)]
    Rpc(#[from] jsonrpsee::core::client::Error),
}
