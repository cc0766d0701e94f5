//! Transaction submission and confirmation engine for substrate-style nodes.
//!
//! # Overview
//! - [`Engine`] is the front-end: it accepts logical calls, assigns them to
//!   signing accounts from a round-robin pool, and drives them through
//!   submission and finalization against a remote node.
//! - [`gateway::WsGateway`] owns the persistent WebSocket JSON-RPC session
//!   and translates the node's lifecycle stream into callbacks.
//! - Nonces are assigned optimistically ahead of the chain: back-to-back
//!   enqueues on one account get strictly consecutive values, and the local
//!   counter is only ever reconciled upwards against on-chain state.
//!
//! # Notes
//! - Signing and wire encoding live behind the [`ExtrinsicCodec`] seam; the
//!   engine never inspects key material.
//! - Nothing is persisted. A restart reconnects and resynchronizes nonces
//!   from the chain.
//!
//! # Example
//! ```no_run
//! # use std::sync::Arc;
//! # use subsend_engine::{Engine, EngineConfig, ExtrinsicCodec, Result};
//! # async fn docs(codec: Arc<dyn ExtrinsicCodec>) -> Result<()> {
//! let config = EngineConfig::new("ws://localhost:9944");
//! let engine = Engine::new(config.clone(), codec);
//! engine.initialize(&config.node_url).await?;
//! let id = engine.add_transaction("balances", "transfer", vec![])?;
//! engine.tick().await;
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

mod account;
mod codec;
mod config;
mod engine;
mod error;
pub mod gateway;
mod queue;
pub mod rpc;
mod store;

pub use crate::account::{Account, AccountSet};
pub use crate::codec::{Call, ExtrinsicCodec};
pub use crate::config::{AccountEntry, EngineConfig};
pub use crate::engine::Engine;
pub use crate::error::{Error, Result};
pub use crate::queue::{Transaction, TxStatus};

/// Chain address of a signing account.
pub type Address = Arc<str>;

/// Stable identifier of a queued transaction.
pub type TxId = Arc<str>;

/// Opaque signing handle, consumed only by the extrinsic codec.
pub type SigningMaterial = Arc<str>;
