//! Wire types and RPC surface of a substrate-style node.
//!
//! The node is expected to expose `chain.submitAndWatchExtrinsic`, delivering
//! [`TxProgress`] updates until finalization, and `system.accountNextIndex`
//! for nonce queries. Dispatch events relevant to a submission ride along
//! with the inclusion updates; the only one the engine interprets is
//! `System.ExtrinsicFailed`.

use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw extrinsic bytes, `0x`-hex encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes(bytes)
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let stripped = encoded
            .strip_prefix("0x")
            .ok_or_else(|| D::Error::custom("expected 0x-prefixed hex"))?;
        hex::decode(stripped).map(Bytes).map_err(D::Error::custom)
    }
}

/// A system event attached to a lifecycle update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEvent {
    pub pallet: String,
    pub method: String,
    /// Dispatch payload, kept opaque and used only for logging.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SystemEvent {
    /// Whether this is the `System.ExtrinsicFailed` dispatch event.
    pub fn is_extrinsic_failed(&self) -> bool {
        self.pallet == "System" && self.method == "ExtrinsicFailed"
    }
}

/// Lifecycle updates delivered over the submit-and-watch subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxProgress {
    /// Validated and queued in the node's pool.
    Ready,
    /// Gossiped to the given peers.
    Broadcast(Vec<String>),
    /// Included in a block; dispatch events for this extrinsic attached.
    InBlock {
        block: String,
        #[serde(default)]
        events: Vec<SystemEvent>,
    },
    /// Included in a finalized block; dispatch events attached.
    Finalized {
        block: String,
        #[serde(default)]
        events: Vec<SystemEvent>,
    },
    /// Removed from the pool without inclusion.
    Dropped { reason: String },
    /// Found invalid after initial acceptance.
    Invalid { reason: String },
}

impl TxProgress {
    /// Terminal updates end the watch; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxProgress::Finalized { .. } | TxProgress::Dropped { .. } | TxProgress::Invalid { .. }
        )
    }
}

/// Extrinsic submission methods.
#[rpc(client, namespace = "chain", namespace_separator = ".")]
pub trait ChainApi {
    /// Submit an extrinsic and watch its lifecycle until finalization.
    #[subscription(
        name = "submitAndWatchExtrinsic" => "extrinsicUpdate",
        unsubscribe = "unwatchExtrinsic",
        item = TxProgress,
    )]
    fn submit_and_watch_extrinsic(&self, extrinsic: Bytes);
}

/// System queries.
#[rpc(client, namespace = "system", namespace_separator = ".")]
pub trait SystemApi {
    /// Current on-chain nonce of `address`, including pool transactions.
    #[method(name = "accountNextIndex")]
    async fn account_next_index(&self, address: String) -> RpcResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(pallet: &str, method: &str) -> SystemEvent {
        SystemEvent {
            pallet: pallet.to_owned(),
            method: method.to_owned(),
            data: serde_json::Value::Null,
        }
    }

    #[test]
    fn bytes_round_trip_as_prefixed_hex() {
        let bytes = Bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let encoded = serde_json::to_string(&bytes).unwrap();
        assert_eq!(encoded, r#""0xdeadbeef""#);
        assert_eq!(serde_json::from_str::<Bytes>(&encoded).unwrap(), bytes);
    }

    #[test]
    fn bytes_reject_missing_prefix() {
        assert!(serde_json::from_str::<Bytes>(r#""deadbeef""#).is_err());
    }

    #[test]
    fn progress_uses_camel_case_tags() {
        let update = TxProgress::InBlock {
            block: "0xabc".to_owned(),
            events: vec![],
        };
        let encoded = serde_json::to_value(&update).unwrap();
        assert!(encoded.get("inBlock").is_some());

        let ready: TxProgress = serde_json::from_str(r#""ready""#).unwrap();
        assert!(matches!(ready, TxProgress::Ready));
    }

    #[test]
    fn extrinsic_failed_predicate_matches_exactly() {
        assert!(event("System", "ExtrinsicFailed").is_extrinsic_failed());
        assert!(!event("System", "ExtrinsicSuccess").is_extrinsic_failed());
        assert!(!event("Balances", "ExtrinsicFailed").is_extrinsic_failed());
    }

    #[test]
    fn terminal_updates() {
        assert!(
            TxProgress::Finalized {
                block: "0x1".into(),
                events: vec![]
            }
            .is_terminal()
        );
        assert!(
            TxProgress::Dropped {
                reason: "full".into()
            }
            .is_terminal()
        );
        assert!(
            !TxProgress::InBlock {
                block: "0x1".into(),
                events: vec![]
            }
            .is_terminal()
        );
        assert!(!TxProgress::Ready.is_terminal());
    }
}
