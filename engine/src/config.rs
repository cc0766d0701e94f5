use std::time::Duration;

use serde::Deserialize;

const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_TICK_INTERVAL_MS: u64 = 200;
const DEFAULT_RETRY_INTERVAL_MS: u64 = 5_000;
const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 30_000;

/// A signing account made available to the pool.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountEntry {
    /// Chain address of the account.
    pub address: String,
    /// Opaque signing handle, passed through to the extrinsic codec.
    pub signing_material: String,
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// WebSocket endpoint of the node.
    pub node_url: String,
    /// Accounts available for submission, rotated round-robin.
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
    /// Retry budget per transaction.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Pace of the submission driver.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Pace of the failed-transaction requeue pass.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Pace of on-chain nonce reconciliation.
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,
}

impl EngineConfig {
    /// Configuration with defaults for everything but the endpoint.
    pub fn new(node_url: impl Into<String>) -> Self {
        EngineConfig {
            node_url: node_url.into(),
            accounts: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            reconcile_interval_ms: DEFAULT_RECONCILE_INTERVAL_MS,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_retry_interval_ms() -> u64 {
    DEFAULT_RETRY_INTERVAL_MS
}

fn default_reconcile_interval_ms() -> u64 {
    DEFAULT_RECONCILE_INTERVAL_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "node_url": "ws://localhost:9944",
                "accounts": [
                    { "address": "5Alice", "signing_material": "//Alice" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.tick_interval(), Duration::from_millis(200));
        assert_eq!(config.retry_interval(), Duration::from_millis(5_000));
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].address, "5Alice");
    }

    #[test]
    fn explicit_values_win() {
        let config: EngineConfig = serde_json::from_str(
            r#"{ "node_url": "ws://node", "max_retries": 2, "tick_interval_ms": 50 }"#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 2);
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert!(config.accounts.is_empty());
    }
}
