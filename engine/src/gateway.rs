//! Session with the remote node: submission with lifecycle callbacks and
//! nonce queries.

use std::sync::Arc;

use async_trait::async_trait;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use subsend_utils::executor::spawn_cancellable;

use crate::rpc::{Bytes, ChainApiClient, SystemApiClient, TxProgress};
use crate::{Error, Result};

/// Receiving end of one submission's lifecycle stream.
///
/// The stream ends after the first terminal update or when the session dies.
/// Dropping the watcher releases the server-side subscription.
#[derive(Debug)]
pub struct TxWatcher {
    events: mpsc::UnboundedReceiver<TxProgress>,
}

impl TxWatcher {
    /// Next lifecycle update, or `None` once the stream is closed.
    pub async fn next(&mut self) -> Option<TxProgress> {
        self.events.recv().await
    }

    /// A watcher together with its sending half. Gateway implementations
    /// feed the sender; tests script it directly.
    pub fn channel() -> (mpsc::UnboundedSender<TxProgress>, Self) {
        let (sender, events) = mpsc::unbounded_channel();
        (sender, TxWatcher { events })
    }
}

/// Connection to a node: submit-with-callbacks plus nonce queries.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Dispatch a signed extrinsic.
    ///
    /// Resolves once the node has accepted the extrinsic for gossip; the
    /// returned watcher then yields the asynchronous lifecycle updates.
    /// Fails with [`Error::SubmitRejected`] when the node or transport
    /// refuses the extrinsic outright.
    async fn submit_and_watch(&self, extrinsic: Bytes) -> Result<TxWatcher>;

    /// Query the account's current on-chain nonce.
    async fn fetch_nonce(&self, address: &str) -> Result<u64>;
}

/// [`Gateway`] over a persistent WebSocket JSON-RPC session.
pub struct WsGateway {
    client: Arc<WsClient>,
    watch_scope: CancellationToken,
}

impl WsGateway {
    /// Establish the session.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = WsClientBuilder::default()
            .build(url)
            .await
            .map_err(|source| Error::ConnectFailed {
                url: url.to_owned(),
                source,
            })?;
        debug!(url, "gateway session established");
        Ok(WsGateway {
            client: Arc::new(client),
            watch_scope: CancellationToken::new(),
        })
    }

    /// Cancel every active subscription forwarder.
    pub fn shutdown(&self) {
        self.watch_scope.cancel();
    }
}

impl Drop for WsGateway {
    fn drop(&mut self) {
        self.watch_scope.cancel();
    }
}

#[async_trait]
impl Gateway for WsGateway {
    async fn submit_and_watch(&self, extrinsic: Bytes) -> Result<TxWatcher> {
        let mut subscription = self
            .client
            .submit_and_watch_extrinsic(extrinsic)
            .await
            .map_err(|err| Error::SubmitRejected(err.to_string()))?;

        let (events, watcher) = TxWatcher::channel();
        spawn_cancellable(self.watch_scope.child_token(), async move {
            loop {
                match subscription.next().await {
                    Some(Ok(update)) => {
                        let terminal = update.is_terminal();
                        if events.send(update).is_err() || terminal {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(%err, "malformed lifecycle update, ending watch");
                        break;
                    }
                    None => break,
                }
            }
            // Release the server-side subscription as soon as the watch ends,
            // whether by terminal status or by the watcher going away.
            if let Err(err) = subscription.unsubscribe().await {
                debug!(%err, "unsubscribe after watch end failed");
            }
        });
        Ok(watcher)
    }

    async fn fetch_nonce(&self, address: &str) -> Result<u64> {
        Ok(self.client.account_next_index(address.to_owned()).await?)
    }
}
