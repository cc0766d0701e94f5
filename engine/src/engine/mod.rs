//! The engine: queue-driven submission, confirmation tracking, retry, and
//! nonce reconciliation.
//!
//! # Overview
//! - [`Engine`] is the public front: enqueue logical calls, drive ticks.
//! - Each accepted submission spawns a watch task that turns the gateway's
//!   lifecycle stream into queue transitions.
//! - [`Engine::run`] ties ticks, retries, and reconciliation to timers for
//!   front-ends that do not want to pace the engine themselves.
//!
//! # Notes
//! - One tick submits at most one transaction, the head of the pending
//!   FIFO. FIFO order per account is what makes the optimistic consecutive
//!   nonces safe.
//! - A submission that fails before the node accepts it rolls the
//!   submitter's nonce back by one; failures after acceptance never do,
//!   because the nonce may have been consumed on-chain.

use std::sync::Arc;

use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use subsend_utils::executor::spawn_cancellable;
use subsend_utils::time::Interval;

use crate::account::{Account, AccountSet};
use crate::codec::{Call, ExtrinsicCodec};
use crate::config::EngineConfig;
use crate::gateway::{Gateway, TxWatcher, WsGateway};
use crate::queue::{Transaction, TxStatus};
use crate::rpc::TxProgress;
use crate::store::{GlobalState, StateStore};
use crate::{Address, Error, Result, TxId};

/// Transaction submission and confirmation engine.
///
/// All state lives behind a single mutation boundary, so enqueues, gateway
/// callbacks, and timer-driven passes may interleave freely.
pub struct Engine {
    store: Arc<StateStore>,
    codec: Arc<dyn ExtrinsicCodec>,
    config: EngineConfig,
    watch_scope: CancellationToken,
}

impl Engine {
    /// Build the engine with the accounts named in `config`.
    pub fn new(config: EngineConfig, codec: Arc<dyn ExtrinsicCodec>) -> Self {
        let accounts = config
            .accounts
            .iter()
            .map(|entry| Account::new(entry.address.as_str(), entry.signing_material.as_str()))
            .collect();
        Engine {
            store: Arc::new(StateStore::new(GlobalState::new(AccountSet::new(accounts)))),
            codec,
            config,
            watch_scope: CancellationToken::new(),
        }
    }

    /// Establish the node session and resynchronize nonces from the chain.
    ///
    /// On [`Error::ConnectFailed`] the gateway handle stays absent and the
    /// driver keeps idling; `initialize` may be called again.
    pub async fn initialize(&self, node_url: &str) -> Result<()> {
        let gateway = WsGateway::connect(node_url).await?;
        self.install_gateway(Arc::new(gateway));
        info!(node_url, "gateway initialized");
        if let Err(err) = self.reconcile_nonces().await {
            warn!(%err, "startup nonce reconciliation incomplete");
        }
        Ok(())
    }

    /// Install an already-connected gateway.
    ///
    /// Seam for alternative transports and for tests; `initialize` uses it
    /// with a [`WsGateway`].
    pub fn install_gateway(&self, gateway: Arc<dyn Gateway>) {
        self.store.mutate(|state| state.gateway = Some(gateway));
    }

    /// Enqueue a logical call.
    ///
    /// Selects the next account round-robin and assigns its optimistic
    /// nonce, all in one atomic update. Fails with [`Error::NoAccounts`]
    /// when the pool is empty; no state changes in that case.
    pub fn add_transaction(
        &self,
        module: impl Into<String>,
        method: impl Into<String>,
        params: Vec<serde_json::Value>,
    ) -> Result<TxId> {
        let call = Call::new(module, method, params);
        self.store.mutate(|state| {
            let (submitter, nonce) = {
                let account = state.accounts.pick_next().ok_or(Error::NoAccounts)?;
                (account.address.clone(), account.assign_nonce())
            };
            let id = state.next_tx_id();
            debug!(%id, %submitter, nonce, module = %call.module, method = %call.method, "transaction enqueued");
            state.queue.push_pending(Transaction {
                id: id.clone(),
                submitter,
                call,
                nonce,
                status: TxStatus::Pending,
                retry_count: 0,
            });
            Ok(id)
        })
    }

    /// Drive one submission if possible.
    ///
    /// Idles when the gateway is absent, the pending queue is empty, or a
    /// previous tick still has a submission awaiting acceptance.
    pub async fn tick(&self) {
        let claimed = self.store.mutate(|state| {
            if state.submit_inflight {
                return None;
            }
            let gateway = state.gateway.clone()?;
            let tx = state.queue.peek_pending()?.clone();
            state.submit_inflight = true;
            Some((gateway, tx))
        });
        let Some((gateway, tx)) = claimed else {
            return;
        };
        self.submit_head(gateway, &tx).await;
        self.store.mutate(|state| state.submit_inflight = false);
    }

    async fn submit_head(&self, gateway: Arc<dyn Gateway>, tx: &Transaction) {
        let material = self
            .store
            .read(|state| state.accounts.get(&tx.submitter).map(|a| a.signing_material.clone()));
        let Some(material) = material else {
            let err = Error::AccountMissing(tx.submitter.clone());
            warn!(id = %tx.id, %err, "marking transaction failed");
            self.store
                .mutate(|state| state.queue.set_status(&tx.id, TxStatus::Failed));
            return;
        };

        let extrinsic = match self.codec.build_signed(&tx.call, &material, tx.nonce) {
            Ok(extrinsic) => extrinsic,
            Err(err) => {
                self.fail_before_acceptance(tx, &err);
                return;
            }
        };

        match gateway.submit_and_watch(extrinsic).await {
            Ok(watcher) => {
                self.store
                    .mutate(|state| state.queue.set_status(&tx.id, TxStatus::Submitted));
                debug!(id = %tx.id, nonce = tx.nonce, "extrinsic accepted by the node");
                self.spawn_watch(tx.id.clone(), watcher);
            }
            Err(err) => self.fail_before_acceptance(tx, &err),
        }
    }

    /// The submission never entered the node: fail the transaction and give
    /// the assigned nonce back.
    fn fail_before_acceptance(&self, tx: &Transaction, err: &Error) {
        warn!(id = %tx.id, %err, "submission rejected before acceptance");
        self.store.mutate(|state| {
            state.queue.set_status(&tx.id, TxStatus::Failed);
            // The optimistic increment produced no on-chain effect. Later
            // enqueues may have moved the counter further; the reconciler
            // repairs that rarer case.
            if let Some(account) = state.accounts.get_mut(&tx.submitter) {
                account.rollback_nonce();
            }
        });
    }

    fn spawn_watch(&self, id: TxId, mut watcher: TxWatcher) {
        let store = self.store.clone();
        spawn_cancellable(self.watch_scope.child_token(), async move {
            loop {
                match watcher.next().await {
                    Some(TxProgress::InBlock { block, events }) => {
                        if events.iter().any(|event| event.is_extrinsic_failed()) {
                            let err = Error::ExtrinsicFailed { id: id.clone() };
                            warn!(%err, block = %block, "dispatch failed at inclusion");
                            store.mutate(|state| state.queue.set_status(&id, TxStatus::Failed));
                            break;
                        }
                        debug!(%id, block = %block, "included in block");
                    }
                    Some(TxProgress::Finalized { block, events }) => {
                        if events.iter().any(|event| event.is_extrinsic_failed()) {
                            let err = Error::ExtrinsicFailed { id: id.clone() };
                            warn!(%err, block = %block, "dispatch failed at finalization");
                            store.mutate(|state| state.queue.set_status(&id, TxStatus::Failed));
                        } else {
                            info!(%id, block = %block, "transaction finalized");
                            store.mutate(|state| state.queue.set_status(&id, TxStatus::Confirmed));
                        }
                        break;
                    }
                    Some(TxProgress::Dropped { reason }) | Some(TxProgress::Invalid { reason }) => {
                        warn!(%id, reason = %reason, "discarded by the node");
                        store.mutate(|state| state.queue.set_status(&id, TxStatus::Failed));
                        break;
                    }
                    Some(_) => {}
                    None => {
                        // Watch aborted without a terminal update.
                        warn!(%id, "lifecycle stream ended early");
                        store.mutate(|state| state.queue.set_status(&id, TxStatus::Failed));
                        break;
                    }
                }
            }
        });
    }

    /// Requeue failed transactions that still have retry budget; drop the
    /// rest.
    ///
    /// Requeued transactions get a fresh optimistic nonce from their
    /// submitter's current counter, so they cannot collide with enqueues
    /// that happened since the failure.
    pub fn retry_failed(&self) {
        self.store.mutate(|state| {
            for mut tx in state.queue.take_failed() {
                if tx.retry_count >= self.config.max_retries {
                    let err = Error::RetriesExhausted {
                        id: tx.id.clone(),
                        retries: tx.retry_count,
                    };
                    warn!(%err, "dropping transaction");
                    continue;
                }
                let Some(account) = state.accounts.get_mut(&tx.submitter) else {
                    let err = Error::AccountMissing(tx.submitter.clone());
                    warn!(id = %tx.id, %err, "dropping failed transaction");
                    continue;
                };
                tx.retry_count += 1;
                tx.nonce = account.assign_nonce();
                tx.status = TxStatus::Pending;
                debug!(id = %tx.id, nonce = tx.nonce, retry = tx.retry_count, "requeued for retry");
                state.queue.push_pending(tx);
            }
        });
    }

    /// Merge an on-chain nonce into the account's local counter.
    ///
    /// Never decreases the counter: the local value runs ahead of the chain
    /// by the in-flight optimistic assignments.
    pub fn sync_account_nonce(&self, address: &str, on_chain_nonce: u64) {
        self.store.mutate(|state| {
            if !state.accounts.sync_nonce(address, on_chain_nonce) {
                debug!(address, "nonce sync for unknown account ignored");
            }
        });
    }

    /// Fetch every account's on-chain nonce and merge it locally.
    ///
    /// Runs after (re)connect and periodically from [`run`](Engine::run);
    /// this is what closes the gap when a pre-acceptance rollback was not
    /// sound.
    pub async fn reconcile_nonces(&self) -> Result<()> {
        let gateway = self
            .store
            .read(|state| state.gateway.clone())
            .ok_or(Error::NotInitialized)?;
        let addresses: Vec<Address> = self
            .store
            .read(|state| state.accounts.iter().map(|a| a.address.clone()).collect());
        for address in addresses {
            match gateway.fetch_nonce(&address).await {
                Ok(on_chain) => self.sync_account_nonce(&address, on_chain),
                Err(err) => warn!(%address, %err, "nonce query failed"),
            }
        }
        Ok(())
    }

    /// Drive the engine until `shutdown` fires.
    ///
    /// Ticks the submission driver, requeues failures, and reconciles
    /// nonces on their configured intervals. Watch tasks are cancelled on
    /// the way out; queued transactions are simply dropped, as a restart
    /// resynchronizes from the chain.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut tick = Interval::new(self.config.tick_interval());
        let mut retry = Interval::new(self.config.retry_interval());
        let mut reconcile = Interval::new(self.config.reconcile_interval());
        loop {
            select! {
                _ = shutdown.cancelled() => break,
                _ = tick.tick() => self.tick().await,
                _ = retry.tick() => self.retry_failed(),
                _ = reconcile.tick() => {
                    if let Err(err) = self.reconcile_nonces().await {
                        debug!(%err, "reconciliation skipped");
                    }
                }
            }
        }
        self.watch_scope.cancel();
        info!("engine stopped");
    }

    /// Live transactions waiting for submission.
    pub fn pending_len(&self) -> usize {
        self.store.read(|state| state.queue.pending_len())
    }

    /// Live transactions awaiting finalization.
    pub fn processing_len(&self) -> usize {
        self.store.read(|state| state.queue.processing_len())
    }

    /// Failed transactions awaiting a retry pass.
    pub fn failed_len(&self) -> usize {
        self.store.read(|state| state.queue.failed_len())
    }

    /// Current local nonce counter of an account.
    pub fn account_nonce(&self, address: &str) -> Option<u64> {
        self.store
            .read(|state| state.accounts.get(address).map(|a| a.nonce))
    }

    /// Snapshot of a live or failed transaction.
    pub fn transaction(&self, id: &str) -> Option<Transaction> {
        self.store.read(|state| state.queue.get(id).cloned())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.watch_scope.cancel();
    }
}
