//! Single source of truth for accounts, queues, and the gateway handle.

use std::sync::{Arc, Mutex};

use crate::TxId;
use crate::account::AccountSet;
use crate::gateway::Gateway;
use crate::queue::QueueState;

/// Everything the engine mutates, behind one lock.
pub(crate) struct GlobalState {
    /// Absent until `initialize` succeeds; the driver idles without it.
    pub gateway: Option<Arc<dyn Gateway>>,
    pub accounts: AccountSet,
    pub queue: QueueState,
    /// Set while the driver has a submission awaiting gateway acceptance.
    pub submit_inflight: bool,
    next_tx_id: u64,
}

impl GlobalState {
    pub fn new(accounts: AccountSet) -> Self {
        GlobalState {
            gateway: None,
            accounts,
            queue: QueueState::default(),
            submit_inflight: false,
            next_tx_id: 0,
        }
    }

    /// Fresh identifier, stable for the transaction's whole life.
    pub fn next_tx_id(&mut self) -> TxId {
        self.next_tx_id += 1;
        Arc::from(format!("tx-{}", self.next_tx_id))
    }
}

/// Serializer for all state mutations.
///
/// Every observer goes through [`read`](StateStore::read) and every change
/// through [`mutate`](StateStore::mutate). One `mutate` is one atomic
/// update: all fields written inside it become visible together, and
/// closures never await while holding the lock.
pub(crate) struct StateStore {
    inner: Mutex<GlobalState>,
}

impl StateStore {
    pub fn new(state: GlobalState) -> Self {
        StateStore {
            inner: Mutex::new(state),
        }
    }

    /// Consistent snapshot access.
    pub fn read<T>(&self, f: impl FnOnce(&GlobalState) -> T) -> T {
        let state = self.inner.lock().expect("state lock poisoned");
        f(&state)
    }

    /// Atomic update over the whole state record.
    pub fn mutate<T>(&self, f: impl FnOnce(&mut GlobalState) -> T) -> T {
        let mut state = self.inner.lock().expect("state lock poisoned");
        f(&mut state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;

    fn make_store() -> StateStore {
        StateStore::new(GlobalState::new(AccountSet::new(vec![Account::new(
            "a", "//a",
        )])))
    }

    #[test]
    fn mutation_is_visible_as_a_whole() {
        let store = make_store();
        store.mutate(|state| {
            state.submit_inflight = true;
            state.accounts.get_mut("a").unwrap().nonce = 3;
        });
        let (inflight, nonce) = store.read(|state| {
            (
                state.submit_inflight,
                state.accounts.get("a").unwrap().nonce,
            )
        });
        assert!(inflight);
        assert_eq!(nonce, 3);
    }

    #[test]
    fn tx_ids_are_unique_and_stable() {
        let store = make_store();
        let first = store.mutate(|state| state.next_tx_id());
        let second = store.mutate(|state| state.next_tx_id());
        assert_ne!(first, second);
    }
}
