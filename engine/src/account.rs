//! Signing account pool: round-robin selection and nonce accounting.

use tracing::debug;

use crate::{Address, SigningMaterial};

/// A signing account and its local nonce counter.
///
/// `nonce` is the *next* value to assign. It runs ahead of the chain while
/// submissions are in flight, and only a compensating rollback after a
/// pre-acceptance failure ever moves it backwards.
#[derive(Debug, Clone)]
pub struct Account {
    pub address: Address,
    pub signing_material: SigningMaterial,
    pub nonce: u64,
}

impl Account {
    pub fn new(address: impl Into<Address>, signing_material: impl Into<SigningMaterial>) -> Self {
        Account {
            address: address.into(),
            signing_material: signing_material.into(),
            nonce: 0,
        }
    }

    /// Hand out the current nonce and advance the counter.
    ///
    /// The increment is optimistic: back-to-back assignments on one account
    /// yield strictly consecutive values before the chain has acknowledged
    /// any of them.
    pub(crate) fn assign_nonce(&mut self) -> u64 {
        let nonce = self.nonce;
        self.nonce += 1;
        debug!(address = %self.address, nonce, "assigned optimistic nonce");
        nonce
    }

    /// Compensate an assignment whose submission never reached the chain.
    pub(crate) fn rollback_nonce(&mut self) {
        self.nonce = self.nonce.saturating_sub(1);
        debug!(address = %self.address, nonce = self.nonce, "rolled back nonce");
    }

    /// Merge the on-chain nonce into the local counter.
    ///
    /// Never decreases: the local value reflects in-flight optimistic
    /// assignments the chain has not seen yet.
    pub(crate) fn sync_nonce(&mut self, on_chain: u64) {
        if on_chain > self.nonce {
            debug!(address = %self.address, local = self.nonce, on_chain, "nonce synced upwards");
            self.nonce = on_chain;
        }
    }
}

/// Round-robin pool over the configured accounts.
#[derive(Debug, Default)]
pub struct AccountSet {
    accounts: Vec<Account>,
    next_index: usize,
}

impl AccountSet {
    pub fn new(accounts: Vec<Account>) -> Self {
        AccountSet {
            accounts,
            next_index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    /// Account at the cursor; advances the cursor with wrap-around.
    pub fn pick_next(&mut self) -> Option<&mut Account> {
        if self.accounts.is_empty() {
            return None;
        }
        let idx = self.next_index % self.accounts.len();
        self.next_index = (idx + 1) % self.accounts.len();
        self.accounts.get_mut(idx)
    }

    pub fn get(&self, address: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| &*a.address == address)
    }

    pub fn get_mut(&mut self, address: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| &*a.address == address)
    }

    /// Merge an on-chain nonce into the account's counter. Returns `false`
    /// when the address is unknown.
    pub fn sync_nonce(&mut self, address: &str, on_chain: u64) -> bool {
        match self.get_mut(address) {
            Some(account) => {
                account.sync_nonce(on_chain);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_set(addresses: &[&str]) -> AccountSet {
        AccountSet::new(
            addresses
                .iter()
                .map(|a| Account::new(*a, format!("//{a}")))
                .collect(),
        )
    }

    mod rotation {
        use super::*;

        #[test]
        fn cycles_with_wrap_around() {
            let mut set = make_set(&["a", "b", "c"]);
            let picked: Vec<_> = (0..6)
                .map(|_| set.pick_next().unwrap().address.clone())
                .collect();
            let expected = ["a", "b", "c", "a", "b", "c"];
            assert!(picked.iter().map(|a| &**a).eq(expected));
        }

        #[test]
        fn empty_pool_yields_none() {
            let mut set = make_set(&[]);
            assert!(set.pick_next().is_none());
        }

        #[test]
        fn single_account_repeats() {
            let mut set = make_set(&["only"]);
            for _ in 0..3 {
                assert_eq!(&*set.pick_next().unwrap().address, "only");
            }
        }
    }

    mod nonce_accounting {
        use super::*;

        #[test]
        fn assignments_are_consecutive() {
            let mut account = Account::new("a", "//a");
            assert_eq!(account.assign_nonce(), 0);
            assert_eq!(account.assign_nonce(), 1);
            assert_eq!(account.assign_nonce(), 2);
            assert_eq!(account.nonce, 3);
        }

        #[test]
        fn rollback_restores_previous_counter() {
            let mut account = Account::new("a", "//a");
            account.nonce = 5;
            assert_eq!(account.assign_nonce(), 5);
            account.rollback_nonce();
            assert_eq!(account.nonce, 5);
        }

        #[test]
        fn rollback_saturates_at_zero() {
            let mut account = Account::new("a", "//a");
            account.rollback_nonce();
            assert_eq!(account.nonce, 0);
        }

        #[test]
        fn sync_never_decreases() {
            let mut set = make_set(&["a"]);
            assert!(set.sync_nonce("a", 7));
            assert_eq!(set.get("a").unwrap().nonce, 7);

            assert!(set.sync_nonce("a", 4));
            assert_eq!(set.get("a").unwrap().nonce, 7);
        }

        #[test]
        fn sync_unknown_address_is_rejected() {
            let mut set = make_set(&["a"]);
            assert!(!set.sync_nonce("ghost", 9));
        }
    }
}
