use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{Account, AccountId, TransferReceipt, TransferRequest, TransferSide};

use super::locking::{lock_pair, lock_until, AccountCell};
use super::{StoreError, NON_POSITIVE_AMOUNT};

/// Tunables for the account store.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Upper bound on how long a caller waits for account locks.
    /// `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,
}

impl StoreConfig {
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}

/// In-memory store of accounts.
///
/// The map is sharded, so lookups and inserts never contend on a global
/// lock. Each account sits behind its own mutex; balances only change while
/// that mutex is held.
#[derive(Default)]
pub struct AccountStore {
    accounts: DashMap<AccountId, AccountCell>,
    config: StoreConfig,
}

impl AccountStore {
    /// Create an empty store with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given settings.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            accounts: DashMap::new(),
            config,
        }
    }

    // ========================
    // Account operations
    // ========================

    /// Insert a new account. The absence check and the insert happen under
    /// the same shard lock, so two concurrent creates of one id cannot both
    /// succeed.
    pub fn create_account(&self, account: Account) -> Result<(), StoreError> {
        if account.balance < Decimal::ZERO {
            return Err(StoreError::invalid_transaction(format!(
                "Initial balance of account {} must not be negative",
                account.account_id
            )));
        }

        match self.accounts.entry(account.account_id.clone()) {
            Entry::Occupied(entry) => Err(StoreError::DuplicateAccount(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(account_id = %account.account_id, balance = %account.balance, "account created");
                entry.insert(Arc::new(Mutex::new(account)));
                Ok(())
            }
        }
    }

    /// Get a snapshot of an account, or `None` if it does not exist.
    pub async fn get_account(&self, account_id: &str) -> Option<Account> {
        let cell = self.cell(account_id)?;
        let account = cell.lock().await.clone();
        Some(account)
    }

    /// Overwrite an account balance. Meant for setup and administrative paths;
    /// regular balance movement goes through [`AccountStore::transfer_fund`].
    /// Returns `None` if the account does not exist.
    pub async fn set_balance(
        &self,
        account_id: &str,
        balance: Decimal,
    ) -> Result<Option<Account>, StoreError> {
        if balance < Decimal::ZERO {
            return Err(StoreError::invalid_transaction(format!(
                "Balance of account {} must not be negative",
                account_id
            )));
        }

        let Some(cell) = self.cell(account_id) else {
            return Ok(None);
        };
        let mut account = lock_until(account_id, &cell, self.deadline()).await?;
        account.balance = balance;
        debug!(account_id, balance = %balance, "balance set");
        Ok(Some(account.clone()))
    }

    /// Remove every account. Not isolated from in-flight transfers: callers
    /// must make sure nothing else is using the store.
    pub fn clear_accounts(&self) {
        self.accounts.clear();
    }

    /// Snapshot of every account, sorted by identifier.
    ///
    /// Accounts are read one at a time, so the listing is not a single
    /// point-in-time view while transfers are running.
    pub async fn list_accounts(&self) -> Vec<Account> {
        let cells: Vec<AccountCell> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut accounts = Vec::with_capacity(cells.len());
        for cell in cells {
            accounts.push(cell.lock().await.clone());
        }
        accounts.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        accounts
    }

    /// Sum of all balances.
    pub async fn total_balance(&self) -> Decimal {
        self.list_accounts()
            .await
            .iter()
            .map(|account| account.balance)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    // ========================
    // Transfer operations
    // ========================

    /// Move `request.amount` from the sender to the receiver.
    ///
    /// Existence and amount checks run before any lock is taken. Both account
    /// locks are then acquired in identifier order and held across the
    /// overdraft check, the debit and the credit, so the pair of mutations is
    /// atomic with respect to every other transfer touching either account.
    pub async fn transfer_fund(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, StoreError> {
        let sender = self
            .cell(&request.sender)
            .ok_or_else(|| StoreError::account_not_found(TransferSide::Sender, &request.sender))?;
        let receiver = self
            .cell(&request.receiver)
            .ok_or_else(|| StoreError::account_not_found(TransferSide::Receiver, &request.receiver))?;

        if request.amount <= Decimal::ZERO {
            return Err(StoreError::invalid_transaction(NON_POSITIVE_AMOUNT));
        }

        // A single mutex cannot be locked twice by the same caller
        if Arc::ptr_eq(&sender, &receiver) {
            return Err(StoreError::invalid_transaction(format!(
                "Cannot transfer from account {} to itself",
                request.sender
            )));
        }

        let (mut debit, mut credit) = lock_pair(
            (request.sender.as_str(), &sender),
            (request.receiver.as_str(), &receiver),
            self.deadline(),
        )
        .await?;

        if debit.would_overdraw(request.amount) {
            debug!(
                sender = %request.sender,
                amount = %request.amount,
                balance = %debit.balance,
                "transfer rejected: insufficient funds"
            );
            return Err(StoreError::Overdraft {
                account_id: request.sender.clone(),
                amount: request.amount,
                current_balance: debit.balance,
            });
        }

        debit.balance -= request.amount;
        credit.balance += request.amount;

        let receipt = TransferReceipt::new(request.clone(), debit.clone(), credit.clone());
        debug!(
            id = %receipt.id,
            sender = %request.sender,
            receiver = %request.receiver,
            amount = %request.amount,
            "transfer committed"
        );
        Ok(receipt)
    }

    // ========================
    // Helper methods
    // ========================

    /// Clone the account cell out of the map so no shard guard is held while
    /// waiting on the account lock.
    fn cell(&self, account_id: &str) -> Option<AccountCell> {
        self.accounts
            .get(account_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn deadline(&self) -> Option<Instant> {
        self.config.lock_timeout.map(|timeout| Instant::now() + timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> AccountStore {
        let store = AccountStore::new();
        store
            .create_account(Account::new("Id-123").with_balance(Decimal::from(500)))
            .unwrap();
        store
            .create_account(Account::new("Id-234").with_balance(Decimal::from(100)))
            .unwrap();
        store
    }

    async fn balance(store: &AccountStore, id: &str) -> Decimal {
        store.get_account(id).await.unwrap().balance
    }

    #[tokio::test]
    async fn test_create_duplicate_account() {
        let store = seeded_store();
        let err = store.create_account(Account::new("Id-123")).unwrap_err();
        assert_eq!(err, StoreError::DuplicateAccount("Id-123".into()));
        // The existing entry is untouched
        assert_eq!(balance(&store, "Id-123").await, Decimal::from(500));
    }

    #[tokio::test]
    async fn test_create_rejects_negative_opening_balance() {
        let store = AccountStore::new();
        let err = store
            .create_account(Account::new("Id-999").with_balance(Decimal::from(-1)))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransaction { .. }));
        assert!(store.get_account("Id-999").await.is_none());
    }

    #[tokio::test]
    async fn test_transfer_moves_funds() {
        let store = seeded_store();
        let receipt = store
            .transfer_fund(&TransferRequest::new("Id-123", "Id-234", Decimal::from(400)))
            .await
            .unwrap();

        assert_eq!(receipt.sender.balance, Decimal::from(100));
        assert_eq!(receipt.receiver.balance, Decimal::from(500));
        assert_eq!(balance(&store, "Id-123").await, Decimal::from(100));
        assert_eq!(balance(&store, "Id-234").await, Decimal::from(500));
    }

    #[tokio::test]
    async fn test_transfer_can_drain_account() {
        let store = seeded_store();
        store
            .transfer_fund(&TransferRequest::new("Id-123", "Id-234", Decimal::from(500)))
            .await
            .unwrap();
        assert_eq!(balance(&store, "Id-123").await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_missing_sender_checked_before_amount() {
        let store = seeded_store();
        let err = store
            .transfer_fund(&TransferRequest::new("Id-456", "Id-234", Decimal::ZERO))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::account_not_found(TransferSide::Sender, "Id-456"));
    }

    #[tokio::test]
    async fn test_store_rejects_exact_self_transfer() {
        let store = seeded_store();
        let err = store
            .transfer_fund(&TransferRequest::new("Id-123", "Id-123", Decimal::from(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransaction { .. }));
        assert_eq!(balance(&store, "Id-123").await, Decimal::from(500));
    }

    #[tokio::test]
    async fn test_transfer_times_out_when_account_is_held() {
        let store = AccountStore::with_config(
            StoreConfig::default().with_lock_timeout(Duration::from_millis(20)),
        );
        store
            .create_account(Account::new("A").with_balance(Decimal::from(10)))
            .unwrap();
        store.create_account(Account::new("B")).unwrap();

        let cell = store.cell("B").unwrap();
        let held = cell.lock().await;

        let err = store
            .transfer_fund(&TransferRequest::new("A", "B", Decimal::from(1)))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::LockTimeout("B".into()));
        drop(held);

        assert_eq!(balance(&store, "A").await, Decimal::from(10));
        assert_eq!(balance(&store, "B").await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_set_balance() {
        let store = seeded_store();
        let account = store
            .set_balance("Id-234", Decimal::from(42))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.balance, Decimal::from(42));
        assert_eq!(balance(&store, "Id-234").await, Decimal::from(42));

        assert!(store.set_balance("Id-234", Decimal::from(-1)).await.is_err());
        assert_eq!(store.set_balance("nope", Decimal::ONE).await, Ok(None));
    }

    #[tokio::test]
    async fn test_list_and_clear() {
        let store = seeded_store();
        let ids: Vec<_> = store
            .list_accounts()
            .await
            .into_iter()
            .map(|a| a.account_id)
            .collect();
        assert_eq!(ids, vec!["Id-123", "Id-234"]);
        assert_eq!(store.total_balance().await, Decimal::from(600));

        store.clear_accounts();
        assert!(store.is_empty());
        assert!(store.get_account("Id-123").await.is_none());
    }
}
