use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{Account, TransferReceipt, TransferRequest};
use crate::storage::AccountStore;

use super::{AppError, LoggingNotifier, Notifier};

/// Application service providing high-level operations on the ledger.
/// This is the primary interface for any client (CLI, API, tests, etc.).
pub struct FundService {
    store: Arc<AccountStore>,
    notifier: Arc<dyn Notifier>,
}

impl FundService {
    /// Create a service over `store` that sends notifications through `notifier`.
    pub fn new(store: Arc<AccountStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Create a service whose notifications go to the log.
    pub fn with_logging_notifier(store: Arc<AccountStore>) -> Self {
        Self::new(store, Arc::new(LoggingNotifier))
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    // ========================
    // Account operations
    // ========================

    pub fn create_account(&self, account: Account) -> Result<(), AppError> {
        Ok(self.store.create_account(account)?)
    }

    pub async fn get_account(&self, account_id: &str) -> Option<Account> {
        self.store.get_account(account_id).await
    }

    pub async fn list_accounts(&self) -> Vec<Account> {
        self.store.list_accounts().await
    }

    /// Remove every account. Only for resetting between test runs.
    pub fn clear_accounts(&self) {
        self.store.clear_accounts();
    }

    // ========================
    // Transfer operations
    // ========================

    /// Transfer funds between two accounts.
    ///
    /// Requests naming the same account on both sides (ignoring case) are
    /// rejected before the store is touched. Store errors are returned as-is
    /// and suppress notifications. Once the store has committed, both account
    /// holders are notified from a detached task, so the result never waits
    /// on, or fails because of, the notifier.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, AppError> {
        debug!(
            sender = %request.sender,
            receiver = %request.receiver,
            amount = %request.amount,
            "transferring fund"
        );

        if request.is_same_account() {
            return Err(AppError::SameAccount);
        }

        let receipt = self.store.transfer_fund(request).await?;

        self.spawn_notifications(vec![
            (
                receipt.sender.clone(),
                format!("Account debited with {}", request.amount),
            ),
            (
                receipt.receiver.clone(),
                format!("Account credited with {}", request.amount),
            ),
        ]);

        Ok(receipt)
    }

    // ========================
    // Helper methods
    // ========================

    /// Deliver notifications in order on a background task. Each delivery
    /// runs in its own task so a panicking notifier only loses that message.
    fn spawn_notifications(&self, messages: Vec<(Account, String)>) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            for (account, description) in messages {
                let account_id = account.account_id.clone();
                let notifier = Arc::clone(&notifier);
                let delivery = tokio::spawn(async move {
                    notifier.notify_about_transfer(&account, &description).await
                });

                match delivery.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(account_id = %account_id, error = %e, "transfer notification failed")
                    }
                    Err(e) => {
                        warn!(account_id = %account_id, error = %e, "transfer notification aborted")
                    }
                }
            }
        });
    }
}
