// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use fundtransfer::application::{FundService, NotificationError, Notifier};
use fundtransfer::domain::Account;
use fundtransfer::storage::AccountStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// A notification captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub account_id: String,
    pub balance: Decimal,
    pub description: String,
}

/// Notifier that keeps every notification in memory
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until at least `count` notifications arrived. Delivery happens on
    /// a background task, so callers cannot assume it is done when a
    /// transfer returns.
    pub async fn wait_for(&self, count: usize) -> Vec<SentNotification> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let sent = self.sent();
            if sent.len() >= count || Instant::now() >= deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_about_transfer(
        &self,
        account: &Account,
        description: &str,
    ) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(SentNotification {
            account_id: account.account_id.clone(),
            balance: account.balance,
            description: description.to_string(),
        });
        Ok(())
    }
}

/// Notifier whose delivery always fails
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify_about_transfer(
        &self,
        account: &Account,
        _description: &str,
    ) -> Result<(), NotificationError> {
        Err(NotificationError {
            account_id: account.account_id.clone(),
            reason: "mail server unreachable".to_string(),
        })
    }
}

/// Notifier that never finishes delivering
pub struct StalledNotifier;

#[async_trait]
impl Notifier for StalledNotifier {
    async fn notify_about_transfer(
        &self,
        _account: &Account,
        _description: &str,
    ) -> Result<(), NotificationError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

/// Notifier that panics on every delivery
pub struct PanickingNotifier;

#[async_trait]
impl Notifier for PanickingNotifier {
    async fn notify_about_transfer(
        &self,
        account: &Account,
        _description: &str,
    ) -> Result<(), NotificationError> {
        panic!("notifier crashed while notifying {}", account.account_id);
    }
}

/// Helper to create a test service backed by a fresh store
pub fn test_service() -> (FundService, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = FundService::new(Arc::new(AccountStore::new()), notifier.clone());
    (service, notifier)
}

/// Helper to read a balance that must exist
pub async fn balance_of(service: &FundService, account_id: &str) -> Decimal {
    service
        .get_account(account_id)
        .await
        .unwrap_or_else(|| panic!("account {} should exist", account_id))
        .balance
}

/// Test fixture: standard account setup
pub struct StandardAccounts;

impl StandardAccounts {
    /// "Id-123" with 500 and "Id-234" with 100
    pub fn create_basic(service: &FundService) -> Result<()> {
        service.create_account(Account::new("Id-123").with_balance(dec!(500)))?;
        service.create_account(Account::new("Id-234").with_balance(dec!(100)))?;
        Ok(())
    }
}
