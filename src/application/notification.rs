use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::domain::Account;

#[derive(Error, Debug)]
#[error("Failed to notify account {account_id}: {reason}")]
pub struct NotificationError {
    pub account_id: String,
    pub reason: String,
}

/// Delivers a human-readable message to an account holder after their
/// balance changed. Failures are reported to the caller, which decides
/// whether they matter; for transfers they never do.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_about_transfer(
        &self,
        account: &Account,
        description: &str,
    ) -> Result<(), NotificationError>;
}

/// Notifier that writes each notification as a log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify_about_transfer(
        &self,
        account: &Account,
        description: &str,
    ) -> Result<(), NotificationError> {
        info!(
            account_id = %account.account_id,
            balance = %account.balance,
            "{}",
            description
        );
        Ok(())
    }
}
