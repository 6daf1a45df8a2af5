use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{AccountId, TransferSide};

/// Reason used when a transfer amount is zero or negative.
pub const NON_POSITIVE_AMOUNT: &str = "Only positive fund transfer supported in system";

/// Failures raised by the account store. Every variant is a business-rule
/// rejection: none of them are transient and none leave a partial mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Account id {0} already exists!")]
    DuplicateAccount(AccountId),

    #[error("{side} Account with accountId {id} does not available in system")]
    AccountNotFound { side: TransferSide, id: AccountId },

    #[error("{reason}")]
    InvalidTransaction { reason: String },

    #[error("The Debiting Fund {amount} from AccountId {account_id} is Not allowed, Due to less balance")]
    Overdraft {
        account_id: AccountId,
        amount: Decimal,
        current_balance: Decimal,
    },

    #[error("Timed out waiting for lock on account {0}")]
    LockTimeout(AccountId),
}

impl StoreError {
    pub fn account_not_found(side: TransferSide, id: impl Into<AccountId>) -> Self {
        Self::AccountNotFound {
            side,
            id: id.into(),
        }
    }

    pub fn invalid_transaction(reason: impl Into<String>) -> Self {
        Self::InvalidTransaction {
            reason: reason.into(),
        }
    }
}
