use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type AccountId = String;

/// An account held by the ledger. The identifier never changes once the
/// account has been created; the balance only moves through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: AccountId,
    pub balance: Decimal,
}

impl Account {
    /// Create an account with a zero balance.
    pub fn new(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: account_id.into(),
            balance: Decimal::ZERO,
        }
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    /// Returns true if debiting `amount` would leave a negative balance.
    pub fn would_overdraw(&self, amount: Decimal) -> bool {
        self.balance - amount < Decimal::ZERO
    }
}
