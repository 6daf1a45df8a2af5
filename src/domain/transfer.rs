use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Account, AccountId};

pub type TransferId = Uuid;

/// Which side of a transfer an account sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferSide {
    /// The account being debited
    Sender,
    /// The account being credited
    Receiver,
}

impl TransferSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferSide::Sender => "Debiting",
            TransferSide::Receiver => "Crediting",
        }
    }
}

impl std::fmt::Display for TransferSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request to move `amount` from `sender` to `receiver`.
/// Requests are transient: they are built per call and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender: AccountId,
    pub receiver: AccountId,
    #[serde(rename = "fund")]
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(sender: impl Into<AccountId>, receiver: impl Into<AccountId>, amount: Decimal) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
        }
    }

    /// Returns true if both sides name the same account, ignoring ASCII case.
    pub fn is_same_account(&self) -> bool {
        self.sender.eq_ignore_ascii_case(&self.receiver)
    }

    /// The opposite-direction request for the same amount.
    pub fn reversed(&self) -> Self {
        Self::new(self.receiver.clone(), self.sender.clone(), self.amount)
    }
}

/// Outcome of a committed transfer: both balances as they were when the
/// locks were released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub id: TransferId,
    pub request: TransferRequest,
    pub sender: Account,
    pub receiver: Account,
    pub completed_at: DateTime<Utc>,
}

impl TransferReceipt {
    pub fn new(request: TransferRequest, sender: Account, receiver: Account) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            sender,
            receiver,
            completed_at: Utc::now(),
        }
    }
}
