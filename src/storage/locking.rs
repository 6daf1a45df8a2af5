use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{timeout_at, Instant};

use crate::domain::Account;

use super::StoreError;

/// An account together with the lock that serialises its mutations.
/// The cell is created with the account and lives as long as its map entry,
/// so every caller resolving the same identifier contends on the same lock.
pub(crate) type AccountCell = Arc<Mutex<Account>>;

/// Lock a single account, giving up at `deadline` if one is set.
pub(crate) async fn lock_until<'a>(
    id: &str,
    cell: &'a AccountCell,
    deadline: Option<Instant>,
) -> Result<MutexGuard<'a, Account>, StoreError> {
    match deadline {
        None => Ok(cell.lock().await),
        Some(deadline) => timeout_at(deadline, cell.lock())
            .await
            .map_err(|_| StoreError::LockTimeout(id.to_string())),
    }
}

/// Lock a sender and receiver for the duration of a transfer.
///
/// Both locks are always taken in ascending identifier order, whatever the
/// direction of the transfer, so two transfers over the same pair of accounts
/// can never each hold one lock while waiting for the other. Guards are
/// returned as `(sender, receiver)`. If the second lock times out the first
/// guard is dropped before returning.
pub(crate) async fn lock_pair<'a>(
    sender: (&str, &'a AccountCell),
    receiver: (&str, &'a AccountCell),
    deadline: Option<Instant>,
) -> Result<(MutexGuard<'a, Account>, MutexGuard<'a, Account>), StoreError> {
    let sender_first = sender.0 < receiver.0;
    let (first, second) = if sender_first {
        (sender, receiver)
    } else {
        (receiver, sender)
    };

    let first_guard = lock_until(first.0, first.1, deadline).await?;
    let second_guard = lock_until(second.0, second.1, deadline).await?;

    if sender_first {
        Ok((first_guard, second_guard))
    } else {
        Ok((second_guard, first_guard))
    }
}
