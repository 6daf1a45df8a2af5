use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::FundService;
use crate::domain::Account;

/// Point-in-time listing of every account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub exported_at: DateTime<Utc>,
    pub total: Decimal,
    pub accounts: Vec<Account>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a FundService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a FundService) -> Self {
        Self { service }
    }

    /// Export balances to CSV format
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.list_accounts().await;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["account_id", "balance"])?;

        for account in &accounts {
            let balance = account.balance.to_string();
            csv_writer.write_record([account.account_id.as_str(), balance.as_str()])?;
        }

        csv_writer.flush()?;
        Ok(accounts.len())
    }

    /// Export balances as a JSON snapshot
    pub async fn export_balances_json<W: Write>(&self, writer: W) -> Result<BalanceSnapshot> {
        let accounts = self.service.list_accounts().await;
        let snapshot = BalanceSnapshot {
            exported_at: Utc::now(),
            total: accounts.iter().map(|a| a.balance).sum(),
            accounts,
        };

        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(snapshot)
    }
}
