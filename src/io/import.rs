use anyhow::Result;
use std::io::Read;

use crate::application::FundService;
use crate::domain::{parse_amount, Account, TransferRequest};
use crate::storage::StoreError;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub skip_duplicates: bool,
}

/// A transfer request read from a batch file, tagged with its source line.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub line: usize,
    pub request: TransferRequest,
}

/// Parsed transfer batch. Lines that failed to parse are kept in `errors`
/// and do not appear in `entries`.
#[derive(Debug, Clone, Default)]
pub struct TransferBatch {
    pub entries: Vec<BatchEntry>,
    pub errors: Vec<ImportError>,
}

/// Importer for loading data into the ledger
pub struct Importer<'a> {
    service: &'a FundService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a FundService) -> Self {
        Self { service }
    }

    /// Import accounts from CSV with header `account_id,balance`.
    pub fn import_accounts_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut result = ImportResult::default();

        for (line_num, record) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let account_id = record.get(0).unwrap_or("").trim();
            if account_id.is_empty() {
                result.errors.push(ImportError {
                    line,
                    field: Some("account_id".to_string()),
                    error: "Account id is empty".to_string(),
                });
                continue;
            }

            let balance = match parse_amount(record.get(1).unwrap_or("0")) {
                Ok(b) => b,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: Some("balance".to_string()),
                        error: format!("Invalid balance: {}", e),
                    });
                    continue;
                }
            };

            match self
                .service
                .create_account(Account::new(account_id).with_balance(balance))
            {
                Ok(()) => result.imported += 1,
                Err(e) => {
                    let duplicate = matches!(
                        e.as_store_error(),
                        Some(StoreError::DuplicateAccount(_))
                    );
                    if duplicate && options.skip_duplicates {
                        result.skipped += 1;
                    } else {
                        result.errors.push(ImportError {
                            line,
                            field: None,
                            error: format!("Account creation failed: {}", e),
                        });
                    }
                }
            }
        }

        Ok(result)
    }
}

/// Read transfer requests from CSV with header `sender,receiver,amount`.
///
/// Only the request shape is checked here: both identifiers present and an
/// amount that parses. Business rules are left to the ledger.
pub fn read_transfers_csv<R: Read>(reader: R) -> Result<TransferBatch> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut batch = TransferBatch::default();

    for (line_num, record) in csv_reader.records().enumerate() {
        let line = line_num + 2;

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                batch.errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("CSV parse error: {}", e),
                });
                continue;
            }
        };

        let sender = record.get(0).unwrap_or("").trim();
        let receiver = record.get(1).unwrap_or("").trim();
        let amount_str = record.get(2).unwrap_or("");

        if sender.is_empty() {
            batch.errors.push(ImportError {
                line,
                field: Some("sender".to_string()),
                error: "Sender is empty".to_string(),
            });
            continue;
        }
        if receiver.is_empty() {
            batch.errors.push(ImportError {
                line,
                field: Some("receiver".to_string()),
                error: "Receiver is empty".to_string(),
            });
            continue;
        }

        let amount = match parse_amount(amount_str) {
            Ok(a) => a,
            Err(e) => {
                batch.errors.push(ImportError {
                    line,
                    field: Some("amount".to_string()),
                    error: format!("Invalid amount: {}", e),
                });
                continue;
            }
        };

        batch.entries.push(BatchEntry {
            line,
            request: TransferRequest::new(sender, receiver, amount),
        });
    }

    Ok(batch)
}
