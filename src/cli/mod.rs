use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::application::{AppError, FundService};
use crate::domain::{format_amount, parse_amount, Account, TransferRequest};
use crate::io::{read_transfers_csv, BatchEntry, Exporter, ImportOptions, Importer};
use crate::storage::{AccountStore, StoreConfig};

/// Fundtransfer - concurrent in-memory account ledger
#[derive(Parser)]
#[command(name = "fundtransfer")]
#[command(about = "Run fund transfers against an in-memory account ledger")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Give up on a transfer after waiting this long for account locks
    #[arg(long, global = true)]
    pub lock_timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load accounts, execute a batch of transfers and print the balances
    Run {
        /// Accounts CSV file (header: account_id,balance)
        #[arg(short, long)]
        accounts: String,

        /// Transfers CSV file (header: sender,receiver,amount); stdin if omitted
        #[arg(short, long)]
        transfers: Option<String>,

        /// Maximum number of transfers in flight at once
        #[arg(short, long, default_value = "8")]
        workers: usize,

        /// Output format for balances
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Hammer account pairs with opposite-direction transfers and verify
    /// that no money is created or lost
    Stress {
        /// Number of account pairs
        #[arg(long, default_value = "4")]
        pairs: usize,

        /// Transfers per direction per pair
        #[arg(long, default_value = "1000")]
        rounds: usize,

        /// Amount moved by each transfer
        #[arg(long, default_value = "1")]
        amount: String,

        /// Opening balance of every account
        #[arg(long, default_value = "100")]
        opening: String,
    },
}

/// How `run` prints the final balances
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl Cli {
    fn store_config(&self) -> StoreConfig {
        match self.lock_timeout_ms {
            Some(ms) => StoreConfig::default().with_lock_timeout(Duration::from_millis(ms)),
            None => StoreConfig::default(),
        }
    }

    pub async fn run(self) -> Result<()> {
        let service = Arc::new(FundService::with_logging_notifier(Arc::new(
            AccountStore::with_config(self.store_config()),
        )));

        match self.command {
            Commands::Run {
                accounts,
                transfers,
                workers,
                format,
            } => {
                run_batch_command(
                    &service,
                    &accounts,
                    transfers.as_deref(),
                    workers,
                    format,
                )
                .await?;
            }

            Commands::Stress {
                pairs,
                rounds,
                amount,
                opening,
            } => {
                let amount =
                    parse_amount(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
                let opening = parse_amount(&opening)
                    .context("Invalid opening balance format. Use '50.00' or '50'")?;
                run_stress_command(&service, pairs, rounds, amount, opening).await?;
            }
        }

        Ok(())
    }
}

async fn run_batch_command(
    service: &Arc<FundService>,
    accounts_path: &str,
    transfers_path: Option<&str>,
    workers: usize,
    format: OutputFormat,
) -> Result<()> {
    use std::fs::File;
    use std::io::{stdin, stdout, Read};

    let file = File::open(accounts_path)
        .with_context(|| format!("Failed to open accounts file: {}", accounts_path))?;
    let imported = Importer::new(service).import_accounts_csv(file, ImportOptions::default())?;
    for error in &imported.errors {
        eprintln!("accounts line {}: {}", error.line, error.error);
    }

    let reader: Box<dyn Read> = match transfers_path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open transfers file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };
    let batch = read_transfers_csv(reader)?;
    for error in &batch.errors {
        eprintln!("transfers line {}: {}", error.line, error.error);
    }

    let outcomes = execute_batch(service, batch.entries, workers).await?;
    let failed: Vec<_> = outcomes.iter().filter(|(_, r)| r.is_err()).collect();
    for (entry, outcome) in &failed {
        if let Err(e) = outcome {
            eprintln!("transfers line {}: {}", entry.line, e);
        }
    }
    eprintln!(
        "Executed {} transfers: {} succeeded, {} rejected",
        outcomes.len(),
        outcomes.len() - failed.len(),
        failed.len()
    );

    match format {
        OutputFormat::Table => print_balances_table(&service.list_accounts().await),
        OutputFormat::Json => {
            Exporter::new(service)
                .export_balances_json(stdout())
                .await?;
            println!();
        }
        OutputFormat::Csv => {
            Exporter::new(service).export_balances_csv(stdout()).await?;
        }
    }

    Ok(())
}

/// Execute every entry through the service with at most `workers` in flight.
/// Outcomes are returned in batch order.
async fn execute_batch(
    service: &Arc<FundService>,
    entries: Vec<BatchEntry>,
    workers: usize,
) -> Result<Vec<(BatchEntry, Result<(), AppError>)>> {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for (index, entry) in entries.into_iter().enumerate() {
        let service = Arc::clone(service);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let outcome = service.transfer(&entry.request).await.map(|_| ());
            (index, entry, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined.context("Transfer task panicked")?);
    }
    outcomes.sort_by_key(|(index, _, _)| *index);

    Ok(outcomes
        .into_iter()
        .map(|(_, entry, outcome)| (entry, outcome))
        .collect())
}

async fn run_stress_command(
    service: &Arc<FundService>,
    pairs: usize,
    rounds: usize,
    amount: Decimal,
    opening: Decimal,
) -> Result<()> {
    let mut requests = Vec::with_capacity(pairs);
    for pair in 0..pairs {
        let a = format!("acct-{:04}-a", pair);
        let b = format!("acct-{:04}-b", pair);
        service.create_account(Account::new(a.clone()).with_balance(opening))?;
        service.create_account(Account::new(b.clone()).with_balance(opening))?;
        requests.push(TransferRequest::new(a, b, amount));
    }
    let expected_total = service.store().total_balance().await;

    let started = Instant::now();
    let mut tasks = JoinSet::new();
    for (pair, forward) in requests.iter().enumerate() {
        for _ in 0..rounds {
            for request in [forward.clone(), forward.reversed()] {
                let service = Arc::clone(service);
                let forward_leg = request.sender == forward.sender;
                tasks.spawn(async move {
                    let ok = service.transfer(&request).await.is_ok();
                    (pair, forward_leg, ok)
                });
            }
        }
    }

    // (a -> b successes, b -> a successes) per pair
    let mut successes = vec![(0i64, 0i64); pairs];
    let mut rejected = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (pair, forward_leg, ok) = joined.context("Transfer task panicked")?;
        match (ok, forward_leg) {
            (true, true) => successes[pair].0 += 1,
            (true, false) => successes[pair].1 += 1,
            (false, _) => rejected += 1,
        }
    }
    let elapsed = started.elapsed();

    let mut violations = 0usize;
    for (pair, request) in requests.iter().enumerate() {
        let (forward, backward) = successes[pair];
        let net = amount * Decimal::from(forward - backward);
        let expected_a = opening - net;
        let expected_b = opening + net;

        let a = service
            .get_account(&request.sender)
            .await
            .with_context(|| format!("Account {} vanished", request.sender))?;
        let b = service
            .get_account(&request.receiver)
            .await
            .with_context(|| format!("Account {} vanished", request.receiver))?;

        if a.balance != expected_a || b.balance != expected_b {
            violations += 1;
            eprintln!(
                "pair {}: expected {}/{}, found {}/{}",
                pair,
                format_amount(expected_a),
                format_amount(expected_b),
                format_amount(a.balance),
                format_amount(b.balance)
            );
        }
    }

    let total = service.store().total_balance().await;
    let executed = pairs * rounds * 2;
    println!(
        "{} transfers in {:.2?} ({} rejected), total balance {} (expected {})",
        executed,
        elapsed,
        rejected,
        format_amount(total),
        format_amount(expected_total)
    );

    if total != expected_total || violations > 0 {
        anyhow::bail!(
            "Ledger inconsistent: {} pair(s) off, total drifted by {}",
            violations,
            format_amount(total - expected_total)
        );
    }

    Ok(())
}

fn print_balances_table(accounts: &[Account]) {
    if accounts.is_empty() {
        println!("No accounts found.");
        return;
    }

    println!("{:<24} {:>16}", "ACCOUNT", "BALANCE");
    println!("{}", "-".repeat(41));
    for account in accounts {
        println!(
            "{:<24} {:>16}",
            account.account_id,
            format_amount(account.balance)
        );
    }
    let total: Decimal = accounts.iter().map(|a| a.balance).sum();
    println!("{}", "-".repeat(41));
    println!("{:<24} {:>16}", "TOTAL", format_amount(total));
}
