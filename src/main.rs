use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vaultpay::application::balance::BalanceHolder;
use vaultpay::application::batch::run_batch;
use vaultpay::application::history::{HistoryView, PaymentHistory};
use vaultpay::application::merchant::{MerchantView, RECENT_RECEIPTS};
use vaultpay::application::payment::{AttemptState, PaymentOutcome, PaymentWorkflow};
use vaultpay::application::receipt::{ReceiptWorkflow, VerificationOutcome};
use vaultpay::config::{DEFAULT_API_BASE, DEFAULT_TIMEOUT_MS, GatewayConfig};
use vaultpay::domain::balance::{OwnerId, VaultBalance};
use vaultpay::domain::ports::GatewayRef;
use vaultpay::infrastructure::http::HttpGateway;
use vaultpay::infrastructure::in_memory::InMemoryGateway;
use vaultpay::interfaces::csv::history_writer::HistoryWriter;
use vaultpay::interfaces::csv::instruction_reader::InstructionReader;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the payment backend
    #[arg(long, global = true, env = "VAULTPAY_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Request timeout in milliseconds
    #[arg(long, global = true, env = "VAULTPAY_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Vault (agent) id whose balance is tracked. Must match the id the backend
    /// reports for its vault; a single-agent backend ignores the requested id, so
    /// any other value makes every balance query fail as a malformed response
    #[arg(long, global = true, env = "VAULTPAY_OWNER", default_value_t = 1)]
    owner: OwnerId,

    /// Run against an in-memory service seeded with this many minor units
    #[arg(long, global = true, value_name = "LOVELACE")]
    simulate: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Query the vault's spendable balance
    Balance,
    /// Pay a recipient from the vault
    Pay {
        recipient: String,
        /// Amount in display units (e.g. 2.5)
        amount: String,
    },
    /// Verify a transaction and mint a receipt
    Verify {
        #[arg(long)]
        tx: String,
        #[arg(long)]
        payer: String,
        #[arg(long)]
        merchant: String,
        /// Amount in display units
        #[arg(long)]
        amount: String,
    },
    /// List payments stored by the service as CSV
    History,
    /// Show the reputation score of an address
    Reputation { address: String },
    /// List verified receipts as CSV, by payer unless --merchant is given
    Receipts {
        address: String,
        /// Treat the address as the merchant that was paid
        #[arg(long)]
        merchant: bool,
    },
    /// List a merchant's invoices as CSV
    Invoices { merchant: String },
    /// Summarize a merchant's reputation and verified receipts
    Merchant { address: String },
    /// Submit payment instructions (recipient,amount) from a CSV file
    Batch {
        input: PathBuf,
        /// Also write the payments settled in this run to a CSV file
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn print_balance(balance: &VaultBalance) {
    println!(
        "vault {}: {} ({} minor units)",
        balance.owner_id,
        balance.display_amount(),
        balance.spendable
    );
}

/// Loads the balance for the soft funds check; a failure only leaves it unknown.
async fn load_balance(holder: &BalanceHolder) {
    if let Err(stale) = holder.refresh().await {
        tracing::warn!(error = %stale, "continuing without a known balance");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let gateway: GatewayRef = match cli.simulate {
        Some(seed) => {
            tracing::info!(owner = cli.owner, seed, "using simulated payment service");
            Arc::new(InMemoryGateway::new(cli.owner, seed))
        }
        None => {
            let config = GatewayConfig::new(&cli.api_base, cli.timeout_ms).into_diagnostic()?;
            Arc::new(HttpGateway::new(&config).into_diagnostic()?)
        }
    };

    let balance = Arc::new(BalanceHolder::new(cli.owner, gateway.clone()));
    let history = Arc::new(PaymentHistory::new());

    match cli.command {
        Command::Balance => {
            let refreshed = balance.refresh().await.into_diagnostic()?;
            print_balance(&refreshed.balance);
        }
        Command::Pay { recipient, amount } => {
            load_balance(&balance).await;
            let workflow = PaymentWorkflow::new(gateway.clone(), balance.clone(), history);
            let attempt = workflow.submit_input(&recipient, &amount).await;
            let Some(outcome) = attempt.outcome() else {
                return Err(miette!("payment attempt did not finish"));
            };
            let PaymentOutcome::Settled(result) = outcome else {
                return Err(miette!("{}", outcome.reason()));
            };
            println!("{}", outcome.reason());
            if let Some(token) = &result.receipt_token {
                println!("receipt: {token}");
            }
            println!("reputation: {}", result.reputation_score);
            if let Some(current) = balance.get_balance().await {
                print_balance(&current);
            }
        }
        Command::Verify {
            tx,
            payer,
            merchant,
            amount,
        } => {
            let workflow = ReceiptWorkflow::new(gateway.clone());
            let outcome = workflow.verify_input(&tx, &payer, &merchant, &amount).await;
            match outcome {
                VerificationOutcome::Verified(_) => println!("{}", outcome.reason()),
                _ => return Err(miette!("{}", outcome.reason())),
            }
        }
        Command::History => {
            let view = HistoryView::new(cli.owner, gateway.clone());
            let records = view.list().await.into_diagnostic()?;
            HistoryWriter::new(io::stdout().lock())
                .write_records(&records)
                .into_diagnostic()?;
        }
        Command::Reputation { address } => {
            let reputation = gateway.reputation(&address).await.into_diagnostic()?;
            println!("{}: {}", reputation.address, reputation.score);
        }
        Command::Receipts { address, merchant } => {
            let view = MerchantView::new(gateway.clone());
            let receipts = if merchant {
                view.receipts_by_merchant(&address).await
            } else {
                view.receipts_by_payer(&address).await
            }
            .into_diagnostic()?;
            HistoryWriter::new(io::stdout().lock())
                .write_receipts(&receipts)
                .into_diagnostic()?;
        }
        Command::Invoices { merchant } => {
            let invoices = MerchantView::new(gateway.clone())
                .invoices(&merchant)
                .await
                .into_diagnostic()?;
            HistoryWriter::new(io::stdout().lock())
                .write_invoices(&invoices)
                .into_diagnostic()?;
        }
        Command::Merchant { address } => {
            let summary = MerchantView::new(gateway.clone())
                .summary(&address)
                .await
                .into_diagnostic()?;
            println!("merchant {}", summary.reputation.address);
            println!(
                "reputation: {:.2} ({})",
                summary.reputation.score,
                summary.tier()
            );
            println!("receipts: {}", summary.total_receipts());
            println!("volume: {}", summary.total_volume().to_display());
            println!("average ticket: {}", summary.average_ticket());
            for receipt in summary.recent(RECENT_RECEIPTS) {
                println!(
                    "  {} from {}: {} ({})",
                    receipt.transaction_reference,
                    receipt.payer_address,
                    receipt.amount.to_display(),
                    receipt.receipt_token.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Batch { input, export } => {
            load_balance(&balance).await;
            let file = File::open(input).into_diagnostic()?;
            let reader = InstructionReader::new(file).into_diagnostic()?;
            let workflow = PaymentWorkflow::new(gateway.clone(), balance.clone(), history.clone());
            let report = run_batch(&workflow, reader.instructions()).await;

            if let Some(path) = export {
                let settled = history.entries().await;
                let file = File::create(path).into_diagnostic()?;
                HistoryWriter::new(file)
                    .write_results(&settled)
                    .into_diagnostic()?;
            }

            for attempt in &report.attempts {
                if let Some(reason) = attempt.reason() {
                    println!("{reason}");
                }
            }
            for skipped in &report.skipped {
                eprintln!("Error reading instruction: {skipped}");
            }
            println!(
                "settled: {}, rejected: {}, unknown: {}, skipped: {}",
                report.count(AttemptState::Settled),
                report.count(AttemptState::Rejected),
                report.count(AttemptState::Unreachable),
                report.skipped.len()
            );

            if report.halted {
                let view = HistoryView::new(cli.owner, gateway.clone());
                match view.reconcile(&history).await {
                    Ok(reconciliation) if !reconciliation.unknown_locally.is_empty() => {
                        eprintln!("payments on record but not settled in this run:");
                        let mut writer = HistoryWriter::new(io::stderr());
                        writer
                            .write_records(&reconciliation.unknown_locally)
                            .into_diagnostic()?;
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "could not reconcile payment history"),
                }
                return Err(miette!(
                    "batch halted: payment status unknown, check history before retrying"
                ));
            }

            if let Some(current) = balance.get_balance().await {
                print_balance(&current);
            }
        }
    }

    Ok(())
}
