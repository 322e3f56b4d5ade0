use std::{error::Error, path::PathBuf};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{Engine, MoneyCents};
use migration::MigratorTrait;
use sea_orm::Database;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "salvadanaio_admin")]
#[command(about = "Admin utilities for Salvadanaio (bootstrap accounts, bulk import)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./salvadanaio.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Account(Account),
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
    List,
    SetRate(SetRateArgs),
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct SetRateArgs {
    #[arg(long)]
    account: Uuid,
    /// Interest rate as a percentage (5 = 5%).
    #[arg(long)]
    rate_percent: f64,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Bankaroo CSV export to import.
    #[arg(long)]
    file: PathBuf,
    /// Account to rebuild, matched by child name (case-insensitive).
    #[arg(long)]
    account_name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = Database::connect(&cli.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    let engine = Engine::builder().database(db).build();

    match cli.command {
        Command::Account(account) => match account.command {
            AccountCommand::Create(args) => {
                if args.name.trim().is_empty() {
                    return Err("account name must not be empty".into());
                }
                let account = engine.create_account(&args.name, Utc::now()).await?;
                println!("created account {} ({})", account.name, account.id);
            }
            AccountCommand::List => {
                for account in engine.accounts().await? {
                    println!(
                        "{}  {}  balance {}  rate {:.2}%",
                        account.id,
                        account.name,
                        account.balance,
                        account.interest_rate * 100.0
                    );
                }
            }
            AccountCommand::SetRate(args) => {
                let account = engine
                    .update_interest_rate(args.account, args.rate_percent / 100.0)
                    .await?;
                println!(
                    "interest rate for {} set to {:.2}%",
                    account.name,
                    account.interest_rate * 100.0
                );
            }
        },
        Command::Import(args) => import(&engine, &args).await?,
    }

    Ok(())
}

/// One usable row of a Bankaroo export: a date plus either a deposit or a
/// withdrawal amount.
#[derive(Debug)]
struct CsvRow {
    date: DateTime<Utc>,
    description: String,
    deposit: Option<MoneyCents>,
    withdrawal: Option<MoneyCents>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Deposits", default)]
    deposits: String,
    #[serde(rename = "Withdrawal", default)]
    withdrawal: String,
}

fn parse_date(cell: &str) -> Option<DateTime<Utc>> {
    let cell = cell.trim();
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%b %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(cell, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| Utc.from_utc_datetime(&dt));
        }
    }
    None
}

/// Currency cells look like `"$7,00"` or `"$253,89"` (comma as decimal
/// separator). Empty or unparseable cells yield `None`.
fn parse_currency(cell: &str) -> Option<MoneyCents> {
    let cell = cell.trim().trim_matches('"').trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<MoneyCents>().ok()
}

fn parse_rows(content: &str) -> Result<Vec<CsvRow>, Box<dyn Error + Send + Sync>> {
    // Bankaroo exports carry a preamble before the real header row.
    let start = content
        .find("Date,Description")
        .ok_or("could not find CSV header row")?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content[start..].as_bytes());

    let mut rows = Vec::new();
    for record in reader.deserialize::<RawRow>() {
        let raw = match record {
            Ok(raw) => raw,
            Err(err) => {
                eprintln!("skipping malformed row: {err}");
                continue;
            }
        };

        let Some(date) = parse_date(&raw.date) else {
            if !raw.date.trim().is_empty() {
                eprintln!("skipping row with unparseable date: {}", raw.date);
            }
            continue;
        };

        let deposit = parse_currency(&raw.deposits);
        let withdrawal = parse_currency(&raw.withdrawal);
        if deposit.is_none() && withdrawal.is_none() {
            continue;
        }

        rows.push(CsvRow {
            date,
            description: raw.description,
            deposit,
            withdrawal,
        });
    }

    Ok(rows)
}

/// Rebuilds one account's history from a CSV export, replaying every row
/// through the ledger so `balance_after` snapshots stay consistent.
async fn import(engine: &Engine, args: &ImportArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let account = engine.account_by_name(&args.account_name).await?;

    let content = std::fs::read_to_string(&args.file)?;
    let mut rows = parse_rows(&content)?;
    rows.sort_by_key(|row| row.date);
    println!("found {} transactions for {}", rows.len(), account.name);

    println!("clearing existing transactions for {}...", account.name);
    engine.clear_transactions(account.id).await?;

    let mut imported = 0usize;
    for row in rows {
        let note = (!row.description.is_empty()).then_some(row.description.as_str());

        let result = if let Some(amount) = row.deposit {
            // Bankaroo marks interest credits only in the description.
            if row.description.to_lowercase().contains("interest") {
                engine
                    .credit_interest(account.id, amount, row.date, note)
                    .await
            } else {
                engine.deposit(account.id, amount, row.date, note).await
            }
        } else if let Some(amount) = row.withdrawal {
            engine.withdraw(account.id, amount, row.date, note).await
        } else {
            continue;
        };

        match result {
            Ok(_) => imported += 1,
            Err(err) => eprintln!(
                "error importing row ({} on {}): {err}",
                row.description,
                row.date.date_naive()
            ),
        }
    }

    let account = engine.account(account.id).await?;
    println!(
        "import complete for {}: {imported} transaction(s), final balance {}",
        account.name, account.balance
    );
    Ok(())
}
