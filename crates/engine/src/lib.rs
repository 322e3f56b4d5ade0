//! Ledger and interest engine for per-child savings accounts.
//!
//! Every deposit, withdrawal, and interest credit appends an immutable
//! [`Transaction`] and updates the owning [`Account`]'s cached balance in the
//! same database transaction, so the balance always equals the fold of the
//! log. Weekly interest is applied exactly once per elapsed accrual period,
//! catching up retroactively after downtime.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tokio::sync::Mutex;
use uuid::Uuid;

pub use accounts::Account;
pub use accrual::{current_anchor, due_periods};
pub use error::EngineError;
pub use money::MoneyCents;
pub use scheduler::InterestScheduler;
pub use transactions::{Transaction, TransactionKind};

mod accounts;
mod accrual;
mod error;
mod money;
mod scheduler;
mod transactions;

type ResultEngine<T> = Result<T, EngineError>;

/// The ledger engine.
///
/// The database is the source of truth; the engine adds validation, the
/// balance/log write pairing, and per-account serialization on top of it.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    // One async mutex per account; every balance mutation holds the
    // account's lock for its whole read-modify-write so two concurrent
    // operations can never both start from the same balance.
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    async fn account_lock(&self, account_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(account_id).or_default().clone()
    }

    async fn find_account(&self, account_id: Uuid) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(account_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::AccountNotFound(account_id.to_string()))?;
        Account::try_from(model)
    }

    /// Persists the new balance and the transaction that produced it as one
    /// atomic pair: either both land or neither is observable.
    async fn write_balance_and_transaction(
        &self,
        account_id: Uuid,
        new_balance: MoneyCents,
        last_interest_at: Option<DateTime<Utc>>,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        let db_tx = self.database.begin().await?;

        transactions::ActiveModel::from(tx).insert(&db_tx).await?;

        let mut account_model = accounts::ActiveModel {
            id: ActiveValue::Set(account_id.to_string()),
            balance: ActiveValue::Set(new_balance.cents()),
            ..Default::default()
        };
        if let Some(at) = last_interest_at {
            account_model.last_interest_at = ActiveValue::Set(Some(at));
        }
        account_model.update(&db_tx).await?;

        db_tx.commit().await?;
        Ok(())
    }

    /// Create a new account with zero balance and zero interest rate.
    ///
    /// The name is trimmed; validation of emptiness belongs to the callers
    /// that own the user interaction.
    pub async fn create_account(
        &self,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Account> {
        let account = Account::new(name.trim().to_string(), created_at);
        accounts::ActiveModel::from(&account)
            .insert(&self.database)
            .await?;
        Ok(account)
    }

    /// Return an [`Account`] by id.
    pub async fn account(&self, account_id: Uuid) -> ResultEngine<Account> {
        self.find_account(account_id).await
    }

    /// Return an [`Account`] by name, matched case-insensitively.
    ///
    /// Used by the bulk importer, whose CSV files are keyed by child name.
    pub async fn account_by_name(&self, name: &str) -> ResultEngine<Account> {
        let models = accounts::Entity::find().all(&self.database).await?;
        for model in models {
            let account = Account::try_from(model)?;
            if account.name.eq_ignore_ascii_case(name.trim()) {
                return Ok(account);
            }
        }
        Err(EngineError::AccountNotFound(name.to_string()))
    }

    /// Return every account, newest first.
    pub async fn accounts(&self) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .order_by_desc(accounts::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Account::try_from).collect()
    }

    /// Set the account's interest rate, a fraction per accrual period.
    pub async fn update_interest_rate(&self, account_id: Uuid, rate: f64) -> ResultEngine<Account> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(EngineError::InvalidRate(format!(
                "interest rate must be a non-negative number, got {rate}"
            )));
        }

        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;

        let mut account = self.find_account(account_id).await?;
        let account_model = accounts::ActiveModel {
            id: ActiveValue::Set(account_id.to_string()),
            interest_rate: ActiveValue::Set(rate),
            ..Default::default()
        };
        account_model.update(&self.database).await?;

        account.interest_rate = rate;
        Ok(account)
    }

    /// Deposit `amount` into an account.
    pub async fn deposit(
        &self,
        account_id: Uuid,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
        note: Option<&str>,
    ) -> ResultEngine<Transaction> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "deposit amount must be greater than zero, got {amount}"
            )));
        }

        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;

        let account = self.find_account(account_id).await?;
        let new_balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;

        let tx = Transaction::new(
            account_id,
            TransactionKind::Deposit,
            amount,
            new_balance,
            occurred_at,
            note.map(|s| s.to_string()),
        )?;
        self.write_balance_and_transaction(account_id, new_balance, None, &tx)
            .await?;
        Ok(tx)
    }

    /// Withdraw `amount` from an account.
    ///
    /// Fails with [`EngineError::InsufficientFunds`] when `amount` exceeds
    /// the current balance; nothing is written in that case.
    pub async fn withdraw(
        &self,
        account_id: Uuid,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
        note: Option<&str>,
    ) -> ResultEngine<Transaction> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "withdrawal amount must be greater than zero, got {amount}"
            )));
        }

        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;

        let account = self.find_account(account_id).await?;
        if amount > account.balance {
            return Err(EngineError::InsufficientFunds(format!(
                "current balance is {}",
                account.balance
            )));
        }
        let new_balance = account
            .balance
            .checked_sub(amount)
            .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;

        let tx = Transaction::new(
            account_id,
            TransactionKind::Withdrawal,
            amount,
            new_balance,
            occurred_at,
            note.map(|s| s.to_string()),
        )?;
        self.write_balance_and_transaction(account_id, new_balance, None, &tx)
            .await?;
        Ok(tx)
    }

    /// Append an interest entry with a caller-supplied amount.
    ///
    /// This is the bulk-import path for historical interest rows; it does not
    /// touch `last_interest_at`, so the accrual engine stays in charge of
    /// period accounting. Scheduled accrual goes through
    /// [`Engine::accrue_account`] instead, which computes the amount from the
    /// account's rate.
    pub async fn credit_interest(
        &self,
        account_id: Uuid,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
        note: Option<&str>,
    ) -> ResultEngine<Transaction> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "interest amount must be greater than zero, got {amount}"
            )));
        }

        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;

        let account = self.find_account(account_id).await?;
        let new_balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;

        let tx = Transaction::new(
            account_id,
            TransactionKind::Interest,
            amount,
            new_balance,
            occurred_at,
            note.map(|s| s.to_string()),
        )?;
        self.write_balance_and_transaction(account_id, new_balance, None, &tx)
            .await?;
        Ok(tx)
    }

    /// Apply every accrual period owed by one account, oldest first.
    ///
    /// Periods are enumerated from the last period that actually produced
    /// interest. A period whose interest computes to zero cents (zero rate,
    /// zero balance, or a rate that rounds away on a small balance) creates
    /// no transaction and does not advance `last_interest_at`, so a later
    /// nonzero-balance check re-enumerates the skipped periods and catches
    /// up retroactively.
    pub async fn accrue_account(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;

        let mut account = self.find_account(account_id).await?;
        let mut applied = Vec::new();

        for period in accrual::due_periods(account.last_interest_at, now) {
            if let Some(tx) = self.apply_interest(&account, period).await? {
                account.balance = tx.balance_after;
                account.last_interest_at = Some(period);
                applied.push(tx);
            }
        }

        Ok(applied)
    }

    /// Apply one period of interest to `account`, or return `None` when the
    /// computed interest is zero cents.
    ///
    /// The interest transaction is stamped at the period's anchor instant and
    /// `last_interest_at` advances to the same instant, atomically with the
    /// balance update. Not exposed: the amount bypasses caller validation
    /// because it is computed from the account itself.
    async fn apply_interest(
        &self,
        account: &Account,
        period: DateTime<Utc>,
    ) -> ResultEngine<Option<Transaction>> {
        let interest = account.balance.mul_rate(account.interest_rate)?;
        if !interest.is_positive() {
            return Ok(None);
        }

        let new_balance = account
            .balance
            .checked_add(interest)
            .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;
        let note = format!("Weekly interest at {:.2}%", account.interest_rate * 100.0);

        let tx = Transaction::new(
            account.id,
            TransactionKind::Interest,
            interest,
            new_balance,
            period,
            Some(note),
        )?;
        self.write_balance_and_transaction(account.id, new_balance, Some(period), &tx)
            .await?;
        Ok(Some(tx))
    }

    /// Run the accrual check for every account.
    ///
    /// Accounts are independent: a failure on one is logged and the loop
    /// moves on. Returns the transactions that were applied.
    pub async fn accrue_all(&self, now: DateTime<Utc>) -> ResultEngine<Vec<Transaction>> {
        let accounts = self.accounts().await?;
        let mut applied = Vec::new();

        for account in accounts {
            match self.accrue_account(account.id, now).await {
                Ok(txs) => {
                    for tx in &txs {
                        tracing::info!(
                            "interest applied to {}: {} on {}",
                            account.name,
                            tx.amount,
                            tx.timestamp.date_naive()
                        );
                    }
                    applied.extend(txs);
                }
                Err(err) => {
                    tracing::error!("failed to accrue interest for {}: {err}", account.name);
                }
            }
        }

        Ok(applied)
    }

    /// Return an account's transactions, newest first.
    pub async fn transactions(&self, account_id: Uuid) -> ResultEngine<Vec<Transaction>> {
        self.find_account(account_id).await?;
        self.find_transactions(account_id).await
    }

    /// Return an account and its transactions, newest first, as one
    /// consistent snapshot: the account lock is held across both reads, so
    /// the listed entries always fold to the returned balance.
    pub async fn account_with_transactions(
        &self,
        account_id: Uuid,
    ) -> ResultEngine<(Account, Vec<Transaction>)> {
        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;

        let account = self.find_account(account_id).await?;
        let txs = self.find_transactions(account_id).await?;
        Ok((account, txs))
    }

    async fn find_transactions(&self, account_id: Uuid) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id.to_string()))
            .order_by_desc(transactions::Column::Timestamp)
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    /// Delete an account's transaction log and reset its balance to zero.
    ///
    /// Bulk import rebuilds an account's history from scratch; this is the
    /// destructive first half of that rebuild. `last_interest_at` is cleared
    /// with the log.
    pub async fn clear_transactions(&self, account_id: Uuid) -> ResultEngine<()> {
        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;

        self.find_account(account_id).await?;

        let db_tx = self.database.begin().await?;
        transactions::Entity::delete_many()
            .filter(transactions::Column::AccountId.eq(account_id.to_string()))
            .exec(&db_tx)
            .await?;
        let account_model = accounts::ActiveModel {
            id: ActiveValue::Set(account_id.to_string()),
            balance: ActiveValue::Set(0),
            last_interest_at: ActiveValue::Set(None),
            ..Default::default()
        };
        account_model.update(&db_tx).await?;
        db_tx.commit().await?;
        Ok(())
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
            locks: Mutex::new(HashMap::new()),
        }
    }
}
