use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Interest,
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
    }

    /// Interest rate update, expressed as a percentage (`5` = 5%).
    ///
    /// The conversion to the stored fraction happens server-side.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RateUpdate {
        pub rate_percent: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub name: String,
        pub balance_cents: i64,
        /// Fraction per accrual period (`0.05` = 5%).
        pub interest_rate: f64,
        pub created_at: DateTime<Utc>,
        pub last_interest_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountListResponse {
        pub accounts: Vec<AccountView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountDetailResponse {
        pub account: AccountView,
        /// Newest first.
        pub transactions: Vec<super::transaction::TransactionView>,
    }
}

pub mod transaction {
    use super::*;

    /// Deposit or withdrawal request.
    ///
    /// `amount` is a decimal string (`"12.34"`); amounts with more than two
    /// decimals are rejected rather than rounded.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementNew {
        pub amount: String,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub kind: TransactionKind,
        pub amount_cents: i64,
        pub balance_after_cents: i64,
        pub timestamp: DateTime<Utc>,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }
}
