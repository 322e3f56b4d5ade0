//! The module contains the representation of a child's savings account.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents};

/// A savings account belonging to one child.
///
/// `balance` is a cached fold of the account's transactions in timestamp
/// order; every ledger operation writes the new balance and the transaction
/// that produced it in one database transaction, so the two can never
/// disagree. Accounts are never deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier, generated once and persisted.
    pub id: Uuid,
    pub name: String,
    pub balance: MoneyCents,
    /// Fraction of the balance credited per accrual period (`0.05` = 5%).
    pub interest_rate: f64,
    pub created_at: DateTime<Utc>,
    /// Anchor instant of the last accrual period that produced interest.
    ///
    /// `None` until the first interest transaction; a period whose interest
    /// rounds to zero cents does not move it.
    pub last_interest_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            balance: MoneyCents::ZERO,
            interest_rate: 0.0,
            created_at,
            last_interest_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub balance: i64,
    pub interest_rate: f64,
    pub created_at: DateTimeUtc,
    pub last_interest_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            name: ActiveValue::Set(account.name.clone()),
            balance: ActiveValue::Set(account.balance.cents()),
            interest_rate: ActiveValue::Set(account.interest_rate),
            created_at: ActiveValue::Set(account.created_at),
            last_interest_at: ActiveValue::Set(account.last_interest_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::AccountNotFound(model.id.clone()))?,
            name: model.name,
            balance: MoneyCents::new(model.balance),
            interest_rate: model.interest_rate,
            created_at: model.created_at,
            last_interest_at: model.last_interest_at,
        })
    }
}
