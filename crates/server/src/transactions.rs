//! Transactions API endpoints

use api_types::transaction::{MovementNew, TransactionListResponse, TransactionView};
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use engine::MoneyCents;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_kind(kind: engine::TransactionKind) -> api_types::TransactionKind {
    match kind {
        engine::TransactionKind::Deposit => api_types::TransactionKind::Deposit,
        engine::TransactionKind::Withdrawal => api_types::TransactionKind::Withdrawal,
        engine::TransactionKind::Interest => api_types::TransactionKind::Interest,
    }
}

pub(crate) fn map_transaction(tx: &engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        account_id: tx.account_id,
        kind: map_kind(tx.kind),
        amount_cents: tx.amount.cents(),
        balance_after_cents: tx.balance_after.cents(),
        timestamp: tx.timestamp,
        note: tx.note.clone(),
    }
}

/// Handle deposit requests
pub async fn deposit(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MovementNew>,
) -> Result<Json<TransactionView>, ServerError> {
    let amount: MoneyCents = payload.amount.parse()?;
    let tx = state
        .engine
        .deposit(id, amount, Utc::now(), payload.note.as_deref())
        .await?;
    Ok(Json(map_transaction(&tx)))
}

/// Handle withdrawal requests
pub async fn withdraw(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MovementNew>,
) -> Result<Json<TransactionView>, ServerError> {
    let amount: MoneyCents = payload.amount.parse()?;
    let tx = state
        .engine
        .withdraw(id, amount, Utc::now(), payload.note.as_deref())
        .await?;
    Ok(Json(map_transaction(&tx)))
}

/// Transaction history for one account, newest first.
pub async fn list(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let txs = state.engine.transactions(id).await?;
    Ok(Json(TransactionListResponse {
        transactions: txs.iter().map(map_transaction).collect(),
    }))
}
