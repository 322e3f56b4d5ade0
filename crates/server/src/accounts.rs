//! Account API endpoints

use api_types::account::{
    AccountDetailResponse, AccountListResponse, AccountNew, AccountView, RateUpdate,
};
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, transactions};

pub(crate) fn map_account(account: &engine::Account) -> AccountView {
    AccountView {
        id: account.id,
        name: account.name.clone(),
        balance_cents: account.balance.cents(),
        interest_rate: account.interest_rate,
        created_at: account.created_at,
        last_interest_at: account.last_interest_at,
    }
}

/// Handle requests for creating a new account
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<Json<AccountView>, ServerError> {
    if payload.name.trim().is_empty() {
        return Err(ServerError::Generic("account name is required".to_string()));
    }

    let account = state.engine.create_account(&payload.name, Utc::now()).await?;
    Ok(Json(map_account(&account)))
}

/// Handle requests for listing all accounts
pub async fn list(
    State(state): State<ServerState>,
) -> Result<Json<AccountListResponse>, ServerError> {
    let accounts = state.engine.accounts().await?;
    Ok(Json(AccountListResponse {
        accounts: accounts.iter().map(map_account).collect(),
    }))
}

/// Account detail: the account and its transaction history, newest first.
pub async fn detail(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountDetailResponse>, ServerError> {
    let (account, txs) = state.engine.account_with_transactions(id).await?;

    Ok(Json(AccountDetailResponse {
        account: map_account(&account),
        transactions: txs.iter().map(transactions::map_transaction).collect(),
    }))
}

/// Update the interest rate. The payload carries a percentage (`5` = 5%);
/// the stored rate is the fraction.
pub async fn update_rate(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RateUpdate>,
) -> Result<Json<AccountView>, ServerError> {
    let rate = payload.rate_percent / 100.0;
    let account = state.engine.update_interest_rate(id, rate).await?;
    Ok(Json(map_account(&account)))
}
