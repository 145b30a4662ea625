use axum::Json;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use remitdesk_core::UserIdentity;
use remitdesk_domain::{CurrencyCode, NewTransaction};

use crate::dto::{CreateTransactionRequest, ListTransactionsQuery, TransactionResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_transactions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult<Json<Vec<TransactionResponse>>> {
    let transactions = state
        .transaction_service
        .list_transactions(&user, query.limit)
        .await?
        .into_iter()
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(transactions))
}

pub async fn create_transaction_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateTransactionRequest>,
) -> ApiResult<(StatusCode, Json<TransactionResponse>)> {
    let input = NewTransaction::new(
        payload.amount_minor,
        CurrencyCode::new(payload.currency)?,
        payload.branch_code,
        payload.note,
    )?;
    let transaction = state
        .transaction_service
        .create_transaction(&user, input)
        .await?;

    Ok((StatusCode::CREATED, Json(TransactionResponse::from(transaction))))
}
