use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use remitdesk_core::{AppError, UserIdentity};
use remitdesk_domain::{CurrencyCode, NewTransaction};

use crate::dto::{CreatePaymentRequest, PaymentResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Initiates an outbound payment by booking it in the tenant ledger.
pub async fn create_payment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<PaymentResponse>)> {
    let beneficiary_reference = payload.beneficiary_reference.trim().to_owned();
    if beneficiary_reference.is_empty() {
        return Err(
            AppError::Validation("beneficiary_reference must not be empty".to_owned()).into(),
        );
    }

    let input = NewTransaction::new(
        payload.amount_minor,
        CurrencyCode::new(payload.currency)?,
        payload.branch_code,
        Some(format!("payment to {beneficiary_reference}")),
    )?;
    let transaction = state
        .transaction_service
        .create_transaction(&user, input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            id: transaction.id.as_uuid().to_string(),
            status: "initiated",
            amount_minor: transaction.amount_minor,
            currency: transaction.currency.as_str().to_owned(),
            beneficiary_reference,
        }),
    ))
}
