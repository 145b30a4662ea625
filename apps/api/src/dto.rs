use remitdesk_domain::LedgerTransaction;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for a ledger entry.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-transaction-request.ts"
)]
pub struct CreateTransactionRequest {
    #[ts(type = "number")]
    pub amount_minor: i64,
    pub currency: String,
    pub branch_code: Option<String>,
    pub note: Option<String>,
}

/// Listing query for ledger entries.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub limit: Option<usize>,
}

/// API representation of a ledger entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/transaction-response.ts"
)]
pub struct TransactionResponse {
    pub id: String,
    #[ts(type = "number")]
    pub amount_minor: i64,
    pub currency: String,
    pub branch_code: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

impl From<LedgerTransaction> for TransactionResponse {
    fn from(value: LedgerTransaction) -> Self {
        Self {
            id: value.id.as_uuid().to_string(),
            amount_minor: value.amount_minor,
            currency: value.currency.as_str().to_owned(),
            branch_code: value.branch_code,
            note: value.note,
            created_by: value.created_by,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Incoming payload for a payment initiation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-payment-request.ts"
)]
pub struct CreatePaymentRequest {
    #[ts(type = "number")]
    pub amount_minor: i64,
    pub currency: String,
    pub beneficiary_reference: String,
    pub branch_code: Option<String>,
}

/// Accepted payment.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/payment-response.ts"
)]
pub struct PaymentResponse {
    pub id: String,
    pub status: &'static str,
    #[ts(type = "number")]
    pub amount_minor: i64,
    pub currency: String,
    pub beneficiary_reference: String,
}
