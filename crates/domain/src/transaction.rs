//! Tenant ledger entries.

use chrono::{DateTime, Utc};
use remitdesk_core::{AppError, AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a random transaction identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a transaction identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Three-letter ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Creates a validated currency code, normalizing to upper case.
    pub fn new(value: impl AsRef<str>) -> AppResult<Self> {
        let normalized = value.as_ref().trim().to_ascii_uppercase();
        if normalized.len() != 3 || !normalized.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Err(AppError::Validation(format!(
                "currency code '{}' must be three letters",
                value.as_ref()
            )));
        }

        Ok(Self(normalized))
    }

    /// Returns the code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Validated input for a new ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    amount_minor: i64,
    currency: CurrencyCode,
    branch_code: Option<NonEmptyString>,
    note: Option<String>,
}

impl NewTransaction {
    /// Validates a new ledger entry. Amounts are in minor currency units.
    pub fn new(
        amount_minor: i64,
        currency: CurrencyCode,
        branch_code: Option<String>,
        note: Option<String>,
    ) -> AppResult<Self> {
        if amount_minor <= 0 {
            return Err(AppError::Validation(
                "transaction amount must be positive".to_owned(),
            ));
        }

        let branch_code = branch_code.map(NonEmptyString::new).transpose()?;
        let note = note.filter(|value| !value.trim().is_empty());

        Ok(Self {
            amount_minor,
            currency,
            branch_code,
            note,
        })
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    /// Returns the currency.
    #[must_use]
    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Returns the branch that booked the entry.
    #[must_use]
    pub fn branch_code(&self) -> Option<&str> {
        self.branch_code.as_ref().map(NonEmptyString::as_str)
    }

    /// Returns the free-form note.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

/// Persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
    /// Entry identifier.
    pub id: TransactionId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Amount in minor units.
    pub amount_minor: i64,
    /// Currency.
    pub currency: CurrencyCode,
    /// Booking branch.
    pub branch_code: Option<String>,
    /// Free-form note.
    pub note: Option<String>,
    /// Subject that booked the entry.
    pub created_by: String,
    /// Booking time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::{CurrencyCode, NewTransaction};

    #[test]
    fn currency_code_is_normalized() {
        let code = CurrencyCode::new(" usd ");
        assert_eq!(code.ok().map(|code| code.as_str().to_owned()), Some("USD".to_owned()));
    }

    #[test]
    fn currency_code_rejects_non_letters() {
        assert!(CurrencyCode::new("U5D").is_err());
        assert!(CurrencyCode::new("EURO").is_err());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let currency = CurrencyCode::new("EUR").unwrap_or_else(|_| unreachable!());
        assert!(NewTransaction::new(0, currency, None, None).is_err());
    }

    #[test]
    fn blank_note_is_dropped() {
        let currency = CurrencyCode::new("EUR").unwrap_or_else(|_| unreachable!());
        let transaction = NewTransaction::new(100, currency, Some("BR-01".to_owned()), Some(" ".to_owned()));
        assert!(transaction.is_ok());
        let transaction = transaction.unwrap_or_else(|_| unreachable!());
        assert_eq!(transaction.note(), None);
        assert_eq!(transaction.branch_code(), Some("BR-01"));
    }
}
