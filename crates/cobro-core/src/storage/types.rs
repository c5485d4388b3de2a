//! Typed rows for the six persisted entities.
//!
//! Field sets mirror the store's columns exactly; anything the UI derives
//! (line totals, paid amounts, effective status) is computed here, never
//! stored.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CobroError, Result};

/// Half a cent: the comparison tolerance for DECIMAL(10, 2) money values.
const MONEY_EPSILON: f64 = 0.005;

/// Lifecycle status of an invoice. The store never recomputes it; callers
/// keep it consistent with recorded payments (see [`effective_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Paid,
    PartiallyPaid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "draft" => Ok(InvoiceStatus::Draft),
            "paid" => Ok(InvoiceStatus::Paid),
            "partially_paid" => Ok(InvoiceStatus::PartiallyPaid),
            other => Err(CobroError::Storage(format!(
                "unknown invoice status: {}",
                other
            ))),
        }
    }
}

/// Status implied by the recorded payments against an invoice total.
pub fn effective_status(total: f64, paid: f64) -> InvoiceStatus {
    if paid <= MONEY_EPSILON {
        InvoiceStatus::Draft
    } else if paid + MONEY_EPSILON >= total {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::PartiallyPaid
    }
}

/// The invoicing party's own identity data. Exactly one row, id fixed at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: Option<String>,
    pub document_id: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub bank_info: Option<String>,
    pub signature_path: Option<String>,
}

/// Mutable fields of the singleton profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub document_id: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub bank_info: Option<String>,
    pub signature_path: Option<String>,
}

/// A business contact billed on invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub document_id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    pub document_id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl NewClient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A billing document owning items and payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub number: i64,
    pub date: NaiveDate,
    pub client_id: i64,
    pub bank_account_id: Option<i64>,
    pub total: f64,
    pub notes: Option<String>,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub number: i64,
    pub date: NaiveDate,
    pub client_id: i64,
    pub bank_account_id: Option<i64>,
    pub total: f64,
    pub notes: Option<String>,
    pub status: InvoiceStatus,
}

/// An invoice joined with the derived fields the UI lists: the client's name,
/// the paid amount, and the outstanding balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSummary {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub client_name: String,
    pub paid_amount: f64,
    pub balance: f64,
}

/// One billable line of an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub description: String,
    pub quantity: f64,
    pub price: f64,
}

impl InvoiceItem {
    /// Contribution to the invoice total. Computed, not stored.
    pub fn line_total(&self) -> f64 {
        self.quantity * self.price
    }
}

#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: f64,
    pub price: f64,
}

/// One recorded payment against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePayment {
    pub id: i64,
    pub invoice_id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInvoicePayment {
    pub date: NaiveDate,
    pub amount: f64,
    pub notes: Option<String>,
}

/// A payment destination, optionally referenced by invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: i64,
    pub bank: String,
    pub account_type: String,
    pub account_number: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBankAccount {
    pub bank: String,
    pub account_type: String,
    pub account_number: String,
    pub is_default: bool,
}

/// Parse a timestamp as written by SQLite's `CURRENT_TIMESTAMP`
/// (`YYYY-MM-DD HH:MM:SS`), tolerating RFC 3339 on read.
pub(crate) fn timestamp_from_sql(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CobroError::Storage(format!("invalid timestamp {:?}: {}", value, e)))
}

/// Parse a `DATE` column value (`YYYY-MM-DD`).
pub(crate) fn date_from_sql(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| CobroError::Storage(format!("invalid date {:?}: {}", value, e)))
}
