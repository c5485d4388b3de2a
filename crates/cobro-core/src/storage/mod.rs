//! Store handle, typed rows, and per-entity repositories.

pub mod repository;
pub mod store;
pub mod types;

pub use repository::{BankAccountRepo, ClientRepo, InvoiceRepo, ProfileRepo};
pub use store::{MutationOutcome, Row, Scalar, Store};
pub use types::{
    effective_status, BankAccount, Client, Invoice, InvoiceItem, InvoicePayment, InvoiceStatus,
    InvoiceSummary, NewBankAccount, NewClient, NewInvoice, NewInvoiceItem, NewInvoicePayment,
    Profile, ProfileUpdate,
};
