//! Typed per-entity data access.
//!
//! The wire surface stays generic for UI compatibility, but host-internal
//! code and tests go through these repositories: a closed, reviewable set of
//! operations with typed arguments instead of an open query channel.

use rusqlite::OptionalExtension;

use crate::error::{CobroError, Result};
use crate::storage::store::Store;
use crate::storage::types::{
    date_from_sql, timestamp_from_sql, BankAccount, Client, Invoice, InvoiceItem, InvoicePayment,
    InvoiceStatus, InvoiceSummary, NewBankAccount, NewClient, NewInvoice, NewInvoiceItem,
    NewInvoicePayment, Profile, ProfileUpdate,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

impl Store {
    pub fn profile(&self) -> ProfileRepo<'_> {
        ProfileRepo { store: self }
    }

    pub fn clients(&self) -> ClientRepo<'_> {
        ClientRepo { store: self }
    }

    pub fn bank_accounts(&self) -> BankAccountRepo<'_> {
        BankAccountRepo { store: self }
    }

    pub fn invoices(&self) -> InvoiceRepo<'_> {
        InvoiceRepo { store: self }
    }
}

/// The singleton profile row. Always present after schema setup; never
/// created or deleted through this interface.
pub struct ProfileRepo<'a> {
    store: &'a Store,
}

impl ProfileRepo<'_> {
    pub fn get(&self) -> Result<Profile> {
        let conn = self.store.lock()?;
        let row = conn
            .query_row(
                "SELECT id, name, document_id, address, phone, email, bank_info, signature_path
                 FROM profile WHERE id = 1",
                [],
                |row| {
                    Ok(Profile {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        document_id: row.get(2)?,
                        address: row.get(3)?,
                        phone: row.get(4)?,
                        email: row.get(5)?,
                        bank_info: row.get(6)?,
                        signature_path: row.get(7)?,
                    })
                },
            )
            .optional()?;
        row.ok_or_else(|| CobroError::Storage("singleton profile row is missing".into()))
    }

    pub fn update(&self, update: &ProfileUpdate) -> Result<()> {
        let conn = self.store.lock()?;
        conn.execute(
            "UPDATE profile
             SET name = ?, document_id = ?, address = ?, phone = ?, email = ?,
                 bank_info = ?, signature_path = ?
             WHERE id = 1",
            (
                &update.name,
                &update.document_id,
                &update.address,
                &update.phone,
                &update.email,
                &update.bank_info,
                &update.signature_path,
            ),
        )?;
        Ok(())
    }
}

pub struct ClientRepo<'a> {
    store: &'a Store,
}

impl ClientRepo<'_> {
    pub fn create(&self, new: &NewClient) -> Result<i64> {
        let conn = self.store.lock()?;
        conn.execute(
            "INSERT INTO clients (name, document_id, address, city, phone, email)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                &new.name,
                &new.document_id,
                &new.address,
                &new.city,
                &new.phone,
                &new.email,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<Client>> {
        let conn = self.store.lock()?;
        let raw = conn
            .query_row(
                "SELECT id, name, document_id, address, city, phone, email, created_at
                 FROM clients WHERE id = ?",
                [id],
                client_columns,
            )
            .optional()?;
        raw.map(client_from_raw).transpose()
    }

    pub fn list(&self) -> Result<Vec<Client>> {
        let conn = self.store.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, document_id, address, city, phone, email, created_at
             FROM clients ORDER BY name COLLATE NOCASE",
        )?;
        let rows = stmt.query_map([], client_columns)?;
        let mut clients = Vec::new();
        for raw in rows {
            clients.push(client_from_raw(raw?)?);
        }
        Ok(clients)
    }

    pub fn update(&self, id: i64, new: &NewClient) -> Result<bool> {
        let conn = self.store.lock()?;
        let changed = conn.execute(
            "UPDATE clients
             SET name = ?, document_id = ?, address = ?, city = ?, phone = ?, email = ?
             WHERE id = ?",
            (
                &new.name,
                &new.document_id,
                &new.address,
                &new.city,
                &new.phone,
                &new.email,
                id,
            ),
        )?;
        Ok(changed > 0)
    }

    /// Delete a client. Rejected by the engine while invoices still
    /// reference it.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.store.lock()?;
        let changed = conn.execute("DELETE FROM clients WHERE id = ?", [id])?;
        Ok(changed > 0)
    }
}

pub struct BankAccountRepo<'a> {
    store: &'a Store,
}

impl BankAccountRepo<'_> {
    pub fn create(&self, new: &NewBankAccount) -> Result<i64> {
        let conn = self.store.lock()?;
        conn.execute(
            "INSERT INTO bank_accounts (bank, account_type, account_number, is_default)
             VALUES (?, ?, ?, ?)",
            (
                &new.bank,
                &new.account_type,
                &new.account_number,
                new.is_default as i64,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<BankAccount>> {
        let conn = self.store.lock()?;
        let raw = conn
            .query_row(
                "SELECT id, bank, account_type, account_number, is_default, created_at
                 FROM bank_accounts WHERE id = ?",
                [id],
                bank_account_columns,
            )
            .optional()?;
        raw.map(bank_account_from_raw).transpose()
    }

    pub fn list(&self) -> Result<Vec<BankAccount>> {
        let conn = self.store.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, bank, account_type, account_number, is_default, created_at
             FROM bank_accounts ORDER BY is_default DESC, bank COLLATE NOCASE",
        )?;
        let rows = stmt.query_map([], bank_account_columns)?;
        let mut accounts = Vec::new();
        for raw in rows {
            accounts.push(bank_account_from_raw(raw?)?);
        }
        Ok(accounts)
    }

    pub fn update(&self, id: i64, new: &NewBankAccount) -> Result<bool> {
        let conn = self.store.lock()?;
        let changed = conn.execute(
            "UPDATE bank_accounts
             SET bank = ?, account_type = ?, account_number = ?, is_default = ?
             WHERE id = ?",
            (
                &new.bank,
                &new.account_type,
                &new.account_number,
                new.is_default as i64,
                id,
            ),
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.store.lock()?;
        let changed = conn.execute("DELETE FROM bank_accounts WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    /// Mark one account as the default, clearing the previous one.
    pub fn set_default(&self, id: i64) -> Result<()> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        tx.execute("UPDATE bank_accounts SET is_default = 0 WHERE is_default = 1", [])?;
        let changed = tx.execute("UPDATE bank_accounts SET is_default = 1 WHERE id = ?", [id])?;
        if changed == 0 {
            return Err(CobroError::InvalidInput(format!(
                "no bank account with id {}",
                id
            )));
        }
        tx.commit()?;
        Ok(())
    }
}

pub struct InvoiceRepo<'a> {
    store: &'a Store,
}

impl InvoiceRepo<'_> {
    pub fn create(&self, new: &NewInvoice) -> Result<i64> {
        let conn = self.store.lock()?;
        conn.execute(
            "INSERT INTO invoices (number, date, client_id, bank_account_id, total, notes, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                new.number,
                new.date.format(DATE_FORMAT).to_string(),
                new.client_id,
                new.bank_account_id,
                new.total,
                &new.notes,
                new.status.as_str(),
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<Invoice>> {
        let conn = self.store.lock()?;
        let raw = conn
            .query_row(
                "SELECT id, number, date, client_id, bank_account_id, total, notes, status, created_at
                 FROM invoices WHERE id = ?",
                [id],
                invoice_columns,
            )
            .optional()?;
        raw.map(invoice_from_raw).transpose()
    }

    pub fn list(&self) -> Result<Vec<Invoice>> {
        let conn = self.store.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, number, date, client_id, bank_account_id, total, notes, status, created_at
             FROM invoices ORDER BY date DESC, number DESC",
        )?;
        let rows = stmt.query_map([], invoice_columns)?;
        let mut invoices = Vec::new();
        for raw in rows {
            invoices.push(invoice_from_raw(raw?)?);
        }
        Ok(invoices)
    }

    /// The joined listing the UI renders: each invoice with its client's
    /// name, the sum of recorded payments, and the outstanding balance.
    pub fn list_summaries(&self) -> Result<Vec<InvoiceSummary>> {
        let conn = self.store.lock()?;
        let mut stmt = conn.prepare(
            "SELECT i.id, i.number, i.date, i.client_id, i.bank_account_id, i.total, i.notes,
                    i.status, i.created_at, c.name,
                    COALESCE((SELECT SUM(p.amount) FROM invoice_payments p
                              WHERE p.invoice_id = i.id), 0)
             FROM invoices i
             JOIN clients c ON c.id = i.client_id
             ORDER BY i.date DESC, i.number DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((invoice_columns(row)?, row.get::<_, String>(9)?, row.get::<_, f64>(10)?))
        })?;
        let mut summaries = Vec::new();
        for raw in rows {
            let (invoice_raw, client_name, paid_amount) = raw?;
            let invoice = invoice_from_raw(invoice_raw)?;
            let balance = invoice.total - paid_amount;
            summaries.push(InvoiceSummary {
                invoice,
                client_name,
                paid_amount,
                balance,
            });
        }
        Ok(summaries)
    }

    pub fn update(&self, id: i64, new: &NewInvoice) -> Result<bool> {
        let conn = self.store.lock()?;
        let changed = conn.execute(
            "UPDATE invoices
             SET number = ?, date = ?, client_id = ?, bank_account_id = ?, total = ?,
                 notes = ?, status = ?
             WHERE id = ?",
            (
                new.number,
                new.date.format(DATE_FORMAT).to_string(),
                new.client_id,
                new.bank_account_id,
                new.total,
                &new.notes,
                new.status.as_str(),
                id,
            ),
        )?;
        Ok(changed > 0)
    }

    pub fn set_status(&self, id: i64, status: InvoiceStatus) -> Result<bool> {
        let conn = self.store.lock()?;
        let changed = conn.execute(
            "UPDATE invoices SET status = ? WHERE id = ?",
            (status.as_str(), id),
        )?;
        Ok(changed > 0)
    }

    /// Delete an invoice; its items and payments cascade with it.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.store.lock()?;
        let changed = conn.execute("DELETE FROM invoices WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    pub fn add_item(&self, invoice_id: i64, item: &NewInvoiceItem) -> Result<i64> {
        let conn = self.store.lock()?;
        conn.execute(
            "INSERT INTO invoice_items (invoice_id, description, quantity, price)
             VALUES (?, ?, ?, ?)",
            (invoice_id, &item.description, item.quantity, item.price),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn items(&self, invoice_id: i64) -> Result<Vec<InvoiceItem>> {
        let conn = self.store.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, invoice_id, description, quantity, price
             FROM invoice_items WHERE invoice_id = ? ORDER BY id",
        )?;
        let rows = stmt.query_map([invoice_id], |row| {
            Ok(InvoiceItem {
                id: row.get(0)?,
                invoice_id: row.get(1)?,
                description: row.get(2)?,
                quantity: row.get(3)?,
                price: row.get(4)?,
            })
        })?;
        let mut items = Vec::new();
        for item in rows {
            items.push(item?);
        }
        Ok(items)
    }

    pub fn delete_item(&self, item_id: i64) -> Result<bool> {
        let conn = self.store.lock()?;
        let changed = conn.execute("DELETE FROM invoice_items WHERE id = ?", [item_id])?;
        Ok(changed > 0)
    }

    pub fn add_payment(&self, invoice_id: i64, payment: &NewInvoicePayment) -> Result<i64> {
        let conn = self.store.lock()?;
        conn.execute(
            "INSERT INTO invoice_payments (invoice_id, date, amount, notes)
             VALUES (?, ?, ?, ?)",
            (
                invoice_id,
                payment.date.format(DATE_FORMAT).to_string(),
                payment.amount,
                &payment.notes,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn payments(&self, invoice_id: i64) -> Result<Vec<InvoicePayment>> {
        let conn = self.store.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, invoice_id, date, amount, notes, created_at
             FROM invoice_payments WHERE invoice_id = ? ORDER BY date, id",
        )?;
        let rows = stmt.query_map([invoice_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut payments = Vec::new();
        for raw in rows {
            let (id, invoice_id, date, amount, notes, created_at) = raw?;
            payments.push(InvoicePayment {
                id,
                invoice_id,
                date: date_from_sql(&date)?,
                amount,
                notes,
                created_at: timestamp_from_sql(&created_at)?,
            });
        }
        Ok(payments)
    }

    pub fn delete_payment(&self, payment_id: i64) -> Result<bool> {
        let conn = self.store.lock()?;
        let changed = conn.execute("DELETE FROM invoice_payments WHERE id = ?", [payment_id])?;
        Ok(changed > 0)
    }

    /// Sum of recorded payments. Callers combine this with the invoice total
    /// to keep `status` consistent (see `effective_status`).
    pub fn paid_total(&self, invoice_id: i64) -> Result<f64> {
        let conn = self.store.lock()?;
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM invoice_payments WHERE invoice_id = ?",
            [invoice_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}

type ClientRaw = (
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn client_columns(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClientRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn client_from_raw(raw: ClientRaw) -> Result<Client> {
    let (id, name, document_id, address, city, phone, email, created_at) = raw;
    Ok(Client {
        id,
        name,
        document_id,
        address,
        city,
        phone,
        email,
        created_at: timestamp_from_sql(&created_at)?,
    })
}

type BankAccountRaw = (i64, String, String, String, i64, String);

fn bank_account_columns(row: &rusqlite::Row<'_>) -> rusqlite::Result<BankAccountRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn bank_account_from_raw(raw: BankAccountRaw) -> Result<BankAccount> {
    let (id, bank, account_type, account_number, is_default, created_at) = raw;
    Ok(BankAccount {
        id,
        bank,
        account_type,
        account_number,
        is_default: is_default != 0,
        created_at: timestamp_from_sql(&created_at)?,
    })
}

type InvoiceRaw = (
    i64,
    i64,
    String,
    i64,
    Option<i64>,
    f64,
    Option<String>,
    String,
    String,
);

fn invoice_columns(row: &rusqlite::Row<'_>) -> rusqlite::Result<InvoiceRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn invoice_from_raw(raw: InvoiceRaw) -> Result<Invoice> {
    let (id, number, date, client_id, bank_account_id, total, notes, status, created_at) = raw;
    Ok(Invoice {
        id,
        number,
        date: date_from_sql(&date)?,
        client_id,
        bank_account_id,
        total,
        notes,
        status: InvoiceStatus::parse(&status)?,
        created_at: timestamp_from_sql(&created_at)?,
    })
}
