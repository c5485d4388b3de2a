use chrono::NaiveDate;

use cobro_core::storage::{
    effective_status, InvoiceStatus, NewBankAccount, NewClient, NewInvoice, NewInvoiceItem,
    NewInvoicePayment, ProfileUpdate,
};
use cobro_core::Store;

fn store() -> Store {
    Store::open_in_memory().expect("in-memory store should open")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn sample_invoice(client_id: i64) -> NewInvoice {
    NewInvoice {
        number: 1001,
        date: date(2024, 3, 15),
        client_id,
        bank_account_id: None,
        total: 500.0,
        notes: Some("March retainer".into()),
        status: InvoiceStatus::Draft,
    }
}

#[test]
fn test_profile_is_seeded_and_updatable() {
    let store = store();

    let profile = store.profile().get().expect("profile should exist");
    assert_eq!(profile.id, 1);
    assert_eq!(profile.name.as_deref(), Some("Mi Nombre"));
    assert!(profile.email.is_none());

    store
        .profile()
        .update(&ProfileUpdate {
            name: Some("Ana Pérez".into()),
            email: Some("ana@example.test".into()),
            ..ProfileUpdate::default()
        })
        .expect("update should succeed");

    let profile = store.profile().get().unwrap();
    assert_eq!(profile.name.as_deref(), Some("Ana Pérez"));
    assert_eq!(profile.email.as_deref(), Some("ana@example.test"));
    // Fields absent from the update are cleared, not preserved.
    assert!(profile.bank_info.is_none());
}

#[test]
fn test_client_crud_round_trip() {
    let store = store();
    let clients = store.clients();

    let id = clients.create(&NewClient::named("Acme Ltd")).unwrap();
    let fetched = clients.get(id).unwrap().expect("client should exist");
    assert_eq!(fetched.name, "Acme Ltd");
    assert!(fetched.city.is_none());

    let mut update = NewClient::named("Acme Ltd");
    update.city = Some("Bogotá".into());
    update.email = Some("billing@acme.test".into());
    assert!(clients.update(id, &update).unwrap());

    let fetched = clients.get(id).unwrap().unwrap();
    assert_eq!(fetched.city.as_deref(), Some("Bogotá"));

    assert!(clients.delete(id).unwrap());
    assert!(clients.get(id).unwrap().is_none());
    assert!(!clients.delete(id).unwrap());
}

#[test]
fn test_client_listing_orders_by_name() {
    let store = store();
    let clients = store.clients();
    clients.create(&NewClient::named("zeta logistics")).unwrap();
    clients.create(&NewClient::named("Acme Ltd")).unwrap();
    clients.create(&NewClient::named("Midtown Cafe")).unwrap();

    let names: Vec<String> = clients
        .list()
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Acme Ltd", "Midtown Cafe", "zeta logistics"]);
}

#[test]
fn test_invoice_lifecycle_with_items_and_payments() {
    let store = store();
    let client_id = store.clients().create(&NewClient::named("Acme Ltd")).unwrap();
    let invoices = store.invoices();

    let invoice_id = invoices.create(&sample_invoice(client_id)).unwrap();
    let invoice = invoices.get(invoice_id).unwrap().expect("invoice exists");
    assert_eq!(invoice.number, 1001);
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.date, date(2024, 3, 15));

    let item_id = invoices
        .add_item(
            invoice_id,
            &NewInvoiceItem {
                description: "Consulting".into(),
                quantity: 10.0,
                price: 50.0,
            },
        )
        .unwrap();
    let items = invoices.items(invoice_id).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].line_total(), 500.0);

    invoices
        .add_payment(
            invoice_id,
            &NewInvoicePayment {
                date: date(2024, 4, 1),
                amount: 200.0,
                notes: Some("first installment".into()),
            },
        )
        .unwrap();
    let paid = invoices.paid_total(invoice_id).unwrap();
    assert_eq!(paid, 200.0);
    assert_eq!(
        effective_status(invoice.total, paid),
        InvoiceStatus::PartiallyPaid
    );
    invoices
        .set_status(invoice_id, InvoiceStatus::PartiallyPaid)
        .unwrap();

    invoices
        .add_payment(
            invoice_id,
            &NewInvoicePayment {
                date: date(2024, 5, 1),
                amount: 300.0,
                notes: None,
            },
        )
        .unwrap();
    let paid = invoices.paid_total(invoice_id).unwrap();
    assert_eq!(effective_status(invoice.total, paid), InvoiceStatus::Paid);

    let payments = invoices.payments(invoice_id).unwrap();
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0].date, date(2024, 4, 1));

    assert!(invoices.delete_item(item_id).unwrap());
    assert!(invoices.items(invoice_id).unwrap().is_empty());
}

#[test]
fn test_deleting_invoice_cascades_to_items_and_payments() {
    let store = store();
    let client_id = store.clients().create(&NewClient::named("Acme Ltd")).unwrap();
    let invoices = store.invoices();
    let invoice_id = invoices.create(&sample_invoice(client_id)).unwrap();
    invoices
        .add_item(
            invoice_id,
            &NewInvoiceItem {
                description: "Consulting".into(),
                quantity: 1.0,
                price: 500.0,
            },
        )
        .unwrap();
    invoices
        .add_payment(
            invoice_id,
            &NewInvoicePayment {
                date: date(2024, 4, 1),
                amount: 500.0,
                notes: None,
            },
        )
        .unwrap();

    assert!(invoices.delete(invoice_id).unwrap());

    assert!(invoices.get(invoice_id).unwrap().is_none());
    assert!(invoices.items(invoice_id).unwrap().is_empty());
    assert!(invoices.payments(invoice_id).unwrap().is_empty());
    // The client survives its invoices.
    assert!(store.clients().get(client_id).unwrap().is_some());
}

#[test]
fn test_deleting_referenced_client_is_rejected() {
    let store = store();
    let client_id = store.clients().create(&NewClient::named("Acme Ltd")).unwrap();
    store.invoices().create(&sample_invoice(client_id)).unwrap();

    let err = store
        .clients()
        .delete(client_id)
        .expect_err("client with invoices must not be deletable");
    assert!(err.to_string().contains("FOREIGN KEY constraint failed"));
    assert!(store.clients().get(client_id).unwrap().is_some());
}

#[test]
fn test_bank_account_default_is_exclusive() {
    let store = store();
    let accounts = store.bank_accounts();

    let first = accounts
        .create(&NewBankAccount {
            bank: "Banco Uno".into(),
            account_type: "checking".into(),
            account_number: "001-123".into(),
            is_default: true,
        })
        .unwrap();
    let second = accounts
        .create(&NewBankAccount {
            bank: "Banco Dos".into(),
            account_type: "savings".into(),
            account_number: "002-456".into(),
            is_default: false,
        })
        .unwrap();

    accounts.set_default(second).unwrap();

    assert!(!accounts.get(first).unwrap().unwrap().is_default);
    assert!(accounts.get(second).unwrap().unwrap().is_default);
    // The default account lists first.
    assert_eq!(accounts.list().unwrap()[0].id, second);

    let err = accounts
        .set_default(9999)
        .expect_err("unknown account cannot become default");
    assert!(err.to_string().contains("9999"));
}

#[test]
fn test_invoice_summaries_carry_derived_fields() {
    let store = store();
    let acme = store.clients().create(&NewClient::named("Acme Ltd")).unwrap();
    let cafe = store.clients().create(&NewClient::named("Midtown Cafe")).unwrap();
    let invoices = store.invoices();

    let paid_one = invoices.create(&sample_invoice(acme)).unwrap();
    invoices
        .add_payment(
            paid_one,
            &NewInvoicePayment {
                date: date(2024, 4, 1),
                amount: 150.0,
                notes: None,
            },
        )
        .unwrap();

    let mut newer = sample_invoice(cafe);
    newer.number = 1002;
    newer.date = date(2024, 6, 1);
    newer.total = 80.0;
    invoices.create(&newer).unwrap();

    let summaries = invoices.list_summaries().unwrap();
    assert_eq!(summaries.len(), 2);

    // Newest first.
    assert_eq!(summaries[0].invoice.number, 1002);
    assert_eq!(summaries[0].client_name, "Midtown Cafe");
    assert_eq!(summaries[0].paid_amount, 0.0);
    assert_eq!(summaries[0].balance, 80.0);

    assert_eq!(summaries[1].client_name, "Acme Ltd");
    assert_eq!(summaries[1].paid_amount, 150.0);
    assert_eq!(summaries[1].balance, 350.0);
}

#[test]
fn test_store_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.sqlite");

    let store = Store::open(&path).unwrap();
    let client_id = store.clients().create(&NewClient::named("Acme Ltd")).unwrap();
    store.close().unwrap();

    let store = Store::open(&path).unwrap();
    let client = store.clients().get(client_id).unwrap().expect("persisted");
    assert_eq!(client.name, "Acme Ltd");
}
