//! Shared test utilities for the lettings desk.
//!
//! This module provides helpers for setting up schema-initialized in-memory databases and
//! creating records with sensible defaults.

use crate::{
    config::database,
    core::{
        apartment, employee, flat,
        payment::{self, PaymentRecord, PaymentType},
        tenant,
    },
    entities::{ApartmentModel, EmployeeModel, FlatModel, TenantModel},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The default `admin` account is not seeded; tests that need it call
/// [`database::seed_default_user`] themselves.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = database::connect("sqlite::memory:").await?;
    database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output through the test harness so `--nocapture` shows it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lettings_desk=debug")
        .with_test_writer()
        .try_init();
}

/// Creates an apartment with postcode `AB1 2CD` and no description.
pub async fn create_test_apartment(
    db: &DatabaseConnection,
    apartment_id: &str,
    address: &str,
) -> Result<ApartmentModel> {
    apartment::add(
        db,
        ApartmentModel {
            apartment_id: apartment_id.to_string(),
            address: address.to_string(),
            postcode: "AB1 2CD".to_string(),
            description: None,
        },
    )
    .await
}

/// Creates a flat in an existing apartment.
pub async fn create_test_flat(
    db: &DatabaseConnection,
    flat_id: &str,
    apartment_id: &str,
    flat_number: i64,
    weekly_rent: f64,
) -> Result<FlatModel> {
    flat::add(
        db,
        FlatModel {
            flat_id: flat_id.to_string(),
            apartment_id: apartment_id.to_string(),
            flat_number,
            weekly_rent,
            description: None,
        },
    )
    .await
}

/// Creates a tenant, housed in `flat_id` when given.
///
/// # Defaults
/// * contact: `07700 900123`
pub async fn create_test_tenant(
    db: &DatabaseConnection,
    tenant_id: &str,
    forename: &str,
    surname: &str,
    flat_id: Option<&str>,
) -> Result<TenantModel> {
    tenant::add(
        db,
        TenantModel {
            tenant_id: tenant_id.to_string(),
            flat_id: flat_id.map(ToString::to_string),
            forename: forename.to_string(),
            surname: surname.to_string(),
            contact: "07700 900123".to_string(),
            description: None,
        },
    )
    .await
}

/// Creates an employee.
///
/// # Defaults
/// * contact: `07700 900456`
/// * address: `9 Depot Road`, postcode `ZX9 8YW`
pub async fn create_test_employee(
    db: &DatabaseConnection,
    employee_id: &str,
    forename: &str,
    surname: &str,
) -> Result<EmployeeModel> {
    employee::add(
        db,
        EmployeeModel {
            employee_id: employee_id.to_string(),
            forename: forename.to_string(),
            surname: surname.to_string(),
            contact: "07700 900456".to_string(),
            address: "9 Depot Road".to_string(),
            postcode: "ZX9 8YW".to_string(),
            description: None,
        },
    )
    .await
}

/// Records a payment at noon on `date`, paid by card.
pub async fn create_test_payment(
    db: &DatabaseConnection,
    payment_type: PaymentType,
    payee_id: &str,
    amount: f64,
    date: &str,
) -> Result<i64> {
    payment::add(
        db,
        PaymentRecord {
            payment_type,
            payee_id: payee_id.to_string(),
            method: "Card".to_string(),
            total_paid: amount,
            date: date.to_string(),
            time: "12:00".to_string(),
            description: None,
        },
    )
    .await
}
