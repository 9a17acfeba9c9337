//! Database configuration module for the lettings desk.
//!
//! This module owns the single `SQLite` connection used for the lifetime of the process. It
//! builds the connection URL, opens the connection capped at one pooled handle, creates every
//! table from the entity definitions on first run and seeds the default operator account.
//! The resulting `DatabaseConnection` is handed explicitly to every repository in `core`.

use crate::core::credentials;
use crate::entities::{
    Apartment, Employee, EmployeePayment, Flat, FlatPayment, Login, Payment, Tenant, flat, login,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    Schema, Set,
};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Username of the account created when the login table is empty.
pub const DEFAULT_USERNAME: &str = "admin";
/// Well-known password of the seeded account; operators are told to register their own.
pub const DEFAULT_PASSWORD: &str = "password";

/// Gets the database URL from the `DATABASE_URL` environment variable, or builds one for the
/// configured data file.
///
/// `mode=rwc` lets `SQLite` create the file on first run.
#[must_use]
pub fn database_url(path: &Path) -> String {
    std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}?mode=rwc", path.display()))
}

/// Opens the one connection the desk uses.
///
/// The pool is capped at a single connection so every statement is serialized, and an
/// in-memory URL always sees the same database.
#[instrument]
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Opening database connection");
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    Database::connect(options).await.map_err(Into::into)
}

/// Opens the connection, ensures the schema exists and seeds the default account.
///
/// This is the first-run entry point used by `main`.
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection> {
    let db = connect(database_url).await?;
    create_tables(&db).await?;
    seed_default_user(&db).await?;
    Ok(db)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity
/// definitions.
///
/// Every statement is `IF NOT EXISTS`, so this is safe to run on each start. Foreign keys come
/// from the `belongs_to` relations; none of them cascade, cascades are done by the
/// repositories.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables = [
        schema.create_table_from_entity(Login),
        schema.create_table_from_entity(Employee),
        schema.create_table_from_entity(Payment),
        schema.create_table_from_entity(EmployeePayment),
        schema.create_table_from_entity(Apartment),
        schema.create_table_from_entity(Flat),
        schema.create_table_from_entity(Tenant),
        schema.create_table_from_entity(FlatPayment),
    ];
    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    let flat_number_index = Index::create()
        .if_not_exists()
        .name("idx_flat_apartment_number")
        .table(Flat)
        .col(flat::Column::ApartmentId)
        .col(flat::Column::FlatNumber)
        .unique()
        .to_owned();
    db.execute(builder.build(&flat_number_index)).await?;

    info!("Database tables ensured.");
    Ok(())
}

/// Seeds the default `admin` account when no account exists yet.
///
/// Returns `true` when an account was created.
#[instrument(skip(db))]
pub async fn seed_default_user(db: &DatabaseConnection) -> Result<bool> {
    if Login::find().count(db).await? > 0 {
        debug!("Login table already populated, skipping seed.");
        return Ok(false);
    }

    let account = login::ActiveModel {
        username: Set(DEFAULT_USERNAME.to_string()),
        password_hash: Set(credentials::hash_password(DEFAULT_PASSWORD)),
    };
    Login::insert(account).exec(db).await?;
    info!("Seeded default '{}' account.", DEFAULT_USERNAME);
    Ok(true)
}

/// Closes the connection. Called once at shutdown.
pub async fn close(db: DatabaseConnection) -> Result<()> {
    db.close().await?;
    info!("Database connection closed.");
    Ok(())
}
