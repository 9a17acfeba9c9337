/// Apartments and their aggregate columns
pub mod apartment;
/// Employees
pub mod employee;
/// Flats of one apartment
pub mod flat;
/// Inbound and outbound payments with their payee links
pub mod payment;
/// Tenants, joined with the flat they live in
pub mod tenant;
/// Operator accounts
pub mod user;

/// Salted password hashing
pub mod credentials;

/// Sort and search plumbing shared by the repositories
pub mod query;

/// Form checks and normalization run before every write
pub mod validation;
