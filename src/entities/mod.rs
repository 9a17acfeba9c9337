//! Entity module - Contains all SeaORM entity definitions for the database.
//! Table and column names keep the layout of the existing data files
//! (`ApartmentTbl`, `FlatApartmentTbl`, ...), so the models map them explicitly.

/// `ApartmentTbl`
pub mod apartment;
/// `EmployeeTbl`
pub mod employee;
/// `EmployeePaymentsTbl`
pub mod employee_payment;
/// `FlatApartmentTbl`
pub mod flat;
/// `FlatPaymentsTbl`
pub mod flat_payment;
/// `LoginTbl`
pub mod login;
/// `PaymentsTbl`
pub mod payment;
/// `TenantTbl`
pub mod tenant;

// Re-export specific types to avoid conflicts
pub use apartment::{Column as ApartmentColumn, Entity as Apartment, Model as ApartmentModel};
pub use employee::{Column as EmployeeColumn, Entity as Employee, Model as EmployeeModel};
pub use employee_payment::{
    Column as EmployeePaymentColumn, Entity as EmployeePayment, Model as EmployeePaymentModel,
};
pub use flat::{Column as FlatColumn, Entity as Flat, Model as FlatModel};
pub use flat_payment::{
    Column as FlatPaymentColumn, Entity as FlatPayment, Model as FlatPaymentModel,
};
pub use login::{Column as LoginColumn, Entity as Login, Model as LoginModel};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use tenant::{Column as TenantColumn, Entity as Tenant, Model as TenantModel};
