//! Payment entity - Money received from tenants or paid out to employees.
//!
//! The payee is not stored here. An `Inbound` payment has one row in `FlatPaymentsTbl`
//! (tenant link), an `Outbound` payment one row in `EmployeePaymentsTbl` (employee link).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "PaymentsTbl")]
pub struct Model {
    /// Auto-incremented key
    #[sea_orm(primary_key, column_name = "PaymentID")]
    pub payment_id: i64,
    /// `"Inbound"` or `"Outbound"`
    #[sea_orm(column_name = "PaymentType")]
    pub payment_type: String,
    /// Cash, card, transfer...
    #[sea_orm(column_name = "PaymentMethod")]
    pub method: String,
    /// Amount paid, always positive; direction comes from `payment_type`
    #[sea_orm(column_name = "TotalPaid")]
    pub total_paid: f64,
    /// `YYYY-MM-DD`
    #[sea_orm(column_name = "PaymentDate")]
    pub date: String,
    /// `HH:MM`
    #[sea_orm(column_name = "PaymentTime")]
    pub time: String,
    /// Free-text notes
    #[sea_orm(column_name = "PaymentDescription")]
    pub description: Option<String>,
}

/// Defines relationships between Payment and its link tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Tenant link of an inbound payment
    #[sea_orm(has_many = "super::flat_payment::Entity")]
    FlatPayments,
    /// Employee link of an outbound payment
    #[sea_orm(has_many = "super::employee_payment::Entity")]
    EmployeePayments,
}

impl Related<super::flat_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FlatPayments.def()
    }
}

impl Related<super::employee_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmployeePayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
