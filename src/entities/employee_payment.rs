//! Link between an outbound payment and the employee it was paid to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Employee payment link model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "EmployeePaymentsTbl")]
pub struct Model {
    /// Linked payment
    #[sea_orm(primary_key, auto_increment = false, column_name = "PaymentID")]
    pub payment_id: i64,
    /// Employee the payment went to
    #[sea_orm(primary_key, auto_increment = false, column_name = "EmployeeID")]
    pub employee_id: String,
}

/// Both sides of the link
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The payment row
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::PaymentId"
    )]
    Payment,
    /// The payee row
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::EmployeeId"
    )]
    Employee,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
