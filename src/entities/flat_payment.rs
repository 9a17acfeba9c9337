//! Link between an inbound payment and the tenant who paid it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tenant payment link model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "FlatPaymentsTbl")]
pub struct Model {
    /// Linked payment
    #[sea_orm(primary_key, auto_increment = false, column_name = "PaymentID")]
    pub payment_id: i64,
    /// Tenant the payment came from
    #[sea_orm(primary_key, auto_increment = false, column_name = "TenantID")]
    pub tenant_id: String,
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
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::TenantId"
    )]
    Tenant,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
