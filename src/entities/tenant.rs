//! Tenant entity - A person renting, or waiting to rent, a flat.
//!
//! `FlatID` is nullable: deleting a flat or its apartment unbinds the tenant instead of
//! removing it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tenant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "TenantTbl")]
pub struct Model {
    /// Display code such as `T0012`
    #[sea_orm(primary_key, auto_increment = false, column_name = "TenantID")]
    pub tenant_id: String,
    /// Flat the tenant lives in, if any
    #[sea_orm(column_name = "FlatID")]
    pub flat_id: Option<String>,
    /// Given name
    #[sea_orm(column_name = "TenantForename")]
    pub forename: String,
    /// Family name
    #[sea_orm(column_name = "TenantSurname")]
    pub surname: String,
    /// Phone number
    #[sea_orm(column_name = "TenantContact")]
    pub contact: String,
    /// Free-text notes
    #[sea_orm(column_name = "TenantDescription")]
    pub description: Option<String>,
}

/// Defines relationships between Tenant and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each tenant optionally lives in one flat
    #[sea_orm(
        belongs_to = "super::flat::Entity",
        from = "Column::FlatId",
        to = "super::flat::Column::FlatId"
    )]
    Flat,
}

impl Related<super::flat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
