//! Flat entity - A lettable unit inside an apartment.
//!
//! `(ApartmentID, FlatNumber)` is unique; the schema adds a unique index for it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Flat database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "FlatApartmentTbl")]
pub struct Model {
    /// Display code such as `F0003`
    #[sea_orm(primary_key, auto_increment = false, column_name = "FlatID")]
    pub flat_id: String,
    /// Owning apartment
    #[sea_orm(column_name = "ApartmentID")]
    pub apartment_id: String,
    /// Number of the flat within its apartment
    #[sea_orm(column_name = "FlatNumber")]
    pub flat_number: i64,
    /// Weekly rent, rounded to pence
    #[sea_orm(column_name = "WeeklyRent")]
    pub weekly_rent: f64,
    /// Free-text notes
    #[sea_orm(column_name = "FlatDescription")]
    pub description: Option<String>,
}

/// Defines relationships between Flat and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each flat belongs to one apartment
    #[sea_orm(
        belongs_to = "super::apartment::Entity",
        from = "Column::ApartmentId",
        to = "super::apartment::Column::ApartmentId"
    )]
    Apartment,
    /// One flat houses many tenants
    #[sea_orm(has_many = "super::tenant::Entity")]
    Tenants,
}

impl Related<super::apartment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Apartment.def()
    }
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
