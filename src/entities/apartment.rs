//! Apartment entity - A building managed by the business.
//!
//! An apartment owns zero or more flats. Flat count, tenant count and upkeep are never stored;
//! they are aggregated from `FlatApartmentTbl` and `TenantTbl` when listing.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Apartment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ApartmentTbl")]
pub struct Model {
    /// Display code such as `A0007`
    #[sea_orm(primary_key, auto_increment = false, column_name = "ApartmentID")]
    pub apartment_id: String,
    /// Street address, title-cased on entry
    #[sea_orm(column_name = "ApartmentAddress")]
    pub address: String,
    /// UK-style postcode, upper-cased on entry
    #[sea_orm(column_name = "ApartmentPostcode")]
    pub postcode: String,
    /// Free-text notes
    #[sea_orm(column_name = "ApartmentDescription")]
    pub description: Option<String>,
}

/// Defines relationships between Apartment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One apartment has many flats
    #[sea_orm(has_many = "super::flat::Entity")]
    Flats,
}

impl Related<super::flat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
