//! Login entity - Operator accounts for the desk.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Login database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "LoginTbl")]
pub struct Model {
    /// Unique, case-sensitive login name
    #[sea_orm(primary_key, auto_increment = false, column_name = "Username")]
    pub username: String,
    /// 64 hex chars of salt followed by the hex PBKDF2 digest
    #[sea_orm(column_name = "PasswordHash")]
    pub password_hash: String,
}

/// Accounts stand alone
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
