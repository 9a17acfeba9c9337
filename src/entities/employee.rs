//! Employee entity - Staff paid through outbound payments.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Employee database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "EmployeeTbl")]
pub struct Model {
    /// Display code such as `E0001`
    #[sea_orm(primary_key, auto_increment = false, column_name = "EmployeeID")]
    pub employee_id: String,
    /// Given name
    #[sea_orm(column_name = "EmployeeForename")]
    pub forename: String,
    /// Family name
    #[sea_orm(column_name = "EmployeeSurname")]
    pub surname: String,
    /// Phone number
    #[sea_orm(column_name = "EmployeeContact")]
    pub contact: String,
    /// Home address
    #[sea_orm(column_name = "EmployeeAddress")]
    pub address: String,
    /// Postcode of the home address
    #[sea_orm(column_name = "EmployeePostcode")]
    pub postcode: String,
    /// Free-text notes
    #[sea_orm(column_name = "EmployeeDescription")]
    pub description: Option<String>,
}

/// Employees are reached from payments through `EmployeePaymentsTbl`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
