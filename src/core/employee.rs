//! Employee repository.

use crate::{
    core::query::{self, FieldKind, ListField, ListQuery},
    entities::{
        Employee, EmployeeColumn, EmployeeModel, EmployeePayment, EmployeePaymentColumn, employee,
    },
    errors::{Error, Result},
};
use sea_orm::{ActiveValue::Unchanged, PaginatorTrait, QueryResult, Set, prelude::*};
use tracing::info;

const EMPLOYEE_SELECT: &str = r"
SELECT EmployeeID, EmployeeForename, EmployeeSurname, EmployeeContact, EmployeeAddress,
       EmployeePostcode
FROM EmployeeTbl";

/// Columns of the employee list. Every one is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmployeeField {
    /// `E0001` style code
    EmployeeId,
    /// Given name
    Forename,
    /// Family name
    Surname,
    /// Phone number
    Contact,
    /// Home address
    Address,
    /// Postcode of the home address
    Postcode,
}

impl ListField for EmployeeField {
    const ALL: &'static [Self] = &[
        Self::EmployeeId,
        Self::Forename,
        Self::Surname,
        Self::Contact,
        Self::Address,
        Self::Postcode,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::EmployeeId => "Employee ID",
            Self::Forename => "Forename",
            Self::Surname => "Surname",
            Self::Contact => "Contact",
            Self::Address => "Address",
            Self::Postcode => "Postcode",
        }
    }

    fn kind(self) -> FieldKind {
        FieldKind::Column(self.sort_key())
    }

    fn sort_key(self) -> &'static str {
        match self {
            Self::EmployeeId => "EmployeeID",
            Self::Forename => "EmployeeForename",
            Self::Surname => "EmployeeSurname",
            Self::Contact => "EmployeeContact",
            Self::Address => "EmployeeAddress",
            Self::Postcode => "EmployeePostcode",
        }
    }

    fn primary() -> Self {
        Self::EmployeeId
    }
}

/// One line of the employee list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmployeeRow {
    /// Display code
    pub employee_id: String,
    /// Given name
    pub forename: String,
    /// Family name
    pub surname: String,
    /// Phone number
    pub contact: String,
    /// Home address
    pub address: String,
    /// Postcode of the home address
    pub postcode: String,
}

impl EmployeeRow {
    fn from_query(row: &QueryResult) -> Result<Self> {
        Ok(Self {
            employee_id: row.try_get("", "EmployeeID")?,
            forename: row.try_get("", "EmployeeForename")?,
            surname: row.try_get("", "EmployeeSurname")?,
            contact: row.try_get("", "EmployeeContact")?,
            address: row.try_get("", "EmployeeAddress")?,
            postcode: row.try_get("", "EmployeePostcode")?,
        })
    }
}

impl From<EmployeeModel> for EmployeeRow {
    fn from(model: EmployeeModel) -> Self {
        Self {
            employee_id: model.employee_id,
            forename: model.forename,
            surname: model.surname,
            contact: model.contact,
            address: model.address,
            postcode: model.postcode,
        }
    }
}

/// Next unused `E` code.
pub async fn free_id<C: ConnectionTrait>(db: &C) -> Result<String> {
    query::scan_free_id::<Employee, _>(db, EmployeeColumn::EmployeeId, 'E').await
}

/// Lists employees filtered and ordered by `list_query`.
pub async fn list<C: ConnectionTrait>(
    db: &C,
    list_query: &ListQuery<EmployeeField>,
) -> Result<Vec<EmployeeRow>> {
    let mut sql = EMPLOYEE_SELECT.to_string();
    let mut values = Vec::new();
    if let Some((clause, pattern)) = list_query.column_filter() {
        sql.push_str("\nWHERE ");
        sql.push_str(&clause);
        values.push(pattern);
    }
    sql.push_str("\nORDER BY ");
    sql.push_str(&list_query.order_by());

    query::fetch_all(db, &sql, values)
        .await?
        .iter()
        .map(EmployeeRow::from_query)
        .collect()
}

/// Stored fields of one employee.
pub async fn get<C: ConnectionTrait>(db: &C, employee_id: &str) -> Result<Option<EmployeeModel>> {
    Employee::find_by_id(employee_id.to_owned())
        .one(db)
        .await
        .map_err(Into::into)
}

/// List line of one employee.
pub async fn get_row<C: ConnectionTrait>(db: &C, employee_id: &str) -> Result<Option<EmployeeRow>> {
    Ok(get(db, employee_id).await?.map(EmployeeRow::from))
}

/// True when the employee is the payee of any recorded payment.
pub async fn has_payments<C: ConnectionTrait>(db: &C, employee_id: &str) -> Result<bool> {
    let count = EmployeePayment::find()
        .filter(EmployeePaymentColumn::EmployeeId.eq(employee_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Registers a validated employee.
pub async fn add<C: ConnectionTrait>(db: &C, employee: EmployeeModel) -> Result<EmployeeModel> {
    let model = employee::ActiveModel {
        employee_id: Set(employee.employee_id),
        forename: Set(employee.forename),
        surname: Set(employee.surname),
        contact: Set(employee.contact),
        address: Set(employee.address),
        postcode: Set(employee.postcode),
        description: Set(employee.description),
    }
    .insert(db)
    .await?;

    info!(employee_id = %model.employee_id, "Registered employee");
    Ok(model)
}

/// Overwrites every field except the id.
pub async fn edit<C: ConnectionTrait>(
    db: &C,
    employee_id: &str,
    changes: EmployeeModel,
) -> Result<EmployeeModel> {
    let updated = employee::ActiveModel {
        employee_id: Unchanged(employee_id.to_owned()),
        forename: Set(changes.forename),
        surname: Set(changes.surname),
        contact: Set(changes.contact),
        address: Set(changes.address),
        postcode: Set(changes.postcode),
        description: Set(changes.description),
    }
    .update(db)
    .await
    .map_err(|e| match e {
        DbErr::RecordNotUpdated => Error::NotFound {
            entity: "Employee",
            id: employee_id.to_owned(),
        },
        other => other.into(),
    })?;

    info!(employee_id, "Updated employee");
    Ok(updated)
}

/// Deletes an employee. Callers refuse this first when [`has_payments`] is true.
pub async fn delete<C: ConnectionTrait>(db: &C, employee_id: &str) -> Result<()> {
    let deleted = Employee::delete_by_id(employee_id.to_owned())
        .exec(db)
        .await?
        .rows_affected;
    if deleted == 0 {
        return Err(Error::NotFound {
            entity: "Employee",
            id: employee_id.to_owned(),
        });
    }
    info!(employee_id, "Deleted employee");
    Ok(())
}
