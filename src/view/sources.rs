use crate::{
    core::{
        apartment::{self, ApartmentField, ApartmentRow},
        employee::{self, EmployeeField, EmployeeRow},
        flat::{self, FlatField, FlatRow},
        query::{self, ListQuery},
        tenant::{self, TenantField, TenantRow},
    },
    errors::Result,
    view::ListSource,
};
use sea_orm::ConnectionTrait;

/// Every apartment with its aggregates.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApartmentSource;

impl ListSource for ApartmentSource {
    type Field = ApartmentField;
    type Row = ApartmentRow;

    async fn fetch<C: ConnectionTrait>(
        &self,
        db: &C,
        query: &ListQuery<ApartmentField>,
    ) -> Result<Vec<ApartmentRow>> {
        apartment::list(db, query).await
    }

    fn cells(&self, row: &ApartmentRow) -> Vec<String> {
        vec![
            row.apartment_id.clone(),
            row.num_flats.to_string(),
            row.num_tenants.to_string(),
            query::format_money(row.upkeep),
            row.address.clone(),
            row.postcode.clone(),
        ]
    }
}

/// Flats of one apartment.
#[derive(Clone, Debug)]
pub struct FlatSource {
    apartment_id: String,
}

impl FlatSource {
    /// Source for the flats of `apartment_id`.
    pub fn new(apartment_id: impl Into<String>) -> Self {
        Self {
            apartment_id: apartment_id.into(),
        }
    }

    /// Apartment whose flats are listed.
    pub fn apartment_id(&self) -> &str {
        &self.apartment_id
    }
}

impl ListSource for FlatSource {
    type Field = FlatField;
    type Row = FlatRow;

    async fn fetch<C: ConnectionTrait>(
        &self,
        db: &C,
        query: &ListQuery<FlatField>,
    ) -> Result<Vec<FlatRow>> {
        flat::list(db, &self.apartment_id, query).await
    }

    fn cells(&self, row: &FlatRow) -> Vec<String> {
        vec![
            row.flat_number.to_string(),
            row.num_tenants.to_string(),
            row.tenants.clone().unwrap_or_default(),
            query::format_money(row.weekly_rent),
        ]
    }
}

/// Every tenant, housed or not.
#[derive(Clone, Copy, Debug, Default)]
pub struct TenantSource;

impl ListSource for TenantSource {
    type Field = TenantField;
    type Row = TenantRow;

    async fn fetch<C: ConnectionTrait>(
        &self,
        db: &C,
        query: &ListQuery<TenantField>,
    ) -> Result<Vec<TenantRow>> {
        tenant::list(db, query).await
    }

    // Unhoused tenants show blank address columns.
    fn cells(&self, row: &TenantRow) -> Vec<String> {
        vec![
            row.tenant_id.clone(),
            row.forename.clone(),
            row.surname.clone(),
            row.contact.clone(),
            row.address.clone().unwrap_or_default(),
            row.flat_number.map(|n| n.to_string()).unwrap_or_default(),
            row.postcode.clone().unwrap_or_default(),
        ]
    }
}

/// Every employee.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmployeeSource;

impl ListSource for EmployeeSource {
    type Field = EmployeeField;
    type Row = EmployeeRow;

    async fn fetch<C: ConnectionTrait>(
        &self,
        db: &C,
        query: &ListQuery<EmployeeField>,
    ) -> Result<Vec<EmployeeRow>> {
        employee::list(db, query).await
    }

    fn cells(&self, row: &EmployeeRow) -> Vec<String> {
        vec![
            row.employee_id.clone(),
            row.forename.clone(),
            row.surname.clone(),
            row.contact.clone(),
            row.address.clone(),
            row.postcode.clone(),
        ]
    }
}
