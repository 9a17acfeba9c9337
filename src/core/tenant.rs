//! Tenant repository.
//!
//! A tenant's address, flat number and postcode are read through its optional flat, so an
//! unhoused tenant lists with those columns empty.

use crate::{
    core::query::{self, FieldKind, ListField, ListQuery},
    entities::{
        Apartment, ApartmentColumn, Flat, FlatColumn, FlatPayment, FlatPaymentColumn, Tenant,
        TenantColumn, TenantModel, flat, tenant,
    },
    errors::{Error, Result},
};
use sea_orm::{
    ActiveValue::Unchanged, JoinType, PaginatorTrait, QueryResult, QuerySelect, RelationTrait,
    Set, prelude::*,
};
use tracing::info;

const TENANT_SELECT: &str = r"
SELECT TenantTbl.TenantID AS TenantID,
       TenantTbl.TenantForename AS TenantForename,
       TenantTbl.TenantSurname AS TenantSurname,
       TenantTbl.TenantContact AS TenantContact,
       ApartmentTbl.ApartmentAddress AS ApartmentAddress,
       FlatApartmentTbl.FlatNumber AS FlatNumber,
       ApartmentTbl.ApartmentPostcode AS ApartmentPostcode
FROM TenantTbl
LEFT JOIN FlatApartmentTbl ON TenantTbl.FlatID = FlatApartmentTbl.FlatID
LEFT JOIN ApartmentTbl ON FlatApartmentTbl.ApartmentID = ApartmentTbl.ApartmentID";

/// Columns of the tenant list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TenantField {
    /// `T0001` style code
    TenantId,
    /// Given name
    Forename,
    /// Family name
    Surname,
    /// Phone number
    Contact,
    /// Address of the apartment the tenant lives in
    Address,
    /// Number of the flat within that apartment
    FlatNumber,
    /// Postcode of that apartment
    Postcode,
}

impl ListField for TenantField {
    const ALL: &'static [Self] = &[
        Self::TenantId,
        Self::Forename,
        Self::Surname,
        Self::Contact,
        Self::Address,
        Self::FlatNumber,
        Self::Postcode,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::TenantId => "Tenant ID",
            Self::Forename => "Forename",
            Self::Surname => "Surname",
            Self::Contact => "Contact",
            Self::Address => "Address",
            Self::FlatNumber => "Flat Number",
            Self::Postcode => "Postcode",
        }
    }

    fn kind(self) -> FieldKind {
        FieldKind::Column(match self {
            Self::TenantId => "TenantTbl.TenantID",
            Self::Forename => "TenantTbl.TenantForename",
            Self::Surname => "TenantTbl.TenantSurname",
            Self::Contact => "TenantTbl.TenantContact",
            Self::Address => "ApartmentTbl.ApartmentAddress",
            Self::FlatNumber => "FlatApartmentTbl.FlatNumber",
            Self::Postcode => "ApartmentTbl.ApartmentPostcode",
        })
    }

    fn sort_key(self) -> &'static str {
        match self {
            Self::TenantId => "TenantID",
            Self::Forename => "TenantForename",
            Self::Surname => "TenantSurname",
            Self::Contact => "TenantContact",
            Self::Address => "ApartmentAddress",
            Self::FlatNumber => "FlatNumber",
            Self::Postcode => "ApartmentPostcode",
        }
    }

    fn primary() -> Self {
        Self::TenantId
    }
}

/// One line of the tenant list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantRow {
    /// Display code
    pub tenant_id: String,
    /// Given name
    pub forename: String,
    /// Family name
    pub surname: String,
    /// Phone number
    pub contact: String,
    /// `None` while the tenant is not housed
    pub address: Option<String>,
    /// Set together with `address`
    pub flat_number: Option<i64>,
    /// Set together with `address`
    pub postcode: Option<String>,
}

impl TenantRow {
    fn from_query(row: &QueryResult) -> Result<Self> {
        Ok(Self {
            tenant_id: row.try_get("", "TenantID")?,
            forename: row.try_get("", "TenantForename")?,
            surname: row.try_get("", "TenantSurname")?,
            contact: row.try_get("", "TenantContact")?,
            address: row.try_get("", "ApartmentAddress")?,
            flat_number: row.try_get("", "FlatNumber")?,
            postcode: row.try_get("", "ApartmentPostcode")?,
        })
    }
}

/// Next unused `T` code.
pub async fn free_id<C: ConnectionTrait>(db: &C) -> Result<String> {
    query::scan_free_id::<Tenant, _>(db, TenantColumn::TenantId, 'T').await
}

/// Lists tenants joined with their flat and apartment.
pub async fn list<C: ConnectionTrait>(
    db: &C,
    list_query: &ListQuery<TenantField>,
) -> Result<Vec<TenantRow>> {
    let mut sql = TENANT_SELECT.to_string();
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
        .map(TenantRow::from_query)
        .collect()
}

/// Stored fields of one tenant.
pub async fn get<C: ConnectionTrait>(db: &C, tenant_id: &str) -> Result<Option<TenantModel>> {
    Tenant::find_by_id(tenant_id.to_owned())
        .one(db)
        .await
        .map_err(Into::into)
}

/// List line of one tenant, with the address of its flat.
pub async fn get_row<C: ConnectionTrait>(db: &C, tenant_id: &str) -> Result<Option<TenantRow>> {
    let sql = format!("{TENANT_SELECT}\nWHERE TenantTbl.TenantID = ?");
    query::fetch_one(db, &sql, vec![tenant_id.into()])
        .await?
        .as_ref()
        .map(TenantRow::from_query)
        .transpose()
}

/// Resolves the flat with `flat_number` at the apartment registered under `address`.
pub async fn find_flat_id<C: ConnectionTrait>(
    db: &C,
    address: &str,
    flat_number: i64,
) -> Result<Option<String>> {
    Flat::find()
        .select_only()
        .column(FlatColumn::FlatId)
        .join(JoinType::InnerJoin, flat::Relation::Apartment.def())
        .filter(ApartmentColumn::Address.eq(address))
        .filter(FlatColumn::FlatNumber.eq(flat_number))
        .into_tuple()
        .one(db)
        .await
        .map_err(Into::into)
}

/// Postcode of the apartment at `address`.
pub async fn postcode_for<C: ConnectionTrait>(db: &C, address: &str) -> Result<Option<String>> {
    Apartment::find()
        .select_only()
        .column(ApartmentColumn::Postcode)
        .filter(ApartmentColumn::Address.eq(address))
        .into_tuple()
        .one(db)
        .await
        .map_err(Into::into)
}

/// True when the tenant is the payee of any recorded payment.
pub async fn has_payments<C: ConnectionTrait>(db: &C, tenant_id: &str) -> Result<bool> {
    let count = FlatPayment::find()
        .filter(FlatPaymentColumn::TenantId.eq(tenant_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Registers a validated tenant, housed or not.
pub async fn add<C: ConnectionTrait>(db: &C, tenant: TenantModel) -> Result<TenantModel> {
    let model = tenant::ActiveModel {
        tenant_id: Set(tenant.tenant_id),
        flat_id: Set(tenant.flat_id),
        forename: Set(tenant.forename),
        surname: Set(tenant.surname),
        contact: Set(tenant.contact),
        description: Set(tenant.description),
    }
    .insert(db)
    .await?;

    info!(tenant_id = %model.tenant_id, flat_id = ?model.flat_id, "Registered tenant");
    Ok(model)
}

/// Updates every stored field except the id, rehousing the tenant if the flat changed.
pub async fn edit<C: ConnectionTrait>(
    db: &C,
    tenant_id: &str,
    changes: TenantModel,
) -> Result<TenantModel> {
    let updated = tenant::ActiveModel {
        tenant_id: Unchanged(tenant_id.to_owned()),
        flat_id: Set(changes.flat_id),
        forename: Set(changes.forename),
        surname: Set(changes.surname),
        contact: Set(changes.contact),
        description: Set(changes.description),
    }
    .update(db)
    .await
    .map_err(|e| match e {
        DbErr::RecordNotUpdated => Error::NotFound {
            entity: "Tenant",
            id: tenant_id.to_owned(),
        },
        other => other.into(),
    })?;

    info!(tenant_id, "Updated tenant");
    Ok(updated)
}

/// Deletes a tenant. Callers refuse this first when [`has_payments`] is true.
pub async fn delete<C: ConnectionTrait>(db: &C, tenant_id: &str) -> Result<()> {
    let deleted = Tenant::delete_by_id(tenant_id.to_owned())
        .exec(db)
        .await?
        .rows_affected;
    if deleted == 0 {
        return Err(Error::NotFound {
            entity: "Tenant",
            id: tenant_id.to_owned(),
        });
    }
    info!(tenant_id, "Deleted tenant");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{payment::PaymentType, query::SortDirection};
    use crate::test_utils::*;

    async fn seeded() -> Result<DatabaseConnection> {
        let db = setup_test_db().await?;
        create_test_apartment(&db, "A0000", "1 Mill Lane").await?;
        create_test_flat(&db, "F0000", "A0000", 3, 100.0).await?;
        create_test_tenant(&db, "T0000", "Jane", "Smith", Some("F0000")).await?;
        create_test_tenant(&db, "T0001", "Adam", "Jones", None).await?;
        create_test_tenant(&db, "T0002", "Zoe", "smart", None).await?;
        Ok(db)
    }

    #[tokio::test]
    async fn test_list_joins_flat_and_apartment() -> Result<()> {
        let db = seeded().await?;
        let rows = list(&db, &ListQuery::new()).await?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].address.as_deref(), Some("1 Mill Lane"));
        assert_eq!(rows[0].flat_number, Some(3));
        assert_eq!(rows[0].postcode.as_deref(), Some("AB1 2CD"));
        assert_eq!(rows[1].address, None);
        assert_eq!(rows[1].flat_number, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_surname_search_is_case_insensitive_prefix() -> Result<()> {
        let db = seeded().await?;
        let query = ListQuery::new().searching(TenantField::Surname, "SM");
        let ids: Vec<_> = list(&db, &query).await?.into_iter().map(|r| r.tenant_id).collect();
        assert_eq!(ids, ["T0000", "T0002"]);

        let query = ListQuery::new().searching(TenantField::Surname, "mith");
        assert!(list(&db, &query).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sort_by_forename_descending() -> Result<()> {
        let db = seeded().await?;
        let query = ListQuery::new().sorted(TenantField::Forename, SortDirection::Descending);
        let names: Vec<_> = list(&db, &query).await?.into_iter().map(|r| r.forename).collect();
        assert_eq!(names, ["Zoe", "Jane", "Adam"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_flat_lookup_by_address() -> Result<()> {
        let db = seeded().await?;
        assert_eq!(
            find_flat_id(&db, "1 Mill Lane", 3).await?.as_deref(),
            Some("F0000")
        );
        assert_eq!(find_flat_id(&db, "1 Mill Lane", 4).await?, None);
        assert_eq!(find_flat_id(&db, "2 Mill Lane", 3).await?, None);
        assert_eq!(
            postcode_for(&db, "1 Mill Lane").await?.as_deref(),
            Some("AB1 2CD")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_round_trip_and_edit() -> Result<()> {
        let db = seeded().await?;
        let record = TenantModel {
            tenant_id: free_id(&db).await?,
            flat_id: None,
            forename: "Mo".to_string(),
            surname: "Khan".to_string(),
            contact: "+44 7700 900000".to_string(),
            description: Some("Pays early".to_string()),
        };
        assert_eq!(record.tenant_id, "T0003");
        add(&db, record.clone()).await?;
        assert_eq!(get(&db, "T0003").await?, Some(record.clone()));

        let rehoused = TenantModel {
            flat_id: Some("F0000".to_string()),
            ..record
        };
        edit(&db, "T0003", rehoused).await?;
        let row = get_row(&db, "T0003").await?.unwrap();
        assert_eq!(row.flat_number, Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn test_payments_block_nothing_until_recorded() -> Result<()> {
        let db = seeded().await?;
        assert!(!has_payments(&db, "T0001").await?);
        create_test_payment(&db, PaymentType::Inbound, "T0001", 50.0, "2024-01-01").await?;
        assert!(has_payments(&db, "T0001").await?);

        delete(&db, "T0002").await?;
        assert!(get(&db, "T0002").await?.is_none());
        assert!(matches!(
            delete(&db, "T0002").await,
            Err(Error::NotFound { entity: "Tenant", .. })
        ));
        Ok(())
    }
}
