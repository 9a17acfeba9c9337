//! Apartment repository - listing, lookup and lifecycle of apartments.
//!
//! An apartment's flat count, tenant count and upkeep (total weekly rent) are never stored;
//! they are aggregated over its flats and their tenants on every read. Searching on one of them
//! fetches unfiltered rows and filters on the formatted value.

use crate::{
    core::query::{self, FieldKind, ListField, ListQuery},
    entities::{
        Apartment, ApartmentColumn, ApartmentModel, Flat, FlatColumn, Tenant, TenantColumn,
        apartment,
    },
    errors::{Error, Result},
};
use sea_orm::{
    ActiveValue::Unchanged, QueryOrder, QueryResult, QuerySelect, Set, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use tracing::{info, instrument};

const SUMMARY_SELECT: &str = r"
SELECT ApartmentID,
       COUNT(FlatID) AS NumFlats,
       CAST(COALESCE(SUM(NumFlatTenants), 0) AS INTEGER) AS NumTenants,
       CAST(COALESCE(SUM(WeeklyRent), 0) AS REAL) AS Upkeep,
       ApartmentAddress,
       ApartmentPostcode
FROM ApartmentTbl
LEFT JOIN (
    SELECT FlatApartmentTbl.ApartmentID AS FlatApartmentID,
           FlatApartmentTbl.FlatID AS FlatID,
           COUNT(TenantTbl.TenantID) AS NumFlatTenants,
           FlatApartmentTbl.WeeklyRent AS WeeklyRent
    FROM FlatApartmentTbl
    LEFT JOIN TenantTbl ON FlatApartmentTbl.FlatID = TenantTbl.FlatID
    GROUP BY FlatApartmentTbl.FlatID
) ON ApartmentID = FlatApartmentID";

/// Columns of the apartment list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApartmentField {
    /// `A0001` style code
    ApartmentId,
    /// Flats registered in the apartment
    NumFlats,
    /// Tenants housed across those flats
    NumTenants,
    /// Summed weekly rent
    Upkeep,
    /// Street address
    Address,
    /// Postcode of the address
    Postcode,
}

impl ListField for ApartmentField {
    const ALL: &'static [Self] = &[
        Self::ApartmentId,
        Self::NumFlats,
        Self::NumTenants,
        Self::Upkeep,
        Self::Address,
        Self::Postcode,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::ApartmentId => "Apartment ID",
            Self::NumFlats => "Num Flats",
            Self::NumTenants => "Num Tenants",
            Self::Upkeep => "Upkeep",
            Self::Address => "Address",
            Self::Postcode => "Postcode",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::ApartmentId => FieldKind::Column("ApartmentID"),
            Self::Address => FieldKind::Column("ApartmentAddress"),
            Self::Postcode => FieldKind::Column("ApartmentPostcode"),
            Self::NumFlats | Self::NumTenants | Self::Upkeep => FieldKind::Computed,
        }
    }

    fn sort_key(self) -> &'static str {
        match self {
            Self::ApartmentId => "ApartmentID",
            Self::NumFlats => "NumFlats",
            Self::NumTenants => "NumTenants",
            Self::Upkeep => "Upkeep",
            Self::Address => "ApartmentAddress",
            Self::Postcode => "ApartmentPostcode",
        }
    }

    fn primary() -> Self {
        Self::ApartmentId
    }
}

/// One line of the apartment list.
#[derive(Clone, Debug, PartialEq)]
pub struct ApartmentRow {
    /// Display code
    pub apartment_id: String,
    /// Flats in the apartment
    pub num_flats: i64,
    /// Tenants across every flat
    pub num_tenants: i64,
    /// Total weekly rent of every flat
    pub upkeep: f64,
    /// Street address
    pub address: String,
    /// Postcode of the address
    pub postcode: String,
}

impl ApartmentRow {
    fn from_query(row: &QueryResult) -> Result<Self> {
        Ok(Self {
            apartment_id: row.try_get("", "ApartmentID")?,
            num_flats: row.try_get("", "NumFlats")?,
            num_tenants: row.try_get("", "NumTenants")?,
            upkeep: row.try_get("", "Upkeep")?,
            address: row.try_get("", "ApartmentAddress")?,
            postcode: row.try_get("", "ApartmentPostcode")?,
        })
    }

    /// A freshly registered apartment has no flats yet.
    #[must_use]
    pub fn empty(apartment: &ApartmentModel) -> Self {
        Self {
            apartment_id: apartment.apartment_id.clone(),
            num_flats: 0,
            num_tenants: 0,
            upkeep: 0.0,
            address: apartment.address.clone(),
            postcode: apartment.postcode.clone(),
        }
    }

    fn matches(&self, field: ApartmentField, term: &str) -> bool {
        match field {
            ApartmentField::NumFlats => query::matches_count_prefix(self.num_flats, term),
            ApartmentField::NumTenants => query::matches_count_prefix(self.num_tenants, term),
            ApartmentField::Upkeep => query::matches_amount_prefix(self.upkeep, term),
            ApartmentField::ApartmentId | ApartmentField::Address | ApartmentField::Postcode => {
                true
            }
        }
    }
}

/// Next unused `A` code.
pub async fn free_id<C: ConnectionTrait>(db: &C) -> Result<String> {
    query::scan_free_id::<Apartment, _>(db, ApartmentColumn::ApartmentId, 'A').await
}

/// Lists apartments with their aggregates, filtered and ordered by `list_query`.
pub async fn list<C: ConnectionTrait>(
    db: &C,
    list_query: &ListQuery<ApartmentField>,
) -> Result<Vec<ApartmentRow>> {
    let mut sql = SUMMARY_SELECT.to_string();
    let mut values = Vec::new();
    if let Some((clause, pattern)) = list_query.column_filter() {
        sql.push_str("\nWHERE ");
        sql.push_str(&clause);
        values.push(pattern);
    }
    sql.push_str("\nGROUP BY ApartmentID\nORDER BY ");
    sql.push_str(&list_query.order_by());

    let rows = query::fetch_all(db, &sql, values)
        .await?
        .iter()
        .map(ApartmentRow::from_query)
        .collect::<Result<Vec<_>>>()?;

    Ok(match list_query.computed_filter() {
        Some(field) => rows
            .into_iter()
            .filter(|row| row.matches(field, &list_query.search_term))
            .collect(),
        None => rows,
    })
}

/// Stored fields of one apartment.
pub async fn get<C: ConnectionTrait>(db: &C, apartment_id: &str) -> Result<Option<ApartmentModel>> {
    Apartment::find_by_id(apartment_id.to_owned())
        .one(db)
        .await
        .map_err(Into::into)
}

/// List line of one apartment, aggregates included.
pub async fn get_row<C: ConnectionTrait>(db: &C, apartment_id: &str) -> Result<Option<ApartmentRow>> {
    let sql = format!("{SUMMARY_SELECT}\nWHERE ApartmentID = ?\nGROUP BY ApartmentID");
    query::fetch_one(db, &sql, vec![apartment_id.into()])
        .await?
        .as_ref()
        .map(ApartmentRow::from_query)
        .transpose()
}

/// Every registered address, for the tenant address picker.
pub async fn addresses<C: ConnectionTrait>(db: &C) -> Result<Vec<String>> {
    Apartment::find()
        .select_only()
        .column(ApartmentColumn::Address)
        .order_by_asc(ApartmentColumn::Address)
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Registers a validated apartment.
pub async fn add<C: ConnectionTrait>(db: &C, apartment: ApartmentModel) -> Result<ApartmentModel> {
    let model = apartment::ActiveModel {
        apartment_id: Set(apartment.apartment_id),
        address: Set(apartment.address),
        postcode: Set(apartment.postcode),
        description: Set(apartment.description),
    }
    .insert(db)
    .await?;

    info!(apartment_id = %model.apartment_id, "Registered apartment");
    Ok(model)
}

/// Updates address, postcode and description. The id never changes.
pub async fn edit<C: ConnectionTrait>(
    db: &C,
    apartment_id: &str,
    changes: ApartmentModel,
) -> Result<ApartmentModel> {
    let updated = apartment::ActiveModel {
        apartment_id: Unchanged(apartment_id.to_owned()),
        address: Set(changes.address),
        postcode: Set(changes.postcode),
        description: Set(changes.description),
    }
    .update(db)
    .await
    .map_err(|e| match e {
        DbErr::RecordNotUpdated => Error::NotFound {
            entity: "Apartment",
            id: apartment_id.to_owned(),
        },
        other => other.into(),
    })?;

    info!(apartment_id, "Updated apartment");
    Ok(updated)
}

/// Deletes an apartment and every flat in it, unbinding their tenants first.
///
/// Runs in one transaction; tenants themselves are kept.
#[instrument(skip(db))]
pub async fn delete<C>(db: &C, apartment_id: &str) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let flat_ids: Vec<String> = Flat::find()
        .select_only()
        .column(FlatColumn::FlatId)
        .filter(FlatColumn::ApartmentId.eq(apartment_id))
        .into_tuple()
        .all(&txn)
        .await?;

    let unbound = Tenant::update_many()
        .col_expr(TenantColumn::FlatId, Expr::value(Option::<String>::None))
        .filter(TenantColumn::FlatId.is_in(flat_ids.clone()))
        .exec(&txn)
        .await?
        .rows_affected;

    Flat::delete_many()
        .filter(FlatColumn::ApartmentId.eq(apartment_id))
        .exec(&txn)
        .await?;

    let deleted = Apartment::delete_by_id(apartment_id.to_owned())
        .exec(&txn)
        .await?
        .rows_affected;
    if deleted == 0 {
        return Err(Error::NotFound {
            entity: "Apartment",
            id: apartment_id.to_owned(),
        });
    }

    txn.commit().await?;
    info!(
        apartment_id,
        flats = flat_ids.len(),
        tenants_unbound = unbound,
        "Deleted apartment"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::query::SortDirection;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_free_id_fills_gap() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(free_id(&db).await?, "A0000");

        create_test_apartment(&db, "A0000", "1 Mill Lane").await?;
        create_test_apartment(&db, "A0001", "2 Mill Lane").await?;
        create_test_apartment(&db, "A0003", "4 Mill Lane").await?;
        assert_eq!(free_id(&db).await?, "A0002");
        Ok(())
    }

    #[tokio::test]
    async fn test_add_then_get_round_trip() -> Result<()> {
        let db = setup_test_db().await?;
        let record = ApartmentModel {
            apartment_id: "A0004".to_string(),
            address: "12 High Street".to_string(),
            postcode: "AB1 2CD".to_string(),
            description: Some("Corner block".to_string()),
        };
        add(&db, record.clone()).await?;

        assert_eq!(get(&db, "A0004").await?, Some(record));
        assert_eq!(get(&db, "A0005").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_aggregates_flats_and_tenants() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_apartment(&db, "A0000", "1 Mill Lane").await?;
        create_test_apartment(&db, "A0001", "2 Mill Lane").await?;
        create_test_flat(&db, "F0000", "A0000", 1, 100.0).await?;
        create_test_flat(&db, "F0001", "A0000", 2, 150.5).await?;
        create_test_tenant(&db, "T0000", "Jane", "Doe", Some("F0000")).await?;
        create_test_tenant(&db, "T0001", "John", "Roe", Some("F0000")).await?;
        create_test_tenant(&db, "T0002", "Ann", "Lee", Some("F0001")).await?;

        let rows = list(&db, &ListQuery::new()).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].apartment_id, "A0000");
        assert_eq!(rows[0].num_flats, 2);
        assert_eq!(rows[0].num_tenants, 3);
        assert_eq!(rows[0].upkeep, 250.5);
        assert_eq!(rows[1], ApartmentRow {
            apartment_id: "A0001".to_string(),
            num_flats: 0,
            num_tenants: 0,
            upkeep: 0.0,
            address: "2 Mill Lane".to_string(),
            postcode: "AB1 2CD".to_string(),
        });
        Ok(())
    }

    #[tokio::test]
    async fn test_list_sorts_both_directions() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_apartment(&db, "A0000", "Beech Road").await?;
        create_test_apartment(&db, "A0001", "Ash Road").await?;
        create_test_apartment(&db, "A0002", "Cedar Road").await?;

        let query = ListQuery::new().sorted(ApartmentField::Address, SortDirection::Ascending);
        let ids: Vec<_> = list(&db, &query).await?.into_iter().map(|r| r.address).collect();
        assert_eq!(ids, ["Ash Road", "Beech Road", "Cedar Road"]);

        let query = query.sorted(ApartmentField::Address, SortDirection::Descending);
        let ids: Vec<_> = list(&db, &query).await?.into_iter().map(|r| r.address).collect();
        assert_eq!(ids, ["Cedar Road", "Beech Road", "Ash Road"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_prefix_search_is_case_insensitive() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_apartment(&db, "A0000", "Smith Street").await?;
        create_test_apartment(&db, "A0001", "Jones Street").await?;

        let query = ListQuery::new().searching(ApartmentField::Address, "sm");
        let rows = list(&db, &query).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address, "Smith Street");

        // LIKE wildcards in the term are literal
        let query = ListQuery::new().searching(ApartmentField::Address, "%");
        assert!(list(&db, &query).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_computed_upkeep_search_matches_formatted_prefix() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_apartment(&db, "A0000", "1 Mill Lane").await?;
        create_test_apartment(&db, "A0001", "2 Mill Lane").await?;
        create_test_flat(&db, "F0000", "A0000", 1, 12.5).await?;
        create_test_flat(&db, "F0001", "A0001", 1, 2.5).await?;

        let query = ListQuery::new().searching(ApartmentField::Upkeep, "12.5");
        let rows = list(&db, &query).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].apartment_id, "A0000");

        let query = ListQuery::new().searching(ApartmentField::NumFlats, "1");
        assert_eq!(list(&db, &query).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_row_and_addresses() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_apartment(&db, "A0000", "Beech Road").await?;
        create_test_apartment(&db, "A0001", "Ash Road").await?;
        create_test_flat(&db, "F0000", "A0000", 1, 80.0).await?;

        let row = get_row(&db, "A0000").await?.unwrap();
        assert_eq!(row.num_flats, 1);
        assert_eq!(row.upkeep, 80.0);
        assert!(get_row(&db, "A0009").await?.is_none());

        assert_eq!(addresses(&db).await?, ["Ash Road", "Beech Road"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_keeps_id() -> Result<()> {
        let db = setup_test_db().await?;
        let original = create_test_apartment(&db, "A0000", "1 Mill Lane").await?;

        let changes = ApartmentModel {
            address: "1 Mill Road".to_string(),
            description: None,
            ..original
        };
        let updated = edit(&db, "A0000", changes).await?;
        assert_eq!(updated.apartment_id, "A0000");
        assert_eq!(get(&db, "A0000").await?.unwrap().address, "1 Mill Road");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unbinds_tenants_and_removes_flats() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_apartment(&db, "A0000", "1 Mill Lane").await?;
        create_test_apartment(&db, "A0001", "2 Mill Lane").await?;
        create_test_flat(&db, "F0000", "A0000", 1, 100.0).await?;
        create_test_flat(&db, "F0001", "A0000", 2, 100.0).await?;
        create_test_flat(&db, "F0002", "A0001", 1, 100.0).await?;
        create_test_tenant(&db, "T0000", "Jane", "Doe", Some("F0000")).await?;
        create_test_tenant(&db, "T0001", "John", "Roe", Some("F0001")).await?;
        create_test_tenant(&db, "T0002", "Ann", "Lee", Some("F0002")).await?;

        delete(&db, "A0000").await?;

        assert!(get(&db, "A0000").await?.is_none());
        let flats = Flat::find().all(&db).await?;
        assert_eq!(flats.len(), 1);
        assert_eq!(flats[0].flat_id, "F0002");

        let tenants = Tenant::find().order_by_asc(TenantColumn::TenantId).all(&db).await?;
        assert_eq!(tenants.len(), 3);
        assert_eq!(tenants[0].flat_id, None);
        assert_eq!(tenants[1].flat_id, None);
        assert_eq!(tenants[2].flat_id.as_deref(), Some("F0002"));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_apartment_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = delete(&db, "A0042").await;
        assert!(matches!(result, Err(Error::NotFound { entity: "Apartment", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_delete_rolls_back_cascade() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_apartment(&db, "A0000", "1 Mill Lane").await?;
        create_test_flat(&db, "F0000", "A0000", 1, 100.0).await?;
        create_test_tenant(&db, "T0000", "Jane", "Doe", Some("F0000")).await?;
        db.execute_unprepared(
            "CREATE TRIGGER KeepApartment BEFORE DELETE ON ApartmentTbl \
             BEGIN SELECT RAISE(ABORT, 'apartment is locked'); END",
        )
        .await?;

        assert!(matches!(delete(&db, "A0000").await, Err(Error::Database(_))));

        assert!(get(&db, "A0000").await?.is_some());
        assert_eq!(Flat::find().all(&db).await?.len(), 1);
        let tenant = Tenant::find_by_id("T0000".to_string()).one(&db).await?.unwrap();
        assert_eq!(tenant.flat_id.as_deref(), Some("F0000"));
        Ok(())
    }
}
