//! Flat repository - the flats of one apartment.
//!
//! The list shows each flat's tenant count and the names of its tenants. Both are derived, as
//! is searching by weekly rent, so those searches run in the application after the query.

use crate::{
    core::query::{self, FieldKind, ListField, ListQuery},
    entities::{Flat, FlatColumn, FlatModel, Tenant, TenantColumn, flat},
    errors::{Error, Result},
};
use sea_orm::{
    ActiveValue::Unchanged, QueryOrder, QueryResult, QuerySelect, Set, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use tracing::{info, instrument};

const FLAT_SELECT: &str = r"
SELECT FlatApartmentTbl.FlatID AS FlatID,
       FlatApartmentTbl.FlatNumber AS FlatNumber,
       COUNT(TenantTbl.TenantID) AS NumTenants,
       CAST(FlatApartmentTbl.WeeklyRent AS REAL) AS WeeklyRent
FROM FlatApartmentTbl
LEFT JOIN TenantTbl ON FlatApartmentTbl.FlatID = TenantTbl.FlatID";

/// Columns of the flat list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlatField {
    /// Number within the apartment
    FlatNumber,
    /// Tenants living in the flat
    NumTenants,
    /// Comma-joined tenant names; searchable but not sortable
    Tenants,
    /// Rent per week
    WeeklyRent,
}

impl ListField for FlatField {
    const ALL: &'static [Self] = &[
        Self::FlatNumber,
        Self::NumTenants,
        Self::Tenants,
        Self::WeeklyRent,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::FlatNumber => "Flat Number",
            Self::NumTenants => "Num Tenants",
            Self::Tenants => "Tenants",
            Self::WeeklyRent => "Weekly Rent",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::FlatNumber => FieldKind::Column("FlatApartmentTbl.FlatNumber"),
            Self::NumTenants | Self::Tenants | Self::WeeklyRent => FieldKind::Computed,
        }
    }

    fn sort_key(self) -> &'static str {
        match self {
            // Tenants is never sortable; fall back to the flat number
            Self::FlatNumber | Self::Tenants => "FlatNumber",
            Self::NumTenants => "NumTenants",
            Self::WeeklyRent => "WeeklyRent",
        }
    }

    fn primary() -> Self {
        Self::FlatNumber
    }

    fn sortable(self) -> bool {
        self != Self::Tenants
    }
}

/// One line of the flat list.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatRow {
    /// Display code, hidden in the list
    pub flat_id: String,
    /// Number within the apartment
    pub flat_number: i64,
    /// Tenants living in the flat
    pub num_tenants: i64,
    /// `"Jane Doe, John Roe"`, or `None` for an empty flat
    pub tenants: Option<String>,
    /// Rent per week
    pub weekly_rent: f64,
}

struct FlatLine {
    flat_id: String,
    flat_number: i64,
    num_tenants: i64,
    weekly_rent: f64,
}

impl FlatLine {
    fn from_query(row: &QueryResult) -> Result<Self> {
        Ok(Self {
            flat_id: row.try_get("", "FlatID")?,
            flat_number: row.try_get("", "FlatNumber")?,
            num_tenants: row.try_get("", "NumTenants")?,
            weekly_rent: row.try_get("", "WeeklyRent")?,
        })
    }

    fn into_row(self, names: &[String]) -> FlatRow {
        FlatRow {
            flat_id: self.flat_id,
            flat_number: self.flat_number,
            num_tenants: self.num_tenants,
            tenants: (!names.is_empty()).then(|| names.join(", ")),
            weekly_rent: self.weekly_rent,
        }
    }
}

/// Next unused `F` code. Flat ids are unique across all apartments.
pub async fn free_id<C: ConnectionTrait>(db: &C) -> Result<String> {
    query::scan_free_id::<Flat, _>(db, FlatColumn::FlatId, 'F').await
}

/// "Forename Surname" of everyone living in a flat.
pub async fn tenant_names<C: ConnectionTrait>(db: &C, flat_id: &str) -> Result<Vec<String>> {
    let tenants = Tenant::find()
        .filter(TenantColumn::FlatId.eq(flat_id))
        .order_by_asc(TenantColumn::TenantId)
        .all(db)
        .await?;
    Ok(tenants
        .into_iter()
        .map(|t| format!("{} {}", t.forename, t.surname))
        .collect())
}

/// Lists the flats of `apartment_id`.
pub async fn list<C: ConnectionTrait>(
    db: &C,
    apartment_id: &str,
    list_query: &ListQuery<FlatField>,
) -> Result<Vec<FlatRow>> {
    let mut sql = format!("{FLAT_SELECT}\nWHERE FlatApartmentTbl.ApartmentID = ?");
    let mut values = vec![apartment_id.into()];
    if let Some((clause, pattern)) = list_query.column_filter() {
        sql.push_str(" AND ");
        sql.push_str(&clause);
        values.push(pattern);
    }
    sql.push_str("\nGROUP BY FlatApartmentTbl.FlatID\nORDER BY ");
    sql.push_str(&list_query.order_by());

    let term = list_query.search_term.as_str();
    let computed = list_query.computed_filter();
    let mut rows = Vec::new();
    for result in query::fetch_all(db, &sql, values).await? {
        let line = FlatLine::from_query(&result)?;
        match computed {
            Some(FlatField::WeeklyRent) if !query::matches_amount_prefix(line.weekly_rent, term) => {
                continue;
            }
            Some(FlatField::NumTenants) if !query::matches_count_prefix(line.num_tenants, term) => {
                continue;
            }
            _ => {}
        }

        let names = tenant_names(db, &line.flat_id).await?;
        if computed == Some(FlatField::Tenants) && !query::matches_all_names(&names, term) {
            continue;
        }
        rows.push(line.into_row(&names));
    }
    Ok(rows)
}

/// Stored fields of one flat.
pub async fn get<C: ConnectionTrait>(db: &C, flat_id: &str) -> Result<Option<FlatModel>> {
    Flat::find_by_id(flat_id.to_owned())
        .one(db)
        .await
        .map_err(Into::into)
}

/// List line of one flat.
pub async fn get_row<C: ConnectionTrait>(db: &C, flat_id: &str) -> Result<Option<FlatRow>> {
    let sql = format!(
        "{FLAT_SELECT}\nWHERE FlatApartmentTbl.FlatID = ?\nGROUP BY FlatApartmentTbl.FlatID"
    );
    let Some(result) = query::fetch_one(db, &sql, vec![flat_id.into()]).await? else {
        return Ok(None);
    };
    let line = FlatLine::from_query(&result)?;
    let names = tenant_names(db, flat_id).await?;
    Ok(Some(line.into_row(&names)))
}

/// Resolves a flat by its number within an apartment.
pub async fn find_id<C: ConnectionTrait>(
    db: &C,
    apartment_id: &str,
    flat_number: i64,
) -> Result<Option<String>> {
    Flat::find()
        .select_only()
        .column(FlatColumn::FlatId)
        .filter(FlatColumn::ApartmentId.eq(apartment_id))
        .filter(FlatColumn::FlatNumber.eq(flat_number))
        .into_tuple()
        .one(db)
        .await
        .map_err(Into::into)
}

/// Registers a validated flat.
pub async fn add<C: ConnectionTrait>(db: &C, flat: FlatModel) -> Result<FlatModel> {
    let model = flat::ActiveModel {
        flat_id: Set(flat.flat_id),
        apartment_id: Set(flat.apartment_id),
        flat_number: Set(flat.flat_number),
        weekly_rent: Set(flat.weekly_rent),
        description: Set(flat.description),
    }
    .insert(db)
    .await?;

    info!(flat_id = %model.flat_id, apartment_id = %model.apartment_id, "Registered flat");
    Ok(model)
}

/// Updates number, rent and description. The flat stays in its apartment.
pub async fn edit<C: ConnectionTrait>(db: &C, flat_id: &str, changes: FlatModel) -> Result<FlatModel> {
    let updated = flat::ActiveModel {
        flat_id: Unchanged(flat_id.to_owned()),
        flat_number: Set(changes.flat_number),
        weekly_rent: Set(changes.weekly_rent),
        description: Set(changes.description),
        ..Default::default()
    }
    .update(db)
    .await
    .map_err(|e| match e {
        DbErr::RecordNotUpdated => Error::NotFound {
            entity: "Flat",
            id: flat_id.to_owned(),
        },
        other => other.into(),
    })?;

    info!(flat_id, "Updated flat");
    Ok(updated)
}

/// Unbinds the flat's tenants, then deletes the flat, in one transaction.
#[instrument(skip(db))]
pub async fn delete<C>(db: &C, flat_id: &str) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let unbound = Tenant::update_many()
        .col_expr(TenantColumn::FlatId, Expr::value(Option::<String>::None))
        .filter(TenantColumn::FlatId.eq(flat_id))
        .exec(&txn)
        .await?
        .rows_affected;

    let deleted = Flat::delete_by_id(flat_id.to_owned())
        .exec(&txn)
        .await?
        .rows_affected;
    if deleted == 0 {
        return Err(Error::NotFound {
            entity: "Flat",
            id: flat_id.to_owned(),
        });
    }

    txn.commit().await?;
    info!(flat_id, tenants_unbound = unbound, "Deleted flat");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::query::SortDirection;
    use crate::test_utils::*;

    async fn seeded() -> Result<DatabaseConnection> {
        let db = setup_test_db().await?;
        create_test_apartment(&db, "A0000", "1 Mill Lane").await?;
        create_test_apartment(&db, "A0001", "2 Mill Lane").await?;
        create_test_flat(&db, "F0000", "A0000", 1, 12.5).await?;
        create_test_flat(&db, "F0001", "A0000", 2, 2.5).await?;
        create_test_flat(&db, "F0002", "A0000", 10, 95.0).await?;
        create_test_flat(&db, "F0003", "A0001", 1, 70.0).await?;
        create_test_tenant(&db, "T0000", "Jane", "Doe", Some("F0000")).await?;
        create_test_tenant(&db, "T0001", "John", "Roe", Some("F0000")).await?;
        create_test_tenant(&db, "T0002", "Jane", "Smith", Some("F0001")).await?;
        create_test_tenant(&db, "T0003", "Ann", "Lee", Some("F0003")).await?;
        Ok(db)
    }

    fn numbers(rows: &[FlatRow]) -> Vec<i64> {
        rows.iter().map(|r| r.flat_number).collect()
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_apartment() -> Result<()> {
        let db = seeded().await?;
        let rows = list(&db, "A0000", &ListQuery::new()).await?;
        assert_eq!(numbers(&rows), [1, 2, 10]);

        assert_eq!(rows[0].num_tenants, 2);
        assert_eq!(rows[0].tenants.as_deref(), Some("Jane Doe, John Roe"));
        assert_eq!(rows[2].num_tenants, 0);
        assert_eq!(rows[2].tenants, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_sorts_by_rent_descending() -> Result<()> {
        let db = seeded().await?;
        let query = ListQuery::new().sorted(FlatField::WeeklyRent, SortDirection::Descending);
        assert_eq!(numbers(&list(&db, "A0000", &query).await?), [10, 1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_rent_search_uses_formatted_prefix() -> Result<()> {
        let db = seeded().await?;
        let query = ListQuery::new().searching(FlatField::WeeklyRent, "12.5");
        assert_eq!(numbers(&list(&db, "A0000", &query).await?), [1]);

        let query = ListQuery::new().searching(FlatField::WeeklyRent, "2.50");
        assert_eq!(numbers(&list(&db, "A0000", &query).await?), [2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_flat_number_search_is_prefix() -> Result<()> {
        let db = seeded().await?;
        let query = ListQuery::new().searching(FlatField::FlatNumber, "1");
        assert_eq!(numbers(&list(&db, "A0000", &query).await?), [1, 10]);
        Ok(())
    }

    #[tokio::test]
    async fn test_num_tenants_search() -> Result<()> {
        let db = seeded().await?;
        let query = ListQuery::new().searching(FlatField::NumTenants, "0");
        assert_eq!(numbers(&list(&db, "A0000", &query).await?), [10]);
        Ok(())
    }

    #[tokio::test]
    async fn test_multi_token_tenant_search() -> Result<()> {
        let db = seeded().await?;
        let query = ListQuery::new().searching(FlatField::Tenants, "jane, roe");
        assert_eq!(numbers(&list(&db, "A0000", &query).await?), [1]);

        let query = ListQuery::new().searching(FlatField::Tenants, "jane, smith");
        assert_eq!(numbers(&list(&db, "A0000", &query).await?), [2]);

        let query = ListQuery::new().searching(FlatField::Tenants, "JANE");
        assert_eq!(numbers(&list(&db, "A0000", &query).await?), [1, 2]);

        let query = ListQuery::new().searching(FlatField::Tenants, "nobody");
        assert!(list(&db, "A0000", &query).await?.is_empty());
        Ok(())
    }

    #[test]
    fn test_tenants_field_is_not_sortable() {
        assert!(!FlatField::Tenants.sortable());
        assert!(FlatField::WeeklyRent.sortable());
    }

    #[tokio::test]
    async fn test_find_id_and_round_trip() -> Result<()> {
        let db = seeded().await?;
        assert_eq!(find_id(&db, "A0000", 2).await?.as_deref(), Some("F0001"));
        assert_eq!(find_id(&db, "A0001", 2).await?, None);

        let record = FlatModel {
            flat_id: free_id(&db).await?,
            apartment_id: "A0001".to_string(),
            flat_number: 2,
            weekly_rent: 88.25,
            description: Some("Top floor".to_string()),
        };
        assert_eq!(record.flat_id, "F0004");
        add(&db, record.clone()).await?;
        assert_eq!(get(&db, "F0004").await?, Some(record));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_flat_number_is_rejected_by_index() -> Result<()> {
        let db = seeded().await?;
        let result = create_test_flat(&db, "F0009", "A0000", 1, 10.0).await;
        assert!(matches!(result, Err(Error::Database(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_keeps_apartment() -> Result<()> {
        let db = seeded().await?;
        let mut changes = get(&db, "F0002").await?.unwrap();
        changes.flat_number = 11;
        changes.weekly_rent = 99.0;
        changes.apartment_id = "A0001".to_string();
        let updated = edit(&db, "F0002", changes).await?;

        assert_eq!(updated.apartment_id, "A0000");
        assert_eq!(updated.flat_number, 11);
        let row = get_row(&db, "F0002").await?.unwrap();
        assert_eq!(row.weekly_rent, 99.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unbinds_only_its_tenants() -> Result<()> {
        let db = seeded().await?;
        delete(&db, "F0000").await?;

        assert!(get(&db, "F0000").await?.is_none());
        assert!(get(&db, "F0001").await?.is_some());

        let tenants = Tenant::find().order_by_asc(TenantColumn::TenantId).all(&db).await?;
        let flats: Vec<_> = tenants.iter().map(|t| t.flat_id.as_deref()).collect();
        assert_eq!(flats, [None, None, Some("F0001"), Some("F0003")]);
        Ok(())
    }
}
