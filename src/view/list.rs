//! Search/sort controller for one entity list.
//!
//! The controller owns the rows on screen and the state that produced them. It decides when a
//! request actually reaches the database: repeated identical searches are dropped, heading
//! clicks toggle direction, and after a mutation the rows are patched locally instead of being
//! reloaded.

use crate::{
    core::query::{ListField, ListQuery, SortDirection},
    errors::Result,
    view::{DisplayMode, REFRESHED, normalize_term},
};
use sea_orm::ConnectionTrait;
use tracing::debug;

/// Where a list gets its rows and how they are shown.
#[allow(async_fn_in_trait)]
pub trait ListSource {
    /// Columns of the list
    type Field: ListField;
    /// One displayed line
    type Row: Clone;

    /// Runs one list request against the database.
    async fn fetch<C: ConnectionTrait>(
        &self,
        db: &C,
        query: &ListQuery<Self::Field>,
    ) -> Result<Vec<Self::Row>>;

    /// Display values of `row`, one per entry of `Self::Field::ALL`.
    fn cells(&self, row: &Self::Row) -> Vec<String>;
}

/// Live view over one entity list.
pub struct ListController<S: ListSource> {
    source: S,
    rows: Vec<S::Row>,
    search_field: S::Field,
    /// `None` forces the next search to hit the database
    search_term: Option<String>,
    /// `[toggle_origin, current_sort]`
    previous_sort_fields: [Option<S::Field>; 2],
    direction: SortDirection,
    mode: DisplayMode,
}

impl<S: ListSource> ListController<S> {
    /// An empty view; call [`Self::open`] to load it.
    pub fn new(source: S) -> Self {
        Self {
            source,
            rows: Vec::new(),
            search_field: S::Field::primary(),
            search_term: Some(String::new()),
            previous_sort_fields: [None, None],
            direction: SortDirection::Ascending,
            mode: DisplayMode::Details,
        }
    }

    /// Loads every row ordered by the primary field.
    pub async fn open<C: ConnectionTrait>(&mut self, db: &C) -> Result<()> {
        self.sort(db, S::Field::primary()).await
    }

    /// The source, e.g. to read which apartment a flat list belongs to.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Rows currently on screen.
    pub fn rows(&self) -> &[S::Row] {
        &self.rows
    }

    /// Row at a 0-based position.
    pub fn row(&self, position: usize) -> Option<&S::Row> {
        self.rows.get(position)
    }

    /// Column the next search filters.
    pub const fn search_field(&self) -> S::Field {
        self.search_field
    }

    /// The cached term, or `None` while a requery is pending.
    pub fn search_term(&self) -> Option<&str> {
        self.search_term.as_deref()
    }

    /// Field the rows are currently sorted on.
    pub const fn sort_field(&self) -> Option<S::Field> {
        self.previous_sort_fields[1]
    }

    /// Direction of the current sort.
    pub const fn direction(&self) -> SortDirection {
        self.direction
    }

    /// What the detail area is showing.
    pub const fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Set by the form flows before they validate.
    pub const fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    /// Column headings, with the sort marker on the sorted column.
    pub fn headings(&self) -> Vec<String> {
        S::Field::ALL
            .iter()
            .map(|&field| {
                if self.sort_field() == Some(field) {
                    format!("{} {}", field.label(), self.direction.marker())
                } else {
                    field.label().to_string()
                }
            })
            .collect()
    }

    /// Every row rendered as display values.
    pub fn table(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|row| self.source.cells(row)).collect()
    }

    /// Switches the search column and re-runs the current term against it.
    pub async fn set_search_column<C: ConnectionTrait>(
        &mut self,
        db: &C,
        field: S::Field,
    ) -> Result<()> {
        let term = self.search_term.take().unwrap_or_default();
        self.search_field = field;
        self.search(db, &term).await
    }

    /// Filters by `term`, keeping the current sort and its direction.
    ///
    /// Whitespace is collapsed first. A term equal to the cached one is ignored. The cached term
    /// and toggle state only change once the query has succeeded.
    pub async fn search<C: ConnectionTrait>(&mut self, db: &C, term: &str) -> Result<()> {
        let term = normalize_term(term);
        if self.search_term.as_deref() == Some(term.as_str()) {
            debug!(term, "Search unchanged, skipping query");
            return Ok(());
        }

        // Flip the origin so the re-sort lands on the same direction.
        let [origin, current] = self.previous_sort_fields;
        let origin = if origin == current { None } else { current };
        let field = current.unwrap_or_else(S::Field::primary);
        self.run_sort(db, field, origin, Some(term)).await
    }

    /// Sorts by `field`: ascending on first click, descending when clicked again.
    ///
    /// Fields that cannot be sorted by the query are ignored.
    pub async fn sort<C: ConnectionTrait>(&mut self, db: &C, field: S::Field) -> Result<()> {
        if !field.sortable() {
            debug!(?field, "Field is not sortable");
            return Ok(());
        }
        let origin = self.previous_sort_fields[0];
        let term = self.search_term.clone();
        self.run_sort(db, field, origin, term).await
    }

    async fn run_sort<C: ConnectionTrait>(
        &mut self,
        db: &C,
        field: S::Field,
        origin: Option<S::Field>,
        search_term: Option<String>,
    ) -> Result<()> {
        let toggled = origin == Some(field);
        let direction = if toggled {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        let query = ListQuery::new()
            .sorted(field, direction)
            .searching(self.search_field, search_term.clone().unwrap_or_default());
        self.rows = self.source.fetch(db, &query).await?;

        self.search_term = search_term;
        self.direction = direction;
        self.previous_sort_fields = [(!toggled).then_some(field), Some(field)];
        Ok(())
    }

    /// Clears search and sort state and reloads by the primary field.
    pub async fn refresh<C: ConnectionTrait>(&mut self, db: &C) -> Result<&'static str> {
        self.search_term = Some(String::new());
        self.search_field = S::Field::primary();
        self.previous_sort_fields = [None, None];
        self.mode = DisplayMode::Details;
        self.open(db).await?;
        Ok(REFRESHED)
    }

    /// Shows a newly registered row first, without a requery.
    pub fn insert_row(&mut self, row: S::Row) {
        self.rows.insert(0, row);
        self.mode = DisplayMode::Details;
    }

    /// Patches the row at `position` after an edit.
    pub fn replace_row(&mut self, position: usize, row: S::Row) {
        if let Some(slot) = self.rows.get_mut(position) {
            *slot = row;
        }
        self.mode = DisplayMode::Details;
    }

    /// Drops the row at `position` after a delete.
    pub fn remove_row(&mut self, position: usize) -> Option<S::Row> {
        self.mode = DisplayMode::Details;
        (position < self.rows.len()).then(|| self.rows.remove(position))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::employee::{EmployeeField, EmployeeRow};
    use crate::core::flat::FlatField;
    use crate::errors::Error;
    use crate::test_utils::*;
    use crate::view::sources::{EmployeeSource, FlatSource};
    use sea_orm::DbErr;
    use std::cell::Cell;

    /// Employee list that counts how often it reaches the database and can be taken offline.
    #[derive(Default)]
    struct CountingSource {
        inner: EmployeeSource,
        queries: Cell<usize>,
        offline: Cell<bool>,
    }

    impl ListSource for CountingSource {
        type Field = EmployeeField;
        type Row = EmployeeRow;

        async fn fetch<C: ConnectionTrait>(
            &self,
            db: &C,
            query: &ListQuery<EmployeeField>,
        ) -> Result<Vec<EmployeeRow>> {
            self.queries.set(self.queries.get() + 1);
            if self.offline.get() {
                return Err(Error::Database(DbErr::Custom("connection lost".into())));
            }
            self.inner.fetch(db, query).await
        }

        fn cells(&self, row: &EmployeeRow) -> Vec<String> {
            self.inner.cells(row)
        }
    }

    async fn opened() -> Result<(sea_orm::DatabaseConnection, ListController<CountingSource>)> {
        let db = setup_test_db().await?;
        create_test_employee(&db, "E0000", "Priya", "Shah").await?;
        create_test_employee(&db, "E0001", "Tom", "Baker").await?;
        create_test_employee(&db, "E0002", "Pete", "Shaw").await?;
        let mut list = ListController::new(CountingSource::default());
        list.open(&db).await?;
        Ok((db, list))
    }

    fn ids(list: &ListController<CountingSource>) -> Vec<&str> {
        list.rows().iter().map(|r| r.employee_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_identical_search_runs_one_query() -> Result<()> {
        let (db, mut list) = opened().await?;
        list.set_search_column(&db, EmployeeField::Surname).await?;
        let before = list.source().queries.get();

        list.search(&db, "sha").await?;
        list.search(&db, "  sha ").await?;
        assert_eq!(list.source().queries.get(), before + 1);
        assert_eq!(ids(&list), ["E0000", "E0002"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_sort_toggle_sequence() -> Result<()> {
        let (db, mut list) = opened().await?;
        assert_eq!(list.headings()[0], "Employee ID ▲");

        list.sort(&db, EmployeeField::Forename).await?;
        assert_eq!(list.direction(), SortDirection::Ascending);
        assert_eq!(ids(&list), ["E0002", "E0000", "E0001"]);

        list.sort(&db, EmployeeField::Forename).await?;
        assert_eq!(list.direction(), SortDirection::Descending);
        assert_eq!(list.headings()[1], "Forename ▼");
        assert_eq!(ids(&list), ["E0001", "E0000", "E0002"]);

        list.sort(&db, EmployeeField::Surname).await?;
        assert_eq!(list.direction(), SortDirection::Ascending);
        assert_eq!(list.headings()[1], "Forename");
        assert_eq!(list.headings()[2], "Surname ▲");

        // Back to the first column starts ascending again.
        list.sort(&db, EmployeeField::Forename).await?;
        assert_eq!(list.direction(), SortDirection::Ascending);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_preserves_direction() -> Result<()> {
        let (db, mut list) = opened().await?;
        list.sort(&db, EmployeeField::EmployeeId).await?;
        assert_eq!(list.direction(), SortDirection::Descending);

        list.search(&db, "e000").await?;
        assert_eq!(list.direction(), SortDirection::Descending);
        assert_eq!(ids(&list), ["E0002", "E0001", "E0000"]);

        list.search(&db, "E0001").await?;
        assert_eq!(list.direction(), SortDirection::Descending);

        // The toggle still works after searching.
        list.sort(&db, EmployeeField::EmployeeId).await?;
        assert_eq!(list.direction(), SortDirection::Ascending);
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_resets_state() -> Result<()> {
        let (db, mut list) = opened().await?;
        list.set_search_column(&db, EmployeeField::Forename).await?;
        list.search(&db, "tom").await?;
        list.sort(&db, EmployeeField::Surname).await?;
        assert_eq!(list.rows().len(), 1);

        assert_eq!(list.refresh(&db).await?, "Successfully refreshed records!");
        assert_eq!(list.search_field(), EmployeeField::EmployeeId);
        assert_eq!(list.search_term(), Some(""));
        assert_eq!(list.sort_field(), Some(EmployeeField::EmployeeId));
        assert_eq!(list.direction(), SortDirection::Ascending);
        assert_eq!(ids(&list), ["E0000", "E0001", "E0002"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_local_patches_skip_the_database() -> Result<()> {
        let (db, mut list) = opened().await?;
        let before = list.source().queries.get();
        let added = create_test_employee(&db, "E0003", "Ruth", "Ellis").await?;

        list.set_mode(DisplayMode::Register);
        list.insert_row(added.clone().into());
        assert_eq!(ids(&list), ["E0003", "E0000", "E0001", "E0002"]);
        assert_eq!(list.mode(), DisplayMode::Details);

        let mut edited = EmployeeRow::from(added);
        edited.contact = "0161 496 0000".to_string();
        list.set_mode(DisplayMode::Edit(0));
        list.replace_row(0, edited);
        assert_eq!(list.row(0).unwrap().contact, "0161 496 0000");

        let removed = list.remove_row(1).unwrap();
        assert_eq!(removed.employee_id, "E0000");
        assert!(list.remove_row(9).is_none());
        assert_eq!(list.rows().len(), 3);
        assert_eq!(list.source().queries.get(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_unsortable_field_is_ignored() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_apartment(&db, "A0000", "1 Main Street").await?;
        create_test_flat(&db, "F0000", "A0000", 2, 100.0).await?;
        create_test_flat(&db, "F0001", "A0000", 1, 90.0).await?;

        let mut list = ListController::new(FlatSource::new("A0000"));
        list.open(&db).await?;
        list.sort(&db, FlatField::Tenants).await?;
        assert_eq!(list.sort_field(), Some(FlatField::FlatNumber));
        assert_eq!(list.headings()[0], "Flat Number ▲");
        assert_eq!(list.table()[0], ["1", "0", "", "£90.00"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_search_can_be_retried() -> Result<()> {
        let (db, mut list) = opened().await?;
        list.sort(&db, EmployeeField::EmployeeId).await?;
        assert_eq!(list.direction(), SortDirection::Descending);

        list.source().offline.set(true);
        assert!(list.search(&db, "e0001").await.is_err());
        assert_eq!(list.search_term(), Some(""));
        assert_eq!(ids(&list), ["E0002", "E0001", "E0000"]);

        list.source().offline.set(false);
        let before = list.source().queries.get();
        list.search(&db, "e0001").await?;
        assert_eq!(list.source().queries.get(), before + 1);
        assert_eq!(ids(&list), ["E0001"]);
        assert_eq!(list.direction(), SortDirection::Descending);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_sort_keeps_toggle_state() -> Result<()> {
        let (db, mut list) = opened().await?;
        list.source().offline.set(true);
        assert!(list.sort(&db, EmployeeField::EmployeeId).await.is_err());
        assert_eq!(list.direction(), SortDirection::Ascending);

        list.source().offline.set(false);
        list.sort(&db, EmployeeField::EmployeeId).await?;
        assert_eq!(list.direction(), SortDirection::Descending);
        Ok(())
    }
}
