//! Controller for the payment list.
//!
//! Payments do not use the generic sort toggle. The "Type" heading cycles the type filter,
//! "Date" and "Time" each flip their own direction, and the other headings do nothing. Every
//! payment mutation is followed by a full requery because the list interleaves two tables.

use crate::{
    core::{
        payment::{self, PaymentField, PaymentQuery, PaymentRow, PaymentType, TypeFilter},
        query::ListField,
    },
    errors::Result,
    view::{DisplayMode, REFRESHED, normalize_term},
};
use sea_orm::ConnectionTrait;
use tracing::debug;

/// Live view over the payment list.
#[derive(Debug, Default)]
pub struct PaymentsController {
    query: PaymentQuery,
    /// Mirrors `query.search_term`; `None` forces the next search to requery
    search_term: Option<String>,
    rows: Vec<PaymentRow>,
    mode: DisplayMode,
}

impl PaymentsController {
    /// An empty view; call [`Self::open`] to load it.
    pub fn new() -> Self {
        Self {
            search_term: Some(String::new()),
            ..Self::default()
        }
    }

    /// Loads the newest payments of both types.
    pub async fn open<C: ConnectionTrait>(&mut self, db: &C) -> Result<()> {
        self.reload_with(db, self.query.clone()).await
    }

    /// Rows currently on screen.
    pub fn rows(&self) -> &[PaymentRow] {
        &self.rows
    }

    /// Row at a 0-based position.
    pub fn row(&self, position: usize) -> Option<&PaymentRow> {
        self.rows.get(position)
    }

    /// The request that produced the current rows.
    pub const fn query(&self) -> &PaymentQuery {
        &self.query
    }

    /// What the detail area is showing.
    pub const fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Set by the form flows before they validate.
    pub const fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    /// Headings with the current type filter and both direction markers.
    pub fn headings(&self) -> Vec<String> {
        PaymentField::ALL
            .iter()
            .map(|&field| match field {
                PaymentField::Type => match self.query.type_filter {
                    TypeFilter::Both => "Type".to_string(),
                    TypeFilter::Only(payment_type) => format!("Type ({payment_type})"),
                },
                PaymentField::Date => format!("Date {}", self.query.date_direction.marker()),
                PaymentField::Time => format!("Time {}", self.query.time_direction.marker()),
                other => other.label().to_string(),
            })
            .collect()
    }

    /// Rows as display values, amounts signed by direction.
    pub fn table(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                vec![
                    row.payment_type.to_string(),
                    row.payee.clone(),
                    row.method.clone(),
                    row.amount_display(),
                    row.date.clone(),
                    row.time.clone(),
                ]
            })
            .collect()
    }

    /// Switches the search column and re-runs the current term against it.
    pub async fn set_search_column<C: ConnectionTrait>(
        &mut self,
        db: &C,
        field: PaymentField,
    ) -> Result<()> {
        let term = self.search_term.take().unwrap_or_default();
        self.query.search_field = field;
        self.search(db, &term).await
    }

    /// Filters by `term` on the search column. A term equal to the cached one is ignored.
    pub async fn search<C: ConnectionTrait>(&mut self, db: &C, term: &str) -> Result<()> {
        let term = normalize_term(term);
        if self.search_term.as_deref() == Some(term.as_str()) {
            debug!(term, "Search unchanged, skipping query");
            return Ok(());
        }
        let query = PaymentQuery {
            search_term: term.clone(),
            ..self.query.clone()
        };
        self.reload_with(db, query).await?;
        self.search_term = Some(term);
        Ok(())
    }

    /// Reacts to a heading click.
    pub async fn sort<C: ConnectionTrait>(&mut self, db: &C, field: PaymentField) -> Result<()> {
        let mut query = self.query.clone();
        match field {
            PaymentField::Type => query.type_filter = query.type_filter.next(),
            PaymentField::Date => query.date_direction = query.date_direction.reversed(),
            PaymentField::Time => query.time_direction = query.time_direction.reversed(),
            PaymentField::Payee | PaymentField::Method | PaymentField::Amount => {
                debug!(?field, "Heading is not sortable");
                return Ok(());
            }
        }
        self.reload_with(db, query).await
    }

    /// Restores the default filter, directions and search.
    pub async fn refresh<C: ConnectionTrait>(&mut self, db: &C) -> Result<&'static str> {
        self.reload_with(db, PaymentQuery::default()).await?;
        self.search_term = Some(String::new());
        self.mode = DisplayMode::Details;
        Ok(REFRESHED)
    }

    /// Requeries after a payment was added, edited or deleted.
    pub async fn after_mutation<C: ConnectionTrait>(&mut self, db: &C) -> Result<()> {
        self.mode = DisplayMode::Details;
        self.reload_with(db, self.query.clone()).await
    }

    // The query is only kept once its rows came back.
    async fn reload_with<C: ConnectionTrait>(&mut self, db: &C, query: PaymentQuery) -> Result<()> {
        self.rows = payment::list(db, &query).await?;
        self.query = query;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::SortDirection;
    use crate::test_utils::*;

    async fn opened() -> Result<(sea_orm::DatabaseConnection, PaymentsController)> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "T0000", "Jane", "Doe", None).await?;
        create_test_employee(&db, "E0000", "Tom", "Baker").await?;
        create_test_payment(&db, PaymentType::Inbound, "T0000", 100.0, "2024-03-01").await?;
        create_test_payment(&db, PaymentType::Outbound, "E0000", 40.5, "2024-03-02").await?;
        let mut payments = PaymentsController::new();
        payments.open(&db).await?;
        Ok((db, payments))
    }

    fn first_type(payments: &PaymentsController) -> Option<PaymentType> {
        payments.row(0).map(|row| row.payment_type)
    }

    #[tokio::test]
    async fn test_defaults_and_rendering() -> Result<()> {
        let (_db, payments) = opened().await?;
        assert_eq!(payments.query().search_field, PaymentField::Payee);
        assert_eq!(
            payments.headings(),
            ["Type", "Payee", "Method", "Amount", "Date ▼", "Time ▼"]
        );
        assert_eq!(
            payments.table(),
            [
                ["Outbound", "Tom Baker", "Card", "- £40.50", "2024-03-02", "12:00"],
                ["Inbound", "Jane Doe", "Card", "+£100.00", "2024-03-01", "12:00"],
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_heading_clicks() -> Result<()> {
        let (db, mut payments) = opened().await?;

        payments.sort(&db, PaymentField::Type).await?;
        assert_eq!(payments.headings()[0], "Type (Inbound)");
        assert_eq!(payments.rows().len(), 1);

        payments.sort(&db, PaymentField::Type).await?;
        assert_eq!(first_type(&payments), Some(PaymentType::Outbound));

        payments.sort(&db, PaymentField::Type).await?;
        assert_eq!(payments.rows().len(), 2);

        payments.sort(&db, PaymentField::Date).await?;
        assert_eq!(payments.query().date_direction, SortDirection::Ascending);
        assert_eq!(first_type(&payments), Some(PaymentType::Inbound));

        let before = payments.query().clone();
        payments.sort(&db, PaymentField::Amount).await?;
        assert_eq!(payments.query(), &before);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_and_refresh() -> Result<()> {
        let (db, mut payments) = opened().await?;
        payments.search(&db, " tom ").await?;
        assert_eq!(payments.rows().len(), 1);

        payments.set_search_column(&db, PaymentField::Method).await?;
        assert!(payments.rows().is_empty());

        payments.sort(&db, PaymentField::Time).await?;
        assert_eq!(payments.refresh(&db).await?, REFRESHED);
        assert_eq!(payments.query(), &PaymentQuery::default());
        assert_eq!(payments.rows().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_mutations_requery() -> Result<()> {
        let (db, mut payments) = opened().await?;
        create_test_payment(&db, PaymentType::Inbound, "T0000", 5.0, "2024-04-01").await?;
        payments.set_mode(DisplayMode::Register);

        payments.after_mutation(&db).await?;
        assert_eq!(payments.mode(), DisplayMode::Details);
        assert_eq!(payments.rows().len(), 3);
        assert_eq!(payments.row(0).map(PaymentRow::amount_display).as_deref(), Some("+£5.00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_query_leaves_state_untouched() -> Result<()> {
        let (db, mut payments) = opened().await?;
        db.execute_unprepared("ALTER TABLE EmployeeTbl RENAME TO EmployeeTblAway")
            .await?;

        assert!(payments.search(&db, "tom").await.is_err());
        assert!(payments.sort(&db, PaymentField::Date).await.is_err());
        assert_eq!(payments.query(), &PaymentQuery::default());
        assert_eq!(payments.rows().len(), 2);

        db.execute_unprepared("ALTER TABLE EmployeeTblAway RENAME TO EmployeeTbl")
            .await?;
        payments.search(&db, "tom").await?;
        assert_eq!(payments.rows().len(), 1);
        assert_eq!(payments.query().search_term, "tom");
        Ok(())
    }
}
