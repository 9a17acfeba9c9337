//! List query plumbing shared by every repository.
//!
//! A list request is a [`ListQuery`]: sort field, direction, search field and search term. Each
//! entity declares its fields through [`ListField`], mapping an on-screen label either to a SQL
//! expression (filtered in the `WHERE` clause) or to a computed value that the repository
//! filters after the rows come back. SQL identifiers only ever come from those mappings; search
//! terms are always bound.

use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, EntityTrait, QueryOrder, QueryResult, QuerySelect, Statement, Value,
};
use std::fmt::Debug;
use tracing::debug;

/// Where a field's value lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// A stored column or pushed-down expression, usable in `WHERE`
    Column(&'static str),
    /// Derived by aggregation or joining; filtered in the application
    Computed,
}

/// A searchable, sortable column of one entity list.
pub trait ListField: Copy + Eq + Debug + 'static {
    /// Every field, in display order.
    const ALL: &'static [Self];

    /// Heading shown above the column.
    fn label(self) -> &'static str;

    /// Where the value lives.
    fn kind(self) -> FieldKind;

    /// Expression used in `ORDER BY`. Computed fields sort on their select alias.
    fn sort_key(self) -> &'static str;

    /// Default sort and search field.
    fn primary() -> Self;

    /// Whether a heading click may sort on this field.
    fn sortable(self) -> bool {
        true
    }

    /// Looks a field up by its heading, ignoring case and spaces.
    fn from_label(label: &str) -> Option<Self> {
        let wanted: String = label.split_whitespace().collect();
        Self::ALL.iter().copied().find(|field| {
            let name: String = field.label().split_whitespace().collect();
            name.eq_ignore_ascii_case(&wanted)
        })
    }
}

/// Explicit sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

impl SortDirection {
    /// `ASC` or `DESC`
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }

    /// Heading decoration
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Ascending => "▲",
            Self::Descending => "▼",
        }
    }

    /// The other direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// One list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery<F> {
    /// Column to order by
    pub sort: F,
    /// Applies to `sort` only
    pub direction: SortDirection,
    /// Column the term is matched against
    pub search_field: F,
    /// Prefix to match; empty or `*` means no filter
    pub search_term: String,
}

impl<F: ListField> Default for ListQuery<F> {
    fn default() -> Self {
        Self {
            sort: F::primary(),
            direction: SortDirection::Ascending,
            search_field: F::primary(),
            search_term: String::new(),
        }
    }
}

impl<F: ListField> ListQuery<F> {
    /// Unfiltered list ordered by the primary field, ascending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders by `field` in `direction`.
    #[must_use]
    pub fn sorted(mut self, field: F, direction: SortDirection) -> Self {
        self.sort = field;
        self.direction = direction;
        self
    }

    /// Filters `field` by the prefix `term`.
    #[must_use]
    pub fn searching(mut self, field: F, term: impl Into<String>) -> Self {
        self.search_field = field;
        self.search_term = term.into();
        self
    }

    /// True when a search term is set and is not the `*` wildcard.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !is_wildcard(&self.search_term)
    }

    /// `WHERE` fragment and bound pattern for a stored-column search, if any.
    #[must_use]
    pub fn column_filter(&self) -> Option<(String, Value)> {
        match self.search_field.kind() {
            FieldKind::Column(expr) if self.is_filtered() => Some((
                format!("{expr} LIKE ? ESCAPE '\\'"),
                Value::from(like_prefix(&self.search_term)),
            )),
            _ => None,
        }
    }

    /// The computed field to filter on after fetching, if any.
    #[must_use]
    pub fn computed_filter(&self) -> Option<F> {
        (self.is_filtered() && self.search_field.kind() == FieldKind::Computed)
            .then_some(self.search_field)
    }

    /// `ORDER BY` body: the sort expression and its direction.
    #[must_use]
    pub fn order_by(&self) -> String {
        format!("{} {}", self.sort.sort_key(), self.direction.sql())
    }
}

/// An empty term or `*` means "no filter".
#[must_use]
pub fn is_wildcard(term: &str) -> bool {
    term.is_empty() || term == "*"
}

/// Escapes `%`, `_` and `\` in `term` and appends the trailing `%` of a prefix match.
#[must_use]
pub fn like_prefix(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 1);
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Formats an amount the way every list shows money.
#[must_use]
pub fn format_money(amount: f64) -> String {
    format!("£{amount:.2}")
}

/// Rounds to whole pence.
#[must_use]
pub fn round_pence(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Prefix match against a value rendered with two decimals, so rent `12.5` matches `"12.5"`.
#[must_use]
pub fn matches_amount_prefix(value: f64, term: &str) -> bool {
    format!("{value:.2}").starts_with(term)
}

/// Count columns are matched the same way as money.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn matches_count_prefix(value: i64, term: &str) -> bool {
    matches_amount_prefix(value as f64, term)
}

/// Every comma-separated token of `term` must prefix some name, case-insensitively.
///
/// A token matches a name when it prefixes the whole name or any word of it, so `"roe"` finds
/// `"John Roe"`. Tokens are matched independently and may hit the same name. An empty name
/// list never matches.
#[must_use]
pub fn matches_all_names(names: &[String], term: &str) -> bool {
    let names: Vec<String> = names.iter().map(|name| name.to_lowercase()).collect();
    term.to_lowercase().split(',').map(str::trim).all(|token| {
        names.iter().any(|name| {
            name.starts_with(token) || name.split_whitespace().any(|word| word.starts_with(token))
        })
    })
}

/// Returns the first gap in the zero-padded `prefix` sequence, or the id after the last one.
///
/// `ids` must be sorted ascending.
#[must_use]
pub fn next_free_id(prefix: char, ids: &[String]) -> String {
    ids.iter()
        .enumerate()
        .find_map(|(position, id)| {
            let expected = format!("{prefix}{position:04}");
            (expected != *id).then_some(expected)
        })
        .unwrap_or_else(|| format!("{prefix}{:04}", ids.len()))
}

/// Scans `column` of entity `E` in ascending order and returns the next free id.
pub async fn scan_free_id<E, C>(db: &C, column: E::Column, prefix: char) -> Result<String>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let ids: Vec<String> = E::find()
        .select_only()
        .column(column)
        .order_by_asc(column)
        .into_tuple()
        .all(db)
        .await?;
    Ok(next_free_id(prefix, &ids))
}

/// Runs a raw, parameterized statement and returns every row.
pub async fn fetch_all<C>(db: &C, sql: &str, values: Vec<Value>) -> Result<Vec<QueryResult>>
where
    C: ConnectionTrait,
{
    debug!(sql, params = values.len(), "Running query");
    let statement = Statement::from_sql_and_values(db.get_database_backend(), sql, values);
    db.query_all(statement).await.map_err(Into::into)
}

/// Like [`fetch_all`] but for statements returning at most one row.
pub async fn fetch_one<C>(db: &C, sql: &str, values: Vec<Value>) -> Result<Option<QueryResult>>
where
    C: ConnectionTrait,
{
    debug!(sql, params = values.len(), "Running single-row query");
    let statement = Statement::from_sql_and_values(db.get_database_backend(), sql, values);
    db.query_one(statement).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Field {
        Name,
        Total,
    }

    impl ListField for Field {
        const ALL: &'static [Self] = &[Self::Name, Self::Total];

        fn label(self) -> &'static str {
            match self {
                Self::Name => "Full Name",
                Self::Total => "Total",
            }
        }

        fn kind(self) -> FieldKind {
            match self {
                Self::Name => FieldKind::Column("FullName"),
                Self::Total => FieldKind::Computed,
            }
        }

        fn sort_key(self) -> &'static str {
            match self {
                Self::Name => "FullName",
                Self::Total => "Total",
            }
        }

        fn primary() -> Self {
            Self::Name
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn free_id_fills_first_gap() {
        assert_eq!(next_free_id('A', &ids(&["A0000", "A0001", "A0003"])), "A0002");
    }

    #[test]
    fn free_id_appends_after_dense_sequence() {
        assert_eq!(next_free_id('A', &ids(&["A0000", "A0001", "A0002"])), "A0003");
    }

    #[test]
    fn free_id_starts_at_zero() {
        assert_eq!(next_free_id('T', &[]), "T0000");
        assert_eq!(next_free_id('E', &ids(&["E0001"])), "E0000");
    }

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("sm"), "sm%");
        assert_eq!(like_prefix("50%_off\\"), "50\\%\\_off\\\\%");
    }

    #[test]
    fn wildcard_terms_do_not_filter() {
        let query = ListQuery::<Field>::new().searching(Field::Name, "*");
        assert!(!query.is_filtered());
        assert!(query.column_filter().is_none());

        let query = ListQuery::<Field>::new();
        assert!(query.column_filter().is_none());
        assert!(query.computed_filter().is_none());
    }

    #[test]
    fn column_and_computed_filters_are_distinct() {
        let query = ListQuery::new().searching(Field::Name, "sm");
        let (clause, value) = query.column_filter().unwrap();
        assert_eq!(clause, "FullName LIKE ? ESCAPE '\\'");
        assert_eq!(value, Value::from("sm%".to_string()));
        assert!(query.computed_filter().is_none());

        let query = ListQuery::new().searching(Field::Total, "12");
        assert!(query.column_filter().is_none());
        assert_eq!(query.computed_filter(), Some(Field::Total));
    }

    #[test]
    fn order_by_uses_direction() {
        let query = ListQuery::new().sorted(Field::Total, SortDirection::Descending);
        assert_eq!(query.order_by(), "Total DESC");
        assert_eq!(ListQuery::<Field>::new().order_by(), "FullName ASC");
    }

    #[test]
    fn labels_resolve_without_spaces_or_case() {
        assert_eq!(Field::from_label("fullname"), Some(Field::Name));
        assert_eq!(Field::from_label("Full  Name"), Some(Field::Name));
        assert_eq!(Field::from_label("missing"), None);
    }

    #[test]
    fn amount_prefix_uses_two_decimals() {
        assert!(matches_amount_prefix(12.5, "12.5"));
        assert!(matches_amount_prefix(12.5, "12.50"));
        assert!(!matches_amount_prefix(12.5, "2.50"));
        assert!(matches_count_prefix(3, "3"));
        assert!(matches_count_prefix(3, "3.00"));
    }

    #[test]
    fn name_tokens_match_independently() {
        let names = ids(&["Jane Doe", "John Roe"]);
        assert!(matches_all_names(&names, "jane, roe"));
        assert!(matches_all_names(&names, "JOHN"));
        assert!(matches_all_names(&names, "jane d, jo"));
        assert!(!matches_all_names(&names, "jane, smith"));
        assert!(!matches_all_names(&[], "jane"));
    }

    #[test]
    fn money_formatting_and_rounding() {
        assert_eq!(format_money(12.5), "£12.50");
        assert!((round_pence(10.456) - 10.46).abs() < f64::EPSILON);
    }
}
