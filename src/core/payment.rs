//! Payment repository - money in from tenants and out to employees.
//!
//! A payment row never names its payee. Inbound payments are linked to a tenant through
//! `FlatPaymentsTbl`, outbound ones to an employee through `EmployeePaymentsTbl`; the link table
//! is chosen once, at creation, by the payment type. Listing joins both sides into one ordered
//! view sorted by date, then time.

use crate::{
    core::query::{self, FieldKind, ListField, ListQuery, SortDirection},
    entities::{
        Employee, EmployeeColumn, EmployeePayment, EmployeePaymentColumn, FlatPayment,
        FlatPaymentColumn, Payment, Tenant, TenantColumn, employee_payment, flat_payment,
        payment,
    },
    errors::{Error, Result},
};
use sea_orm::{
    ActiveValue::Unchanged, QueryOrder, QueryResult, Set, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use std::fmt;
use tracing::{info, instrument};

const INBOUND_SELECT: &str = r"
SELECT PaymentsTbl.PaymentID AS PaymentID,
       PaymentsTbl.PaymentType AS PaymentType,
       TenantTbl.TenantForename || ' ' || TenantTbl.TenantSurname AS Payee,
       PaymentsTbl.PaymentMethod AS PaymentMethod,
       CAST(PaymentsTbl.TotalPaid AS REAL) AS TotalPaid,
       PaymentsTbl.PaymentDate AS PaymentDate,
       PaymentsTbl.PaymentTime AS PaymentTime
FROM PaymentsTbl
INNER JOIN FlatPaymentsTbl ON PaymentsTbl.PaymentID = FlatPaymentsTbl.PaymentID
INNER JOIN TenantTbl ON FlatPaymentsTbl.TenantID = TenantTbl.TenantID
WHERE PaymentsTbl.PaymentType = 'Inbound'";

const OUTBOUND_SELECT: &str = r"
SELECT PaymentsTbl.PaymentID AS PaymentID,
       PaymentsTbl.PaymentType AS PaymentType,
       EmployeeTbl.EmployeeForename || ' ' || EmployeeTbl.EmployeeSurname AS Payee,
       PaymentsTbl.PaymentMethod AS PaymentMethod,
       CAST(PaymentsTbl.TotalPaid AS REAL) AS TotalPaid,
       PaymentsTbl.PaymentDate AS PaymentDate,
       PaymentsTbl.PaymentTime AS PaymentTime
FROM PaymentsTbl
INNER JOIN EmployeePaymentsTbl ON PaymentsTbl.PaymentID = EmployeePaymentsTbl.PaymentID
INNER JOIN EmployeeTbl ON EmployeePaymentsTbl.EmployeeID = EmployeeTbl.EmployeeID
WHERE PaymentsTbl.PaymentType = 'Outbound'";

/// Direction of a payment, which also decides who the payee is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentType {
    /// Received from a tenant
    Inbound,
    /// Paid to an employee
    Outbound,
}

impl PaymentType {
    /// Stored value of `PaymentType`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "Inbound",
            Self::Outbound => "Outbound",
        }
    }

    /// Case-insensitive parse of `"Inbound"` / `"Outbound"`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("inbound") {
            Some(Self::Inbound)
        } else if value.eq_ignore_ascii_case("outbound") {
            Some(Self::Outbound)
        } else {
            None
        }
    }

    /// `+£X.XX` for money in, `- £X.XX` for money out.
    #[must_use]
    pub fn signed_amount(self, amount: f64) -> String {
        match self {
            Self::Inbound => format!("+£{amount:.2}"),
            Self::Outbound => format!("- £{amount:.2}"),
        }
    }

    fn from_stored(value: &str) -> Result<Self> {
        Self::parse(value)
            .ok_or_else(|| DbErr::Type(format!("unknown payment type '{value}'")).into())
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which payment types the list shows. Heading clicks cycle both, inbound, outbound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TypeFilter {
    /// Inbound and outbound together
    #[default]
    Both,
    /// A single direction
    Only(PaymentType),
}

impl TypeFilter {
    /// Next state of the cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Both => Self::Only(PaymentType::Inbound),
            Self::Only(PaymentType::Inbound) => Self::Only(PaymentType::Outbound),
            Self::Only(PaymentType::Outbound) => Self::Both,
        }
    }
}

/// Columns of the payment list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentField {
    /// `Inbound` or `Outbound`
    Type,
    /// Name of the tenant or employee
    Payee,
    /// How the money moved
    Method,
    /// Total paid, unsigned
    Amount,
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM`
    Time,
}

impl ListField for PaymentField {
    const ALL: &'static [Self] = &[
        Self::Type,
        Self::Payee,
        Self::Method,
        Self::Amount,
        Self::Date,
        Self::Time,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Type => "Type",
            Self::Payee => "Payee",
            Self::Method => "Method",
            Self::Amount => "Amount",
            Self::Date => "Date",
            Self::Time => "Time",
        }
    }

    // Both typed selects alias their columns identically, so the aliases filter the union.
    // Amounts are matched as shown on screen, with two decimals.
    fn kind(self) -> FieldKind {
        match self {
            Self::Amount => FieldKind::Column("printf('%.2f', TotalPaid)"),
            other => FieldKind::Column(other.sort_key()),
        }
    }

    fn sort_key(self) -> &'static str {
        match self {
            Self::Type => "PaymentType",
            Self::Payee => "Payee",
            Self::Method => "PaymentMethod",
            Self::Amount => "TotalPaid",
            Self::Date => "PaymentDate",
            Self::Time => "PaymentTime",
        }
    }

    fn primary() -> Self {
        Self::Payee
    }

    fn sortable(self) -> bool {
        matches!(self, Self::Date | Self::Time)
    }
}

/// One payment list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentQuery {
    /// Types to show
    pub type_filter: TypeFilter,
    /// Primary ordering
    pub date_direction: SortDirection,
    /// Ordering within one date
    pub time_direction: SortDirection,
    /// Column the term is matched against
    pub search_field: PaymentField,
    /// Prefix to match; empty or `*` means no filter
    pub search_term: String,
}

impl Default for PaymentQuery {
    /// Both types, newest first, no search.
    fn default() -> Self {
        Self {
            type_filter: TypeFilter::Both,
            date_direction: SortDirection::Descending,
            time_direction: SortDirection::Descending,
            search_field: PaymentField::Payee,
            search_term: String::new(),
        }
    }
}

impl PaymentQuery {
    fn search(&self) -> ListQuery<PaymentField> {
        ListQuery::new().searching(self.search_field, self.search_term.clone())
    }
}

/// One line of the payment list.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentRow {
    /// Key in `PaymentsTbl`
    pub payment_id: i64,
    /// Direction of the payment
    pub payment_type: PaymentType,
    /// "Forename Surname" of the tenant or employee
    pub payee: String,
    /// Cash, card, transfer...
    pub method: String,
    /// Unsigned; see [`PaymentRow::amount_display`]
    pub amount: f64,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
}

impl PaymentRow {
    fn from_query(row: &QueryResult) -> Result<Self> {
        let payment_type: String = row.try_get("", "PaymentType")?;
        Ok(Self {
            payment_id: row.try_get("", "PaymentID")?,
            payment_type: PaymentType::from_stored(&payment_type)?,
            payee: row.try_get("", "Payee")?,
            method: row.try_get("", "PaymentMethod")?,
            amount: row.try_get("", "TotalPaid")?,
            date: row.try_get("", "PaymentDate")?,
            time: row.try_get("", "PaymentTime")?,
        })
    }

    /// Amount with its direction sign.
    #[must_use]
    pub fn amount_display(&self) -> String {
        self.payment_type.signed_amount(self.amount)
    }
}

/// What the register and edit forms submit.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentRecord {
    /// Fixed once the payment is recorded
    pub payment_type: PaymentType,
    /// Tenant id for inbound, employee id for outbound
    pub payee_id: String,
    /// Cash, card, transfer...
    pub method: String,
    /// Positive amount rounded to pence
    pub total_paid: f64,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    /// Free-text notes
    pub description: Option<String>,
}

/// A stored payment with its resolved payee.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentDetails {
    /// Key in `PaymentsTbl`
    pub payment_id: i64,
    /// Stored fields and payee id
    pub record: PaymentRecord,
    /// `"<id> <forename> <surname>"`, as offered by [`payees`]
    pub payee_label: String,
}

/// A candidate payee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payee {
    /// Tenant or employee code
    pub id: String,
    /// Given name
    pub forename: String,
    /// Family name
    pub surname: String,
}

impl Payee {
    /// `"<id> <forename> <surname>"`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {} {}", self.id, self.forename, self.surname)
    }
}

/// Lists payments of the filtered type(s), searched and ordered by date then time.
pub async fn list<C: ConnectionTrait>(db: &C, payment_query: &PaymentQuery) -> Result<Vec<PaymentRow>> {
    let typed = match payment_query.type_filter {
        TypeFilter::Both => format!("{INBOUND_SELECT}\nUNION ALL\n{OUTBOUND_SELECT}"),
        TypeFilter::Only(PaymentType::Inbound) => INBOUND_SELECT.to_string(),
        TypeFilter::Only(PaymentType::Outbound) => OUTBOUND_SELECT.to_string(),
    };

    let mut sql = format!("SELECT * FROM ({typed}\n)");
    let mut values = Vec::new();
    if let Some((clause, pattern)) = payment_query.search().column_filter() {
        sql.push_str("\nWHERE ");
        sql.push_str(&clause);
        values.push(pattern);
    }
    sql.push_str(&format!(
        "\nORDER BY PaymentDate {}, PaymentTime {}, PaymentID ASC",
        payment_query.date_direction.sql(),
        payment_query.time_direction.sql()
    ));

    query::fetch_all(db, &sql, values)
        .await?
        .iter()
        .map(PaymentRow::from_query)
        .collect()
}

/// Loads a payment and resolves its payee through the link table of its type.
pub async fn get<C: ConnectionTrait>(db: &C, payment_id: i64) -> Result<Option<PaymentDetails>> {
    let Some(stored) = Payment::find_by_id(payment_id).one(db).await? else {
        return Ok(None);
    };
    let payment_type = PaymentType::from_stored(&stored.payment_type)?;

    let payee = match payment_type {
        PaymentType::Inbound => FlatPayment::find()
            .filter(FlatPaymentColumn::PaymentId.eq(payment_id))
            .find_also_related(Tenant)
            .one(db)
            .await?
            .and_then(|(_, tenant)| tenant)
            .map(|t| Payee {
                id: t.tenant_id,
                forename: t.forename,
                surname: t.surname,
            }),
        PaymentType::Outbound => EmployeePayment::find()
            .filter(EmployeePaymentColumn::PaymentId.eq(payment_id))
            .find_also_related(Employee)
            .one(db)
            .await?
            .and_then(|(_, employee)| employee)
            .map(|e| Payee {
                id: e.employee_id,
                forename: e.forename,
                surname: e.surname,
            }),
    };
    let Some(payee) = payee else {
        return Ok(None);
    };

    Ok(Some(PaymentDetails {
        payment_id,
        payee_label: payee.label(),
        record: PaymentRecord {
            payment_type,
            payee_id: payee.id,
            method: stored.method,
            total_paid: stored.total_paid,
            date: stored.date,
            time: stored.time,
            description: stored.description,
        },
    }))
}

/// Tenants (inbound) or employees (outbound) that can be picked as payee, by id.
pub async fn payees<C: ConnectionTrait>(db: &C, payment_type: PaymentType) -> Result<Vec<Payee>> {
    Ok(match payment_type {
        PaymentType::Inbound => Tenant::find()
            .order_by_asc(TenantColumn::TenantId)
            .all(db)
            .await?
            .into_iter()
            .map(|t| Payee {
                id: t.tenant_id,
                forename: t.forename,
                surname: t.surname,
            })
            .collect(),
        PaymentType::Outbound => Employee::find()
            .order_by_asc(EmployeeColumn::EmployeeId)
            .all(db)
            .await?
            .into_iter()
            .map(|e| Payee {
                id: e.employee_id,
                forename: e.forename,
                surname: e.surname,
            })
            .collect(),
    })
}

/// Records a payment and its payee link in one transaction. Returns the new payment id.
#[instrument(skip(db, record), fields(payment_type = %record.payment_type, payee = %record.payee_id))]
pub async fn add<C>(db: &C, record: PaymentRecord) -> Result<i64>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let stored = payment::ActiveModel {
        payment_type: Set(record.payment_type.as_str().to_string()),
        method: Set(record.method),
        total_paid: Set(record.total_paid),
        date: Set(record.date),
        time: Set(record.time),
        description: Set(record.description),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    match record.payment_type {
        PaymentType::Inbound => {
            FlatPayment::insert(flat_payment::ActiveModel {
                payment_id: Set(stored.payment_id),
                tenant_id: Set(record.payee_id),
            })
            .exec_without_returning(&txn)
            .await?;
        }
        PaymentType::Outbound => {
            EmployeePayment::insert(employee_payment::ActiveModel {
                payment_id: Set(stored.payment_id),
                employee_id: Set(record.payee_id),
            })
            .exec_without_returning(&txn)
            .await?;
        }
    }

    txn.commit().await?;
    info!(payment_id = stored.payment_id, "Recorded payment");
    Ok(stored.payment_id)
}

/// Updates the payment row and repoints its existing link row.
///
/// The type is fixed at creation; `record.payment_type` is ignored.
pub async fn edit<C>(db: &C, payment_id: i64, record: PaymentRecord) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let payment_type = stored_type(&txn, payment_id).await?;

    payment::ActiveModel {
        payment_id: Unchanged(payment_id),
        method: Set(record.method),
        total_paid: Set(record.total_paid),
        date: Set(record.date),
        time: Set(record.time),
        description: Set(record.description),
        ..Default::default()
    }
    .update(&txn)
    .await?;

    match payment_type {
        PaymentType::Inbound => {
            FlatPayment::update_many()
                .col_expr(FlatPaymentColumn::TenantId, Expr::value(record.payee_id))
                .filter(FlatPaymentColumn::PaymentId.eq(payment_id))
                .exec(&txn)
                .await?;
        }
        PaymentType::Outbound => {
            EmployeePayment::update_many()
                .col_expr(EmployeePaymentColumn::EmployeeId, Expr::value(record.payee_id))
                .filter(EmployeePaymentColumn::PaymentId.eq(payment_id))
                .exec(&txn)
                .await?;
        }
    }

    txn.commit().await?;
    info!(payment_id, "Updated payment");
    Ok(())
}

/// Removes the link row matching the payment's type, then the payment, in one transaction.
#[instrument(skip(db))]
pub async fn delete<C>(db: &C, payment_id: i64) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    match stored_type(&txn, payment_id).await? {
        PaymentType::Inbound => {
            FlatPayment::delete_many()
                .filter(FlatPaymentColumn::PaymentId.eq(payment_id))
                .exec(&txn)
                .await?;
        }
        PaymentType::Outbound => {
            EmployeePayment::delete_many()
                .filter(EmployeePaymentColumn::PaymentId.eq(payment_id))
                .exec(&txn)
                .await?;
        }
    }
    Payment::delete_by_id(payment_id).exec(&txn).await?;

    txn.commit().await?;
    info!(payment_id, "Deleted payment");
    Ok(())
}

async fn stored_type<C: ConnectionTrait>(db: &C, payment_id: i64) -> Result<PaymentType> {
    let stored = Payment::find_by_id(payment_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Payment",
            id: payment_id.to_string(),
        })?;
    PaymentType::from_stored(&stored.payment_type)
}
