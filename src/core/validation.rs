//! Field validators run before any write.
//!
//! Each `validate_*` function checks one submitted form in field order and stops at the first
//! problem, returning it as [`Error::Validation`] with the exact message the operator sees. On
//! success it returns the normalized record ready for the repository: ids upper-cased, names
//! and addresses title-cased, postcodes upper-cased, money rounded to pence, dates and times
//! re-formatted, blank descriptions dropped.

use crate::{
    core::{
        apartment, employee, flat,
        payment::{self, PaymentRecord, PaymentType},
        query, tenant, user,
    },
    entities::{ApartmentModel, EmployeeModel, FlatModel, TenantModel},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use sea_orm::ConnectionTrait;
use std::sync::LazyLock;
use tracing::{debug, warn};

#[allow(clippy::expect_used)]
static APARTMENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^A[0-9]{4}$").expect("apartment id pattern to compile"));
#[allow(clippy::expect_used)]
static TENANT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^T[0-9]{4}$").expect("tenant id pattern to compile"));
#[allow(clippy::expect_used)]
static EMPLOYEE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^E[0-9]{4}$").expect("employee id pattern to compile"));
// Anchored at the start only: trailing text after a valid number is tolerated.
#[allow(clippy::expect_used)]
static CONTACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?\d{1,4}?[-.\s]?\(?\d{1,3}?\)?[-.\s]?\d{1,4}[-.\s]?\d{1,4}[-.\s]?\d{1,9}")
        .expect("contact pattern to compile")
});
#[allow(clippy::expect_used)]
static POSTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z]{1,2}\d{1,2})\s(\d[a-zA-Z]{2})$").expect("postcode pattern to compile")
});

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 20;
/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 6;
/// Accounts the desk will hold.
pub const MAX_ACCOUNTS: u64 = 10;

/// Upper-cases the first letter of every word and lower-cases the rest.
///
/// A word starts after any character that is not a letter, so `"o'neil-smith"` becomes
/// `"O'Neil-Smith"`.
#[must_use]
pub fn title_case(value: &str) -> String {
    let mut titled = String::with_capacity(value.len());
    let mut after_letter = false;
    for c in value.chars() {
        if after_letter {
            titled.extend(c.to_lowercase());
        } else {
            titled.extend(c.to_uppercase());
        }
        after_letter = c.is_alphabetic();
    }
    titled
}

/// Phone number: optional `+`, then digit groups split by `-`, `.` or a space.
#[must_use]
pub fn is_contact(value: &str) -> bool {
    CONTACT.is_match(value)
}

/// Outward and inward code separated by one space, e.g. `AB1 2CD`.
#[must_use]
pub fn is_postcode(value: &str) -> bool {
    POSTCODE.is_match(value)
}

/// Parses a non-negative monetary amount and rounds it to pence.
#[must_use]
pub fn parse_money(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
        .map(query::round_pence)
}

/// Parses and zero-pads a `YYYY-MM-DD` date.
#[must_use]
pub fn normalize_date(value: &str) -> Option<String> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(|date| date.format(DATE_FORMAT).to_string())
}

/// Parses and zero-pads an `HH:MM` time.
#[must_use]
pub fn normalize_time(value: &str) -> Option<String> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .ok()
        .map(|time| time.format(TIME_FORMAT).to_string())
}

fn description(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn required(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        debug!(message, "Form rejected");
        return Err(Error::validation(message));
    }
    Ok(trimmed.to_string())
}

fn check(ok: bool, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        debug!(message, "Form rejected");
        Err(Error::validation(message))
    }
}

fn contact(value: &str) -> Result<String> {
    let contact = required(value, "Contact is empty.")?;
    check(is_contact(&contact), "Contact number is in an incorrect format.")?;
    Ok(contact)
}

fn postcode(value: &str) -> Result<String> {
    let postcode = required(value, "Postcode is empty.")?.to_uppercase();
    check(is_postcode(&postcode), "Postcode is in an incorrect format.")?;
    Ok(postcode)
}

/// Fields of the apartment register and edit forms.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApartmentForm {
    /// Upper-cased before the format check
    pub apartment_id: String,
    /// Title-cased
    pub address: String,
    /// Upper-cased
    pub postcode: String,
    /// Empty means no notes
    pub description: String,
}

/// Checks a new apartment, including that its id is free.
pub async fn validate_new_apartment<C: ConnectionTrait>(
    db: &C,
    form: &ApartmentForm,
) -> Result<ApartmentModel> {
    let apartment_id = required(&form.apartment_id, "Apartment ID is empty.")?.to_uppercase();
    check(
        apartment::get(db, &apartment_id).await?.is_none(),
        "Apartment ID already taken.",
    )?;
    check(
        APARTMENT_ID.is_match(&apartment_id),
        "Apartment ID must be in format 'A0000'",
    )?;
    apartment_details(apartment_id, form)
}

/// The id is fixed on edit; only address, postcode and description are checked.
pub fn validate_apartment_edit(apartment_id: &str, form: &ApartmentForm) -> Result<ApartmentModel> {
    apartment_details(apartment_id.to_owned(), form)
}

fn apartment_details(apartment_id: String, form: &ApartmentForm) -> Result<ApartmentModel> {
    Ok(ApartmentModel {
        apartment_id,
        address: title_case(&required(&form.address, "Address is empty.")?),
        postcode: postcode(&form.postcode)?,
        description: description(&form.description),
    })
}

/// Fields of the flat register and edit forms. The apartment is the one being viewed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatForm {
    /// Positive whole number
    pub flat_number: String,
    /// Monetary amount
    pub weekly_rent: String,
    /// Empty means no notes
    pub description: String,
}

/// Checks a new flat for `apartment_id` and assigns it the next free flat id.
pub async fn validate_new_flat<C: ConnectionTrait>(
    db: &C,
    apartment_id: &str,
    form: &FlatForm,
) -> Result<FlatModel> {
    let (flat_number, weekly_rent) = flat_fields(db, apartment_id, None, form).await?;
    Ok(FlatModel {
        flat_id: flat::free_id(db).await?,
        apartment_id: apartment_id.to_owned(),
        flat_number,
        weekly_rent,
        description: description(&form.description),
    })
}

/// Checks an edit of `current`. Keeping the flat's own number is allowed.
pub async fn validate_flat_edit<C: ConnectionTrait>(
    db: &C,
    current: &FlatModel,
    form: &FlatForm,
) -> Result<FlatModel> {
    let (flat_number, weekly_rent) =
        flat_fields(db, &current.apartment_id, Some(current.flat_number), form).await?;
    Ok(FlatModel {
        flat_number,
        weekly_rent,
        description: description(&form.description),
        ..current.clone()
    })
}

async fn flat_fields<C: ConnectionTrait>(
    db: &C,
    apartment_id: &str,
    previous_number: Option<i64>,
    form: &FlatForm,
) -> Result<(i64, f64)> {
    let number = required(&form.flat_number, "Flat number is empty.")?;
    let flat_number = number
        .chars()
        .all(|c| c.is_ascii_digit())
        .then(|| number.parse::<i64>().ok())
        .flatten()
        .ok_or_else(|| Error::validation("Flat number must be an integer."))?;

    if previous_number != Some(flat_number) {
        check(
            flat::find_id(db, apartment_id, flat_number).await?.is_none(),
            "This flat number is already taken.",
        )?;
    }

    let rent = required(&form.weekly_rent, "Weekly rent is empty.")?;
    let weekly_rent =
        parse_money(&rent).ok_or_else(|| Error::validation("Weekly rent must be a monetary amount."))?;
    Ok((flat_number, weekly_rent))
}

/// Fields of the tenant register and edit forms.
///
/// `address` is the apartment picked from [`apartment::addresses`]; `None` leaves the tenant
/// unhoused.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TenantForm {
    /// Upper-cased before the format check
    pub tenant_id: String,
    /// Title-cased
    pub forename: String,
    /// Title-cased
    pub surname: String,
    /// Phone number
    pub contact: String,
    /// Apartment address, or `None` to leave the tenant unhoused
    pub address: Option<String>,
    /// Required when `address` is set
    pub flat_number: String,
    /// Empty means no notes
    pub description: String,
}

/// Tenants can only be registered once an apartment exists.
pub async fn ensure_apartments_exist<C: ConnectionTrait>(db: &C) -> Result<()> {
    check(
        !apartment::addresses(db).await?.is_empty(),
        "No apartments have been registered to this system.\n\
         Please register an apartment before adding a tenant.",
    )
}

/// Checks a new tenant and resolves the flat it moves into.
pub async fn validate_new_tenant<C: ConnectionTrait>(
    db: &C,
    form: &TenantForm,
) -> Result<TenantModel> {
    let tenant_id = required(&form.tenant_id, "Tenant ID is empty.")?.to_uppercase();
    check(
        tenant::get(db, &tenant_id).await?.is_none(),
        "Tenant ID already taken.",
    )?;
    check(TENANT_ID.is_match(&tenant_id), "Tenant ID must be in format 'T0000'")?;
    tenant_details(db, tenant_id, form).await
}

/// Checks an edit; the flat is resolved again from address and number.
pub async fn validate_tenant_edit<C: ConnectionTrait>(
    db: &C,
    tenant_id: &str,
    form: &TenantForm,
) -> Result<TenantModel> {
    tenant_details(db, tenant_id.to_owned(), form).await
}

async fn tenant_details<C: ConnectionTrait>(
    db: &C,
    tenant_id: String,
    form: &TenantForm,
) -> Result<TenantModel> {
    let forename = title_case(&required(&form.forename, "Forename is empty.")?);
    let surname = title_case(&required(&form.surname, "Surname is empty.")?);
    let contact = contact(&form.contact)?;

    // A flat is only resolved when both the address and the number are given.
    let flat_number = form.flat_number.trim();
    let flat_id = match form.address.as_deref().map(str::trim) {
        Some(address) if !address.is_empty() && !flat_number.is_empty() => {
            let found = match flat_number.parse::<i64>() {
                Ok(number) => tenant::find_flat_id(db, address, number).await?,
                Err(_) => None,
            };
            let flat_id = found.ok_or_else(|| {
                Error::validation("This flat number is not registered to this address.")
            })?;
            Some(flat_id)
        }
        _ => None,
    };

    Ok(TenantModel {
        tenant_id,
        flat_id,
        forename,
        surname,
        contact,
        description: description(&form.description),
    })
}

/// Fields of the employee register and edit forms.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmployeeForm {
    /// Upper-cased before the format check
    pub employee_id: String,
    /// Title-cased
    pub forename: String,
    /// Title-cased
    pub surname: String,
    /// Phone number
    pub contact: String,
    /// Title-cased
    pub address: String,
    /// Upper-cased
    pub postcode: String,
    /// Empty means no notes
    pub description: String,
}

/// Checks a new employee, including that its id is free.
pub async fn validate_new_employee<C: ConnectionTrait>(
    db: &C,
    form: &EmployeeForm,
) -> Result<EmployeeModel> {
    let employee_id = required(&form.employee_id, "Employee ID is empty.")?.to_uppercase();
    check(
        employee::get(db, &employee_id).await?.is_none(),
        "Employee ID already taken.",
    )?;
    check(
        EMPLOYEE_ID.is_match(&employee_id),
        "Employee ID must be in format 'E0000'",
    )?;
    employee_details(employee_id, form)
}

/// Checks every field of an edit except the fixed id.
pub fn validate_employee_edit(employee_id: &str, form: &EmployeeForm) -> Result<EmployeeModel> {
    employee_details(employee_id.to_owned(), form)
}

fn employee_details(employee_id: String, form: &EmployeeForm) -> Result<EmployeeModel> {
    Ok(EmployeeModel {
        employee_id,
        forename: title_case(&required(&form.forename, "Forename is empty.")?),
        surname: title_case(&required(&form.surname, "Surname is empty.")?),
        contact: contact(&form.contact)?,
        address: title_case(&required(&form.address, "Address is empty.")?),
        postcode: postcode(&form.postcode)?,
        description: description(&form.description),
    })
}

/// Fields of the payment register and edit forms.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentForm {
    /// Fixed to the stored type on edit
    pub payment_type: Option<PaymentType>,
    /// Tenant or employee code, matching the type
    pub payee_id: String,
    /// Cash, card, transfer...
    pub method: String,
    /// Monetary amount
    pub amount: String,
    /// `YYYY-MM-DD`, padded if needed
    pub date: String,
    /// `HH:MM`, padded if needed
    pub time: String,
    /// Empty means no notes
    pub description: String,
}

/// Checks type, payee, method, amount, date and time, in that order.
pub async fn validate_payment<C: ConnectionTrait>(
    db: &C,
    form: &PaymentForm,
) -> Result<PaymentRecord> {
    let payment_type = form
        .payment_type
        .ok_or_else(|| Error::validation("Payment Type must be selected."))?;

    let payee_id = form.payee_id.trim().to_uppercase();
    let payees = payment::payees(db, payment_type).await?;
    check(
        payees.iter().any(|payee| payee.id == payee_id),
        "Payee must be selected.",
    )?;

    let method = title_case(&required(&form.method, "Payment method is empty.")?);

    let amount = required(&form.amount, "Amount paid is empty.")?;
    let total_paid = parse_money(&amount)
        .ok_or_else(|| Error::validation("Amount paid must be a monetary amount."))?;

    let date = required(&form.date, "Date is empty.")?;
    let date = normalize_date(&date)
        .ok_or_else(|| Error::validation("Date input is invalid.\nMust be of form YYYY-MM-DD"))?;

    let time = required(&form.time, "Time is empty.")?;
    let time = normalize_time(&time)
        .ok_or_else(|| Error::validation("Time input is invalid.\nMust be of form HH:MM"))?;

    Ok(PaymentRecord {
        payment_type,
        payee_id,
        method,
        total_paid,
        date,
        time,
        description: description(&form.description),
    })
}

/// Refuses to delete a tenant who is the payee of recorded payments.
pub async fn validate_tenant_delete<C: ConnectionTrait>(db: &C, tenant_id: &str) -> Result<()> {
    if tenant::has_payments(db, tenant_id).await? {
        warn!(tenant_id, "Refused to delete tenant with payments");
        return Err(Error::validation(
            "This tenant has recorded payments and cannot be deleted.",
        ));
    }
    Ok(())
}

/// Refuses to delete an employee who is the payee of recorded payments.
pub async fn validate_employee_delete<C: ConnectionTrait>(db: &C, employee_id: &str) -> Result<()> {
    if employee::has_payments(db, employee_id).await? {
        warn!(employee_id, "Refused to delete employee with payments");
        return Err(Error::validation(
            "This employee has recorded payments and cannot be deleted.",
        ));
    }
    Ok(())
}

/// Accepts the login only when the stored credential matches.
pub async fn validate_login<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
) -> Result<()> {
    check(
        user::verify_login(db, username, password).await?,
        "Incorrect username or password.",
    )
}

/// Checks a new account against name rules, capacity and password rules.
pub async fn validate_registration<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<()> {
    check(!username.is_empty(), "Username is empty.")?;
    check(
        user::find_hash(db, username).await?.is_none(),
        "Username already taken.",
    )?;
    check(
        username.chars().count() <= MAX_USERNAME_LEN,
        "Username is too long.",
    )?;
    check(
        user::count(db).await? < MAX_ACCOUNTS,
        "Account capacity has been reached.",
    )?;
    new_password(password, confirm_password)
}

/// Requires the current password before accepting a new one.
pub async fn validate_password_change<C: ConnectionTrait>(
    db: &C,
    username: &str,
    old_password: &str,
    password: &str,
    confirm_password: &str,
) -> Result<()> {
    check(
        user::verify_login(db, username, old_password).await?,
        "Incorrect password.",
    )?;
    new_password(password, confirm_password)
}

fn new_password(password: &str, confirm_password: &str) -> Result<()> {
    check(
        password.chars().count() >= MIN_PASSWORD_LEN,
        "Password should be 6 characters or more.",
    )?;
    check(password == confirm_password, "Password does not match.")
}

/// The signed-in operator cannot remove their own account.
pub fn validate_user_delete(current_user: &str, username: &str) -> Result<()> {
    check(
        current_user != username,
        "You cannot delete the account you are logged in as.",
    )
}
