//! Register, edit and delete flows for each list.
//!
//! Every flow runs the matching validator first, then the repository call, then patches the
//! on-screen rows. The returned string is the confirmation shown to the operator.

use crate::{
    console::{command::Fields, render},
    core::{
        apartment::{self, ApartmentRow},
        employee::{self, EmployeeRow},
        flat,
        payment::{self, PaymentType},
        query::ListField,
        tenant,
        validation::{self, ApartmentForm, EmployeeForm, FlatForm, PaymentForm, TenantForm},
    },
    errors::{Error, Result},
    view::{
        DisplayMode, ListController, ListSource, PaymentsController,
        sources::{ApartmentSource, EmployeeSource, FlatSource, TenantSource},
    },
};
use chrono::Local;
use sea_orm::{ConnectionTrait, TransactionTrait};
use tracing::info;

fn index(position: usize) -> usize {
    position.saturating_sub(1)
}

fn no_row(position: usize) -> Error {
    Error::validation(format!("There is no row {position}."))
}

fn row_at<S: ListSource>(list: &ListController<S>, position: usize) -> Result<&S::Row> {
    list.row(index(position)).ok_or_else(|| no_row(position))
}

fn missing(entity: &'static str, id: &str) -> Error {
    Error::NotFound {
        entity,
        id: id.to_owned(),
    }
}

/// Confirmation text listing every displayed field of the row at `position`.
pub fn delete_prompt<S: ListSource>(
    list: &ListController<S>,
    position: usize,
    question: &str,
) -> Result<String> {
    let row = row_at(list, position)?;
    let labels: Vec<&str> = S::Field::ALL.iter().map(|f| f.label()).collect();
    Ok(render::record(question, &labels, &list.source().cells(row)))
}

/// Asked before an apartment and its flats are removed.
pub const APARTMENT_DELETE_QUESTION: &str = "Are you sure you want to delete this apartment?\n\
     Warning: This will delete all flats tied to this address.";
/// Asked before a flat is removed and its tenants unbound.
pub const FLAT_DELETE_QUESTION: &str = "Are you sure you want to delete this flat?\n\
     Warning: This will unbind any tenants from this flat.";
/// Asked before a tenant without payments is removed.
pub const TENANT_DELETE_QUESTION: &str = "Are you sure you want to delete this tenant?";
/// Asked before an employee without payments is removed.
pub const EMPLOYEE_DELETE_QUESTION: &str = "Are you sure you want to delete this employee?";
/// Asked before a payment is removed.
pub const PAYMENT_DELETE_QUESTION: &str = "Are you sure you want to delete this payment?";

/// Registers an apartment; `id` defaults to the next free code.
pub async fn add_apartment<C: ConnectionTrait>(
    db: &C,
    list: &mut ListController<ApartmentSource>,
    fields: &Fields,
) -> Result<&'static str> {
    list.set_mode(DisplayMode::Register);
    let apartment_id = match fields.get("id") {
        Some(id) => id.to_owned(),
        None => apartment::free_id(db).await?,
    };
    let form = ApartmentForm {
        apartment_id,
        address: fields.or_empty("address"),
        postcode: fields.or_empty("postcode"),
        description: fields.or_empty("description"),
    };
    let model = validation::validate_new_apartment(db, &form).await?;
    let model = apartment::add(db, model).await?;
    list.insert_row(ApartmentRow::empty(&model));
    Ok("Apartment has been successfully added to the database.")
}

/// Fields left out of `fields` keep their stored values.
pub async fn edit_apartment<C: ConnectionTrait>(
    db: &C,
    list: &mut ListController<ApartmentSource>,
    position: usize,
    fields: &Fields,
) -> Result<&'static str> {
    let mut row = row_at(list, position)?.clone();
    list.set_mode(DisplayMode::Edit(index(position)));
    let current = apartment::get(db, &row.apartment_id)
        .await?
        .ok_or_else(|| missing("Apartment", &row.apartment_id))?;

    let form = ApartmentForm {
        apartment_id: current.apartment_id.clone(),
        address: fields.or("address", &current.address),
        postcode: fields.or("postcode", &current.postcode),
        description: fields.or("description", current.description.as_deref().unwrap_or_default()),
    };
    let changes = validation::validate_apartment_edit(&current.apartment_id, &form)?;
    let updated = apartment::edit(db, &current.apartment_id, changes).await?;

    row.address = updated.address;
    row.postcode = updated.postcode;
    list.replace_row(index(position), row);
    Ok("Apartment has been successfully updated in the database.")
}

/// Deletes the apartment shown at `position` with its flats.
pub async fn delete_apartment<C>(
    db: &C,
    list: &mut ListController<ApartmentSource>,
    position: usize,
) -> Result<&'static str>
where
    C: ConnectionTrait + TransactionTrait,
{
    let apartment_id = row_at(list, position)?.apartment_id.clone();
    apartment::delete(db, &apartment_id).await?;
    list.remove_row(index(position));
    Ok("Successfully deleted apartment from database.")
}

/// Registers a flat in the apartment being viewed.
pub async fn add_flat<C: ConnectionTrait>(
    db: &C,
    list: &mut ListController<FlatSource>,
    fields: &Fields,
) -> Result<&'static str> {
    list.set_mode(DisplayMode::Register);
    let form = FlatForm {
        flat_number: fields.or_empty("number"),
        weekly_rent: fields.or_empty("rent"),
        description: fields.or_empty("description"),
    };
    let apartment_id = list.source().apartment_id().to_owned();
    let model = validation::validate_new_flat(db, &apartment_id, &form).await?;
    let model = flat::add(db, model).await?;
    let row = flat::get_row(db, &model.flat_id)
        .await?
        .ok_or_else(|| missing("Flat", &model.flat_id))?;
    list.insert_row(row);
    Ok("Flat has been successfully added to the database.")
}

/// Edits the flat at `position`; unchanged keys keep their values.
pub async fn edit_flat<C: ConnectionTrait>(
    db: &C,
    list: &mut ListController<FlatSource>,
    position: usize,
    fields: &Fields,
) -> Result<&'static str> {
    let mut row = row_at(list, position)?.clone();
    list.set_mode(DisplayMode::Edit(index(position)));
    let current = flat::get(db, &row.flat_id)
        .await?
        .ok_or_else(|| missing("Flat", &row.flat_id))?;

    let form = FlatForm {
        flat_number: fields.or("number", &current.flat_number.to_string()),
        weekly_rent: fields.or("rent", &format!("{:.2}", current.weekly_rent)),
        description: fields.or("description", current.description.as_deref().unwrap_or_default()),
    };
    let changes = validation::validate_flat_edit(db, &current, &form).await?;
    let updated = flat::edit(db, &current.flat_id, changes).await?;

    row.flat_number = updated.flat_number;
    row.weekly_rent = updated.weekly_rent;
    list.replace_row(index(position), row);
    Ok("Flat has been successfully updated in the database.")
}

/// Deletes the flat and unbinds its tenants.
pub async fn delete_flat<C>(
    db: &C,
    list: &mut ListController<FlatSource>,
    position: usize,
) -> Result<&'static str>
where
    C: ConnectionTrait + TransactionTrait,
{
    let flat_id = row_at(list, position)?.flat_id.clone();
    flat::delete(db, &flat_id).await?;
    list.remove_row(index(position));
    Ok("Successfully deleted flat from database.")
}

/// Registers a tenant. Refused until at least one apartment exists.
pub async fn add_tenant<C: ConnectionTrait>(
    db: &C,
    list: &mut ListController<TenantSource>,
    fields: &Fields,
) -> Result<&'static str> {
    validation::ensure_apartments_exist(db).await?;
    list.set_mode(DisplayMode::Register);
    let tenant_id = match fields.get("id") {
        Some(id) => id.to_owned(),
        None => tenant::free_id(db).await?,
    };
    let form = TenantForm {
        tenant_id,
        forename: fields.or_empty("forename"),
        surname: fields.or_empty("surname"),
        contact: fields.or_empty("contact"),
        address: fields.get("address").map(ToOwned::to_owned),
        flat_number: fields.or_empty("flat"),
        description: fields.or_empty("description"),
    };
    let model = validation::validate_new_tenant(db, &form).await?;
    let model = tenant::add(db, model).await?;
    let row = tenant::get_row(db, &model.tenant_id)
        .await?
        .ok_or_else(|| missing("Tenant", &model.tenant_id))?;
    list.insert_row(row);
    Ok("Tenant has been successfully added to the database.")
}

/// Edits the tenant at `position`, rehousing it when address or flat number change.
pub async fn edit_tenant<C: ConnectionTrait>(
    db: &C,
    list: &mut ListController<TenantSource>,
    position: usize,
    fields: &Fields,
) -> Result<&'static str> {
    let row = row_at(list, position)?.clone();
    list.set_mode(DisplayMode::Edit(index(position)));
    let current = tenant::get(db, &row.tenant_id)
        .await?
        .ok_or_else(|| missing("Tenant", &row.tenant_id))?;

    let flat_number = row.flat_number.map(|n| n.to_string()).unwrap_or_default();
    let form = TenantForm {
        tenant_id: current.tenant_id.clone(),
        forename: fields.or("forename", &current.forename),
        surname: fields.or("surname", &current.surname),
        contact: fields.or("contact", &current.contact),
        address: fields.get("address").map(ToOwned::to_owned).or(row.address),
        flat_number: fields.or("flat", &flat_number),
        description: fields.or("description", current.description.as_deref().unwrap_or_default()),
    };
    let changes = validation::validate_tenant_edit(db, &current.tenant_id, &form).await?;
    tenant::edit(db, &current.tenant_id, changes).await?;

    let updated = tenant::get_row(db, &current.tenant_id)
        .await?
        .ok_or_else(|| missing("Tenant", &current.tenant_id))?;
    list.replace_row(index(position), updated);
    Ok("Tenant record has been successfully updated!")
}

/// Refuses tenants with recorded payments before anything is shown.
pub async fn tenant_delete_prompt<C: ConnectionTrait>(
    db: &C,
    list: &ListController<TenantSource>,
    position: usize,
) -> Result<String> {
    let tenant_id = &row_at(list, position)?.tenant_id;
    validation::validate_tenant_delete(db, tenant_id).await?;
    delete_prompt(list, position, TENANT_DELETE_QUESTION)
}

/// Deletes the tenant at `position`. Call [`tenant_delete_prompt`] first.
pub async fn delete_tenant<C: ConnectionTrait>(
    db: &C,
    list: &mut ListController<TenantSource>,
    position: usize,
) -> Result<&'static str> {
    let tenant_id = row_at(list, position)?.tenant_id.clone();
    tenant::delete(db, &tenant_id).await?;
    list.remove_row(index(position));
    Ok("Successfully deleted tenant from database.")
}

/// Registers an employee; `id` defaults to the next free code.
pub async fn add_employee<C: ConnectionTrait>(
    db: &C,
    list: &mut ListController<EmployeeSource>,
    fields: &Fields,
) -> Result<&'static str> {
    list.set_mode(DisplayMode::Register);
    let employee_id = match fields.get("id") {
        Some(id) => id.to_owned(),
        None => employee::free_id(db).await?,
    };
    let form = EmployeeForm {
        employee_id,
        forename: fields.or_empty("forename"),
        surname: fields.or_empty("surname"),
        contact: fields.or_empty("contact"),
        address: fields.or_empty("address"),
        postcode: fields.or_empty("postcode"),
        description: fields.or_empty("description"),
    };
    let model = validation::validate_new_employee(db, &form).await?;
    let model = employee::add(db, model).await?;
    list.insert_row(EmployeeRow::from(model));
    Ok("Employee has been successfully added to the database.")
}

/// Edits the employee at `position`; unchanged keys keep their values.
pub async fn edit_employee<C: ConnectionTrait>(
    db: &C,
    list: &mut ListController<EmployeeSource>,
    position: usize,
    fields: &Fields,
) -> Result<&'static str> {
    let employee_id = row_at(list, position)?.employee_id.clone();
    list.set_mode(DisplayMode::Edit(index(position)));
    let current = employee::get(db, &employee_id)
        .await?
        .ok_or_else(|| missing("Employee", &employee_id))?;

    let form = EmployeeForm {
        employee_id: employee_id.clone(),
        forename: fields.or("forename", &current.forename),
        surname: fields.or("surname", &current.surname),
        contact: fields.or("contact", &current.contact),
        address: fields.or("address", &current.address),
        postcode: fields.or("postcode", &current.postcode),
        description: fields.or("description", current.description.as_deref().unwrap_or_default()),
    };
    let changes = validation::validate_employee_edit(&employee_id, &form)?;
    let updated = employee::edit(db, &employee_id, changes).await?;
    list.replace_row(index(position), EmployeeRow::from(updated));
    Ok("Employee record has been successfully updated!")
}

/// Refuses employees who were paid, otherwise builds the confirmation text.
pub async fn employee_delete_prompt<C: ConnectionTrait>(
    db: &C,
    list: &ListController<EmployeeSource>,
    position: usize,
) -> Result<String> {
    let employee_id = &row_at(list, position)?.employee_id;
    validation::validate_employee_delete(db, employee_id).await?;
    delete_prompt(list, position, EMPLOYEE_DELETE_QUESTION)
}

/// Deletes the employee at `position`. Call [`employee_delete_prompt`] first.
pub async fn delete_employee<C: ConnectionTrait>(
    db: &C,
    list: &mut ListController<EmployeeSource>,
    position: usize,
) -> Result<&'static str> {
    let employee_id = row_at(list, position)?.employee_id.clone();
    employee::delete(db, &employee_id).await?;
    list.remove_row(index(position));
    Ok("Successfully deleted employee from database.")
}

/// Date defaults to today and time to midnight, as on the register form.
pub async fn add_payment<C>(
    db: &C,
    payments: &mut PaymentsController,
    fields: &Fields,
) -> Result<&'static str>
where
    C: ConnectionTrait + TransactionTrait,
{
    payments.set_mode(DisplayMode::Register);
    let today = Local::now().date_naive().to_string();
    let form = PaymentForm {
        payment_type: fields.get("type").and_then(PaymentType::parse),
        payee_id: fields.or_empty("payee"),
        method: fields.or_empty("method"),
        amount: fields.or_empty("amount"),
        date: fields.or("date", &today),
        time: fields.or("time", "00:00"),
        description: fields.or_empty("description"),
    };
    let record = validation::validate_payment(db, &form).await?;
    let payment_id = payment::add(db, record).await?;
    info!(payment_id, "Payment registered from console");
    payments.after_mutation(db).await?;
    Ok("Payment has been successfully added to the database.")
}

/// The payment type cannot be changed on edit.
pub async fn edit_payment<C>(
    db: &C,
    payments: &mut PaymentsController,
    position: usize,
    fields: &Fields,
) -> Result<&'static str>
where
    C: ConnectionTrait + TransactionTrait,
{
    let payment_id = payments
        .row(index(position))
        .ok_or_else(|| no_row(position))?
        .payment_id;
    payments.set_mode(DisplayMode::Edit(index(position)));
    let current = payment::get(db, payment_id)
        .await?
        .ok_or_else(|| missing("Payment", &payment_id.to_string()))?;
    let stored = &current.record;

    let form = PaymentForm {
        payment_type: Some(stored.payment_type),
        payee_id: fields.or("payee", &stored.payee_id),
        method: fields.or("method", &stored.method),
        amount: fields.or("amount", &format!("{:.2}", stored.total_paid)),
        date: fields.or("date", &stored.date),
        time: fields.or("time", &stored.time),
        description: fields.or("description", stored.description.as_deref().unwrap_or_default()),
    };
    let record = validation::validate_payment(db, &form).await?;
    payment::edit(db, payment_id, record).await?;
    payments.after_mutation(db).await?;
    Ok("Payment record has been successfully updated!")
}

/// Confirmation text for the payment at `position`, as displayed.
pub fn payment_delete_prompt(payments: &PaymentsController, position: usize) -> Result<String> {
    let table = payments.table();
    let values = table.get(index(position)).ok_or_else(|| no_row(position))?;
    Ok(render::record(
        PAYMENT_DELETE_QUESTION,
        &[
            "Payment Type",
            "Payee",
            "Method",
            "Amount Paid",
            "Payment Date",
            "Payment Time",
        ],
        values,
    ))
}

/// Deletes the payment and its payee link, then re-queries the list.
pub async fn delete_payment<C>(
    db: &C,
    payments: &mut PaymentsController,
    position: usize,
) -> Result<&'static str>
where
    C: ConnectionTrait + TransactionTrait,
{
    let payment_id = payments
        .row(index(position))
        .ok_or_else(|| no_row(position))?
        .payment_id;
    payment::delete(db, payment_id).await?;
    payments.after_mutation(db).await?;
    Ok("Successfully deleted payment from database.")
}
