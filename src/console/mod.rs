//! Line-oriented operator console.
//!
//! The console owns the signed-in operator and the screen currently open. Each line is parsed
//! into a [`Command`] and routed to the active list controller or to the account operations.
//! Validation and not-found failures are printed and the session continues; database and I/O
//! failures end the session.

/// Command grammar
pub mod command;
/// Register, edit and delete flows
pub mod forms;
/// Text rendering of lists and confirmations
pub mod render;

use crate::{
    config::database::{DEFAULT_PASSWORD, DEFAULT_USERNAME},
    core::{apartment, payment::PaymentField, query::ListField, user, validation},
    errors::{Error, Result},
    view::{
        DisplayMode, ListController, ListSource, PaymentsController,
        sources::{ApartmentSource, EmployeeSource, FlatSource, TenantSource},
    },
};
use command::{Command, ScreenName, USAGE};
use sea_orm::DatabaseConnection;
use std::io::{BufRead, Write};
use tracing::{error, info, instrument};

/// Shown after signing in with the seeded account.
pub const DEFAULT_ACCOUNT_ADVICE: &str = "It is recommended for you to register an account to \
     prevent potential security breaches.\n\n\
     This can be done within the 'Manage Users' menu option.";

enum Screen {
    Home,
    Apartments(ListController<ApartmentSource>),
    Flats(ListController<FlatSource>),
    Tenants(ListController<TenantSource>),
    Employees(ListController<EmployeeSource>),
    Payments(PaymentsController),
    Users(Vec<String>),
}

impl Screen {
    fn name(&self) -> String {
        match self {
            Self::Home => "home".to_string(),
            Self::Apartments(_) => "apartments".to_string(),
            Self::Flats(list) => format!("flats {}", list.source().apartment_id()),
            Self::Tenants(_) => "tenants".to_string(),
            Self::Employees(_) => "employees".to_string(),
            Self::Payments(_) => "payments".to_string(),
            Self::Users(_) => "users".to_string(),
        }
    }

    fn mode(&self) -> DisplayMode {
        match self {
            Self::Apartments(list) => list.mode(),
            Self::Flats(list) => list.mode(),
            Self::Tenants(list) => list.mode(),
            Self::Employees(list) => list.mode(),
            Self::Payments(payments) => payments.mode(),
            Self::Home | Self::Users(_) => DisplayMode::Details,
        }
    }
}

/// Interactive session over any reader and writer.
pub struct Console<'a, R, W> {
    db: &'a DatabaseConnection,
    input: R,
    output: W,
    user: Option<String>,
    screen: Screen,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    /// Starts signed out, on the home screen.
    pub const fn new(db: &'a DatabaseConnection, input: R, output: W) -> Self {
        Self {
            db,
            input,
            output,
            user: None,
            screen: Screen::Home,
        }
    }

    /// The signed-in username, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Reads commands until `quit` or end of input.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<()> {
        writeln!(self.output, "Type 'help' for the list of commands.")?;
        loop {
            self.prompt()?;
            let Some(line) = self.read_line()? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let outcome = match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => self.execute(command).await,
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                self.report(e)?;
            }
        }
        info!("Console session ended");
        Ok(())
    }

    fn prompt(&mut self) -> Result<()> {
        let who = self.user.as_deref().unwrap_or("guest");
        let mode = match self.screen.mode() {
            DisplayMode::Details => String::new(),
            DisplayMode::Register => " [register]".to_string(),
            DisplayMode::Edit(position) => format!(" [edit {}]", position + 1),
        };
        write!(self.output, "{who}@{}{mode}> ", self.screen.name())?;
        self.output.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    // Operator mistakes are printed; anything else ends the session.
    fn report(&mut self, error: Error) -> Result<()> {
        match error {
            Error::Validation { message } => self.say(&message),
            e @ Error::NotFound { .. } => self.say(&e.to_string()),
            e => {
                error!(error = %e, "Console command failed");
                Err(e)
            }
        }
    }

    /// Prints `prompt` and reads a yes/no answer.
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        write!(self.output, "{prompt}\n[y/N] ")?;
        self.output.flush()?;
        let answer = self.read_line()?.unwrap_or_default();
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Help => self.say(USAGE),
            Command::Login { username, password } => self.login(&username, &password).await,
            Command::Quit => Ok(()),
            _ if self.user.is_none() => self.say("Please log in first."),
            Command::Logout => {
                info!(username = ?self.user, "Logged out");
                self.user = None;
                self.screen = Screen::Home;
                self.say("Logged out.")
            }
            Command::Open(screen) => self.open(screen).await,
            Command::Register {
                username,
                password,
                confirm,
            } => self.register(&username, &password, &confirm).await,
            Command::Passwd { old, new, confirm } => self.change_password(&old, &new, &confirm).await,
            Command::DeleteUser(username) => self.delete_user(&username).await,
            Command::Add(fields) => {
                let db = self.db;
                let message = match &mut self.screen {
                    Screen::Apartments(list) => forms::add_apartment(db, list, &fields).await?,
                    Screen::Flats(list) => forms::add_flat(db, list, &fields).await?,
                    Screen::Tenants(list) => forms::add_tenant(db, list, &fields).await?,
                    Screen::Employees(list) => forms::add_employee(db, list, &fields).await?,
                    Screen::Payments(payments) => forms::add_payment(db, payments, &fields).await?,
                    Screen::Home | Screen::Users(_) => NO_RECORDS_HERE,
                };
                self.say(message)
            }
            Command::Edit(position, fields) => {
                let db = self.db;
                let message = match &mut self.screen {
                    Screen::Apartments(list) => {
                        forms::edit_apartment(db, list, position, &fields).await?
                    }
                    Screen::Flats(list) => forms::edit_flat(db, list, position, &fields).await?,
                    Screen::Tenants(list) => forms::edit_tenant(db, list, position, &fields).await?,
                    Screen::Employees(list) => {
                        forms::edit_employee(db, list, position, &fields).await?
                    }
                    Screen::Payments(payments) => {
                        forms::edit_payment(db, payments, position, &fields).await?
                    }
                    Screen::Home | Screen::Users(_) => NO_RECORDS_HERE,
                };
                self.say(message)
            }
            Command::Delete(position) => self.delete(position).await,
            Command::List
            | Command::Sort(_)
            | Command::Search(_)
            | Command::Column(_)
            | Command::Refresh => self.list_command(command).await,
        }
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        validation::validate_login(self.db, username, password).await?;
        self.user = Some(username.to_owned());
        info!(username, "Logged in");
        self.say(&format!("Logged in as {username}."))?;
        if username == DEFAULT_USERNAME && password == DEFAULT_PASSWORD {
            self.say(DEFAULT_ACCOUNT_ADVICE)?;
        }
        Ok(())
    }

    async fn open(&mut self, screen: ScreenName) -> Result<()> {
        let db = self.db;
        self.screen = match screen {
            ScreenName::Apartments => Screen::Apartments(opened(db, ApartmentSource).await?),
            ScreenName::Flats(apartment_id) => {
                // Flats are only reachable through an existing apartment.
                if apartment::get(db, &apartment_id).await?.is_none() {
                    return Err(Error::NotFound {
                        entity: "Apartment",
                        id: apartment_id,
                    });
                }
                Screen::Flats(opened(db, FlatSource::new(apartment_id)).await?)
            }
            ScreenName::Tenants => Screen::Tenants(opened(db, TenantSource).await?),
            ScreenName::Employees => Screen::Employees(opened(db, EmployeeSource).await?),
            ScreenName::Payments => {
                let mut payments = PaymentsController::new();
                payments.open(db).await?;
                Screen::Payments(payments)
            }
            ScreenName::Users => Screen::Users(user::usernames(db).await?),
        };
        self.show()
    }

    /// Prints the rows of the current screen.
    fn show(&mut self) -> Result<()> {
        let text = match &self.screen {
            Screen::Home => USAGE.to_string(),
            Screen::Apartments(list) => render::table(&list.headings(), &list.table()),
            Screen::Flats(list) => render::table(&list.headings(), &list.table()),
            Screen::Tenants(list) => render::table(&list.headings(), &list.table()),
            Screen::Employees(list) => render::table(&list.headings(), &list.table()),
            Screen::Payments(payments) => render::table(&payments.headings(), &payments.table()),
            Screen::Users(usernames) => {
                let rows: Vec<Vec<String>> = usernames.iter().map(|u| vec![u.clone()]).collect();
                render::table(&["Username".to_string()], &rows)
            }
        };
        write!(self.output, "{text}")?;
        Ok(())
    }

    async fn list_command(&mut self, command: Command) -> Result<()> {
        let db = self.db;
        let notice = match &mut self.screen {
            Screen::Apartments(list) => drive(db, list, &command).await?,
            Screen::Flats(list) => drive(db, list, &command).await?,
            Screen::Tenants(list) => drive(db, list, &command).await?,
            Screen::Employees(list) => drive(db, list, &command).await?,
            Screen::Payments(payments) => drive_payments(db, payments, &command).await?,
            Screen::Users(usernames) => {
                *usernames = user::usernames(db).await?;
                None
            }
            Screen::Home => None,
        };
        if let Some(notice) = notice {
            self.say(notice)?;
        }
        self.show()
    }

    async fn delete(&mut self, position: usize) -> Result<()> {
        let db = self.db;
        let prompt = match &self.screen {
            Screen::Apartments(list) => {
                forms::delete_prompt(list, position, forms::APARTMENT_DELETE_QUESTION)?
            }
            Screen::Flats(list) => forms::delete_prompt(list, position, forms::FLAT_DELETE_QUESTION)?,
            Screen::Tenants(list) => forms::tenant_delete_prompt(db, list, position).await?,
            Screen::Employees(list) => forms::employee_delete_prompt(db, list, position).await?,
            Screen::Payments(payments) => forms::payment_delete_prompt(payments, position)?,
            Screen::Home | Screen::Users(_) => return Err(Error::validation(NO_RECORDS_HERE)),
        };
        if !self.confirm(&prompt)? {
            return self.say("Deletion cancelled.");
        }

        let message = match &mut self.screen {
            Screen::Apartments(list) => forms::delete_apartment(db, list, position).await?,
            Screen::Flats(list) => forms::delete_flat(db, list, position).await?,
            Screen::Tenants(list) => forms::delete_tenant(db, list, position).await?,
            Screen::Employees(list) => forms::delete_employee(db, list, position).await?,
            Screen::Payments(payments) => forms::delete_payment(db, payments, position).await?,
            Screen::Home | Screen::Users(_) => return Ok(()),
        };
        self.say(message)
    }

    async fn register(&mut self, username: &str, password: &str, confirm: &str) -> Result<()> {
        validation::validate_registration(self.db, username, password, confirm).await?;
        user::add(self.db, username, password).await?;
        if let Screen::Users(usernames) = &mut self.screen {
            *usernames = user::usernames(self.db).await?;
        }
        self.say("Successfully created account!")
    }

    async fn change_password(&mut self, old: &str, new: &str, confirm: &str) -> Result<()> {
        let username = self.user.clone().unwrap_or_default();
        validation::validate_password_change(self.db, &username, old, new, confirm).await?;
        user::change_password(self.db, &username, new).await?;
        self.say("Successfully changed password.")
    }

    async fn delete_user(&mut self, username: &str) -> Result<()> {
        let current = self.user.clone().unwrap_or_default();
        validation::validate_user_delete(&current, username)?;
        let question = format!("Are you sure you want to delete the user account '{username}'?");
        if !self.confirm(&question)? {
            return self.say("Deletion cancelled.");
        }
        user::delete(self.db, username).await?;
        if let Screen::Users(usernames) = &mut self.screen {
            usernames.retain(|u| u != username);
        }
        self.say(&format!("Deleted user account '{username}'."))
    }
}

const NO_RECORDS_HERE: &str = "Open a list first, e.g. 'open apartments'.";

async fn opened<S: ListSource>(db: &DatabaseConnection, source: S) -> Result<ListController<S>> {
    let mut list = ListController::new(source);
    list.open(db).await?;
    Ok(list)
}

fn unknown_column(label: &str) -> Error {
    Error::validation(format!("Unknown column '{label}'."))
}

/// Applies a list command to a generic list. Returns a notice to print, if any.
async fn drive<S: ListSource>(
    db: &DatabaseConnection,
    list: &mut ListController<S>,
    command: &Command,
) -> Result<Option<&'static str>> {
    match command {
        Command::Sort(label) => {
            let field = S::Field::from_label(label).ok_or_else(|| unknown_column(label))?;
            list.sort(db, field).await?;
        }
        Command::Search(term) => list.search(db, term).await?,
        Command::Column(label) => {
            let field = S::Field::from_label(label).ok_or_else(|| unknown_column(label))?;
            list.set_search_column(db, field).await?;
        }
        Command::Refresh => return Ok(Some(list.refresh(db).await?)),
        _ => {}
    }
    Ok(None)
}

async fn drive_payments(
    db: &DatabaseConnection,
    payments: &mut PaymentsController,
    command: &Command,
) -> Result<Option<&'static str>> {
    match command {
        Command::Sort(label) => {
            // Headings carry decorations like "Type (Inbound)" or "Date ▼".
            let bare = label.split(['(', '▲', '▼']).next().unwrap_or_default();
            let field = PaymentField::from_label(bare).ok_or_else(|| unknown_column(label))?;
            payments.sort(db, field).await?;
        }
        Command::Search(term) => payments.search(db, term).await?,
        Command::Column(label) => {
            let field = PaymentField::from_label(label).ok_or_else(|| unknown_column(label))?;
            payments.set_search_column(db, field).await?;
        }
        Command::Refresh => return Ok(Some(payments.refresh(db).await?)),
        _ => {}
    }
    Ok(None)
}
