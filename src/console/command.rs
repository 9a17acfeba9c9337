//! Operator command parsing.

use crate::errors::{Error, Result};
use std::collections::BTreeMap;

/// Lists the operator can switch to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScreenName {
    /// Every apartment
    Apartments,
    /// Flats of the apartment with this id
    Flats(String),
    /// Every tenant, housed or not
    Tenants,
    /// Every employee
    Employees,
    /// Inbound and outbound payments
    Payments,
    /// Operator accounts
    Users,
}

/// `key=value` pairs separated by `;`. Keys are matched case-insensitively.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fields(BTreeMap<String, String>);

impl Fields {
    /// Splits `a=1; b=2`. A pair without `=` is a validation error.
    pub fn parse(input: &str) -> Result<Self> {
        let mut fields = BTreeMap::new();
        for pair in input.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::validation(format!("Expected key=value, got '{pair}'."))
            })?;
            fields.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
        Ok(Self(fields))
    }

    /// The submitted value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The submitted value, or `current` when the key was not given.
    pub fn or(&self, key: &str, current: &str) -> String {
        self.get(key).unwrap_or(current).to_string()
    }

    /// The submitted value, or an empty string.
    pub fn or_empty(&self, key: &str) -> String {
        self.or(key, "")
    }
}

/// One line of operator input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print [`USAGE`]
    Help,
    /// Sign in
    Login {
        /// Account name
        username: String,
        /// Plain-text password, checked against the stored hash
        password: String,
    },
    /// Sign out and return to the login gate
    Logout,
    /// Leave the console
    Quit,
    /// Switch to a list
    Open(ScreenName),
    /// Print the current list
    List,
    /// Sort by the named heading
    Sort(String),
    /// Search the current search column; an empty term clears the filter
    Search(String),
    /// Pick the search column by heading
    Column(String),
    /// Reset search and sort
    Refresh,
    /// Register a record on the current list
    Add(Fields),
    /// 1-based row position as printed by `list`
    Edit(usize, Fields),
    /// 1-based row position, confirmed before anything is removed
    Delete(usize),
    /// Create an operator account
    Register {
        /// New account name
        username: String,
        /// New password
        password: String,
        /// Must repeat `password`
        confirm: String,
    },
    /// Change the signed-in operator's password
    Passwd {
        /// Current password
        old: String,
        /// Replacement password
        new: String,
        /// Must repeat `new`
        confirm: String,
    },
    /// Remove another operator's account
    DeleteUser(String),
}

/// Help text printed by `help`.
pub const USAGE: &str = "\
Commands:
  login <username> <password>
  open apartments | flats <apartment id> | tenants | employees | payments | users
  list                       show the current list
  sort <heading>             sort by a column; again to reverse
  search [term]              filter the search column by prefix, * for everything
  column <heading>           change the search column
  refresh                    reset search and sort
  add key=value; ...         register a record
  edit <row> key=value; ...  change a record
  delete <row>               delete a record after confirmation
  register <user> <password> <confirm>
  passwd <old> <new> <confirm>
  deluser <user>
  logout | quit";

impl Command {
    /// Parses one input line. Unknown words and wrong arity are validation errors.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match (word.to_lowercase().as_str(), args.as_slice()) {
            ("help" | "?", _) => Self::Help,
            ("login", [username, password]) => Self::Login {
                username: (*username).to_string(),
                password: (*password).to_string(),
            },
            ("logout", []) => Self::Logout,
            ("quit" | "exit", []) => Self::Quit,
            ("open", [screen]) => Self::Open(match screen.to_lowercase().as_str() {
                "apartments" => ScreenName::Apartments,
                "tenants" => ScreenName::Tenants,
                "employees" => ScreenName::Employees,
                "payments" => ScreenName::Payments,
                "users" => ScreenName::Users,
                _ => return Err(usage()),
            }),
            ("open", [screen, apartment_id]) if screen.eq_ignore_ascii_case("flats") => {
                Self::Open(ScreenName::Flats(apartment_id.to_uppercase()))
            }
            ("list", []) => Self::List,
            ("sort", [_, ..]) => Self::Sort(rest.to_string()),
            ("search", _) => Self::Search(rest.to_string()),
            ("column", [_, ..]) => Self::Column(rest.to_string()),
            ("refresh", []) => Self::Refresh,
            ("add", _) => Self::Add(Fields::parse(rest)?),
            ("edit", [position, ..]) => {
                let fields = rest.strip_prefix(*position).unwrap_or_default();
                Self::Edit(parse_position(position)?, Fields::parse(fields)?)
            }
            ("delete", [position]) => Self::Delete(parse_position(position)?),
            ("register", [username, password, confirm]) => Self::Register {
                username: (*username).to_string(),
                password: (*password).to_string(),
                confirm: (*confirm).to_string(),
            },
            ("passwd", [old, new, confirm]) => Self::Passwd {
                old: (*old).to_string(),
                new: (*new).to_string(),
                confirm: (*confirm).to_string(),
            },
            ("deluser", [username]) => Self::DeleteUser((*username).to_string()),
            _ => return Err(usage()),
        };
        Ok(command)
    }
}

fn usage() -> Error {
    Error::validation("Unrecognised command. Type 'help' for the list of commands.")
}

fn parse_position(position: &str) -> Result<usize> {
    position
        .parse::<usize>()
        .ok()
        .filter(|&p| p > 0)
        .ok_or_else(|| Error::validation(format!("'{position}' is not a row number.")))
}
