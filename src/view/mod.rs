//! Controllers that sit between the operator and the repositories.

/// Generic search/sort controller
pub mod list;
/// Payment list controller
pub mod payments;
/// Per-entity list sources
pub mod sources;

pub use list::{ListController, ListSource};
pub use payments::PaymentsController;

/// Notification shown after a refresh.
pub const REFRESHED: &str = "Successfully refreshed records!";

/// Which panel of an entity screen is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// The list itself
    #[default]
    Details,
    /// The register form
    Register,
    /// The edit form for the row at this position
    Edit(usize),
}

/// Collapses whitespace runs to single spaces and trims the ends.
#[must_use]
pub fn normalize_term(term: &str) -> String {
    term.split_whitespace().collect::<Vec<_>>().join(" ")
}
