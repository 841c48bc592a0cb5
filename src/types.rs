//! Shared primitive IDs and table-ordering enums.

/// Monotonic contact identifier.
pub type ContactId = u64;
/// Monotonic operation sequence number.
pub type OpSeq = u64;

/// Sortable contact column.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactField {
    /// Given name (default sort column).
    #[default]
    FirstName,
    /// Family name.
    LastName,
    /// Email address.
    Email,
    /// Phone number.
    PhoneNumber,
    /// Company name.
    Company,
    /// Job title.
    JobTitle,
}

/// Direction applied to the active sort column.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Smallest value first (default).
    #[default]
    Ascending,
    /// Largest value first.
    Descending,
}

impl SortDirection {
    /// Returns the opposite direction.
    pub fn toggle(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}
