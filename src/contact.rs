//! Contact domain record and draft types.

use serde::{Deserialize, Serialize};

use crate::types::{ContactField, ContactId};

/// Fully materialized, authoritative contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    /// Stable contact identifier.
    pub id: ContactId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Email address, unique across the directory.
    pub email: String,
    /// Phone number text, stored as entered.
    pub phone_number: String,
    /// Company name, when provided.
    #[serde(default)]
    pub company: Option<String>,
    /// Job title, when provided.
    #[serde(default)]
    pub job_title: Option<String>,
}

impl ContactRecord {
    /// Returns the text of `field` for sorting; unset optionals read as `""`.
    pub fn field_text(&self, field: ContactField) -> &str {
        match field {
            ContactField::FirstName => &self.first_name,
            ContactField::LastName => &self.last_name,
            ContactField::Email => &self.email,
            ContactField::PhoneNumber => &self.phone_number,
            ContactField::Company => self.company.as_deref().unwrap_or(""),
            ContactField::JobTitle => self.job_title.as_deref().unwrap_or(""),
        }
    }
}

/// Field payload used to create a new [`ContactRecord`] or replace an
/// existing one wholesale.
///
/// Every key is optional at the wire layer so that an absent key and an
/// empty value fail validation the same way. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ContactDraft {
    /// Given name; required.
    pub first_name: String,
    /// Family name; required.
    pub last_name: String,
    /// Email address; required, must be unique.
    pub email: String,
    /// Phone number text; required.
    pub phone_number: String,
    /// Company name; optional.
    pub company: Option<String>,
    /// Job title; optional.
    pub job_title: Option<String>,
}

impl ContactDraft {
    /// Returns the wire name of the first required field that is missing
    /// or empty, in declaration order.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        if self.first_name.is_empty() {
            return Some("firstName");
        }
        if self.last_name.is_empty() {
            return Some("lastName");
        }
        if self.email.is_empty() {
            return Some("email");
        }
        if self.phone_number.is_empty() {
            return Some("phoneNumber");
        }
        None
    }

    /// Materializes a record from this draft under `id`.
    pub fn into_record(self, id: ContactId) -> ContactRecord {
        ContactRecord {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            company: self.company,
            job_title: self.job_title,
        }
    }
}
