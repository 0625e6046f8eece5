//! Technician model.
//!
//! Technicians are the workers jobs are dispatched to. The store only relies
//! on `id`; the remaining fields are carried through untouched for the
//! scheduling board.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A schedulable field technician.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technician {
    /// Unique technician identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Trade skills (e.g., "hvac", "plumbing").
    #[serde(default)]
    pub skills: Vec<String>,
    /// Whether the technician takes new work.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Business-specific metadata.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

fn default_active() -> bool {
    true
}

/// Partial technician fields for `update_technician`.
///
/// `Some` fields overwrite, `None` fields leave the existing value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the email.
    #[serde(
        default,
        deserialize_with = "super::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<Option<String>>,
    /// `Some(None)` clears the phone.
    #[serde(
        default,
        deserialize_with = "super::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<Option<String>>,
    pub skills: Option<Vec<String>>,
    pub active: Option<bool>,
    pub attributes: Option<HashMap<String, String>>,
}

impl Technician {
    /// Creates an active technician with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            email: None,
            phone: None,
            skills: Vec::new(),
            active: true,
            attributes: HashMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the contact email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the contact phone.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Adds a skill.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.push(skill.into());
        self
    }

    /// Adds a business attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether this technician has a given skill.
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }

    /// Merges a patch onto this technician. The ID never changes.
    pub fn apply(&mut self, patch: &TechnicianPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            self.phone = phone.clone();
        }
        if let Some(skills) = &patch.skills {
            self.skills = skills.clone();
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(attributes) = &patch.attributes {
            self.attributes = attributes.clone();
        }
    }
}
