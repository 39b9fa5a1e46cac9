use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::models::MonitorState;

/// Administrative thermal-point area. Descriptive metadata only, never
/// used when matching page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Centru,
    Vest,
    Sud,
    Nord,
    Est,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Zone::Centru => "Centru",
            Zone::Vest => "Vest",
            Zone::Sud => "Sud",
            Zone::Nord => "Nord",
            Zone::Est => "Est",
        };
        f.write_str(s)
    }
}

/// Wizard submission: a street to monitor plus an optional zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub street: String,
    #[serde(default)]
    pub zone: Option<Zone>,
}

/// A configured monitored location. Immutable once registered; removed
/// only as a whole together with its sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub street: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
    pub title: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("street must not be empty")]
    EmptyStreet,
    #[error("location '{0}' is already configured")]
    AlreadyConfigured(String),
}

/// Derives the uniqueness key for a (street, zone) pair: lowercased, with
/// runs of whitespace and punctuation collapsed to single underscores, and
/// the zone appended when present. Deterministic, so submitting the same
/// pair twice always collides and distinct streets never do.
pub fn location_id(street: &str, zone: Option<Zone>) -> String {
    let mut key = String::with_capacity(street.len());
    let mut separated = true;
    for c in street.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            key.push(c);
            separated = false;
        } else if !separated {
            key.push('_');
            separated = true;
        }
    }
    while key.ends_with('_') {
        key.pop();
    }
    match zone {
        Some(zone) => format!("{}_{}", key, zone.to_string().to_lowercase()),
        None => key,
    }
}

/// Validates a wizard submission against the already-registered locations
/// and builds the new record. The caller inserts it into the state; this
/// function only decides.
pub fn register(
    form: &RegistrationForm,
    existing: &HashMap<String, Location>,
) -> Result<Location, RegistrationError> {
    let street = form.street.trim();
    if street.is_empty() {
        return Err(RegistrationError::EmptyStreet);
    }

    let id = location_id(street, form.zone);
    if existing.contains_key(&id) {
        return Err(RegistrationError::AlreadyConfigured(id));
    }

    Ok(Location {
        id,
        street: street.to_string(),
        zone: form.zone,
        title: format!("Termoenergetica - {street}"),
    })
}

/// Convenience wrapper applying `register` to the live state.
pub fn register_into(
    form: &RegistrationForm,
    state: &mut MonitorState,
) -> Result<Location, RegistrationError> {
    let location = register(form, &state.locations)?;
    state.add_location(location.clone());
    Ok(location)
}
