//! The mirrored user record.
//!
//! Field names follow the remote JSON representation so records can be
//! decoded directly from the directory's `/users` payload.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};

/// A user from the remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Primary key.
    pub id: UserId,
    /// Display name. Reads are ordered by this field.
    pub name: String,
    /// Account handle.
    pub username: String,
    /// Contact email. Searchable alongside `name`.
    pub email: String,
    /// Postal address.
    pub address: Address,
    /// Phone number, free-form.
    pub phone: String,
    /// Personal or company website.
    pub website: String,
    /// Employer.
    pub company: Company,
    /// Unix milliseconds at which this record was written to the local store.
    ///
    /// Never part of the remote representation.
    #[serde(skip)]
    pub synced_at: Option<i64>,
}

impl UserRecord {
    /// Return a copy stamped with the given persistence time.
    pub fn stamped(mut self, synced_at: i64) -> Self {
        self.synced_at = Some(synced_at);
        self
    }
}

/// Postal address of a user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    /// Street name and number.
    pub street: String,
    /// Apartment or suite.
    pub suite: String,
    /// City.
    pub city: String,
    /// Postal code.
    pub zipcode: String,
    /// Coordinates.
    pub geo: Geo,
}

/// Geographic coordinates, kept as the strings the directory returns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Geo {
    /// Latitude.
    pub lat: String,
    /// Longitude.
    pub lng: String,
}

/// Company a user works for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Company {
    /// Company name.
    pub name: String,
    /// Marketing tagline.
    #[serde(rename = "catchPhrase")]
    pub catch_phrase: String,
    /// Business slogan.
    pub bs: String,
}
