// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The author of a status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::common::*;
use crate::entity::Entity;

/// The user who posted a status, as embedded in the `user` field of a status.
///
/// Only the fields birdcall cares about are read; Twitter sends many more. Every field is
/// optional on the wire, and an `Author` is only valid when all of them are present.
///
/// Two authors are equal when they have the same ID. An author without an ID equals nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    /// The numeric ID of the user.
    #[serde(default)]
    pub id: Option<u64>,
    /// When the account was created. Absent if the timestamp couldn't be parsed.
    #[serde(default, deserialize_with = "deserialize_opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    /// The display name of the user.
    #[serde(default)]
    pub name: Option<String>,
    /// The handle of the user, without the `@`.
    #[serde(default)]
    pub screen_name: Option<String>,
}

impl PartialEq for Author {
    fn eq(&self, other: &Author) -> bool {
        self.id.is_some() && self.id == other.id
    }
}

impl Entity for Author {
    fn id(&self) -> Option<u64> {
        self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn is_valid(&self) -> bool {
        self.id.is_some()
            && self.created_at.is_some()
            && self.name.is_some()
            && self.screen_name.is_some()
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Author name: {}", self.name.as_deref().unwrap_or("<unknown>"))?;
        match self.created_at {
            Some(date) => write!(f, "(creating date: {})", date.format(TIMESTAMP_FORMAT)),
            None => write!(f, "(creating date: <unknown>)"),
        }
    }
}
