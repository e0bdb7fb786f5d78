// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Statuses (tweets) and collections of them.
//!
//! A `Status` is read from the JSON Twitter sends for a tweet, keeping the ID, the timestamp, the
//! text, and the embedded `Author`. Both search responses and the filter stream carry them. A
//! search response holds a whole page of them under `statuses`, which deserializes straight into
//! a `StatusCollection`:
//!
//! ```rust
//! use birdcall::tweet::StatusCollection;
//!
//! let page: StatusCollection = serde_json::from_str(r#"{
//!     "statuses": [{
//!         "id": 1050118621198921728,
//!         "created_at": "Wed Oct 10 20:19:24 +0000 2018",
//!         "text": "To make room for more expression, we will now count all emojis as equal.",
//!         "user": {
//!             "id": 6253282,
//!             "created_at": "Wed May 23 06:01:13 +0000 2007",
//!             "name": "Twitter API",
//!             "screen_name": "twitterapi"
//!         }
//!     }],
//!     "search_metadata": {"count": 1}
//! }"#).unwrap();
//!
//! assert_eq!(page.len(), 1);
//! ```
//!
//! Statuses that aren't valid (see `Entity::is_valid`) are left out of the collection, as are
//! repeated IDs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::common::*;
use crate::entity::{Collection, Entity};
use crate::user::Author;

pub(crate) mod raw;

/// A single status, as returned by search or by the filter stream.
///
/// Two statuses are equal when they have the same ID. A status without an ID equals nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    /// The numeric ID of the status.
    #[serde(default)]
    pub id: Option<u64>,
    /// When the status was posted. Absent if the timestamp couldn't be parsed.
    #[serde(default, deserialize_with = "deserialize_opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    /// The user who posted the status.
    #[serde(default)]
    pub user: Option<Author>,
    /// The text of the status.
    #[serde(default)]
    pub text: Option<String>,
}

impl PartialEq for Status {
    fn eq(&self, other: &Status) -> bool {
        self.id.is_some() && self.id == other.id
    }
}

impl Entity for Status {
    fn id(&self) -> Option<u64> {
        self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn is_valid(&self) -> bool {
        self.id.is_some()
            && self.created_at.is_some()
            && self.text.is_some()
            && self.user.as_ref().map_or(false, Author::is_valid)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.created_at {
            Some(date) => write!(f, "[at {}, by ", date.format(TIMESTAMP_FORMAT))?,
            None => write!(f, "[at <unknown>, by ")?,
        }
        match &self.user {
            Some(user) => write!(f, "{}", user)?,
            None => write!(f, "<unknown>")?,
        }
        write!(f, "]: {}", self.text.as_deref().unwrap_or(""))
    }
}

/// A duplicate-free sequence of statuses.
pub type StatusCollection = Collection<Status>;

impl Collection<Status> {
    /// Returns the statuses sorted by author creation time, then author ID, then status creation
    /// time, all ascending. Missing values sort first.
    ///
    /// The sort is stable, and the collection itself keeps its insertion order.
    pub fn ordered(&self) -> Vec<Status> {
        let mut statuses = self.as_slice().to_vec();
        statuses.sort_by_key(|status| {
            let author = status.user.as_ref();
            (
                author.and_then(|a| a.created_at),
                author.and_then(|a| a.id),
                status.created_at,
            )
        });
        statuses
    }
}

impl<'de> Deserialize<'de> for Collection<Status> {
    fn deserialize<D>(deser: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = raw::RawStatuses::deserialize(deser)?;
        let mut collection = Collection::new();
        for status in raw.statuses.into_iter().filter(Status::is_valid) {
            // valid statuses always carry an id
            collection.add(status).map_err(serde::de::Error::custom)?;
        }
        Ok(collection)
    }
}
