// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Identity and validity of the values parsed from Twitter, and the collection that keeps them
//! unique.
//!
//! Twitter identifies every user and tweet by a numeric ID, and two values with the same ID are
//! the same thing, whatever else differs between them. Values coming off the wire can be
//! incomplete, though, so every field is optional and `Entity::is_valid` says whether the value
//! has everything it needs. Calls only ever keep valid values.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// A value Twitter identifies by a numeric ID.
pub trait Entity {
    /// The numeric ID of this value, if it was present.
    fn id(&self) -> Option<u64>;

    /// When this value was created, if the timestamp was present and could be parsed.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Whether this value has its ID, its timestamp, and everything else it requires.
    fn is_valid(&self) -> bool;

    /// Whether this value and `other` have the same ID.
    ///
    /// Comparing a value that has no ID is an error rather than a mismatch.
    fn same_id(&self, other: &Self) -> Result<bool>
    where
        Self: Sized,
    {
        match (self.id(), other.id()) {
            (Some(mine), Some(theirs)) => Ok(mine == theirs),
            _ => Err(Error::MissingValue("id")),
        }
    }
}

/// A sequence of entities that holds at most one entity per ID.
///
/// Entities stay in the order they were first added. Adding an entity whose ID is already present
/// leaves the collection untouched, so the first one seen wins.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
    ids: HashSet<u64>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection {
            items: Vec::new(),
            ids: HashSet::new(),
        }
    }
}

impl<T: Entity> Collection<T> {
    /// Creates an empty collection.
    pub fn new() -> Collection<T> {
        Collection::default()
    }

    /// Adds `item` if no entity with its ID is present yet.
    ///
    /// Returns `Ok(true)` if it was added, `Ok(false)` if its ID was already taken, and
    /// `Error::MissingValue("id")` if it has no ID at all.
    pub fn add(&mut self, item: T) -> Result<bool> {
        let id = item.id().ok_or(Error::MissingValue("id"))?;
        if !self.ids.insert(id) {
            return Ok(false);
        }
        self.items.push(item);
        Ok(true)
    }

    /// Returns whether an entity with the given ID is present.
    pub fn contains_id(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }
}

impl<T> Collection<T> {
    /// The number of entities in the collection.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the entities in the order they were added.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The entities in the order they were added.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Unwraps the entities in the order they were added.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
