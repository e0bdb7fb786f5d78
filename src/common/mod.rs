// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Set of structs and methods that act as a sort of internal prelude.
//!
//! The elements available in this module are fairly basic building blocks that the other modules
//! glob-import to make available as a common language.
//!
//! ## `ParamList`
//!
//! `ParamList` is the collection of parameters attached to a web call. It's consumed by the auth
//! module both to build the query string and to compute the OAuth signature, so it lives here
//! where everyone can reach it. It's backed by a `BTreeMap` so the rendered query string comes
//! out in the same order every time, which makes requests easy to compare in logs and tests.
//!
//! ## Timestamps
//!
//! Twitter always gives timestamps in the same format (`Wed Aug 27 13:08:45 +0000 2008`), so
//! `parse_timestamp` and the `deserialize_opt_datetime` glue for serde live here instead of being
//! written out on every entity. Unlike a strict deserializer, these give `None` for a timestamp
//! that doesn't parse, which the entities then treat as "no timestamp".
//!
//! ## `Response`
//!
//! In its own module, `Response` pairs a parsed value with the rate-limit information from the
//! response headers. The module also contains the functions every web call goes through: the one
//! that loads a response and checks it for errors, and the one that deserializes it.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hyper::header::{HeaderMap, HeaderValue};
use percent_encoding::{utf8_percent_encode, AsciiSet, PercentEncode};
use serde::{Deserialize, Deserializer};

mod response;

pub use crate::common::response::*;

/// A set of headers returned with a response.
pub type Headers = HeaderMap<HeaderValue>;

/// The format Twitter uses for every `created_at` field.
pub const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Represents a list of parameters to a Twitter API call.
///
/// This type is a wrapper around a `BTreeMap<Cow<'static, str>, Cow<'static, str>>` to collect a
/// set of parameter key/value pairs. These are then used to assemble and sign a Twitter API
/// request. The `Cow` type is used to avoid having to allocate a `String` if a string literal is
/// used for a parameter. All the functions that add parameters to this `ParamList` accept `impl
/// Into<Cow<'static, str>>`, meaning that either a string literal or an owned `String` may be
/// used.
///
/// A key holds exactly one value: adding a key a second time replaces the earlier value.
///
/// ```
/// use birdcall::ParamList;
///
/// let params = ParamList::new()
///     .add_param("q", "rustlang")
///     .add_param("count", "10")
///     .add_param("q", "ferris");
///
/// assert_eq!(params.get("q").map(|v| v.as_ref()), Some("ferris"));
/// assert_eq!(params.to_urlencoded(), "count=10&q=ferris");
/// ```
#[derive(Debug, Clone, Default, PartialEq, derive_more::Deref, derive_more::DerefMut, derive_more::From)]
pub struct ParamList(BTreeMap<Cow<'static, str>, Cow<'static, str>>);

impl ParamList {
    /// Creates a new, empty `ParamList`.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds the given key/value parameter to this `ParamList`.
    pub fn add_param(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    /// Adds the given key/value parameter to this `ParamList` only if the given value is `Some`.
    ///
    /// If the given value is `None`, then the `ParamList` is returned unmodified.
    pub fn add_opt_param(
        self,
        key: impl Into<Cow<'static, str>>,
        value: Option<impl Into<Cow<'static, str>>>,
    ) -> Self {
        match value {
            Some(val) => self.add_param(key.into(), val.into()),
            None => self,
        }
    }

    /// Adds the given key/value to this `ParamList` by mutating it in place, rather than consuming
    /// it as in `add_param`.
    pub fn add_param_ref(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) {
        self.0.insert(key.into(), value.into());
    }

    /// Renders this `ParamList` as an `application/x-www-form-urlencoded` string.
    ///
    /// The key/value pairs are printed as `key1=value1&key2=value2`, sorted by key, with all keys
    /// and values being percent-encoded according to Twitter's requirements.
    pub fn to_urlencoded(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Parses a timestamp in Twitter's `created_at` format.
///
/// Surrounding whitespace is ignored. Anything else that doesn't match the format gives `None`.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(input.trim(), TIMESTAMP_FORMAT)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// Reads an optional `created_at` field, giving `None` when it is absent, null, or unparseable.
pub fn deserialize_opt_datetime<'de, D>(ser: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(ser)?;
    Ok(s.as_deref().and_then(parse_timestamp))
}

/// Percent-encodes the given string the way the Twitter API expects.
///
/// Twitter bases its encoding scheme on RFC 3986, Section 2.1. They describe the process in full
/// [in their documentation][twitter-percent], but the process can be summarized by saying that
/// every *byte* that is not an ASCII number or letter, or the ASCII characters `-`, `.`, `_`, or
/// `~` must be replaced with a percent sign (`%`) and the byte value in hexadecimal.
///
/// [twitter-percent]: https://developer.twitter.com/en/docs/basics/authentication/oauth-1-0a/percent-encoding-parameters
pub fn percent_encode(src: &str) -> PercentEncode<'_> {
    lazy_static::lazy_static! {
        static ref ENCODER: AsciiSet = percent_encoding::NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');
    }
    utf8_percent_encode(src, &*ENCODER)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::fs::File;
    use std::io::Read;

    pub(crate) fn load_file(path: &str) -> String {
        let mut file = File::open(path).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn add_param_keeps_last_value() {
        let params = ParamList::new()
            .add_param("track", "rust")
            .add_param("count", "10")
            .add_param("track", "ferris")
            .add_param("count", "20")
            .add_param("track", "crab");

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("track").map(|v| v.as_ref()), Some("crab"));
        assert_eq!(params.get("count").map(|v| v.as_ref()), Some("20"));
    }

    #[test]
    fn opt_params() {
        let params = ParamList::new()
            .add_opt_param("lang", Some("en"))
            .add_opt_param("count", None::<String>);

        assert_eq!(params.to_urlencoded(), "lang=en");
    }

    #[test]
    fn urlencoded_is_sorted_and_escaped() {
        let mut params = ParamList::new().add_param("status", "Hello Ladies + Gentlemen");
        params.add_param_ref("include_entities", "true");

        assert_eq!(
            params.to_urlencoded(),
            "include_entities=true&status=Hello%20Ladies%20%2B%20Gentlemen"
        );
    }

    #[test]
    fn percent_encoding_keeps_unreserved() {
        assert_eq!(percent_encode("test-value_123.txt~").to_string(), "test-value_123.txt~");
        assert_eq!(percent_encode("foo=bar&baz").to_string(), "foo%3Dbar%26baz");
        assert_eq!(percent_encode("café").to_string(), "caf%C3%A9");
    }

    #[test]
    fn timestamps() {
        let date = parse_timestamp("Wed Aug 27 13:08:45 +0000 2008").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2008, 8, 27));
        assert_eq!((date.hour(), date.minute(), date.second()), (13, 8, 45));

        let shifted = parse_timestamp("  Wed Aug 27 15:08:45 +0200 2008\n").unwrap();
        assert_eq!(shifted, date);

        assert_eq!(parse_timestamp("2008-08-27T13:08:45Z"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
