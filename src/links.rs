// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Internal module to contain the URLs used by the library.

pub mod auth {
    pub const REQUEST_TOKEN: &str = "https://api.twitter.com/oauth/request_token";
    pub const AUTHORIZE: &str = "https://api.twitter.com/oauth/authorize";
    pub const ACCESS_TOKEN: &str = "https://api.twitter.com/oauth/access_token";
}

pub mod statuses {
    pub const SEARCH: &str = "https://api.twitter.com/1.1/search/tweets.json";
}

pub mod stream {
    pub const FILTER: &str = "https://stream.twitter.com/1.1/statuses/filter.json";
}
