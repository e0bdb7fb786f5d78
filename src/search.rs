// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Searching recent statuses.
//!
//! `search` sets up a `StaticCall` against the standard search endpoint, which answers with one
//! page of statuses matching a query. The query and the page size come from `search_text` and
//! `max_message` in the settings, and either can be overridden on the returned call before it's
//! executed:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use birdcall::{Authenticator, Call, HttpsTransport, Settings, StdinPrompt};
//!
//! # #[tokio::main]
//! # async fn main() -> birdcall::error::Result<()> {
//! let settings = Settings::load("birdcall.toml")?;
//! let auth = Arc::new(Authenticator::from_settings(
//!     &settings,
//!     Arc::new(HttpsTransport::new()),
//!     StdinPrompt,
//! ));
//! auth.authenticate().await?;
//!
//! let page = birdcall::search::search(auth, &settings)
//!     .with_parameter("q", "rustlang")
//!     .execute()
//!     .await?;
//!
//! for status in page.ordered() {
//!     println!("{}", status);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::call::StaticCall;
use crate::links;
use crate::settings::Settings;
use crate::tweet::StatusCollection;

/// Searches for statuses matching `search_text`, `max_message` at a time.
///
/// Either parameter is left out when it isn't set, which leaves Twitter's default page size in
/// place but makes Twitter reject the call for lack of a query.
pub fn search(auth: Arc<Authenticator>, settings: &Settings) -> StaticCall<StatusCollection> {
    let mut call = StaticCall::new(auth, links::statuses::SEARCH);
    if let Some(text) = &settings.search_text {
        call.add_parameter("q", text.clone());
    }
    if let Some(count) = settings.max_message {
        call.add_parameter("count", count.to_string());
    }
    call
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::fixed_pin;
    use crate::auth::KeyPair;
    use crate::settings::tests::settings_from_toml;
    use crate::transport::mock::MockTransport;

    fn authenticator() -> Arc<Authenticator> {
        Arc::new(Authenticator::new(
            KeyPair::new("CK", "CS"),
            Arc::new(MockTransport::new()),
            fixed_pin(""),
        ))
    }

    #[test]
    fn parameters_from_settings() {
        let settings = settings_from_toml(
            r#"
            consumer_key = "CK"
            consumer_secret = "CS"
            search_text = "hello"
            max_message = 10
            "#,
        )
        .unwrap();

        let call = search(authenticator(), &settings);
        assert_eq!(call.url(), links::statuses::SEARCH);
        assert_eq!(call.params().to_urlencoded(), "count=10&q=hello");
    }

    #[test]
    fn unset_parameters_are_left_out() {
        let settings = settings_from_toml("consumer_key = \"CK\"\nconsumer_secret = \"CS\"").unwrap();

        let call = search(authenticator(), &settings);
        assert!(call.params().is_empty());
    }
}
