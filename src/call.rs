// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameterized, signed calls to the Twitter API.
//!
//! A call is a URL, a set of parameters, and the `Authenticator` that will sign it. The shared
//! part lives in `CallBuilder`; `StaticCall` and `StreamingCall` (in the `stream` module) wrap it
//! and dereference to it, so the setters are available on both.
//!
//! Building a call never touches the network. Whether the `Authenticator` has finished its
//! handshake is only checked when the call is executed, and a call can be changed and executed
//! again as many times as needed:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use birdcall::{Authenticator, Call, HttpsTransport, KeyPair, StaticCall, StdinPrompt};
//! use birdcall::tweet::StatusCollection;
//!
//! # #[tokio::main]
//! # async fn main() -> birdcall::error::Result<()> {
//! let consumer = KeyPair::new("consumer key", "consumer secret");
//! let auth = Arc::new(Authenticator::new(consumer, Arc::new(HttpsTransport::new()), StdinPrompt));
//! auth.authenticate().await?;
//!
//! let mut search = StaticCall::<StatusCollection>::new(
//!     auth.clone(),
//!     "https://api.twitter.com/1.1/search/tweets.json",
//! )
//! .with_parameter("q", "rustlang")
//! .with_parameter("count", "10");
//!
//! let first = search.execute().await?;
//! search.add_parameter("q", "ferris");
//! let second = search.execute().await?;
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::Arc;

use hyper::{Body, Request};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::auth::Authenticator;
use crate::common::*;
use crate::error::{Error, Result};

/// The future returned by `Call::execute`.
pub type CallFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Something that can be sent to Twitter to get a result back.
pub trait Call {
    /// What a successful execution produces.
    type Output;

    /// Signs and sends the call, then reads the result.
    ///
    /// Fails with an `AuthPhase::NotReady` authorization error if the `Authenticator` hasn't
    /// finished its handshake, or with `Error::Request` if anything after signing failed.
    fn execute(&self) -> CallFuture<'_, Self::Output>;
}

/// The URL, parameters and `Authenticator` shared by every kind of call.
#[derive(Clone)]
pub struct CallBuilder {
    url: String,
    params: ParamList,
    auth: Arc<Authenticator>,
}

impl CallBuilder {
    /// Creates a call to `url` without parameters.
    pub fn new(auth: Arc<Authenticator>, url: impl Into<String>) -> CallBuilder {
        CallBuilder {
            url: url.into(),
            params: ParamList::new(),
            auth,
        }
    }

    /// Sets a parameter, replacing any earlier value for the same key.
    pub fn add_parameter(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> &mut Self {
        self.params.add_param_ref(key, value);
        self
    }

    /// Sets a parameter, consuming and returning the builder.
    pub fn with_parameter(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.add_parameter(key, value);
        self
    }

    /// Replaces the URL the call is sent to.
    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = url.into();
        self
    }

    /// Replaces the URL, consuming and returning the builder.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.set_url(url);
        self
    }

    /// The URL the call is sent to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The parameters sent with the call.
    pub fn params(&self) -> &ParamList {
        &self.params
    }

    /// The `Authenticator` that signs the call.
    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.auth
    }

    /// Signs a GET request for the current URL and parameters.
    pub(crate) fn signed_request(&self) -> Result<Request<Body>> {
        let token = self.auth.signing_capability()?;
        token.get(&self.url, &self.params).map_err(Error::request)
    }
}

/// A call whose response is a single JSON document, read in full into a `T`.
///
/// Either the whole document parses, or the call fails: there are no partial results.
pub struct StaticCall<T> {
    builder: CallBuilder,
    _result: PhantomData<fn() -> T>,
}

impl<T> StaticCall<T> {
    /// Creates a call to `url` without parameters.
    pub fn new(auth: Arc<Authenticator>, url: impl Into<String>) -> StaticCall<T> {
        StaticCall {
            builder: CallBuilder::new(auth, url),
            _result: PhantomData,
        }
    }

    /// Sets a parameter, replacing any earlier value for the same key.
    pub fn with_parameter(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.builder.add_parameter(key, value);
        self
    }

    /// Replaces the URL the call is sent to.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.builder.set_url(url);
        self
    }
}

impl<T> Clone for StaticCall<T> {
    fn clone(&self) -> Self {
        StaticCall {
            builder: self.builder.clone(),
            _result: PhantomData,
        }
    }
}

impl<T> Deref for StaticCall<T> {
    type Target = CallBuilder;

    fn deref(&self) -> &CallBuilder {
        &self.builder
    }
}

impl<T> DerefMut for StaticCall<T> {
    fn deref_mut(&mut self) -> &mut CallBuilder {
        &mut self.builder
    }
}

impl<T> Call for StaticCall<T>
where
    T: DeserializeOwned + Send,
{
    type Output = Response<T>;

    fn execute(&self) -> CallFuture<'_, Response<T>> {
        Box::pin(async move {
            let request = self.signed_request()?;
            let response = request_with_json_response(self.auth.transport(), request)
                .await
                .map_err(Error::request)?;

            info!(
                url = %self.url,
                remaining = response.rate_limit_status.remaining,
                "static call completed"
            );
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::{fixed_pin, ready_authenticator};
    use crate::auth::KeyPair;
    use crate::error::AuthPhase;
    use crate::links;
    use crate::transport::mock::MockTransport;
    use crate::tweet::StatusCollection;
    use hyper::{Method, StatusCode};

    #[test]
    fn builder_forms() {
        let auth = Arc::new(Authenticator::new(
            KeyPair::new("CK", "CS"),
            Arc::new(MockTransport::new()),
            fixed_pin(""),
        ));
        let builder = CallBuilder::new(auth, "https://example.com/a.json")
            .with_parameter("track", "rust")
            .with_parameter("track", "ferris")
            .with_url(links::statuses::SEARCH);

        assert_eq!(builder.url(), links::statuses::SEARCH);
        assert_eq!(builder.params().to_urlencoded(), "track=ferris");
        assert!(!builder.authenticator().is_ready());
    }

    #[test]
    fn parameters_overwrite() {
        let auth = Arc::new(Authenticator::new(
            KeyPair::new("CK", "CS"),
            Arc::new(MockTransport::new()),
            fixed_pin(""),
        ));
        let mut call = StaticCall::<serde_json::Value>::new(auth, links::statuses::SEARCH)
            .with_parameter("q", "first")
            .with_parameter("count", "5");
        call.add_parameter("q", "second").add_parameter("q", "third");
        call.set_url("https://example.com/other.json");

        assert_eq!(call.params().len(), 2);
        assert_eq!(call.params().get("q").map(|v| v.as_ref()), Some("third"));
        assert_eq!(call.url(), "https://example.com/other.json");
    }

    #[tokio::test]
    async fn not_ready() {
        let transport = Arc::new(MockTransport::new());
        let auth = Arc::new(Authenticator::new(
            KeyPair::new("CK", "CS"),
            transport.clone(),
            fixed_pin(""),
        ));
        let call = StaticCall::<StatusCollection>::new(auth, links::statuses::SEARCH);

        let err = call.execute().await.unwrap_err();
        assert_eq!(err.auth_phase(), Some(AuthPhase::NotReady));
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn search_scenario() {
        let transport = Arc::new(MockTransport::new());
        let auth = ready_authenticator(transport.clone()).await;
        transport.push_body(
            StatusCode::OK,
            crate::common::tests::load_file("sample_payloads/search.json"),
        );

        let call = StaticCall::<StatusCollection>::new(auth, links::statuses::SEARCH)
            .with_parameter("q", "hello")
            .with_parameter("count", "10");
        let statuses = call.execute().await.unwrap();
        assert_eq!(statuses.len(), 3);

        let seen = transport.seen();
        assert_eq!(seen.len(), 3);
        let search = &seen[2];
        assert_eq!(search.method, Method::GET);
        assert_eq!(search.uri.path(), "/1.1/search/tweets.json");
        assert_eq!(search.uri.query(), Some("count=10&q=hello"));
        assert_eq!(search.oauth_param("oauth_consumer_key").as_deref(), Some("CK"));
        assert_eq!(search.oauth_param("oauth_token").as_deref(), Some("ACC456"));
        assert!(search.oauth_param("oauth_signature").is_some());
        assert!(search.oauth_param("oauth_verifier").is_none());
    }

    #[tokio::test]
    async fn can_execute_again() {
        let transport = Arc::new(MockTransport::new());
        let auth = ready_authenticator(transport.clone()).await;
        transport.push_body(StatusCode::OK, r#"{"statuses": []}"#);
        transport.push_body(StatusCode::OK, r#"{"statuses": []}"#);

        let mut call = StaticCall::<StatusCollection>::new(auth, links::statuses::SEARCH)
            .with_parameter("q", "one");
        call.execute().await.unwrap();
        call.add_parameter("q", "two");
        call.execute().await.unwrap();

        let seen = transport.seen();
        assert_eq!(seen[2].uri.query(), Some("q=one"));
        assert_eq!(seen[3].uri.query(), Some("q=two"));
    }

    #[tokio::test]
    async fn bad_document() {
        let transport = Arc::new(MockTransport::new());
        let auth = ready_authenticator(transport.clone()).await;
        transport.push_body(StatusCode::OK, r#"{"statuses": [ oops"#);

        let call = StaticCall::<StatusCollection>::new(auth, links::statuses::SEARCH);
        let err = call.execute().await.unwrap_err();

        assert!(matches!(err, Error::Request(ref cause) if matches!(**cause, Error::DeserializeError(_))));
    }

    #[tokio::test]
    async fn bad_status() {
        let transport = Arc::new(MockTransport::new());
        let auth = ready_authenticator(transport.clone()).await;
        transport.push_body(StatusCode::INTERNAL_SERVER_ERROR, "");

        let call = StaticCall::<StatusCollection>::new(auth, links::statuses::SEARCH);
        let err = call.execute().await.unwrap_err();

        assert!(matches!(err, Error::Request(ref cause) if matches!(**cause, Error::BadStatus(_))));
        assert_eq!(err.auth_phase(), None);
    }
}
