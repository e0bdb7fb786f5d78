// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Types and functions for the PIN-based authorization handshake.
//!
//! Every call to the Twitter API has to be signed with the keys of the app making it (the
//! "consumer" keys) and the keys of a user who allowed the app to act on their behalf (the
//! "access" keys). Getting the access keys takes three steps:
//!
//! 1. Ask Twitter for a temporary "request token", signed with the consumer keys only.
//! 2. Send the user to the authorization page for that token. Since there is no callback to
//!    receive, Twitter shows them a PIN, which they hand back to the app.
//! 3. Exchange the request token and the PIN for the access token.
//!
//! The `Authenticator` walks through these steps, using its `Prompt` to collect the PIN, and keeps
//! the resulting `Token` for the rest of the process. Calls share one `Authenticator` through an
//! `Arc` and ask it for the `Token` when they are executed:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use birdcall::{Authenticator, HttpsTransport, KeyPair, StdinPrompt};
//!
//! # #[tokio::main]
//! # async fn main() -> birdcall::error::Result<()> {
//! let consumer = KeyPair::new("consumer key", "consumer secret");
//! let auth = Arc::new(Authenticator::new(consumer, Arc::new(HttpsTransport::new()), StdinPrompt));
//!
//! // prints the authorization URL, then waits for the PIN on stdin
//! let token = auth.authenticate().await?;
//!
//! // later calls don't touch the network or the prompt again
//! assert_eq!(auth.authenticate().await?, token);
//! # Ok(())
//! # }
//! ```
//!
//! Each step is also available on its own, for applications that want to present the
//! authorization URL some other way. A failing step is reported as `Error::Auth` with the
//! matching `AuthPhase`, and is never retried.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use hyper::{Body, Method, Request};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info};

use crate::common::*;
use crate::error::{AuthPhase, Error, Result};
use crate::links;
use crate::prompt::Prompt;
use crate::settings::Settings;
use crate::transport::Transport;

pub(crate) mod raw;

/// A key/secret pair representing an OAuth token.
///
/// Depending on where it came from, this can be the consumer keys of the app, the temporary
/// request token of the handshake, or the access token of the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    /// A key used to identify an application or user.
    pub key: Cow<'static, str>,
    /// A private key used to sign messages from an application or user.
    pub secret: Cow<'static, str>,
}

impl KeyPair {
    /// Creates a KeyPair with the given key and secret.
    ///
    /// This can be called with either `&'static str` (a string literal) or `String`.
    pub fn new<K, S>(key: K, secret: S) -> KeyPair
    where
        K: Into<Cow<'static, str>>,
        S: Into<Cow<'static, str>>,
    {
        KeyPair {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

/// The signing capability: consumer keys plus the access token of an authorized user.
///
/// A `Token` is produced once by the `Authenticator` and never changes afterward, so it can be
/// cloned freely into every call that needs to sign a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// The consumer keys of the app.
    pub consumer: KeyPair,
    /// The access token of the user.
    pub access: KeyPair,
}

impl Token {
    /// Builds a signed GET request for `url`, with `params` as its query string.
    pub fn get(&self, url: &str, params: &ParamList) -> Result<Request<Body>> {
        raw::get(url, self, Some(params))
    }
}

/// Where the handshake currently stands.
#[derive(Clone)]
enum AuthState {
    Init,
    TemporaryTokenObtained,
    PinCollected,
    Ready(Token),
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AuthState::Init => "Init",
            AuthState::TemporaryTokenObtained => "TemporaryTokenObtained",
            AuthState::PinCollected => "PinCollected",
            AuthState::Ready(_) => "Ready",
        };
        f.write_str(name)
    }
}

/// Runs the PIN-based handshake and holds on to the resulting `Token`.
///
/// See the [module documentation](index.html) for an overview.
pub struct Authenticator {
    consumer: KeyPair,
    transport: Arc<dyn Transport>,
    prompt: Mutex<Box<dyn Prompt>>,
    state: Mutex<AuthState>,
    handshake: tokio::sync::Mutex<()>,
}

impl Authenticator {
    /// Creates an `Authenticator` for the app identified by `consumer`.
    ///
    /// Nothing is sent until one of the handshake steps is run.
    pub fn new(
        consumer: KeyPair,
        transport: Arc<dyn Transport>,
        prompt: impl Prompt + 'static,
    ) -> Authenticator {
        Authenticator {
            consumer,
            transport,
            prompt: Mutex::new(Box::new(prompt)),
            state: Mutex::new(AuthState::Init),
            handshake: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates an `Authenticator` using the consumer keys from `settings`.
    pub fn from_settings(
        settings: &Settings,
        transport: Arc<dyn Transport>,
        prompt: impl Prompt + 'static,
    ) -> Authenticator {
        Authenticator::new(settings.consumer_pair(), transport, prompt)
    }

    /// The consumer keys this `Authenticator` signs with.
    pub fn consumer(&self) -> &KeyPair {
        &self.consumer
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        &*self.transport
    }

    /// Moves the handshake forward. A completed handshake stays completed, even if a step is run
    /// again by hand afterward.
    fn set_state(&self, state: AuthState) {
        let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let (AuthState::Ready(_), false) = (&*current, matches!(state, AuthState::Ready(_))) {
            return;
        }
        debug!(state = ?state, "handshake advanced");
        *current = state;
    }

    fn current_token(&self) -> Option<Token> {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            AuthState::Ready(token) => Some(token.clone()),
            _ => None,
        }
    }

    /// Step 1: asks Twitter for a temporary request token.
    ///
    /// The request is a POST signed with the consumer keys only, asking for the out-of-band
    /// (PIN) flow. Fails with `AuthPhase::TemporaryToken`.
    pub async fn request_temporary_token(&self) -> Result<KeyPair> {
        let request = raw::RequestBuilder::new(Method::POST, links::auth::REQUEST_TOKEN)
            .oauth_callback("oob")
            .request_keys(&self.consumer, None)
            .map_err(|e| Error::auth(AuthPhase::TemporaryToken, e))?;

        let (_, body) = raw_request(self.transport(), request)
            .await
            .map_err(|e| Error::auth(AuthPhase::TemporaryToken, e))?;
        let (temp, _) = parse_token_response(&body)
            .map_err(|e| Error::auth(AuthPhase::TemporaryToken, e))?;

        info!("temporary credential acquired");
        self.set_state(AuthState::TemporaryTokenObtained);
        Ok(temp)
    }

    /// Step 2: the page where the user approves the app for the given request token.
    pub fn authorization_url(&self, temporary: &KeyPair) -> String {
        format!(
            "{}?oauth_token={}",
            links::auth::AUTHORIZE,
            percent_encode(&temporary.key)
        )
    }

    /// Step 2, continued: shows the authorization URL through the prompt and returns the PIN the
    /// user typed in, unvalidated. Fails with `AuthPhase::PinCollection`.
    ///
    /// The prompt blocks the current thread until it has an answer. On a multi-threaded tokio
    /// runtime the worker hands its other tasks off first, through `block_in_place`.
    pub fn collect_pin(&self, authorization_url: &str) -> Result<String> {
        let message = format!(
            "Open the following URL, authorize the app, then type the PIN shown:\n{}",
            authorization_url
        );
        let pin = blocking(|| {
            self.prompt
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .prompt_for_text(&message)
        })
        .map_err(|e| Error::auth(AuthPhase::PinCollection, e))?;

        self.set_state(AuthState::PinCollected);
        Ok(pin)
    }

    /// Step 3: exchanges the request token and the PIN for the access token, and keeps the
    /// resulting `Token`. Fails with `AuthPhase::AccessToken`.
    pub async fn exchange_for_access_token(&self, temporary: &KeyPair, pin: &str) -> Result<Token> {
        let request = raw::RequestBuilder::new(Method::GET, links::auth::ACCESS_TOKEN)
            .oauth_verifier(pin)
            .request_keys(&self.consumer, Some(temporary))
            .map_err(|e| Error::auth(AuthPhase::AccessToken, e))?;

        let (_, body) = raw_request(self.transport(), request)
            .await
            .map_err(|e| Error::auth(AuthPhase::AccessToken, e))?;
        let (access, extra) = parse_token_response(&body)
            .map_err(|e| Error::auth(AuthPhase::AccessToken, e))?;

        info!(
            user_id = extra.user_id.unwrap_or_default(),
            screen_name = extra.screen_name.as_deref().unwrap_or(""),
            "access token acquired"
        );

        let token = Token {
            consumer: self.consumer.clone(),
            access,
        };
        self.set_state(AuthState::Ready(token.clone()));
        Ok(token)
    }

    /// Returns the signing capability, or `AuthPhase::NotReady` if the handshake hasn't completed
    /// yet.
    pub fn signing_capability(&self) -> Result<Token> {
        self.current_token().ok_or(Error::Auth {
            phase: AuthPhase::NotReady,
            cause: None,
        })
    }

    /// Returns whether the handshake has completed.
    pub fn is_ready(&self) -> bool {
        self.current_token().is_some()
    }

    /// Runs all three steps of the handshake, once.
    ///
    /// When the `Token` already exists it is returned right away, without any request or prompt.
    /// Concurrent callers wait for the handshake in progress and share its `Token`; if it failed,
    /// the next caller in line starts over.
    pub async fn authenticate(&self) -> Result<Token> {
        if let Some(token) = self.current_token() {
            debug!("reusing access token");
            return Ok(token);
        }

        let _handshake = self.handshake.lock().await;
        if let Some(token) = self.current_token() {
            debug!("handshake completed while waiting");
            return Ok(token);
        }

        let temporary = self.request_temporary_token().await?;
        let url = self.authorization_url(&temporary);
        let pin = self.collect_pin(&url)?;
        self.exchange_for_access_token(&temporary, &pin).await
    }
}

/// Runs a blocking closure, moving the worker's other tasks elsewhere when the runtime allows it.
fn blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// The fields of an access-token response that aren't part of the token.
#[derive(Debug, Default, PartialEq)]
struct TokenExtras {
    user_id: Option<u64>,
    screen_name: Option<String>,
}

/// Reads the form-encoded body Twitter answers both token requests with.
fn parse_token_response(body: &[u8]) -> Result<(KeyPair, TokenExtras)> {
    let mut key: Option<String> = None;
    let mut secret: Option<String> = None;
    let mut extras = TokenExtras::default();

    for (k, v) in url::form_urlencoded::parse(body) {
        match k.as_ref() {
            "oauth_token" => key = Some(v.into_owned()),
            "oauth_token_secret" => secret = Some(v.into_owned()),
            "user_id" => extras.user_id = v.parse().ok(),
            "screen_name" => extras.screen_name = Some(v.into_owned()),
            _ => (),
        }
    }

    let key = key.ok_or(Error::MissingValue("oauth_token"))?;
    let secret = secret.ok_or(Error::MissingValue("oauth_token_secret"))?;
    Ok((KeyPair::new(key, secret), extras))
}
