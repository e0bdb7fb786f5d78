// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A library for talking to Twitter with a PIN-authorized user account.
//!
//! birdcall does three things:
//!
//! * It runs the PIN-based OAuth handshake, asking the user for the PIN through a `Prompt`, and
//!   keeps the resulting access token for the life of the process. See the `auth` module.
//! * It signs and sends **static calls**, whose response is one JSON document, like a search.
//!   See `StaticCall` and the `search` module.
//! * It reads **streaming calls**, where Twitter sends one record per line for as long as the
//!   connection stays open, collecting records until a time budget or a record limit is reached.
//!   See `StreamingCall` and the `stream` module.
//!
//! # Getting started
//!
//! Register an app with Twitter to get its consumer key and secret, and put them in a
//! configuration file (see `Settings`):
//!
//! ```toml
//! consumer_key = "..."
//! consumer_secret = "..."
//! search_text = "rustlang"
//! max_message = 10
//! ```
//!
//! Then load the settings, run the handshake, and make a call:
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
//! let page = birdcall::search::search(auth.clone(), &settings).execute().await?;
//! println!("{} statuses, {} calls left", page.len(), page.rate_limit_status.remaining);
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! birdcall reports what it does through `tracing`, and never installs a subscriber itself.
//! Records that are skipped while reading a stream are reported at the `warn` level, since
//! they're not errors of the call itself.
//!
//! # TLS
//!
//! By default, HTTPS goes through `native-tls`. Disable the default features and enable `rustls`
//! (system roots) or `rustls_webpki` (bundled roots) to use rustls instead.

#![warn(missing_docs)]

mod common;
pub mod auth;
mod call;
pub mod entity;
pub mod error;
mod links;
mod prompt;
pub mod search;
mod settings;
pub mod stream;
mod transport;
pub mod tweet;
pub mod user;

pub use crate::auth::{Authenticator, KeyPair, Token};
pub use crate::call::{Call, CallBuilder, CallFuture, StaticCall};
pub use crate::common::{ParamList, RateLimit, Response};
pub use crate::entity::{Collection, Entity};
pub use crate::prompt::{Prompt, StdinPrompt};
pub use crate::settings::Settings;
pub use crate::stream::{RecordStream, StreamRecord, StreamingCall};
pub use crate::transport::{FutureResponse, HttpsTransport, Transport};
