// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A composite error type for errors that can occur while interacting with Twitter.
//!
//! Every fallible operation in birdcall returns an `Error` from this module. Two variants matter
//! most to callers, since they are what the public operations actually hand back:
//!
//! * `Auth` is returned when any step of the PIN-based handshake fails, or when a call is executed
//!   before the `Authenticator` has obtained its access token. The `phase` says which step it was.
//! * `Request` is returned when a static call or a stream fails after authorization succeeded:
//!   the request couldn't be built or sent, Twitter answered with an error, or the response
//!   couldn't be parsed.
//!
//! Both carry the error that caused them, so the lower-level variants below show up as their
//! `source()`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::Headers;

/// Convenient alias to a Result containing a local Error type
pub type Result<T> = std::result::Result<T, Error>;

/// The step of the authorization handshake that failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, derive_more::Display)]
pub enum AuthPhase {
    /// Requesting the temporary (request) token from Twitter.
    #[display(fmt = "temporary token request")]
    TemporaryToken,
    /// Asking the user for the PIN shown on the authorization page.
    #[display(fmt = "PIN collection")]
    PinCollection,
    /// Exchanging the temporary token and PIN for an access token.
    #[display(fmt = "access token exchange")]
    AccessToken,
    /// A request was about to be signed before the handshake completed.
    #[display(fmt = "signing before authorization completed")]
    NotReady,
}

///Represents a collection of errors returned from a Twitter API call.
///
///This is returned as part of `Error::TwitterError` whenever Twitter has rejected a call.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TwitterErrors {
    ///A collection of errors returned by Twitter.
    pub errors: Vec<TwitterErrorCode>,
}

impl fmt::Display for TwitterErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for e in &self.errors {
            if first {
                first = false;
            } else {
                writeln!(f, ",")?;
            }

            write!(f, "{}", e)?;
        }

        Ok(())
    }
}

///Represents a specific error returned from a Twitter API call.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TwitterErrorCode {
    ///The error message returned by Twitter.
    pub message: String,
    ///The numeric error code returned by Twitter. A list of possible error codes can be found in
    ///the [API documentation][error-codes].
    ///
    ///[error-codes]: https://developer.twitter.com/en/docs/basics/response-codes
    pub code: i32,
}

impl fmt::Display for TwitterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}: {}", self.code, self.message)
    }
}

/// A set of errors that can occur when interacting with Twitter.
#[derive(Debug, Error)]
pub enum Error {
    ///A step of the authorization handshake failed, or a request was signed too early. The
    ///enclosed cause is absent for `AuthPhase::NotReady`.
    #[error("Authorization failed during {phase}")]
    Auth {
        /// The step that failed.
        phase: AuthPhase,
        /// The error that made the step fail.
        #[source]
        cause: Option<Box<Error>>,
    },
    ///A static call or a stream failed after it was signed. The enclosed error is the cause.
    #[error("Request could not be executed: {0}")]
    Request(#[source] Box<Error>),
    ///The response from Twitter was formatted incorrectly or in an unexpected manner. The enclosed
    ///values are an explanatory string and, if applicable, the input that caused the error.
    #[error("Invalid response received: {0} ({1:?})")]
    InvalidResponse(&'static str, Option<String>),
    ///The response from Twitter was missing an expected value, or an entity was missing the id
    ///needed to compare it. The enclosed value was the expected parameter.
    #[error("Value missing from response: {0}")]
    MissingValue(&'static str),
    ///The response from Twitter returned an error structure instead of the expected response. The
    ///enclosed value was the response from Twitter.
    #[error("Errors returned by Twitter: {1}")]
    TwitterError(Headers, TwitterErrors),
    ///The web request experienced a rate limit error (code 88). The enclosed value is the time at
    ///which the rate window resets, as a Unix timestamp.
    #[error("Rate limit reached, hold until {0}")]
    RateLimit(i32),
    ///The response returned from Twitter contained an error indicator. The enclosed value is the
    ///HTTP status code.
    #[error("Error status received: {0}")]
    BadStatus(hyper::StatusCode),
    ///The request could not be assembled, usually because the target URL is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] hyper::http::Error),
    ///The web request experienced an error. The enclosed error was returned from hyper.
    #[error("Network error: {0}")]
    NetError(#[from] hyper::Error),
    ///An error was experienced while processing the response stream, or while reading from the
    ///prompt. The enclosed error was returned from libstd.
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    ///An error occurred while loading a JSON value. The enclosed error was returned from
    ///`serde_json`.
    #[error("JSON deserialize error: {0}")]
    DeserializeError(#[from] serde_json::Error),
    ///The configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    /// Wraps `cause` as the failure of the given handshake step.
    pub(crate) fn auth(phase: AuthPhase, cause: impl Into<Error>) -> Error {
        Error::Auth {
            phase,
            cause: Some(Box::new(cause.into())),
        }
    }

    /// Wraps `cause` as the failure of a call. Authorization errors pass through untouched, since
    /// they already say what went wrong.
    pub(crate) fn request(cause: impl Into<Error>) -> Error {
        match cause.into() {
            err @ Error::Auth { .. } => err,
            err => Error::Request(Box::new(err)),
        }
    }

    /// Returns the handshake step this error belongs to, if it is an authorization error.
    pub fn auth_phase(&self) -> Option<AuthPhase> {
        match self {
            Error::Auth { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn request_keeps_auth_errors() {
        let not_ready = Error::Auth {
            phase: AuthPhase::NotReady,
            cause: None,
        };

        let wrapped = Error::request(not_ready);
        assert_eq!(wrapped.auth_phase(), Some(AuthPhase::NotReady));
    }

    #[test]
    fn causes_are_reachable() {
        let err = Error::auth(AuthPhase::AccessToken, Error::BadStatus(hyper::StatusCode::UNAUTHORIZED));

        assert_eq!(err.auth_phase(), Some(AuthPhase::AccessToken));
        let source = err.source().expect("auth error should carry its cause");
        assert!(source.to_string().contains("401"));
        assert!(err.to_string().contains("access token exchange"));
    }

    #[test]
    fn twitter_errors_display() {
        let errors: TwitterErrors = serde_json::from_str(
            r#"{"errors":[{"message":"Rate limit exceeded","code":88},{"message":"Bad Authentication data.","code":215}]}"#,
        )
        .unwrap();

        assert_eq!(
            errors.to_string(),
            "#88: Rate limit exceeded,\n#215: Bad Authentication data."
        );
    }
}
