// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Infrastructure types related to packaging rate-limit information alongside responses from
//! Twitter.

use std::ops::{Deref, DerefMut};

use hyper::{Body, Request};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use super::Headers;
use crate::error::{self, Error, TwitterErrors};
use crate::transport::Transport;

const X_RATE_LIMIT_LIMIT: &str = "X-Rate-Limit-Limit";
const X_RATE_LIMIT_REMAINING: &str = "X-Rate-Limit-Remaining";
const X_RATE_LIMIT_RESET: &str = "X-Rate-Limit-Reset";

fn rate_limit(headers: &Headers, header: &'static str) -> error::Result<Option<i32>> {
    let val = headers.get(header);

    if let Some(val) = val {
        let val = val
            .to_str()
            .map_err(|_| Error::InvalidResponse("rate-limit header is not ASCII", None))?
            .parse::<i32>()
            .map_err(|_| {
                Error::InvalidResponse("rate-limit header is not a number", Some(format!("{:?}", val)))
            })?;
        Ok(Some(val))
    } else {
        Ok(None)
    }
}

fn rate_limit_limit(headers: &Headers) -> error::Result<Option<i32>> {
    rate_limit(headers, X_RATE_LIMIT_LIMIT)
}

fn rate_limit_remaining(headers: &Headers) -> error::Result<Option<i32>> {
    rate_limit(headers, X_RATE_LIMIT_REMAINING)
}

fn rate_limit_reset(headers: &Headers) -> error::Result<Option<i32>> {
    rate_limit(headers, X_RATE_LIMIT_RESET)
}

/// Rate-limit information returned with a call.
///
/// A value of `-1` means Twitter didn't send the corresponding header.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq)]
pub struct RateLimit {
    ///The rate limit ceiling for the given request.
    pub limit: i32,
    ///The number of requests left for the 15-minute window.
    pub remaining: i32,
    ///The UTC Unix timestamp at which the rate window resets.
    pub reset: i32,
}

impl RateLimit {
    fn from_headers(headers: &Headers) -> error::Result<Self> {
        Ok(RateLimit {
            limit: rate_limit_limit(headers)?.unwrap_or(-1),
            remaining: rate_limit_remaining(headers)?.unwrap_or(-1),
            reset: rate_limit_reset(headers)?.unwrap_or(-1),
        })
    }
}

///A helper struct to wrap response data with accompanying rate limit information.
///
///It dereferences to the wrapped value, so a `Response<StatusCollection>` can be used wherever a
///`StatusCollection` is expected.
#[derive(Debug)]
pub struct Response<T> {
    /// Rate limit information returned with the call.
    pub rate_limit_status: RateLimit,
    ///The decoded response from the request.
    pub response: T,
}

impl<T> Response<T> {
    /// Discards the rate-limit information and returns the wrapped value.
    pub fn into_inner(self) -> T {
        self.response
    }
}

impl<T> Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.response
    }
}

impl<T> DerefMut for Response<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.response
    }
}

/// Sends the request through the given transport and loads the whole response body.
///
/// Besides transport errors, this fails when the body is a Twitter error payload (reported as
/// `RateLimit` for error code 88 when the reset header is present) or when the status code isn't
/// a success.
pub async fn raw_request(
    transport: &dyn Transport,
    request: Request<Body>,
) -> error::Result<(Headers, Vec<u8>)> {
    let resp = transport.send(request).await?;
    let (parts, body) = resp.into_parts();
    let body = hyper::body::to_bytes(body).await?.to_vec();

    if let Ok(errors) = serde_json::from_slice::<TwitterErrors>(&body) {
        if errors.errors.iter().any(|e| e.code == 88) {
            if let Some(reset) = rate_limit_reset(&parts.headers)? {
                return Err(Error::RateLimit(reset));
            }
        }
        return Err(Error::TwitterError(parts.headers, errors));
    }

    if !parts.status.is_success() {
        return Err(Error::BadStatus(parts.status));
    }

    debug!(status = %parts.status, bytes = body.len(), "response loaded");

    Ok((parts.headers, body))
}

/// Sends the request, then deserializes the whole body as a single JSON document.
pub async fn request_with_json_response<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: Request<Body>,
) -> error::Result<Response<T>> {
    let (headers, body) = raw_request(transport, request).await?;
    let response = serde_json::from_slice(&body)?;
    let rate_limit_status = RateLimit::from_headers(&headers)?;
    Ok(Response {
        rate_limit_status,
        response,
    })
}
