// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The seam between birdcall and the network.
//!
//! Every request birdcall makes, from the handshake to a long-lived stream, goes through a
//! `Transport`. The library only ever hands it a fully signed `hyper::Request`, and gets back the
//! unread `hyper::Response`, so a transport never needs to know anything about OAuth or Twitter.
//!
//! `HttpsTransport` is the one you want in a real program. It wraps a `hyper::Client` with the TLS
//! connector selected by the crate features (`native_tls` by default, or `rustls` /
//! `rustls_webpki`).

use std::future::Future;
use std::pin::Pin;

use hyper::client::HttpConnector;
use hyper::{Body, Request, Response};

#[cfg(all(feature = "hyper-rustls", not(feature = "native_tls")))]
use hyper_rustls::HttpsConnector;
#[cfg(feature = "native_tls")]
use hyper_tls::HttpsConnector;

use crate::error;

/// Convenient type alias for futures that resolve to a response from the transport.
pub type FutureResponse = Pin<Box<dyn Future<Output = error::Result<Response<Body>>> + Send>>;

/// Something that can send a signed request and hand back the response.
pub trait Transport: Send + Sync {
    /// Sends the request. The returned future resolves once the response headers arrived; the
    /// body is left unread.
    fn send(&self, request: Request<Body>) -> FutureResponse;
}

#[cfg(feature = "native_tls")]
fn new_https_connector() -> HttpsConnector<HttpConnector> {
    HttpsConnector::new()
}

#[cfg(all(feature = "rustls", not(feature = "native_tls")))]
fn new_https_connector() -> HttpsConnector<HttpConnector> {
    HttpsConnector::with_native_roots()
}

#[cfg(all(feature = "rustls_webpki", not(feature = "rustls"), not(feature = "native_tls")))]
fn new_https_connector() -> HttpsConnector<HttpConnector> {
    HttpsConnector::with_webpki_roots()
}

/// A `Transport` backed by a `hyper::Client` speaking HTTPS.
///
/// The client keeps a connection pool, so share one instance (it's cheap to clone) rather than
/// creating one per request.
#[derive(Clone)]
pub struct HttpsTransport {
    client: hyper::Client<HttpsConnector<HttpConnector>, Body>,
}

impl HttpsTransport {
    /// Creates a new transport with its own connection pool.
    pub fn new() -> HttpsTransport {
        let client = hyper::Client::builder().build(new_https_connector());
        HttpsTransport { client }
    }
}

impl Default for HttpsTransport {
    fn default() -> Self {
        HttpsTransport::new()
    }
}

impl Transport for HttpsTransport {
    fn send(&self, request: Request<Body>) -> FutureResponse {
        let response = self.client.request(request);
        Box::pin(async move { Ok(response.await?) })
    }
}
