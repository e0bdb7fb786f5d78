// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Access to the Streaming API.
//!
//! A streaming endpoint answers with a response that never really ends: Twitter keeps the
//! connection open and writes one JSON record per line as matching tweets come in, with a blank
//! line every now and then to keep the connection alive. `StreamingCall` reads such a response
//! until one of three things happens:
//!
//! * the time budget (`delay_seconds`) runs out,
//! * the collection reaches `max_records` entries, or
//! * Twitter closes the connection.
//!
//! Collection is best-effort. A line that isn't valid JSON, or a record that fails
//! `Entity::is_valid`, is logged and skipped; a record whose ID was already collected is ignored.
//! Only failing to open the connection, or losing it, fails the call.
//!
//! The time budget starts when the first line arrives and is checked once per line, so a stream
//! that goes quiet can overrun it until the next line (or keep-alive) shows up. The line that
//! arrives after the budget ran out is dropped, and so is a line arriving exactly when it runs
//! out: the deadline itself already counts as expired.
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
//! let statuses = birdcall::stream::filter(auth, &settings)
//!     .with_delay_seconds(60)
//!     .execute()
//!     .await?;
//!
//! for status in statuses.ordered() {
//!     println!("{}", status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Callers who want to handle every line themselves can use `StreamingCall::records` instead.

use std::borrow::Cow;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use std::{io, str};

use futures::{Stream, StreamExt};
use hyper::{Body, Request};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::auth::Authenticator;
use crate::call::{Call, CallBuilder, CallFuture};
use crate::entity::{Collection, Entity};
use crate::error::{Error, Result};
use crate::links;
use crate::settings::Settings;
use crate::transport::Transport;
use crate::tweet::Status;

mod lines;

use self::lines::LineStream;

/// One line of a streaming response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord<T> {
    /// A blank line, sent periodically to keep the connection alive.
    KeepAlive,
    /// A line that parsed as a record.
    Record(T),
}

/// A `Stream` of the lines of a streaming response, each parsed as a `T`.
///
/// A line that isn't UTF-8 or doesn't parse gives an `Error::IOError` or `Error::DeserializeError`
/// item, and the stream goes on with the next line. Losing the connection gives an
/// `Error::Request` item, after which the stream ends.
pub struct RecordStream<T> {
    lines: LineStream,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> RecordStream<T> {
    fn new(body: Body) -> RecordStream<T> {
        RecordStream {
            lines: LineStream::new(body),
            _record: PhantomData,
        }
    }

    fn parse(line: &[u8]) -> Result<StreamRecord<T>> {
        let line = str::from_utf8(line).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8")
        })?;

        if line.trim().is_empty() {
            Ok(StreamRecord::KeepAlive)
        } else {
            Ok(StreamRecord::Record(serde_json::from_str(line)?))
        }
    }
}

impl<T: DeserializeOwned> Stream for RecordStream<T> {
    type Item = Result<StreamRecord<T>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.lines).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(Error::request(err)))),
            Poll::Ready(Some(Ok(line))) => Poll::Ready(Some(Self::parse(&line))),
        }
    }
}

/// A call to a streaming endpoint, collecting valid and distinct records into a `Collection`.
///
/// See the [module documentation](index.html) for how the response is read.
pub struct StreamingCall<T> {
    builder: CallBuilder,
    delay: Duration,
    max_records: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T> StreamingCall<T> {
    /// Creates a call to `url` without parameters, with the time budget and record limit taken
    /// from `default_delay_seconds` and `default_max_records`.
    pub fn new(
        auth: Arc<Authenticator>,
        url: impl Into<String>,
        settings: &Settings,
    ) -> StreamingCall<T> {
        StreamingCall {
            builder: CallBuilder::new(auth, url),
            delay: Duration::from_secs(settings.default_delay_seconds),
            max_records: settings.default_max_records,
            _record: PhantomData,
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

    /// Sets how long the stream is read, counted from its first line.
    pub fn with_delay_seconds(mut self, seconds: u64) -> Self {
        self.set_delay_seconds(seconds);
        self
    }

    /// Sets how long the stream is read, counted from its first line.
    pub fn set_delay_seconds(&mut self, seconds: u64) -> &mut Self {
        self.delay = Duration::from_secs(seconds);
        self
    }

    /// Sets how many records are collected at most.
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.set_max_records(max_records);
        self
    }

    /// Sets how many records are collected at most.
    pub fn set_max_records(&mut self, max_records: usize) -> &mut Self {
        self.max_records = max_records;
        self
    }

    /// How long the stream is read.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// How many records are collected at most.
    pub fn max_records(&self) -> usize {
        self.max_records
    }
}

impl<T> Clone for StreamingCall<T> {
    fn clone(&self) -> Self {
        StreamingCall {
            builder: self.builder.clone(),
            delay: self.delay,
            max_records: self.max_records,
            _record: PhantomData,
        }
    }
}

impl<T> Deref for StreamingCall<T> {
    type Target = CallBuilder;

    fn deref(&self) -> &CallBuilder {
        &self.builder
    }
}

impl<T> DerefMut for StreamingCall<T> {
    fn deref_mut(&mut self) -> &mut CallBuilder {
        &mut self.builder
    }
}

/// Sends the request and hands back the body, still unread, if the status is a success.
async fn open(transport: &dyn Transport, request: Request<Body>) -> Result<Body> {
    let response = transport.send(request).await.map_err(Error::request)?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::request(Error::BadStatus(status)));
    }
    debug!(%status, "stream opened");
    Ok(response.into_body())
}

impl<T> StreamingCall<T>
where
    T: Entity + DeserializeOwned + Send,
{
    /// Opens the stream and returns its lines, parsed but otherwise untouched: no time budget,
    /// record limit, validation, or deduplication is applied.
    pub async fn records(&self) -> Result<RecordStream<T>> {
        let request = self.signed_request()?;
        let body = open(self.auth().transport(), request).await?;
        Ok(RecordStream::new(body))
    }

    fn auth(&self) -> &Arc<Authenticator> {
        self.builder.authenticator()
    }

    async fn collect(&self, mut records: RecordStream<T>) -> Result<Collection<T>> {
        let mut collection = Collection::new();
        let mut deadline = None;

        while let Some(record) = records.next().await {
            let record = match record {
                Err(err @ Error::Request(_)) => return Err(err),
                other => other,
            };

            let now = Instant::now();
            let expires = *deadline.get_or_insert(now + self.delay);
            if now >= expires {
                debug!("time budget spent");
                break;
            }
            if collection.len() >= self.max_records {
                debug!(max_records = self.max_records, "record limit reached");
                break;
            }

            match record {
                Ok(StreamRecord::KeepAlive) => debug!("keep-alive"),
                Ok(StreamRecord::Record(item)) if !item.is_valid() => {
                    debug!(id = ?item.id(), "skipping invalid record");
                }
                Ok(StreamRecord::Record(item)) => {
                    let id = item.id();
                    match collection.add(item) {
                        Ok(true) => debug!(?id, "record added"),
                        Ok(false) => debug!(?id, "skipping repeated record"),
                        Err(err) => warn!(error = %err, "skipping record"),
                    }
                }
                Err(err) => warn!(error = %err, "skipping malformed line"),
            }
        }

        Ok(collection)
    }
}

impl<T> Call for StreamingCall<T>
where
    T: Entity + DeserializeOwned + Send,
{
    type Output = Collection<T>;

    fn execute(&self) -> CallFuture<'_, Collection<T>> {
        Box::pin(async move {
            let records = self.records().await?;
            let collection = self.collect(records).await?;
            info!(url = %self.url(), records = collection.len(), "stream closed");
            Ok(collection)
        })
    }
}

/// Follows the statuses matching `search_text` on the filter stream.
///
/// The time budget and record limit come from `settings`, and can be changed on the returned call.
pub fn filter(auth: Arc<Authenticator>, settings: &Settings) -> StreamingCall<Status> {
    let mut call = StreamingCall::new(auth, links::stream::FILTER, settings);
    if let Some(text) = &settings.search_text {
        call.add_parameter("track", text.clone());
    }
    call
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::{fixed_pin, ready_authenticator};
    use crate::auth::KeyPair;
    use crate::common::tests::load_file;
    use crate::error::AuthPhase;
    use crate::settings::tests::settings_from_toml;
    use crate::transport::mock::MockTransport;
    use futures::stream;
    use hyper::{Method, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings() -> Settings {
        settings_from_toml(
            r#"
            consumer_key = "CK"
            consumer_secret = "CS"
            default_delay_seconds = 30
            default_max_records = 100
            search_text = "hello"
            "#,
        )
        .unwrap()
    }

    fn status_line(id: u64) -> String {
        format!(
            concat!(
                r#"{{"id":{},"created_at":"Wed Oct 10 20:19:24 +0000 2018","text":"status {}","#,
                r#""user":{{"id":6253282,"created_at":"Wed May 23 06:01:13 +0000 2007","#,
                r#""name":"Twitter API","screen_name":"twitterapi"}}}}"#
            ),
            id, id
        )
    }

    fn ids(statuses: &Collection<Status>) -> Vec<u64> {
        statuses.iter().filter_map(|s| s.id).collect()
    }

    async fn stream_call(body: impl Into<Body>) -> (Arc<MockTransport>, StreamingCall<Status>) {
        let transport = Arc::new(MockTransport::new());
        let auth = ready_authenticator(transport.clone()).await;
        transport.push_body(StatusCode::OK, body);
        (transport, filter(auth, &settings()))
    }

    #[test]
    fn defaults_from_settings() {
        let auth = Arc::new(Authenticator::new(
            KeyPair::new("CK", "CS"),
            Arc::new(MockTransport::new()),
            fixed_pin(""),
        ));
        let call = filter(auth, &settings());

        assert_eq!(call.delay(), Duration::from_secs(30));
        assert_eq!(call.max_records(), 100);
        assert_eq!(call.params().get("track").map(|v| v.as_ref()), Some("hello"));

        let call = call.with_delay_seconds(5).with_max_records(7);
        assert_eq!(call.delay(), Duration::from_secs(5));
        assert_eq!(call.max_records(), 7);
    }

    #[tokio::test]
    async fn malformed_line_is_skipped() {
        let body = format!("{}\n{{\"id\": 2, \"text\": \n{}\n", status_line(1), status_line(3));
        let (transport, call) = stream_call(body).await;

        let statuses = call.execute().await.unwrap();
        assert_eq!(ids(&statuses), vec![1, 3]);

        let seen = transport.seen();
        assert_eq!(seen[2].method, Method::GET);
        assert_eq!(seen[2].uri.path(), "/1.1/statuses/filter.json");
        assert_eq!(seen[2].uri.query(), Some("track=hello"));
        assert_eq!(seen[2].oauth_param("oauth_token").as_deref(), Some("ACC456"));
    }

    #[tokio::test]
    async fn sample_stream() {
        let (_, call) = stream_call(load_file("sample_payloads/filter_stream.txt")).await;

        let statuses = call.execute().await.unwrap();
        assert_eq!(ids(&statuses), vec![1050118621198921728, 1049829165036601344]);
    }

    #[tokio::test]
    async fn invalid_and_repeated_records_are_skipped() {
        let no_text = r#"{"id":5,"created_at":"Wed Oct 10 20:19:24 +0000 2018","user":{"id":1,"created_at":"Wed May 23 06:01:13 +0000 2007","name":"a","screen_name":"b"}}"#;
        let no_id = r#"{"created_at":"Wed Oct 10 20:19:24 +0000 2018","text":"hi"}"#;
        let body = [
            status_line(1),
            no_text.to_string(),
            status_line(1),
            no_id.to_string(),
            "\u{0}not json".to_string(),
            status_line(2),
        ]
        .join("\r\n");
        let (_, call) = stream_call(body).await;

        let statuses = call.execute().await.unwrap();
        assert_eq!(ids(&statuses), vec![1, 2]);
    }

    #[tokio::test]
    async fn keep_alives_are_ignored() {
        let body = format!("\r\n{}\r\n\r\n\r\n{}\r\n\r\n", status_line(1), status_line(2));
        let (_, call) = stream_call(body).await;

        let statuses = call.execute().await.unwrap();
        assert_eq!(ids(&statuses), vec![1, 2]);
    }

    #[tokio::test]
    async fn final_line_without_newline() {
        let body = format!("{}\n{}", status_line(1), status_line(2));
        let (_, call) = stream_call(body).await;

        let statuses = call.execute().await.unwrap();
        assert_eq!(ids(&statuses), vec![1, 2]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_skipped() {
        let mut body = status_line(1).into_bytes();
        body.extend_from_slice(b"\n\xff\xfe\n");
        body.extend_from_slice(status_line(2).as_bytes());
        let (_, call) = stream_call(body).await;

        let statuses = call.execute().await.unwrap();
        assert_eq!(ids(&statuses), vec![1, 2]);
    }

    #[tokio::test]
    async fn stops_at_max_records() {
        let transport = Arc::new(MockTransport::new());
        let auth = ready_authenticator(transport.clone()).await;

        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let lines = (1..=10).map(|id| format!("{}\n", status_line(id))).collect::<Vec<_>>();
        let chunks = stream::iter(lines).map(move |line| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, io::Error>(line)
        });
        transport.push(hyper::Response::new(Body::wrap_stream(chunks)));

        let statuses = filter(auth, &settings())
            .with_max_records(3)
            .execute()
            .await
            .unwrap();

        assert_eq!(ids(&statuses), vec![1, 2, 3]);
        // the fourth line is read, found over the limit, and nothing after it
        assert_eq!(pulled.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn zero_delay_collects_nothing() {
        let body = format!("{}\n{}\n", status_line(1), status_line(2));
        let (_, call) = stream_call(body).await;

        let statuses = call.with_delay_seconds(0).execute().await.unwrap();
        assert!(statuses.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn line_after_deadline_is_dropped() {
        let transport = Arc::new(MockTransport::new());
        let auth = ready_authenticator(transport.clone()).await;

        // lines arrive at 0s, 10s, 20s and 30s; the budget is 15s from the first one
        let lines = (1..=4).map(|id| (id, format!("{}\n", status_line(id))));
        let chunks = stream::iter(lines).then(|(id, line)| async move {
            if id > 1 {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok::<_, io::Error>(line)
        });
        transport.push(hyper::Response::new(Body::wrap_stream(chunks)));

        let statuses = filter(auth, &settings())
            .with_delay_seconds(15)
            .execute()
            .await
            .unwrap();

        assert_eq!(ids(&statuses), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn line_at_deadline_is_dropped() {
        let transport = Arc::new(MockTransport::new());
        let auth = ready_authenticator(transport.clone()).await;

        // lines arrive at exactly 0s, 10s and 20s; the budget is 20s
        let lines = (1..=3).map(|id| (id, format!("{}\n", status_line(id))));
        let chunks = stream::iter(lines).then(|(id, line)| async move {
            if id > 1 {
                tokio::time::advance(Duration::from_secs(10)).await;
            }
            Ok::<_, io::Error>(line)
        });
        transport.push(hyper::Response::new(Body::wrap_stream(chunks)));

        let statuses = filter(auth, &settings())
            .with_delay_seconds(20)
            .execute()
            .await
            .unwrap();

        assert_eq!(ids(&statuses), vec![1, 2]);
    }

    #[tokio::test]
    async fn not_ready() {
        let transport = Arc::new(MockTransport::new());
        let auth = Arc::new(Authenticator::new(
            KeyPair::new("CK", "CS"),
            transport.clone(),
            fixed_pin(""),
        ));

        let err = filter(auth, &settings()).execute().await.unwrap_err();
        assert_eq!(err.auth_phase(), Some(AuthPhase::NotReady));
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn failed_open() {
        let transport = Arc::new(MockTransport::new());
        let auth = ready_authenticator(transport.clone()).await;
        transport.push_body(StatusCode::UNAUTHORIZED, "");

        let err = filter(auth, &settings()).execute().await.unwrap_err();
        assert!(matches!(err, Error::Request(ref cause) if matches!(**cause, Error::BadStatus(StatusCode::UNAUTHORIZED))));
    }

    #[tokio::test]
    async fn lost_connection() {
        let transport = Arc::new(MockTransport::new());
        let auth = ready_authenticator(transport.clone()).await;
        let chunks = vec![
            Ok(format!("{}\n", status_line(1))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        transport.push(hyper::Response::new(Body::wrap_stream(stream::iter(chunks))));

        let err = filter(auth, &settings()).execute().await.unwrap_err();
        assert!(matches!(err, Error::Request(ref cause) if matches!(**cause, Error::NetError(_))));
    }

    #[tokio::test]
    async fn raw_records() {
        let body = format!("{}\n\nnope\n{}\n", status_line(1), status_line(1));
        let (_, call) = stream_call(body).await;

        let records = call.records().await.unwrap().collect::<Vec<_>>().await;
        assert_eq!(records.len(), 4);
        assert!(matches!(records[0], Ok(StreamRecord::Record(ref s)) if s.id == Some(1)));
        assert!(matches!(records[1], Ok(StreamRecord::KeepAlive)));
        assert!(matches!(records[2], Err(Error::DeserializeError(_))));
        assert!(matches!(records[3], Ok(StreamRecord::Record(_))));
    }
}
