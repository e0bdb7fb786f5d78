// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Splitting a response body into lines.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use hyper::body::HttpBody;
use hyper::Body;

use crate::error;

/// A `Stream` of the lines in a response body, without their `\n` or `\r\n` terminators.
///
/// The body is read one chunk at a time, and only when no complete line is buffered. Whatever
/// follows the last terminator is yielded as a final line when the body ends. After a read error
/// the body is dropped and the stream ends.
pub(crate) struct LineStream {
    body: Option<Body>,
    buf: Vec<u8>,
}

impl LineStream {
    pub(crate) fn new(body: Body) -> LineStream {
        LineStream {
            body: Some(body),
            buf: vec![],
        }
    }
}

fn strip_cr(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}

impl Stream for LineStream {
    type Item = error::Result<Vec<u8>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(pos) = this.buf.iter().position(|&b| b == b'\n') {
                let mut line = this.buf.drain(..=pos).collect::<Vec<u8>>();
                line.pop();
                return Poll::Ready(Some(Ok(strip_cr(line))));
            }

            let body = match this.body.as_mut() {
                Some(body) => body,
                None if this.buf.is_empty() => return Poll::Ready(None),
                None => {
                    let rest = std::mem::take(&mut this.buf);
                    return Poll::Ready(Some(Ok(strip_cr(rest))));
                }
            };

            match Pin::new(body).poll_data(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => this.buf.extend_from_slice(&chunk),
                Poll::Ready(Some(Err(err))) => {
                    this.body = None;
                    this.buf.clear();
                    return Poll::Ready(Some(Err(err.into())));
                }
                Poll::Ready(None) => this.body = None,
            }
        }
    }
}
