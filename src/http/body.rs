//! Fixed-length response body that reports short deliveries.

use bytes::Bytes;
use hyper::body::{Body, Frame, SizeHint};
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::error;

/// A single-frame body whose length is known before the headers go out.
///
/// The host rejects chunked responses, so the body always reports an exact
/// size hint. If it is dropped before every declared byte was handed to
/// hyper, the shortfall is logged since a second response can no longer be
/// sent.
///
/// `written` counts bytes handed to hyper's connection buffer, not bytes
/// that reached the socket. A write that fails after hyper took the frame
/// ends the connection, and that error is logged where the connection task
/// awaits `serve_connection`.
#[derive(Debug)]
pub struct MeteredBody {
    data: Option<Bytes>,
    declared: usize,
    written: usize,
    expect_delivery: bool,
}

impl MeteredBody {
    pub fn new(data: Bytes) -> Self {
        Self {
            declared: data.len(),
            data: Some(data),
            written: 0,
            expect_delivery: true,
        }
    }

    /// Mark the body as never meant to be sent, as for a `HEAD` response.
    /// `Content-Length` still advertises the full length.
    pub fn headers_only(&mut self) {
        self.expect_delivery = false;
    }

    /// Length advertised in `Content-Length`.
    pub fn declared(&self) -> usize {
        self.declared
    }

    /// Bytes handed to the transport so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Whether fewer bytes than declared were handed over for a body that
    /// was meant to be sent.
    pub fn is_short(&self) -> bool {
        self.expect_delivery && self.written < self.declared
    }
}

impl Body for MeteredBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.data.take() {
            Some(chunk) if !chunk.is_empty() => {
                self.written += chunk.len();
                Poll::Ready(Some(Ok(Frame::data(chunk))))
            }
            _ => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.data.as_ref().map_or(true, Bytes::is_empty)
    }

    fn size_hint(&self) -> SizeHint {
        let remaining = self.data.as_ref().map_or(0, Bytes::len);
        SizeHint::with_exact(remaining as u64)
    }
}

impl Drop for MeteredBody {
    fn drop(&mut self) {
        if self.is_short() {
            error!(
                "Only wrote {} of {} bytes to response",
                self.written, self.declared
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_body_delivers_everything_once() {
        let body = MeteredBody::new(Bytes::from_static(b"{\"n\":1}"));
        assert_eq!(body.declared(), 7);
        assert_eq!(body.size_hint().exact(), Some(7));
        assert!(!body.is_end_stream());

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"{\"n\":1}");
    }

    #[tokio::test]
    async fn test_written_tracks_frames() {
        let mut body = MeteredBody::new(Bytes::from_static(b"[]"));
        let frame = body.frame().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"[]"));
        assert_eq!(body.written(), 2);
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
        assert!(body.frame().await.is_none());
    }

    #[test]
    fn test_empty_body_is_finished() {
        let body = MeteredBody::new(Bytes::new());
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
        assert!(!body.is_short());
    }

    #[test]
    fn test_unpolled_body_is_short() {
        let body = MeteredBody::new(Bytes::from_static(b"{\"ok\":true}"));
        assert_eq!(body.written(), 0);
        assert!(body.is_short());
    }

    #[tokio::test]
    async fn test_delivered_body_is_not_short() {
        let mut body = MeteredBody::new(Bytes::from_static(b"\"done\""));
        assert!(body.is_short());
        body.frame().await.unwrap().unwrap();
        assert!(!body.is_short());
    }

    #[test]
    fn test_headers_only_body_is_not_short() {
        let mut body = MeteredBody::new(Bytes::from_static(b"{\"ok\":true}"));
        body.headers_only();
        assert!(!body.is_short());
        assert_eq!(body.declared(), 11);
        assert_eq!(body.written(), 0);
    }
}
