//! Response types and traits for working with HTTP responses.
//!
//! Bodies are collected frame-by-frame into a [`RecvBuffer`](crate::RecvBuffer)
//! rather than into an unbounded `Vec`, so buffer growth follows the chunked
//! receive-buffer contract and allocation failure is reported as an error.

use crate::error::HttpResponseError;
use crate::Error;
use hyperdriver::Body;

mod futures {
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{ready, Context, Poll};

    use bytes::Buf;
    use pin_project::pin_project;

    use crate::buffer::RecvBuffer;
    use crate::Error;

    /// Future which accumulates a response body into a [`RecvBuffer`].
    #[pin_project]
    pub struct Buffered<Body = hyperdriver::Body>
    where
        Body: http_body::Body,
    {
        #[pin]
        body: Body,
        buf: Option<RecvBuffer>,
    }

    impl<Body> fmt::Debug for Buffered<Body>
    where
        Body: http_body::Body,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Buffered").finish()
        }
    }

    impl<Body> Future for Buffered<Body>
    where
        Body: http_body::Body,
        Body::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        type Output = Result<RecvBuffer, Error>;

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            let mut this = self.project();
            loop {
                match ready!(this.body.as_mut().poll_frame(cx)) {
                    Some(Ok(frame)) => {
                        if let Ok(mut data) = frame.into_data() {
                            let buf = this.buf.as_mut().expect("polled after completion");
                            while data.has_remaining() {
                                let chunk = data.chunk();
                                buf.append(chunk)?;
                                let n = chunk.len();
                                data.advance(n);
                            }
                        }
                    }
                    Some(Err(err)) => {
                        return Poll::Ready(Err(Error::ResponseBody(err.into())));
                    }
                    None => {
                        let buf = this.buf.take().expect("polled after completion");
                        return Poll::Ready(Ok(buf));
                    }
                }
            }
        }
    }

    impl<Body> From<Body> for Buffered<Body>
    where
        Body: http_body::Body,
    {
        fn from(body: Body) -> Self {
            Self {
                body,
                buf: Some(RecvBuffer::new()),
            }
        }
    }

    #[pin_project]
    pub struct Text<Body = hyperdriver::Body>(#[pin] Buffered<Body>)
    where
        Body: http_body::Body;

    impl<Body> fmt::Debug for Text<Body>
    where
        Body: http_body::Body,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Text").finish()
        }
    }

    impl<Body> Future for Text<Body>
    where
        Body: http_body::Body,
        Body::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        type Output = Result<String, Error>;

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            let collected = ready!(self.project().0.poll(cx))?;
            Poll::Ready(
                String::from_utf8(collected.as_bytes().to_vec())
                    .map_err(|err| Error::ResponseBody(err.into())),
            )
        }
    }

    impl<Body> From<Buffered<Body>> for Text<Body>
    where
        Body: http_body::Body,
    {
        fn from(buffered: Buffered<Body>) -> Self {
            Self(buffered)
        }
    }

    impl<Body> From<Body> for Text<Body>
    where
        Body: http_body::Body,
    {
        fn from(body: Body) -> Self {
            Self(Buffered::from(body))
        }
    }

    #[pin_project]
    pub struct Json<T, Body = hyperdriver::Body>
    where
        Body: http_body::Body,
    {
        #[pin]
        inner: Buffered<Body>,
        _phantom: std::marker::PhantomData<T>,
    }

    impl<T, B> fmt::Debug for Json<T, B>
    where
        B: http_body::Body,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Json").finish()
        }
    }

    impl<T, B> Future for Json<T, B>
    where
        T: serde::de::DeserializeOwned,
        B: http_body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        type Output = Result<T, Error>;

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            let buf = ready!(self.project().inner.poll(cx))?;
            Poll::Ready(
                serde_json::from_slice(buf.as_bytes())
                    .map_err(|err| Error::ResponseBody(err.into())),
            )
        }
    }

    impl<T, Body> From<Body> for Json<T, Body>
    where
        Body: http_body::Body,
    {
        fn from(body: Body) -> Self {
            Self {
                inner: Buffered::from(body),
                _phantom: std::marker::PhantomData,
            }
        }
    }

    impl<T, Body> From<Buffered<Body>> for Json<T, Body>
    where
        Body: http_body::Body,
    {
        fn from(buffered: Buffered<Body>) -> Self {
            Self {
                inner: buffered,
                _phantom: std::marker::PhantomData,
            }
        }
    }
}

/// Extension trait for working with HTTP response bodies.
pub trait ResponseBodyExt<Body>
where
    Body: http_body::Body,
{
    /// Get a reference to the response body.
    fn body(&self) -> &Body;

    /// Accumulate the response body into a [`RecvBuffer`](crate::RecvBuffer).
    fn buffered(self) -> self::futures::Buffered<Body>;

    /// Collect the response body into a `String` instance.
    fn text(self) -> self::futures::Text<Body>
    where
        Self: Sized,
    {
        self.buffered().into()
    }

    /// Collect the body and deserialize it as JSON.
    fn json<T>(self) -> self::futures::Json<T, Body>
    where
        T: serde::de::DeserializeOwned,
        Self: Sized,
    {
        self.buffered().into()
    }
}

/// Extension trait for working with HTTP response types.
pub trait ResponseExt<Body>: ResponseBodyExt<Body>
where
    Body: http_body::Body,
{
    /// Get the status code of the response.
    fn status(&self) -> http::StatusCode;

    /// Get the headers of the response.
    fn headers(&self) -> &http::HeaderMap;

    /// Get the URI of the request that generated the response.
    fn uri(&self) -> &http::Uri;

    /// Get the parts of the request that generated the response.
    fn request(&self) -> &http::request::Parts;

    /// Get the parts of the response.
    fn response(&self) -> &http::response::Parts;
}

impl<Body> ResponseBodyExt<Body> for http::Response<Body>
where
    Body: http_body::Body,
{
    fn body(&self) -> &Body {
        self.body()
    }

    fn buffered(self) -> self::futures::Buffered<Body> {
        self.into_body().into()
    }
}

/// Wrapper around an HTTP response that provides additional methods for working with the response,
/// and allows for easy access to the response and request parts.
#[derive(Debug)]
pub struct Response {
    request: http::request::Parts,
    response: http::response::Parts,
    body: Body,
}

impl Response {
    /// Create a new `Response` instance.
    pub fn new(request: http::request::Parts, response: http::response::Response<Body>) -> Self {
        let (response, body) = response.into_parts();

        Self {
            request,
            response,
            body,
        }
    }

    /// Get the parts of the request that generated the response.
    pub fn into_parts(self) -> (http::request::Parts, http::response::Parts, Body) {
        (self.request, self.response, self.body)
    }

    /// Convert the `Response` into an `http::Response` instance.
    pub fn into_response(self) -> http::Response<Body> {
        http::Response::from_parts(self.response, self.body)
    }

    /// Convert the `Response` into an `HttpResponseError` instance.
    pub async fn into_error(self) -> HttpResponseError {
        HttpResponseError::from_response(self).await
    }

    /// Convert the `Response` into an `HttpResponseError` instance if the response status is not a success status.
    pub async fn error_for_status(self) -> Result<Self, Error> {
        if self.status().is_success() {
            Ok(self)
        } else {
            Err(Error::Response(self.into_error().await))
        }
    }
}

impl ResponseBodyExt<hyperdriver::Body> for Response {
    fn body(&self) -> &Body {
        &self.body
    }

    fn buffered(self) -> self::futures::Buffered {
        self.body.into()
    }
}

impl ResponseExt<hyperdriver::Body> for Response {
    fn status(&self) -> http::StatusCode {
        self.response.status
    }

    fn headers(&self) -> &http::HeaderMap {
        &self.response.headers
    }

    fn uri(&self) -> &http::Uri {
        &self.request.uri
    }

    fn request(&self) -> &http::request::Parts {
        &self.request
    }

    fn response(&self) -> &http::response::Parts {
        &self.response
    }
}
