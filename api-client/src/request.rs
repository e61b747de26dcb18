use http::{header::HeaderValue, HeaderName, Uri};

use crate::{response::Response, ApiClient, Error};

pub trait RequestExt {
    fn parts(&self) -> http::request::Parts;
}

impl<B> RequestExt for http::Request<B> {
    fn parts(&self) -> http::request::Parts {
        let mut builder = http::request::Request::builder()
            .uri(self.uri().clone())
            .method(self.method().clone());

        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers().clone();
        }

        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }
}

#[derive(Debug)]
pub struct RequestBuilder {
    req: http::request::Builder,
    client: ApiClient,
    body: Option<hyperdriver::Body>,
}

impl RequestBuilder {
    pub fn new(client: ApiClient, uri: Uri, method: http::Method) -> Self {
        Self {
            req: http::Request::builder().method(method).uri(uri),
            client,
            body: None,
        }
    }

    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.req = self.req.header(key, value);
        self
    }

    pub fn headers_mut(&mut self) -> Option<&mut http::header::HeaderMap> {
        self.req.headers_mut()
    }

    pub fn body<B: Into<hyperdriver::Body>>(self, body: B) -> Self {
        Self {
            body: Some(body.into()),
            ..self
        }
    }

    pub async fn send(self) -> Result<Response, Error> {
        let req = self
            .req
            .body(self.body.unwrap_or_else(hyperdriver::Body::empty))?;

        self.client.execute(req).await.map_err(Error::Request)
    }
}
