//! A small client core for accessing JSON APIs over HTTP / HTTPS.
//!
//! Service crates wrap [`ApiClient`] with their own typed operations; tests
//! substitute the transport with [`mock::MockService`].

use std::sync::Arc;
use std::sync::Once;

use http::Method;
use http::Uri;
use hyperdriver::service::SharedService;
use tower::util::BoxCloneService;
use tower::ServiceExt;

pub mod buffer;
mod error;
pub mod request;
pub mod response;
pub mod tls;
pub mod uri;

pub use self::buffer::RecvBuffer;
pub use self::error::{Error, HttpResponseError};
pub use self::request::RequestBuilder;
pub use self::request::RequestExt;
use self::response::Response;
use self::uri::UriExtension as _;

/// Boxed transport service used between a client and the HTTP stack.
pub type ApiService = BoxCloneService<
    http::Request<hyperdriver::Body>,
    http::Response<hyperdriver::Body>,
    hyperdriver::client::Error,
>;

static INIT: Once = Once::new();

/// Initialize process-wide transport state.
///
/// Installs the `ring` crypto provider as the rustls process default.
/// Idempotent; called implicitly by the [`ApiClient`] constructors, and may
/// also be called explicitly from process bootstrap.
pub fn init() {
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// A client for accessing APIs over HTTP / HTTPS
///
/// Useful inner object to wrap for individual API clients.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Arc<Uri>,
    inner: hyperdriver::client::SharedClientService<hyperdriver::Body, hyperdriver::Body>,
}

impl ApiClient {
    /// Create a new API Client from a base URL, trusting the platform TLS
    /// roots.
    pub fn new(base: Uri) -> Self {
        init();
        let inner = hyperdriver::Client::build_tcp_http()
            .with_default_tls()
            .build_service();

        ApiClient {
            base: Arc::new(base),
            inner,
        }
    }

    /// Create a new API Client with a specific TLS client configuration
    /// (e.g. one built from a custom CA bundle via
    /// [`tls::client_config_with_ca_bundle`]).
    pub fn new_with_tls(base: Uri, config: rustls::ClientConfig) -> Self {
        init();
        let inner = hyperdriver::Client::build_tcp_http()
            .with_tls(config)
            .build_service();

        ApiClient {
            base: Arc::new(base),
            inner,
        }
    }

    /// Create a new API Client over a caller-supplied transport service.
    pub fn new_with_inner_service<S>(base: Uri, inner: S) -> Self
    where
        S: tower::Service<
                http::Request<hyperdriver::Body>,
                Response = http::Response<hyperdriver::Body>,
                Error = hyperdriver::client::Error,
            > + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        let service = tower::ServiceBuilder::new()
            .layer(SharedService::layer())
            .service(inner);

        ApiClient {
            base: Arc::new(base),
            inner: service,
        }
    }

    /// The base URL requests are issued against.
    pub fn base(&self) -> &Uri {
        &self.base
    }

    /// Access the underlying transport service.
    pub fn inner(&self) -> &hyperdriver::client::SharedClientService<hyperdriver::Body, hyperdriver::Body> {
        &self.inner
    }
}

impl ApiClient {
    /// Start a GET request to `endpoint`, resolved against the base URL.
    pub fn get(&self, endpoint: &str) -> RequestBuilder {
        let url = (*self.base).clone().join(endpoint);
        RequestBuilder::new(self.clone(), url, Method::GET)
    }

    /// Start a POST request to `endpoint`, resolved against the base URL.
    pub fn post(&self, endpoint: &str) -> RequestBuilder {
        let url = (*self.base).clone().join(endpoint);
        RequestBuilder::new(self.clone(), url, Method::POST)
    }

    /// Start a DELETE request to `endpoint`, resolved against the base URL.
    pub fn delete(&self, endpoint: &str) -> RequestBuilder {
        let url = (*self.base).clone().join(endpoint);
        RequestBuilder::new(self.clone(), url, Method::DELETE)
    }

    /// Send a fully-formed request over the transport.
    pub async fn execute(
        &self,
        req: http::Request<hyperdriver::Body>,
    ) -> Result<Response, hyperdriver::client::Error> {
        let parts = req.parts();

        let response = self.inner.clone().oneshot(req).await?;
        Ok(Response::new(parts, response))
    }
}

pub mod mock {
    //! A scripted transport for tests.

    use bytes::Bytes;
    use http::response;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    pub struct MockResponse {
        status: http::StatusCode,
        headers: http::HeaderMap,
        body: Vec<u8>,
    }

    impl MockResponse {
        pub fn new(status: http::StatusCode, headers: http::HeaderMap, body: Vec<u8>) -> Self {
            Self {
                status,
                headers,
                body,
            }
        }
    }

    /// A transport that answers requests from queued responses, keyed by
    /// request path. Multiple responses for one path are served in the order
    /// they were added; the last response for a path is retained and replayed
    /// if the queue runs dry.
    #[derive(Debug, Default, Clone)]
    pub struct MockService {
        responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    }

    impl MockService {
        pub fn new() -> Self {
            Self {
                responses: Default::default(),
            }
        }

        pub fn add(
            &self,
            path: &str,
            status: http::StatusCode,
            headers: http::HeaderMap,
            body: Vec<u8>,
        ) {
            let response = MockResponse::new(status, headers, body);
            self.responses
                .lock()
                .expect("mock responses lock")
                .entry(path.to_owned())
                .or_default()
                .push_back(response);
        }

        /// Queue a JSON body with a 200 status.
        pub fn add_json(&self, path: &str, body: &str) {
            let mut headers = http::HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static("application/json"),
            );
            self.add(path, http::StatusCode::OK, headers, body.as_bytes().to_vec());
        }

        fn next(&self, path: &str) -> Option<MockResponse> {
            let mut responses = self.responses.lock().expect("mock responses lock");
            let queue = responses.get_mut(path)?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        }
    }

    impl tower::Service<http::Request<hyperdriver::Body>> for MockService {
        type Response = http::Response<hyperdriver::Body>;
        type Error = hyperdriver::client::Error;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(
            &mut self,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), Self::Error>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<hyperdriver::Body>) -> Self::Future {
            let path = req.uri().path().to_owned();
            let response = self.next(&path).unwrap_or_else(|| {
                panic!(
                    "No response configured for path: {path}",
                    path = req.uri().path()
                )
            });

            let mut builder = response::Builder::new()
                .status(response.status)
                .version(http::Version::HTTP_11);

            for (key, value) in response.headers.iter() {
                builder = builder.header(key, value);
            }

            let response = builder
                .body(hyperdriver::Body::from(Bytes::from(response.body.clone())))
                .unwrap();

            std::future::ready(Ok(response))
        }
    }
}
