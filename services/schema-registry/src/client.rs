//! The registry client and its resource protocol.
//!
//! Resources are addressed as `POST /` (add), `/schemas/ids/{id}` (get,
//! delete), `/names` and `/names/{name}/versions`, and `/digests` and
//! `/digests/{digest}/versions`. All bodies are UTF-8 JSON.

use std::sync::atomic::{AtomicUsize, Ordering};

use api_client::response::{Response, ResponseBodyExt as _};
use api_client::uri::IntoUri;
use api_client::ApiClient;
use camino::{Utf8Path, Utf8PathBuf};
use http::Uri;
use serde_json::Value;

use crate::codec;
use crate::digest::Digest;
use crate::error::RegistryError;
use crate::schema::Schema;

/// A client for a remote metric schema registry.
///
/// Holds an immutable list of registry base URLs and an optional CA
/// certificate path. Every operation performs exactly one blocking HTTP
/// round-trip against the currently selected URL; a transport failure
/// advances the selection so the next operation tries the next URL in
/// rotation. The client is cheap to clone and safe to share across tasks.
#[derive(Debug)]
pub struct RegistryClient {
    endpoints: Vec<ApiClient>,
    ca_cert: Option<Utf8PathBuf>,
    cursor: AtomicUsize,
}

impl RegistryClient {
    /// Create a client for the given registry base URLs.
    ///
    /// When `ca_cert` is given, servers are verified against that PEM bundle
    /// instead of the platform trust roots. Fails with `InvalidArgument` if
    /// no URL is supplied or a URL is not a valid base URL.
    pub fn new<I, U>(urls: I, ca_cert: Option<&Utf8Path>) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = U>,
        U: IntoUri,
    {
        let bases = Self::parse_bases(urls)?;
        let tls = match ca_cert {
            Some(path) => Some(
                api_client::tls::client_config_with_ca_bundle(path)
                    .map_err(RegistryError::CaCertificate)?,
            ),
            None => None,
        };

        let endpoints = bases
            .into_iter()
            .map(|base| match &tls {
                Some(config) => ApiClient::new_with_tls(base, config.clone()),
                None => ApiClient::new(base),
            })
            .collect();

        Ok(Self {
            endpoints,
            ca_cert: ca_cert.map(Utf8Path::to_path_buf),
            cursor: AtomicUsize::new(0),
        })
    }

    /// Create a client over a caller-supplied transport service.
    ///
    /// Used by tests to script responses; the service is cloned per
    /// endpoint.
    pub fn with_service<I, U, S>(urls: I, service: S) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = U>,
        U: IntoUri,
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
        let bases = Self::parse_bases(urls)?;
        let endpoints = bases
            .into_iter()
            .map(|base| ApiClient::new_with_inner_service(base, service.clone()))
            .collect();

        Ok(Self {
            endpoints,
            ca_cert: None,
            cursor: AtomicUsize::new(0),
        })
    }

    fn parse_bases<I, U>(urls: I) -> Result<Vec<Uri>, RegistryError>
    where
        I: IntoIterator<Item = U>,
        U: IntoUri,
    {
        let mut bases = Vec::new();
        for url in urls {
            let base = url
                .into_uri()
                .map_err(|_| RegistryError::InvalidArgument("registry URL is not a valid base URL"))?;
            bases.push(base);
        }
        if bases.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "at least one registry URL is required",
            ));
        }
        Ok(bases)
    }

    /// The registry base URLs, in rotation order.
    pub fn urls(&self) -> impl Iterator<Item = &Uri> + '_ {
        self.endpoints.iter().map(|e| e.base())
    }

    /// The CA certificate path, if one was configured.
    pub fn ca_cert(&self) -> Option<&Utf8Path> {
        self.ca_cert.as_deref()
    }

    fn endpoint(&self) -> &ApiClient {
        let idx = self.cursor.load(Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[idx]
    }

    /// Rotate to the next URL after a transport failure. The failed call is
    /// not retried.
    fn transport_failure(&self, err: api_client::Error) -> RegistryError {
        if matches!(err, api_client::Error::Request(_)) {
            self.cursor.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(error = %err, "transport failure, rotating registry URL");
        }
        RegistryError::from(err)
    }

    async fn read_json(&self, response: Response) -> Result<Value, RegistryError> {
        let response = response
            .error_for_status()
            .await
            .map_err(RegistryError::from)?;
        let buf = response.buffered().await.map_err(RegistryError::from)?;
        serde_json::from_slice(buf.as_bytes()).map_err(|err| {
            RegistryError::invalid_format(format!("response is not valid JSON: {err}"))
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, RegistryError> {
        let response = self
            .endpoint()
            .get(path)
            .send()
            .await
            .map_err(|err| self.transport_failure(err))?;
        self.read_json(response).await
    }

    async fn delete_json(&self, path: &str) -> Result<Value, RegistryError> {
        let response = self
            .endpoint()
            .delete(path)
            .send()
            .await
            .map_err(|err| self.transport_failure(err))?;
        self.read_json(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, RegistryError> {
        let payload = serde_json::to_vec(body)
            .map_err(|err| RegistryError::invalid_format(format!("request body: {err}")))?;
        let response = self
            .endpoint()
            .post(path)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(bytes::Bytes::from(payload))
            .send()
            .await
            .map_err(|err| self.transport_failure(err))?;
        self.read_json(response).await
    }

    /// Register a schema. Returns the registry-assigned id.
    #[tracing::instrument(skip(self, schema), fields(schema = schema.name()))]
    pub async fn add(&self, schema: &Schema) -> Result<String, RegistryError> {
        let obj = codec::schema_to_json(schema)?;
        let value = self.post_json("", &obj).await?;
        let id = extract_id(&value)?;
        tracing::debug!(%id, "schema registered");
        Ok(id)
    }

    /// Register a schema as a new version under `name`. Returns the
    /// registry-assigned id.
    #[tracing::instrument(skip(self, schema))]
    pub async fn add_version(&self, name: &str, schema: &Schema) -> Result<String, RegistryError> {
        let obj = codec::schema_to_json(schema)?;
        let value = self.post_json(&format!("names/{name}/versions"), &obj).await?;
        extract_id(&value)
    }

    /// Fetch the schema stored under `id`.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Schema, RegistryError> {
        let value = self.get_json(&format!("schemas/ids/{id}")).await?;
        codec::schema_from_json(&value)
    }

    /// Delete the schema stored under `id`.
    ///
    /// The server acknowledges with an array whose first element is the
    /// deleted id; any other shape or id fails with `InvalidResponse`.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        let value = self.delete_json(&format!("schemas/ids/{id}")).await?;
        let acked = value
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RegistryError::invalid_response("expected an array acknowledging the deleted id")
            })?;
        if acked != id {
            return Err(RegistryError::invalid_response(format!(
                "server acknowledged `{acked}`, requested `{id}`"
            )));
        }
        Ok(())
    }

    /// Delete every schema version stored under `name`. Returns the deleted
    /// ids.
    #[tracing::instrument(skip(self))]
    pub async fn delete_by_name(&self, name: &str) -> Result<Vec<String>, RegistryError> {
        let value = self.delete_json(&format!("names/{name}")).await?;
        string_list(&value)
    }

    /// List the schema names known to the registry.
    #[tracing::instrument(skip(self))]
    pub async fn list_names(&self) -> Result<Vec<String>, RegistryError> {
        let value = self.get_json("names").await?;
        string_list(&value)
    }

    /// List the schema content digests known to the registry.
    #[tracing::instrument(skip(self))]
    pub async fn list_digests(&self) -> Result<Vec<Digest>, RegistryError> {
        let value = self.get_json("digests").await?;
        let arr = value
            .as_array()
            .ok_or_else(|| RegistryError::invalid_format("expected an array of digest strings"))?;
        let mut digests = Vec::new();
        digests.try_reserve_exact(arr.len())?;
        for item in arr {
            let s = item
                .as_str()
                .ok_or_else(|| RegistryError::invalid_format("digest entries must be strings"))?;
            let digest = s
                .parse::<Digest>()
                .map_err(|err| RegistryError::invalid_format(format!("digest `{s}`: {err}")))?;
            digests.push(digest);
        }
        Ok(digests)
    }

    /// List schema ids by name or by content digest.
    ///
    /// Exactly one selector must be supplied; anything else fails with
    /// `InvalidArgument`. A JSON `null` response means the selector is
    /// unknown to the registry and fails with `NotFound`.
    pub async fn list_ids(
        &self,
        name: Option<&str>,
        digest: Option<&Digest>,
    ) -> Result<Vec<String>, RegistryError> {
        let path = match (name, digest) {
            (Some(name), None) => format!("names/{name}/versions"),
            (None, Some(digest)) => format!("digests/{digest}/versions"),
            (Some(_), Some(_)) => {
                return Err(RegistryError::InvalidArgument(
                    "list_ids takes a name or a digest, not both",
                ))
            }
            (None, None) => {
                return Err(RegistryError::InvalidArgument(
                    "list_ids requires a name or a digest",
                ))
            }
        };
        let value = self.get_json(&path).await?;
        if value.is_null() {
            return Err(RegistryError::NotFound);
        }
        string_list(&value)
    }

    /// List the ids of all versions stored under `name`.
    #[tracing::instrument(skip(self))]
    pub async fn list_ids_by_name(&self, name: &str) -> Result<Vec<String>, RegistryError> {
        self.list_ids(Some(name), None).await
    }

    /// List the ids of all versions whose content hashes to `digest`.
    #[tracing::instrument(skip(self))]
    pub async fn list_ids_by_digest(&self, digest: &Digest) -> Result<Vec<String>, RegistryError> {
        self.list_ids(None, Some(digest)).await
    }
}

fn extract_id(value: &Value) -> Result<String, RegistryError> {
    value
        .as_object()
        .and_then(|obj| obj.get("id"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RegistryError::invalid_response("expected an object with a string `id`"))
}

fn string_list(value: &Value) -> Result<Vec<String>, RegistryError> {
    let arr = value
        .as_array()
        .ok_or_else(|| RegistryError::invalid_format("expected an array of strings"))?;
    let mut out = Vec::new();
    out.try_reserve_exact(arr.len())?;
    for item in arr {
        let s = item
            .as_str()
            .ok_or_else(|| RegistryError::invalid_format("array entries must be strings"))?;
        out.push(s.to_owned());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_id_requires_string_id() {
        assert_eq!(extract_id(&json!({"id": "abc123"})).unwrap(), "abc123");
        assert!(matches!(
            extract_id(&json!({"id": 7})),
            Err(RegistryError::InvalidResponse(_))
        ));
        assert!(matches!(
            extract_id(&json!(["abc123"])),
            Err(RegistryError::InvalidResponse(_))
        ));
    }

    #[test]
    fn string_list_rejects_non_strings() {
        assert_eq!(
            string_list(&json!(["a", "b"])).unwrap(),
            vec!["a".to_owned(), "b".to_owned()]
        );
        assert!(matches!(
            string_list(&json!(["a", 1])),
            Err(RegistryError::InvalidFormat(_))
        ));
        assert!(matches!(
            string_list(&json!({"a": 1})),
            Err(RegistryError::InvalidFormat(_))
        ));
    }

    #[test]
    fn empty_url_list_is_rejected() {
        let err = RegistryClient::new(Vec::<&str>::new(), None).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
    }
}
