//! End-to-end registry scenarios against a scripted transport.

use api_client::mock::MockService;
use schema_registry::{Digest, Record, RegistryClient, RegistryError, Schema, ValueType};

const BASE: &str = "http://registry.example.com";

fn client_with(mock: MockService) -> RegistryClient {
    RegistryClient::with_service([BASE], mock).unwrap()
}

fn test_schema() -> Schema {
    let mut schema = Schema::new("test");
    schema.add_metric("one", None, ValueType::S64).unwrap();
    schema
}

#[tokio::test]
async fn add_returns_assigned_id() {
    let mock = MockService::new();
    mock.add_json("/", r#"{"id": "abc123"}"#);

    let client = client_with(mock);
    let id = client.add(&test_schema()).await.unwrap();
    assert_eq!(id, "abc123");
}

#[tokio::test]
async fn add_rejects_response_without_id() {
    let mock = MockService::new();
    mock.add_json("/", r#"["abc123"]"#);

    let client = client_with(mock);
    let err = client.add(&test_schema()).await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidResponse(_)));
}

#[tokio::test]
async fn get_round_trips_a_rich_schema() {
    let mut rec = Record::new("rec");
    rec.add_member("uno", Some("u_uno"), ValueType::S64, 1).unwrap();
    rec.add_member("dos", Some("u_dos"), ValueType::S64, 1).unwrap();

    let mut schema = Schema::new("test");
    schema.add_metric("one", Some("u_one"), ValueType::S64).unwrap();
    schema.add_meta("two", Some("u_two"), ValueType::S64).unwrap();
    schema
        .add_array("three", Some("u_three"), ValueType::D64Array, 10)
        .unwrap();
    let rec_idx = schema.add_record(rec).unwrap();
    schema.add_record_array("rec_array", rec_idx, 8).unwrap();
    schema
        .add_array("u32_array", None, ValueType::U32Array, 4)
        .unwrap();
    schema.add_list("list", None, 512).unwrap();

    let body = schema_registry::codec::schema_to_json(&schema)
        .unwrap()
        .to_string();

    let mock = MockService::new();
    mock.add_json("/schemas/ids/abc123", &body);

    let client = client_with(mock);
    let fetched = client.get("abc123").await.unwrap();
    assert_eq!(fetched, schema);
}

#[tokio::test]
async fn get_propagates_decode_failures() {
    let mock = MockService::new();
    mock.add_json("/schemas/ids/abc123", r#"{"name": "test"}"#);

    let client = client_with(mock);
    let err = client.get("abc123").await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidFormat(_)));
}

#[tokio::test]
async fn delete_checks_acknowledged_id() {
    let mock = MockService::new();
    mock.add_json("/schemas/ids/abc123", r#"["abc123"]"#);

    let client = client_with(mock);
    client.delete("abc123").await.unwrap();
}

#[tokio::test]
async fn delete_mismatched_id_is_an_error() {
    let mock = MockService::new();
    mock.add_json("/schemas/ids/abc123", r#"["other-id"]"#);

    let client = client_with(mock);
    let err = client.delete("abc123").await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidResponse(_)));
}

#[tokio::test]
async fn delete_by_name_returns_deleted_ids() {
    let mock = MockService::new();
    mock.add_json("/names/test", r#"["id-1", "id-2"]"#);

    let client = client_with(mock);
    let ids = client.delete_by_name("test").await.unwrap();
    assert_eq!(ids, ["id-1", "id-2"]);
}

#[tokio::test]
async fn list_names_decodes_strings() {
    let mock = MockService::new();
    mock.add_json("/names", r#"["cpu_stats", "mem_stats"]"#);

    let client = client_with(mock);
    let names = client.list_names().await.unwrap();
    assert_eq!(names, ["cpu_stats", "mem_stats"]);
}

#[tokio::test]
async fn list_names_rejects_non_string_entries() {
    let mock = MockService::new();
    mock.add_json("/names", r#"["cpu_stats", 42]"#);

    let client = client_with(mock);
    let err = client.list_names().await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidFormat(_)));
}

#[tokio::test]
async fn list_digests_parses_hex_strings() {
    let hex_a = "aa".repeat(20);
    let hex_b = "0123456789abcdef0123456789abcdef01234567";
    let mock = MockService::new();
    mock.add_json("/digests", &format!(r#"["{hex_a}", "{hex_b}"]"#));

    let client = client_with(mock);
    let digests = client.list_digests().await.unwrap();
    assert_eq!(digests.len(), 2);
    assert_eq!(digests[0].to_string(), hex_a);
    assert_eq!(digests[1].to_string(), hex_b);
}

#[tokio::test]
async fn list_digests_rejects_malformed_entries() {
    let mock = MockService::new();
    mock.add_json("/digests", r#"["abc"]"#);

    let client = client_with(mock);
    let err = client.list_digests().await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidFormat(_)));
}

#[tokio::test]
async fn list_ids_by_name_hits_versions_resource() {
    let mock = MockService::new();
    mock.add_json("/names/test/versions", r#"["id-1", "id-2"]"#);

    let client = client_with(mock);
    let ids = client.list_ids_by_name("test").await.unwrap();
    assert_eq!(ids, ["id-1", "id-2"]);
}

#[tokio::test]
async fn list_ids_by_digest_not_found() {
    let digest: Digest = "ab".repeat(20).parse().unwrap();
    let mock = MockService::new();
    mock.add_json(&format!("/digests/{digest}/versions"), "null");

    let client = client_with(mock);
    let err = client.list_ids_by_digest(&digest).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound));
}

#[tokio::test]
async fn list_ids_requires_exactly_one_selector() {
    let digest: Digest = "ab".repeat(20).parse().unwrap();
    let client = client_with(MockService::new());

    let err = client.list_ids(None, None).await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));

    let err = client.list_ids(Some("test"), Some(&digest)).await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));
}

#[tokio::test]
async fn error_statuses_fail_before_decoding() {
    let mock = MockService::new();
    mock.add(
        "/names",
        http::StatusCode::INTERNAL_SERVER_ERROR,
        http::HeaderMap::new(),
        b"boom".to_vec(),
    );

    let client = client_with(mock);
    let err = client.list_names().await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidResponse(_)));
}

#[tokio::test]
async fn add_version_posts_under_name() {
    let mock = MockService::new();
    mock.add_json("/names/test/versions", r#"{"id": "id-3"}"#);

    let client = client_with(mock);
    let id = client.add_version("test", &test_schema()).await.unwrap();
    assert_eq!(id, "id-3");
}

mod failover {
    use super::*;

    /// A transport that fails for one host and answers `[]` for the rest.
    #[derive(Debug, Clone)]
    struct FlakyHost(&'static str);

    impl tower::Service<http::Request<hyperdriver::Body>> for FlakyHost {
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
            if req.uri().host() == Some(self.0) {
                return std::future::ready(Err(hyperdriver::client::Error::RequestTimeout));
            }
            let response = http::Response::builder()
                .status(http::StatusCode::OK)
                .body(hyperdriver::Body::from(bytes::Bytes::from_static(b"[]")))
                .unwrap();
            std::future::ready(Ok(response))
        }
    }

    #[tokio::test]
    async fn transport_failure_rotates_to_the_next_url() {
        let client = RegistryClient::with_service(
            ["http://one.example.com", "http://two.example.com"],
            FlakyHost("one.example.com"),
        )
        .unwrap();

        let err = client.list_names().await.unwrap_err();
        assert!(matches!(err, RegistryError::Transport(_)));

        // The failed call is not retried, but the next one uses the next URL.
        let names = client.list_names().await.unwrap();
        assert!(names.is_empty());
    }
}
