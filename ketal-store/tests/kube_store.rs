//! KubeStore tests against a mocked Kubernetes API server.

use std::time::Duration;

use futures_util::StreamExt;
use ketal_store::{
    Device, DeviceSpec, Eip, EventType, KubeConfig, KubeStore, RecordStore, StoreError, WatchEvent,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEVICES: &str = "/apis/ketal.equinix.metal/v1/namespaces/default/devices";
const EIPS: &str = "/apis/ketal.equinix.metal/v1/namespaces/default/eips";

fn device_json(name: &str) -> serde_json::Value {
    json!({
        "apiVersion": "ketal.equinix.metal/v1",
        "kind": "Device",
        "metadata": {"name": name, "namespace": "default", "resourceVersion": "7"},
        "spec": {"hostname": name, "deviceType": "c3.small.x86", "os": "ubuntu_20_04"}
    })
}

fn store<R: ketal_store::Resource>(server: &MockServer) -> KubeStore<R> {
    let config = KubeConfig::new(server.uri()).with_token("secret");
    KubeStore::new(&config, "default").unwrap()
}

#[tokio::test]
async fn test_list_devices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DEVICES))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiVersion": "ketal.equinix.metal/v1",
            "kind": "DeviceList",
            "metadata": {"resourceVersion": "10"},
            "items": [device_json("node-1"), device_json("node-2")]
        })))
        .mount(&server)
        .await;

    let store = store::<Device>(&server);
    let devices = store.list().await.unwrap();

    let names: Vec<&str> = devices.iter().map(|d| d.metadata.name.as_str()).collect();
    assert_eq!(names, vec!["node-1", "node-2"]);
    assert_eq!(devices[0].spec.device_type, "c3.small.x86");
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/node-9", DEVICES)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "kind": "Status",
            "code": 404,
            "message": "devices.ketal.equinix.metal \"node-9\" not found"
        })))
        .mount(&server)
        .await;

    let store = store::<Device>(&server);
    let err = store.get("node-9").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_create_conflict_is_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EIPS))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "kind": "Status",
            "code": 409,
            "reason": "AlreadyExists",
            "message": "eips.ketal.equinix.metal \"147.75.1.2\" already exists"
        })))
        .mount(&server)
        .await;

    let store = store::<Eip>(&server);
    let eip = Eip::new("147.75.1.2", "default", Default::default());
    let err = store.create(&eip).await.unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_create_returns_stored_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEVICES))
        .respond_with(ResponseTemplate::new(201).set_body_json(device_json("node-1")))
        .mount(&server)
        .await;

    let store = store::<Device>(&server);
    let device = Device::new(
        "node-1",
        "default",
        DeviceSpec {
            hostname: "node-1".into(),
            ..Default::default()
        },
    );
    let created = store.create(&device).await.unwrap();
    assert_eq!(created.metadata.resource_version.as_deref(), Some("7"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["kind"], "Device");
    assert_eq!(body["metadata"]["name"], "node-1");
}

#[tokio::test]
async fn test_delete_server_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/node-1", DEVICES)))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "kind": "Status",
            "code": 403,
            "message": "forbidden"
        })))
        .mount(&server)
        .await;

    let store = store::<Device>(&server);
    match store.delete("node-1").await.unwrap_err() {
        StoreError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "forbidden");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_watch_streams_events() {
    let server = MockServer::start().await;
    let body = concat!(
        r#"{"type":"ADDED","object":{"metadata":{"name":"node-1"}}}"#,
        "\n",
        r#"{"type":"BOOKMARK","object":{"metadata":{"resourceVersion":"11"}}}"#,
        "\n",
        r#"{"type":"DELETED","object":{"metadata":{"name":"node-1"}}}"#,
        "\n",
    );
    Mock::given(method("GET"))
        .and(path(DEVICES))
        .and(query_param("watch", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let store = store::<Device>(&server);
    let events: Vec<WatchEvent> = tokio::time::timeout(
        Duration::from_secs(5),
        store.watch().await.unwrap().map(|e| e.unwrap()).collect::<Vec<_>>(),
    )
    .await
    .unwrap();

    assert_eq!(
        events,
        vec![
            WatchEvent::new(EventType::Added, "node-1"),
            WatchEvent::new(EventType::Deleted, "node-1"),
        ]
    );
}
