//! MetalClient tests against a mocked Equinix Metal API.

use ketal_metal::{DeviceCreateRequest, MetalApi, MetalClient, MetalError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> MetalClient {
    MetalClient::new("token-123", Some(server.uri().as_str())).unwrap()
}

#[tokio::test]
async fn test_list_devices_follows_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/proj-1/devices"))
        .and(query_param("page", "1"))
        .and(header("X-Auth-Token", "token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "devices": [{"id": "d1", "hostname": "node-1"}],
            "meta": {"current_page": 1, "last_page": 2, "total": 2}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/proj-1/devices"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "devices": [{"id": "d2", "hostname": "node-2"}],
            "meta": {"current_page": 2, "last_page": 2, "total": 2}
        })))
        .mount(&server)
        .await;

    let devices = client(&server).list_devices("proj-1").await.unwrap();
    let hostnames: Vec<&str> = devices.iter().map(|d| d.hostname.as_str()).collect();
    assert_eq!(hostnames, vec!["node-1", "node-2"]);
}

#[tokio::test]
async fn test_list_ips() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/proj-1/ips"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip_addresses": [
                {"id": "ip1", "address": "147.75.1.2", "address_family": 4, "public": true},
                {"id": "ip2", "address": "2604:1380::", "address_family": 6, "public": true}
            ]
        })))
        .mount(&server)
        .await;

    let ips = client(&server).list_ips("proj-1").await.unwrap();
    assert_eq!(ips.len(), 2);
    assert!(ips[0].is_ipv4());
    assert!(!ips[1].is_ipv4());
}

#[tokio::test]
async fn test_create_device_posts_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects/proj-1/devices"))
        .and(body_json(json!({
            "hostname": "node-2",
            "plan": "c3.small.x86",
            "facility": ["am6"],
            "operating_system": "ubuntu_20_04",
            "billing_cycle": "hourly",
            "project_id": "proj-1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "new-id",
            "hostname": "node-2",
            "state": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = DeviceCreateRequest {
        hostname: "node-2".into(),
        plan: "c3.small.x86".into(),
        facility: vec!["am6".into()],
        operating_system: "ubuntu_20_04".into(),
        billing_cycle: "hourly".into(),
        project_id: "proj-1".into(),
    };
    let device = client(&server).create_device(&request).await.unwrap();
    assert_eq!(device.id, "new-id");
    assert_eq!(device.state, "queued");
}

#[tokio::test]
async fn test_api_errors_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects/proj-1/devices"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"errors": ["Hostname has already been taken"]})),
        )
        .mount(&server)
        .await;

    let request = DeviceCreateRequest {
        hostname: "node-1".into(),
        project_id: "proj-1".into(),
        ..Default::default()
    };
    let err = client(&server).create_device(&request).await.unwrap_err();
    assert!(err.is_already_exists());
    match err {
        MetalError::Api { status, errors } => {
            assert_eq!(status, 422);
            assert_eq!(errors, vec!["Hostname has already been taken".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unauthorized_list_projects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid authentication token"})))
        .mount(&server)
        .await;

    let err = client(&server).list_projects().await.unwrap_err();
    assert!(!err.is_already_exists());
    assert_eq!(err.to_string(), "api error (401): Invalid authentication token");
}

#[test]
fn test_empty_token_rejected() {
    assert!(matches!(
        MetalClient::new("", None),
        Err(MetalError::Config(_))
    ));
}
