// PveRepo tests against a mock hypervisor API

use guestwatch::config::UpstreamConfig;
use guestwatch::error::UpstreamError;
use guestwatch::pve_repo::{HypervisorApi, PveRepo, extract, split_api_path};

const AUTH: &str = "PVEAPIToken=monitor@pve!gw=s3cret";

fn upstream(base_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        base_url: base_url.to_string(),
        token_id: "monitor@pve!gw".into(),
        token_secret: "s3cret".into(),
        accept_invalid_certs: false,
        timeout_secs: 5,
        default_node: None,
        default_guest_id: None,
    }
}

#[tokio::test]
async fn guest_status_sends_token_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api2/json/nodes/pve/qemu/100/status/current")
        .match_header("authorization", AUTH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"status":"running","cpu":0.5,"mem":10,"maxmem":20}}"#)
        .create_async()
        .await;

    let repo = PveRepo::new(&upstream(&format!("{}/api2/json/", server.url()))).unwrap();
    let payload = repo.guest_status("pve", "100").await.unwrap();
    mock.assert_async().await;

    let metrics = extract::extract_metrics(&payload);
    assert_eq!(metrics.status.as_deref(), Some("running"));
    assert_eq!(metrics.cpu_percent, Some(50.0));
    assert_eq!(metrics.memory.used, Some(10.0));
}

#[tokio::test]
async fn non_success_status_is_reported_with_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api2/json/nodes/pve/qemu/100/status/current")
        .with_status(401)
        .with_body("authentication failure")
        .create_async()
        .await;

    let repo = PveRepo::new(&upstream(&format!("{}/api2/json", server.url()))).unwrap();
    let err = repo.guest_status("pve", "100").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    match err {
        UpstreamError::Status { body, .. } => assert_eq!(body, "authentication failure"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_credentials_fail_before_any_request() {
    let mut config = upstream("http://127.0.0.1:9/api2/json");
    config.token_secret = String::new();
    let repo = PveRepo::new(&config).unwrap();
    let err = repo.guest_status("pve", "100").await.unwrap_err();
    assert!(matches!(err, UpstreamError::NotConfigured(_)));
    assert_eq!(err.status(), None);

    let repo = PveRepo::new(&upstream("")).unwrap();
    let err = repo.node_guests("pve").await.unwrap_err();
    assert!(matches!(err, UpstreamError::NotConfigured(_)));
}

#[tokio::test]
async fn node_status_combines_detail_and_cluster_entry() {
    let mut server = mockito::Server::new_async().await;
    let detail = server
        .mock("GET", "/api2/json/nodes/pve/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"cpu":0.25,"uptime":7200,"pveversion":"pve-manager/8.2",
                "memory":{"used":4096,"total":8192,"free":4096},"loadavg":["0.10","0.20","0.30"]}}"#,
        )
        .create_async()
        .await;
    let nodes = server
        .mock("GET", "/api2/json/nodes")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":[{"node":"other","status":"offline"},{"node":"pve","status":"online","maxcpu":8}]}"#,
        )
        .create_async()
        .await;

    let repo = PveRepo::new(&upstream(&format!("{}/api2/json", server.url()))).unwrap();
    let payload = repo.node_status("pve").await.unwrap();
    detail.assert_async().await;
    nodes.assert_async().await;

    let entry = payload.node_entry.as_ref().unwrap();
    assert_eq!(entry["status"], "online");

    let summary = extract::node_summary("pve", &payload);
    assert_eq!(summary.node, "pve");
    assert_eq!(summary.status, "online");
    assert_eq!(summary.memory_percent, Some(50.0));
}

#[tokio::test]
async fn node_guests_lists_guests() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api2/json/nodes/pve/qemu")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[{"vmid":100,"name":"web","status":"running"},{"vmid":101}]}"#)
        .create_async()
        .await;

    let repo = PveRepo::new(&upstream(&format!("{}/api2/json", server.url()))).unwrap();
    let guests = extract::guest_listing(&repo.node_guests("pve").await.unwrap());
    assert_eq!(guests.len(), 2);
    assert_eq!(guests[0].id, "100");
    assert_eq!(guests[0].name, "web");
    assert_eq!(guests[1].name, "101");
}

#[tokio::test]
async fn raw_get_keeps_query_and_stays_below_base() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api2/json/cluster/resources")
        .match_query(mockito::Matcher::UrlEncoded("type".into(), "vm".into()))
        .match_header("authorization", AUTH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[{"vmid":100}]}"#)
        .create_async()
        .await;

    let repo = PveRepo::new(&upstream(&format!("{}/api2/json", server.url()))).unwrap();
    let payload = repo.raw_get("/cluster/resources?type=vm").await.unwrap();
    mock.assert_async().await;
    assert_eq!(payload["data"][0]["vmid"], 100);

    let err = repo.raw_get("nodes/../../secret").await.unwrap_err();
    assert!(matches!(err, UpstreamError::InvalidPath(_)));
}

#[test]
fn split_api_path_rejects_escapes() {
    let (segments, query) = split_api_path("nodes//pve/status").unwrap();
    assert_eq!(segments, vec!["nodes", "pve", "status"]);
    assert_eq!(query, None);
    assert!(split_api_path("").is_err());
    assert!(split_api_path("?x=1").is_err());
    assert!(split_api_path("nodes/./pve").is_err());
    assert!(split_api_path("http://other/api").is_err());
}
