// Tests for the host fetch adapter against a local mock HTTP server.
use super::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_parses_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/table.json"))
        .and(query_param("pageIndex", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .mount(&server)
        .await;

    let url = format!("{}/table.json?pageIndex=2", server.uri());
    let resp = HostFetch::new().fetch(&NetworkRequest::get(url.clone())).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.status_text, "OK");
    assert_eq!(resp.url, url);
    assert_eq!(resp.body, json!([{ "id": 1 }]));
}

#[tokio::test]
async fn test_fetch_sends_headers_and_keeps_text_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plain"))
        .and(wiremock::matchers::header("accept", "text/plain"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let req = NetworkRequest::get(format!("{}/plain", server.uri())).with_header("accept", "text/plain");
    let resp = HostFetch::new().fetch(&req).await.unwrap();
    assert_eq!(resp.status, 404);
    assert!(!resp.is_success());
    assert_eq!(resp.body, json!("missing"));
}

#[tokio::test]
async fn test_fetch_connection_error_is_reported() {
    // Nothing listens on port 9 of the loopback interface.
    let res = HostFetch::new().fetch(&NetworkRequest::get("http://127.0.0.1:9/table.json")).await;
    assert!(res.is_err());
}
