//! Retry-loop behavior of the shared HTTP fetch helper, exercised against
//! a mock upstream.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stratus::providers::http::HttpClient;
use stratus::providers::ProviderError;

fn client() -> HttpClient {
    HttpClient::new().expect("build http client")
}

#[tokio::test]
async fn server_errors_retry_until_success() {
    let server = MockServer::start().await;

    // First two calls fail with 500, the third succeeds.
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let url = format!("{}/forecast", server.uri());
    let value = client()
        .fetch_json("test api", &url, true, false)
        .await
        .expect("retries should reach the good response");

    assert_eq!(value["ok"], true);
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn retries_stop_after_the_attempt_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let url = format!("{}/forecast", server.uri());
    let result = client().fetch_json("test api", &url, true, false).await;

    match result {
        Err(ProviderError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 10),
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 10);
}

#[tokio::test]
async fn client_errors_fail_fast_when_not_asked_to_keep_trying() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/forecast", server.uri());
    let result = client().fetch_json("test api", &url, false, false).await;

    match result {
        Err(ProviderError::HttpStatus { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn client_errors_keep_trying_when_asked() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let url = format!("{}/forecast", server.uri());
    let value = client()
        .fetch_json("test api", &url, true, false)
        .await
        .expect("404 should retry in keep-trying mode");

    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn throttled_geocoder_bodies_retry() {
    let server = MockServer::start().await;

    // geocode.xyz rate limiting arrives as a 200 with a sentinel body.
    Mock::given(method("GET"))
        .and(path("/geocode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latt": "Throttled! See geocode.xyz pricing"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/geocode"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "latt": "38.84", "longt": "-105.04" })),
        )
        .mount(&server)
        .await;

    let url = format!("{}/geocode", server.uri());
    let value = client()
        .fetch_json("geocode.xyz", &url, true, true)
        .await
        .expect("throttled body should retry to the real answer");

    assert_eq!(value["latt"], "38.84");
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn throttle_detection_only_applies_when_enabled() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latt": "Throttled! See geocode.xyz pricing"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/geocode", server.uri());
    let value = client()
        .fetch_json("geocode.xyz", &url, true, false)
        .await
        .expect("without throttle checking the body is returned as-is");

    assert_eq!(value["latt"], "Throttled! See geocode.xyz pricing");
}

#[tokio::test]
async fn non_json_bodies_are_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/forecast", server.uri());
    let result = client().fetch_json("test api", &url, true, false).await;

    // Parse failures are terminal even in keep-trying mode.
    assert!(matches!(result, Err(ProviderError::Parse { .. })));
}
