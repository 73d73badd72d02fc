//! Tests for the per-vendor attempt loop and the in-session gateway retry,
//! against a local listener serving canned HTTP responses.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use snappfood_crawler::application::fetcher::VendorFetcher;
use snappfood_crawler::domain::Vendor;
use snappfood_crawler::infrastructure::config::{CrawlerConfig, IdentityConfig};
use snappfood_crawler::infrastructure::http_client::{BoundClient, BoundClientConfig};
use snappfood_crawler::infrastructure::identity::{Identity, IdentityPool};

fn http_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Serve one canned response per accepted connection, in order.
async fn serve(responses: Vec<String>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let mut buf = [0u8; 8192];
            let _ = stream.read(&mut buf).await;
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    addr
}

fn test_crawler_config(addr: SocketAddr) -> CrawlerConfig {
    CrawlerConfig {
        api_base_url: format!("http://{addr}"),
        max_attempts: 3,
        request_timeout_seconds: 5,
        status_retries: 0,
        vendor_delay_secs: (0.0, 0.0),
        product_delay_secs: 0.0,
        ..CrawlerConfig::default()
    }
}

fn vendor() -> Vendor {
    Vendor {
        vendor_id: 900,
        vendor_code: "test-code".to_string(),
        lat: 35.7,
        lon: 51.4,
        vendor_title: None,
    }
}

#[tokio::test]
async fn persistent_server_errors_exhaust_the_attempt_budget() {
    let err = http_response("500 Internal Server Error", "oops");
    let addr = serve(vec![err.clone(), err.clone(), err]).await;

    let pool = IdentityPool::from_config(&IdentityConfig::default()).unwrap();
    let config = test_crawler_config(addr);
    let fetcher = VendorFetcher::new(&pool, &config);

    assert!(fetcher.fetch(&vendor()).await.is_none());
}

#[tokio::test]
async fn a_later_attempt_can_succeed_after_failures() {
    let addr = serve(vec![
        http_response("500 Internal Server Error", "oops"),
        http_response("200 OK", r#"{"status": true, "data": {"menus": []}}"#),
    ])
    .await;

    let pool = IdentityPool::from_config(&IdentityConfig::default()).unwrap();
    let config = test_crawler_config(addr);
    let fetcher = VendorFetcher::new(&pool, &config);

    let payload = fetcher.fetch(&vendor()).await.unwrap();
    assert_eq!(payload["status"], serde_json::Value::Bool(true));
}

#[tokio::test]
async fn undecodable_bodies_count_as_failed_attempts() {
    let garbage = http_response("200 OK", "<html>definitely not json</html>");
    let addr = serve(vec![garbage.clone(), garbage.clone(), garbage]).await;

    let pool = IdentityPool::from_config(&IdentityConfig::default()).unwrap();
    let config = test_crawler_config(addr);
    let fetcher = VendorFetcher::new(&pool, &config);

    assert!(fetcher.fetch(&vendor()).await.is_none());
}

#[tokio::test]
async fn bound_client_retries_gateway_errors_in_session() {
    let addr = serve(vec![
        http_response("502 Bad Gateway", "bad"),
        http_response("200 OK", r#"{"ok": true}"#),
    ])
    .await;

    let identity = Identity {
        source_ip: None,
        headers: vec![("user-agent".into(), "test".into())],
    };
    let client = BoundClient::new(
        &identity,
        BoundClientConfig {
            timeout_seconds: 5,
            status_retries: 2,
            status_backoff_base_secs: 0.01,
        },
    )
    .unwrap();

    let response = client.get(&format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn bound_client_does_not_retry_other_status_codes() {
    // A second response is available; a 404 must be returned without
    // consuming it.
    let addr = serve(vec![
        http_response("404 Not Found", "missing"),
        http_response("200 OK", r#"{"ok": true}"#),
    ])
    .await;

    let identity = Identity {
        source_ip: None,
        headers: vec![("user-agent".into(), "test".into())],
    };
    let client = BoundClient::new(
        &identity,
        BoundClientConfig {
            timeout_seconds: 5,
            status_retries: 2,
            status_backoff_base_secs: 0.01,
        },
    )
    .unwrap();

    let response = client.get(&format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
