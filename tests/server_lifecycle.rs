//! End-to-end test over a real socket: serve, request, shut down.

use std::time::Duration;

use insights_api::config::ApiConfig;
use insights_api::{HttpServer, Shutdown};
use tokio::net::TcpListener;

#[tokio::test]
async fn test_serve_and_graceful_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = ApiConfig::default();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    let res = client
        .get(format!("http://{addr}/v1/fields/assessment-answer"))
        .header("Gooru-Session-Token", "token-1")
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-trace-id"));

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["content"]["type_name"], "type");

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
