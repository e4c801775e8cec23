mod common;

use common::test_config;
use std::sync::Arc;
use std::time::Duration;
use studio_service::config::StudioConfig;
use studio_service::services::providers::mock::MockProvider;
use studio_service::services::providers::ContentProvider;
use studio_service::startup::Application;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Headers promise a 1000 byte body; only the first few bytes ever arrive.
const STALLED_ASK: &[u8] = b"POST /ask HTTP/1.1\r\n\
host: localhost\r\n\
content-type: application/json\r\n\
content-length: 1000\r\n\
\r\n\
{\"question\":";

async fn spawn_app(
    config: StudioConfig,
) -> (
    u16,
    tokio_util::sync::CancellationToken,
    tokio::task::JoinHandle<std::io::Result<()>>,
) {
    let provider: Arc<dyn ContentProvider> = Arc::new(MockProvider::with_text("ok"));
    let app = Application::build_with_provider(config, Some(provider))
        .await
        .expect("Failed to build application");
    let port = app.port();
    let shutdown = app.shutdown_token();
    (port, shutdown, tokio::spawn(app.run_until_stopped()))
}

#[tokio::test]
async fn stalled_upload_does_not_hold_up_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.server.request_timeout_secs = 600;
    config.server.shutdown_grace_secs = 1;
    let (port, shutdown, server) = spawn_app(config).await;

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream.write_all(STALLED_ASK).await.unwrap();
    // Give the handler time to start waiting on the body.
    tokio::time::sleep(Duration::from_millis(200)).await;

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server kept draining past the shutdown grace")
        .unwrap()
        .unwrap();
    drop(stream);
}

#[tokio::test]
async fn stalled_upload_times_out_with_408() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.server.request_timeout_secs = 1;
    config.server.shutdown_grace_secs = 1;
    let (port, shutdown, server) = spawn_app(config).await;

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream.write_all(STALLED_ASK).await.unwrap();

    let mut buf = vec![0u8; 1024];
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("no response before the request timeout")
        .unwrap();
    let head = String::from_utf8_lossy(&buf[..n]);
    assert!(head.starts_with("HTTP/1.1 408"), "unexpected response: {head}");
    drop(stream);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}
