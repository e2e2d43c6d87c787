//! Startup and shutdown behaviour of the HTTP server and the binary

mod fixtures;

use image_arena::api::ApiServer;
use image_arena::AppState;
use std::net::TcpListener as StdTcpListener;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use fixtures::test_config;

fn server_on_port(port: u16) -> Arc<ApiServer> {
    let mut config = test_config();
    config.service.host = "127.0.0.1".to_string();
    config.service.port = port;
    let state = Arc::new(AppState::new(config).unwrap());
    Arc::new(ApiServer::new(state))
}

fn free_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_bind_fails_on_occupied_port() {
    let occupied = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let server = server_on_port(port);
    let err = server.bind().await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to bind"));
}

#[tokio::test]
async fn test_serve_answers_and_stops() {
    let port = free_port();
    let server = server_on_port(port);
    let listener = server.bind().await.unwrap();

    let task = {
        let server = server.clone();
        tokio::spawn(async move { server.serve(listener).await })
    };

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream
        .write_all(b"GET /alive HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "got {}", response);
    assert!(response.ends_with("Alive"));

    server.stop();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

fn wait_for_exit(mut child: std::process::Child, limit: Duration) -> std::process::ExitStatus {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if start.elapsed() > limit {
            let _ = child.kill();
            let _ = child.wait();
            panic!("process still running after {:?}", limit);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn test_binary_exits_when_port_is_taken() {
    let occupied = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let child = Command::new(env!("CARGO_BIN_EXE_image-arena"))
        .args(["--in-memory", "--no-discover", "--host", "127.0.0.1", "--port"])
        .arg(port.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let status = wait_for_exit(child, Duration::from_secs(10));
    assert!(!status.success());
    drop(occupied);
}

#[test]
fn test_binary_dry_run_succeeds() {
    let child = Command::new(env!("CARGO_BIN_EXE_image-arena"))
        .args(["--in-memory", "--no-discover", "--dry-run"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let status = wait_for_exit(child, Duration::from_secs(10));
    assert!(status.success());
}
