//! Gateway server tests: bind a real listener on loopback and talk raw HTTP.
//!
//! Run:
//!   cargo test -p gateway --test server_tests

use std::net::TcpListener;
use std::time::Duration;

use actix_web::{test, App};
use db_infra::{DbPool, ResolvedConfig};
use gateway::middleware::StructuredLogger;
use gateway::{build_server, AppError, AppState};
use test_support::TempSqlite;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[ctor::ctor]
fn init_test_logging() {
    test_support::logging::init();
}

fn config_for(db_url: &str, port: u16) -> ResolvedConfig {
    let port = port.to_string();
    ResolvedConfig::resolve_from(|key| match key {
        "DATABASE_URL" => Some(db_url.to_string()),
        "DB_MAX_CONNS" => Some("2".to_string()),
        "SERVER_HOST" => Some("127.0.0.1".to_string()),
        "SERVER_PORT" => Some(port.clone()),
        "SERVER_READ_TIMEOUT" => Some("5s".to_string()),
        "SERVER_WRITE_TIMEOUT" => Some("5s".to_string()),
        _ => None,
    })
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn raw_get(port: u16, path: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut buf))
        .await
        .expect("response within timeout")
        .unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

#[actix_web::test]
async fn test_unrouted_path_is_not_found() {
    let app = test::init_service(App::new().wrap(StructuredLogger)).await;

    let req = test::TestRequest::get().uri("/api/anything").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[actix_web::test]
async fn test_bound_server_answers_and_stops() {
    let db = TempSqlite::new();
    let config = config_for(&db.url(), free_port());
    let pool = DbPool::open(&config.database).await.unwrap();

    let server = build_server(&config.server, AppState::new(pool.clone())).unwrap();
    let handle = server.handle();
    let running = actix_web::rt::spawn(server);

    let response = raw_get(config.server.port, "/health").await;
    assert!(
        response.starts_with("HTTP/1.1 404"),
        "unexpected response: {response}"
    );

    handle.stop(true).await;
    running.await.unwrap().unwrap();
    pool.close().await;
}

#[actix_web::test]
async fn test_port_in_use_is_server_error() {
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let db = TempSqlite::new();
    let config = config_for(&db.url(), port);
    let pool = DbPool::open(&config.database).await.unwrap();

    let err = build_server(&config.server, AppState::new(pool.clone())).err().expect("expected build_server to fail on an occupied port");
    assert!(matches!(err, AppError::Server(_)), "got {err:?}");

    pool.close().await;
    drop(occupied);
}

#[actix_web::test]
async fn test_run_rejects_bad_database_url_before_binding() {
    let config = config_for("mysql://root@localhost/app", free_port());

    let err = gateway::run(config).await.unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}
