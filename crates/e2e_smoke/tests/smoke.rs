use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use axum::Router;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const TOKEN_NAME: &str = "token";
const PASSWORD: &str = "INFOKEEPER_CANARY_SECRET_7f3e1c9a";

fn test_db_url() -> Option<String> {
    std::env::var("INFOKEEPER_TEST_DB_URL")
        .ok()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn smoke_registers_saves_and_loads_every_resource() {
    let Some(db_url) = test_db_url() else {
        eprintln!("skipping e2e smoke test; set INFOKEEPER_TEST_DB_URL to enable");
        return;
    };

    let log_buf = init_test_tracing();

    let schema = format!("infokeeper_test_{}", ulid::Ulid::new()).to_lowercase();
    let config = infokeeper_server::config::ServerConfig::from_kv(&HashMap::from([
        ("INFOKEEPER_BIND_ADDR".to_string(), "127.0.0.1:0".to_string()),
        ("INFOKEEPER_DB_URL".to_string(), db_url.clone()),
        ("INFOKEEPER_DB_SCHEMA".to_string(), schema.clone()),
        ("INFOKEEPER_DB_MAX_CONNECTIONS".to_string(), "4".to_string()),
        ("INFOKEEPER_TOKEN_NAME".to_string(), TOKEN_NAME.to_string()),
        ("INFOKEEPER_TOKEN_SECRET".to_string(), "smoke-secret".to_string()),
    ]))
    .expect("server config should be valid");

    let (addr, shutdown, task) = spawn_server(
        infokeeper_server::http::router_from_config(&config)
            .await
            .expect("server router should init"),
    )
    .await;

    let client = reqwest::Client::new();
    wait_for_healthz(&client, addr).await;

    let ready = client
        .get(format!("http://{}/readyz", addr))
        .send()
        .await
        .expect("readyz request should succeed");
    assert_eq!(ready.status(), StatusCode::OK);
    let ready = ready.json::<Value>().await.expect("readyz should be JSON");
    assert_eq!(ready["checks"]["storage"], true);

    let user_id = uuid::Uuid::new_v4().to_string();
    let (status, body) = call(
        &client,
        addr,
        "/v1/users/register",
        None,
        json!({"id": user_id, "login": "smoke@example.com", "password": PASSWORD}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");

    let (status, body) = call(
        &client,
        addr,
        "/v1/users/login",
        None,
        json!({"login": "smoke@example.com", "password": PASSWORD}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    let token = body["token"]
        .as_str()
        .expect("login should return a token")
        .to_string();

    let (status, body) = call(&client, addr, "/v1/credentials/load", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let credential_id = uuid::Uuid::new_v4().to_string();
    let (status, body) = call(
        &client,
        addr,
        "/v1/credentials/save",
        Some(&token),
        json!({"id": credential_id, "login": "mail_box", "password": "p", "metadata": "work"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "credential save failed: {body}");

    let (status, body) = call(
        &client,
        addr,
        "/v1/credentials/load",
        Some(&token),
        json!({"login": "MAIL_"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let credentials = body["credentials"].as_array().expect("credentials array");
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0]["id"], credential_id.as_str());

    let card = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "number": "4444 4444 4444 4444",
        "owner_name": "Ivan Petrov",
        "expires_at": "2030-06-30",
        "cvv_code": "123",
        "pin_code": "1234",
    });
    let (status, body) = call(&client, addr, "/v1/credit-cards/save", Some(&token), card).await;
    assert_eq!(status, StatusCode::OK, "card save failed: {body}");

    let duplicate = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "number": "4444 4444 4444 4444",
        "owner_name": "Ivan Petrov",
        "expires_at": "2031-06-30",
        "cvv_code": "321",
        "pin_code": "4321",
    });
    let (status, body) =
        call(&client, addr, "/v1/credit-cards/save", Some(&token), duplicate).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");

    let (status, body) = call(
        &client,
        addr,
        "/v1/credit-cards/load",
        Some(&token),
        json!({"cvv_code": "123", "expires_after": "2030-06-30", "expires_before": "2030-06-30"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cards = body["credit_cards"].as_array().expect("credit_cards array");
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0]["expires_at"], "2030-06-30");

    let (status, body) = call(
        &client,
        addr,
        "/v1/text-data/save",
        Some(&token),
        json!({"id": uuid::Uuid::new_v4().to_string(), "data": "the quick fox"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "text save failed: {body}");

    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let (status, body) = call(
        &client,
        addr,
        "/v1/text-data/load",
        Some(&token),
        json!({"data": "quick", "created_before": today}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text_data"].as_array().map(Vec::len), Some(1));

    let (status, body) = call(
        &client,
        addr,
        "/v1/text-data/load",
        Some(&token),
        json!({"data": "slow"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"text_data": []}));

    let logs = String::from_utf8(
        log_buf
            .lock()
            .expect("log lock should be available")
            .clone(),
    )
    .expect("logs should be UTF-8");
    assert!(
        !logs.contains(PASSWORD),
        "logs must never contain a user secret"
    );
    assert!(logs.contains("operation=\"SaveCreditCard\""), "logs: {logs}");

    let _ = shutdown.send(());
    let _ = task.await;
    drop_schema(&db_url, &schema).await;
}

async fn call(
    client: &reqwest::Client,
    addr: SocketAddr,
    path: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut request = client.post(format!("http://{}{}", addr, path)).json(&body);
    if let Some(token) = token {
        request = request.header(TOKEN_NAME, token);
    }

    let response = request.send().await.expect("request should succeed");
    let status = response.status();
    let body = response
        .json::<Value>()
        .await
        .expect("response should be valid JSON");
    (status, body)
}

async fn drop_schema(db_url: &str, schema: &str) {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(db_url)
        .await
        .expect("DB connect should succeed");
    let drop_schema = format!("DROP SCHEMA {} CASCADE", schema);
    let _ = sqlx::query(&drop_schema).execute(&pool).await;
    pool.close().await;
}

async fn spawn_server(
    app: Router,
) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local_addr should succeed");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    (addr, shutdown_tx, handle)
}

async fn wait_for_healthz(client: &reqwest::Client, addr: SocketAddr) {
    let url = format!("http://{}/healthz", addr);

    for _ in 0..50 {
        if let Ok(response) = client.get(&url).send().await
            && response.status().is_success()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    panic!("server did not become ready at {}", url);
}

#[derive(Clone)]
struct TestWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut lock = self
            .buf
            .lock()
            .map_err(|_| std::io::Error::other("log mutex poisoned"))?;
        lock.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn init_test_tracing() -> Arc<Mutex<Vec<u8>>> {
    static LOG_BUF: OnceLock<Arc<Mutex<Vec<u8>>>> = OnceLock::new();

    LOG_BUF
        .get_or_init(|| {
            let buf = Arc::new(Mutex::new(Vec::new()));
            let make_writer = {
                let buf = buf.clone();
                move || TestWriter { buf: buf.clone() }
            };

            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .with_ansi(false)
                .with_writer(make_writer)
                .finish();

            tracing::subscriber::set_global_default(subscriber)
                .expect("global tracing subscriber should be set once");

            buf
        })
        .clone()
}
