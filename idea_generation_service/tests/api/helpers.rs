use chrono::Utc;
use common::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use idea_generation_service::{
    configuration::{get_configuration, DatabaseSettings},
    startup::{get_connection_pool, Application},
};
use once_cell::sync::Lazy;
use secrecy::Secret;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

// Ensures that the `tracing` stack is only initialized once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_tracing_subscriber(subscriber);
    } else {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_tracing_subscriber(subscriber);
    };
});

pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/service_account_key.pem");
pub const TEST_PROJECT_ID: &str = "demo-project";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    /// Database connection used to assert checks thanks to db queries
    pub db_pool: PgPool,
    /// Mocked OAuth token endpoint
    pub oauth_server: MockServer,
    /// Mocked Vertex AI endpoint
    pub vertex_server: MockServer,
    pub api_client: reqwest::Client,
}

/// A test API client / test suite
impl TestApp {
    pub async fn post_generate_video_ideas(&self, plan_id: Uuid) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/generate_video_ideas", &self.address))
            .json(&serde_json::json!({ "planId": plan_id }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Mounts a token-exchange mock answering every assertion with a fixed token
    pub async fn mock_token_exchange(&self) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&self.oauth_server)
            .await;
    }

    /// Mounts a generateContent mock returning `text` as the only candidate
    pub async fn mock_vertex_text_response(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path_regex(r".*:generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": text }] },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&self.vertex_server)
            .await;
    }
}

/// The service-account key file handed to the app under test. The private key
/// is a throwaway RSA key generated for the test suite.
pub fn test_service_account_json() -> String {
    serde_json::json!({
        "type": "service_account",
        "client_email": "svc@demo-project.iam.gserviceaccount.com",
        "private_key": TEST_PRIVATE_KEY_PEM,
        "project_id": TEST_PROJECT_ID
    })
    .to_string()
}

/// Launches the server as a background task without touching Postgres.
///
/// The connection pool is lazy, so tests that never reach the database can run
/// on a machine without one.
pub async fn spawn_app() -> TestApp {
    spawn_app_inner(false).await
}

/// Launches the server with a dedicated, freshly migrated test database.
pub async fn spawn_app_with_database() -> TestApp {
    spawn_app_inner(true).await
}

async fn spawn_app_inner(set_up_db: bool) -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    let oauth_server = MockServer::start().await;
    let vertex_server = MockServer::start().await;

    // Randomizes configuration to ensure test isolation
    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // Uses a different database for each test case
        c.database.database_name = format!(
            "test_{}_{}",
            Utc::now().format("%Y-%m-%d_%H-%M-%S"),
            Uuid::new_v4()
        );
        // Uses a random OS port
        c.application.port = 0;
        // Points both outbound integrations at the mock servers
        c.google_oauth.token_url = format!("{}/token", oauth_server.uri());
        c.google_oauth.service_account_json = Some(Secret::new(test_service_account_json()));
        c.vertex_ai.base_url = Some(vertex_server.uri());
        c
    };

    if set_up_db {
        set_up_database(&configuration.database).await;
    }

    // Only one actix-web worker is needed for integration tests
    let application = Application::build(configuration.clone(), Some(1))
        .await
        .expect("Failed to build application.");

    let application_port = application.port();

    // Launches the application as a background task
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        port: application_port,
        db_pool: get_connection_pool(&configuration.database),
        oauth_server,
        vertex_server,
        api_client: reqwest::Client::new(),
    }
}

/// Creates and migrates a database for integration test
async fn set_up_database(config: &DatabaseSettings) -> PgPool {
    // Creates database
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");

    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    info!("Created database: {}", config.database_name);

    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres.");

    // Migrates database
    sqlx::migrate!("../migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");

    info!("Migration done for database: {}", config.database_name);

    connection_pool
}
