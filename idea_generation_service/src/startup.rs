use actix_cors::Cors;
use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::net::TcpListener;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::{DatabaseSettings, Settings},
    repositories::{
        content_plan_postgres_repository::ContentPlanPostgresRepository,
        google_access_token_repository::GoogleAccessTokenRepository,
        vertex_ai_repository::VertexAiRepository,
    },
    routes::{generate_video_ideas::generate_video_ideas, health_check::health_check},
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Failed to build the outbound HTTP client: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

impl Application {
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building application")]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let connection_pool = get_connection_pool(&settings.database);

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr().unwrap().port();

        // One client is shared by both outbound repositories. No explicit
        // timeout: the hosting platform bounds the request lifetime.
        let http_client = reqwest::Client::builder().build()?;

        let access_token_repository =
            GoogleAccessTokenRepository::new(http_client.clone(), settings.google_oauth.clone());
        let vertex_ai_repository =
            VertexAiRepository::new(http_client, settings.vertex_ai.clone());
        let content_plan_repository = ContentPlanPostgresRepository::new();

        let server = run(
            listener,
            nb_workers,
            connection_pool,
            content_plan_repository,
            access_token_repository,
            vertex_ai_repository,
        )?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
///
/// # Parameters
/// - nb_workers: number of actix-web workers
///   if `None`, the number of available physical CPUs is used as the worker count.
pub fn run(
    listener: TcpListener,
    nb_workers: Option<usize>,
    db_pool: PgPool,
    content_plan_repository: ContentPlanPostgresRepository,
    access_token_repository: GoogleAccessTokenRepository,
    vertex_ai_repository: VertexAiRepository,
) -> Result<Server, std::io::Error> {
    // Wraps the connection to a db in smart pointers
    let db_pool = Data::new(db_pool);

    // Wraps repositories in a `actix_web::Data` (`Arc`) to be able to register them
    // and access them from handlers.
    // Those repositories are shared among all threads.
    let content_plan_repository = Data::new(content_plan_repository);
    let access_token_repository = Data::new(access_token_repository);
    let vertex_ai_repository = Data::new(vertex_ai_repository);

    // `move` to capture variables from the surrounding environment
    let server = HttpServer::new(move || {
        info!("Starting actix-web worker");

        App::new()
            .wrap(TracingLogger::default())
            // The dashboard is served from another origin: accept all of them
            // and answer preflights with a wildcard.
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .send_wildcard(),
            )
            .route("/health_check", web::get().to(health_check))
            .route("/generate_video_ideas", web::post().to(generate_video_ideas))
            .app_data(db_pool.clone())
            .app_data(content_plan_repository.clone())
            .app_data(access_token_repository.clone())
            .app_data(vertex_ai_repository.clone())
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web settings (number of workers = number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    // No await
    Ok(server.run())
}

pub fn get_connection_pool(settings: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(settings.with_db())
}
