use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::Request,
    response::Response,
    routing::{get, post},
    serve::Serve,
};
use secrecy::SecretString;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tokio::net::TcpListener;
use tower_http::{services::ServeFile, trace::TraceLayer};
use tracing::{Span, info, info_span};
use uuid::Uuid;

use crate::{
    configuration::{DatabaseSettings, Settings},
    email_client::EmailClient,
    routes::{broadcast_form, health_check, load_template, preview_recipients, send_broadcast},
};

pub struct AppState {
    pub pool: SqlitePool,
    pub email_client: EmailClient,
    pub csrf_token: SecretString,
}

pub async fn run(
    listener: TcpListener,
    pool: SqlitePool,
    email_client: EmailClient,
    csrf_token: SecretString,
) -> anyhow::Result<Serve<TcpListener, Router, Router>> {
    // Wrapped in an Arc pointer to allow cheap cloning of AppState across
    // handlers instead of cloning the pool and the EmailClient themselves.
    let app_state = Arc::new(AppState {
        pool,
        email_client,
        csrf_token,
    });
    let app = Router::new()
        .route("/", get(broadcast_form))
        .route("/health_check", get(health_check))
        .route("/admin/emails/preview-recipients", post(preview_recipients))
        .route("/admin/emails/load-template/{id}", get(load_template))
        .route("/admin/emails/broadcast", post(send_broadcast))
        .nest_service("/static/admin.css", ServeFile::new("static/admin.css"))
        .with_state(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let request_id = Uuid::new_v4();
                    info_span!(
                        "http_request",
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        request_id = ?request_id,
                    )
                })
                .on_response(|response: &Response, latency: Duration, span: &Span| {
                    let status = response.status();
                    let headers = response.headers();
                    span.record("status", &status.as_u16());
                    info!(parent: span, ?status, ?headers, ?latency, "Response sent");
                }),
        );

    Ok(axum::serve(listener, app))
}

pub struct Application {
    port: u16,
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    // build wires everything together; the caller decides when to start
    // serving via run_until_stopped.
    pub async fn build(configuration: Settings) -> anyhow::Result<Self> {
        let connection_pool = get_connection_pool(&configuration.database);
        sqlx::migrate!("./migrations").run(&connection_pool).await?;

        let sender_email = configuration
            .email_client
            .sender()
            .expect("Invalid sender email address.");
        let timeout = configuration.email_client.timeout();
        let email_client = EmailClient::new(
            sender_email,
            configuration.email_client.base_url,
            configuration.email_client.authorization_token,
            timeout,
        );

        let listener = TcpListener::bind(format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        ))
        .await?;
        let port = listener.local_addr()?.port();

        let server = run(
            listener,
            connection_pool,
            email_client,
            configuration.application.csrf_token,
        )
        .await?;

        Ok(Self { server, port })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        Ok(self.server.await?)
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> SqlitePool {
    SqlitePoolOptions::new().connect_lazy_with(configuration.connect_options())
}
