use std::sync::LazyLock;
use std::time::Duration;

use broadcast_admin::{
    domain::RecipientEmail,
    email_client::EmailClient,
    preview::PreviewClient,
    startup::run,
    telemetry::{get_subscriber, init_subscriber},
};
use chrono::Utc;
use secrecy::SecretString;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tokio::net::TcpListener;
use uuid::Uuid;
use wiremock::MockServer;

// One subscriber for the whole test binary; TEST_LOG=true makes it chatty.
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const TEST_CSRF_TOKEN: &str = "test-csrf-token";

pub struct TestApp {
    pub address: String,
    pub db_pool: SqlitePool,
    /// Mock stand-in for the external delivery API.
    pub email_server: MockServer,
    pub api_client: reqwest::Client,
}

pub async fn spawn_app() -> TestApp {
    LazyLock::force(&TRACING);

    let email_server = MockServer::start().await;

    let database_path =
        std::env::temp_dir().join(format!("broadcast-admin-test-{}.db", Uuid::new_v4()));
    let connect_options = SqliteConnectOptions::new()
        .filename(&database_path)
        .create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await
        .expect("Failed to open the test database.");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to migrate the test database.");

    let email_client = EmailClient::new(
        RecipientEmail::parse("broadcast@example.com".to_string()).unwrap(),
        email_server.uri(),
        SecretString::from("test-delivery-token".to_string()),
        Duration::from_millis(200),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind a random port.");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let server = run(
        listener,
        db_pool.clone(),
        email_client,
        SecretString::from(TEST_CSRF_TOKEN.to_string()),
    )
    .await
    .expect("Failed to build the application.");
    tokio::spawn(async move { server.await.unwrap() });

    TestApp {
        address,
        db_pool,
        email_server,
        api_client: reqwest::Client::new(),
    }
}

#[derive(serde::Serialize)]
pub struct BroadcastForm<'a> {
    pub subject: &'a str,
    pub content: &'a str,
    pub recipient_type: &'a str,
    pub custom_recipient_ids: &'a str,
    pub csrf_token: &'a str,
}

impl TestApp {
    /// A preview client wired against this app with the right token.
    pub fn preview_client(&self) -> PreviewClient {
        PreviewClient::new(
            self.address.clone(),
            SecretString::from(TEST_CSRF_TOKEN.to_string()),
            Duration::from_secs(2),
        )
    }

    pub async fn post_preview_recipients(
        &self,
        recipient_type: &str,
        custom_recipient_ids: &str,
        csrf_token: &str,
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}/admin/emails/preview-recipients", self.address))
            .form(&[
                ("recipient_type", recipient_type),
                ("custom_recipient_ids", custom_recipient_ids),
                ("csrf_token", csrf_token),
            ])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_load_template(&self, template_id: &str) -> reqwest::Response {
        self.api_client
            .get(format!(
                "{}/admin/emails/load-template/{}",
                self.address, template_id
            ))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_broadcast(&self, form: &BroadcastForm<'_>) -> reqwest::Response {
        self.api_client
            .post(format!("{}/admin/emails/broadcast", self.address))
            .form(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn seed_recipient(&self, recipient: &SeedRecipient<'_>) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users \
             (id, email, first_name, last_name, is_staff, is_superuser, is_active, joined_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(recipient.email)
        .bind(recipient.first_name)
        .bind(recipient.last_name)
        .bind(recipient.is_staff)
        .bind(recipient.is_superuser)
        .bind(recipient.is_active)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await
        .expect("Failed to seed a recipient.");
        id
    }

    /// An active, plain (non-staff) user with the given address.
    pub async fn seed_active_user(&self, email: &str) -> Uuid {
        self.seed_recipient(&SeedRecipient::active(email)).await
    }

    pub async fn seed_template(
        &self,
        name: &str,
        subject: &str,
        content: &str,
        is_active: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO email_templates (id, name, subject, content, is_active, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(subject)
        .bind(content)
        .bind(is_active)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await
        .expect("Failed to seed a template.");
        id
    }
}

pub struct SeedRecipient<'a> {
    pub email: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl<'a> SeedRecipient<'a> {
    pub fn active(email: &'a str) -> Self {
        Self {
            email,
            first_name: Some("Ursula"),
            last_name: Some("Le Guin"),
            is_staff: false,
            is_superuser: false,
            is_active: true,
        }
    }

    pub fn staff(email: &'a str) -> Self {
        Self {
            is_staff: true,
            ..Self::active(email)
        }
    }

    pub fn inactive(email: &'a str) -> Self {
        Self {
            is_active: false,
            ..Self::active(email)
        }
    }
}
