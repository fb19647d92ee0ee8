use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use reqwest::StatusCode;
use rinja_axum::Template;
use secrecy::ExposeSecret;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    domain::{RecipientEmail, RecipientSelection, SubjectLine},
    email_client::EmailClient,
    routes::preview_recipients::selection_predicate,
    startup::AppState,
};

#[derive(Deserialize)]
pub struct BroadcastFormData {
    subject: String,
    content: String,
    recipient_type: String,
    custom_recipient_ids: String,
    csrf_token: String,
}

/// A recipient the selection resolved to, with just enough to deliver and
/// log.
#[derive(Debug, sqlx::FromRow)]
pub struct RecipientContact {
    pub id: String,
    pub email: String,
}

#[derive(Template)]
#[template(path = "broadcast_result.html")]
struct BroadcastResultTemplate {
    subject: String,
    total_recipients: usize,
    successful_sends: i64,
    failed_sends: i64,
}

#[tracing::instrument(
    name = "Sending a broadcast",
    skip(app_state, form),
    fields(recipient_type = %form.recipient_type)
)]
pub async fn send_broadcast(
    State(app_state): State<Arc<AppState>>,
    Form(form): Form<BroadcastFormData>,
) -> Result<impl IntoResponse, BroadcastError> {
    if form.csrf_token != app_state.csrf_token.expose_secret() {
        return Err(BroadcastError::ForgedRequest);
    }

    let subject = SubjectLine::parse(form.subject).map_err(BroadcastError::InvalidSubject)?;
    if form.content.trim().is_empty() {
        return Err(BroadcastError::EmptyContent);
    }

    let selection = RecipientSelection::parse(&form.recipient_type, &form.custom_recipient_ids)
        .map_err(BroadcastError::InvalidSelection)?;
    let recipients = resolve_recipients(&app_state.pool, &selection).await?;

    // The form-level guard: a custom selection must name someone.
    if recipients.is_empty() && matches!(selection, RecipientSelection::Custom(_)) {
        return Err(BroadcastError::NoRecipientsSelected);
    }

    let broadcast_id =
        insert_broadcast(&app_state.pool, &subject, &form.content, recipients.len()).await?;

    let mut successful_sends = 0;
    let mut failed_sends = 0;
    for recipient in &recipients {
        match deliver(&app_state.email_client, recipient, &subject, &form.content).await {
            Ok(()) => {
                record_delivery(&app_state.pool, broadcast_id, recipient, "sent", None).await?;
                successful_sends += 1;
            }
            Err(reason) => {
                tracing::error!(email = %recipient.email, %reason, "failed to deliver to recipient");
                record_delivery(
                    &app_state.pool,
                    broadcast_id,
                    recipient,
                    "failed",
                    Some(reason.as_str()),
                )
                .await?;
                failed_sends += 1;
            }
        }
    }

    let status = if failed_sends == 0 { "sent" } else { "failed" };
    finalize_broadcast(
        &app_state.pool,
        broadcast_id,
        status,
        successful_sends,
        failed_sends,
    )
    .await?;

    Ok(Html(
        BroadcastResultTemplate {
            subject: subject.as_ref().to_owned(),
            total_recipients: recipients.len(),
            successful_sends,
            failed_sends,
        }
        .render()
        .unwrap(),
    ))
}

/// One delivery attempt. A stored email that no longer parses is a failure
/// without ever reaching the delivery API.
async fn deliver(
    email_client: &EmailClient,
    recipient: &RecipientContact,
    subject: &SubjectLine,
    content: &str,
) -> Result<(), String> {
    let email = RecipientEmail::parse(recipient.email.clone())?;
    email_client
        .send_email(&email, subject.as_ref(), content, "")
        .await
        .map_err(|e| e.to_string())
}

#[derive(thiserror::Error, Debug)]
pub enum BroadcastError {
    #[error("anti-forgery token mismatch")]
    ForgedRequest,
    #[error("invalid broadcast subject, {0}")]
    InvalidSubject(String),
    #[error("broadcast content is empty")]
    EmptyContent,
    #[error("invalid recipient selection, {0}")]
    InvalidSelection(String),
    #[error("a custom selection must name at least one recipient")]
    NoRecipientsSelected,
    #[error("couldn't persist the broadcast, sqlx error {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl IntoResponse for BroadcastError {
    fn into_response(self) -> Response {
        match self {
            BroadcastError::ForgedRequest => {
                tracing::error!("{}", BroadcastError::ForgedRequest);
                StatusCode::FORBIDDEN.into_response()
            }
            BroadcastError::NoRecipientsSelected => {
                tracing::error!("{}", BroadcastError::NoRecipientsSelected);
                let html = "<p>Please select at least one recipient for custom sending.</p>";
                (StatusCode::BAD_REQUEST, Html(html)).into_response()
            }
            BroadcastError::SqlxError(e) => {
                tracing::error!("{}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            other => {
                tracing::error!("{}", other);
                StatusCode::BAD_REQUEST.into_response()
            }
        }
    }
}

#[tracing::instrument(name = "Resolving the full recipient list", skip(pool, selection))]
pub async fn resolve_recipients(
    pool: &SqlitePool,
    selection: &RecipientSelection,
) -> Result<Vec<RecipientContact>, sqlx::Error> {
    if let RecipientSelection::Custom(ids) = selection {
        if ids.is_empty() {
            return Ok(vec![]);
        }
    }

    let sql = format!(
        "SELECT id, email FROM users WHERE {} ORDER BY email",
        selection_predicate(selection)
    );
    let mut query = sqlx::query_as::<_, RecipientContact>(&sql);
    if let RecipientSelection::Custom(ids) = selection {
        for id in ids {
            query = query.bind(id.to_string());
        }
    }
    query.fetch_all(pool).await
}

#[tracing::instrument(name = "Recording a new broadcast", skip(pool, subject, content))]
async fn insert_broadcast(
    pool: &SqlitePool,
    subject: &SubjectLine,
    content: &str,
    total_recipients: usize,
) -> Result<Uuid, sqlx::Error> {
    let broadcast_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO broadcasts (id, subject, content, status, created_at, total_recipients) \
         VALUES (?, ?, ?, 'sending', ?, ?)",
    )
    .bind(broadcast_id.to_string())
    .bind(subject.as_ref())
    .bind(content)
    .bind(Utc::now())
    .bind(total_recipients as i64)
    .execute(pool)
    .await?;
    Ok(broadcast_id)
}

#[tracing::instrument(
    name = "Recording a delivery attempt",
    skip(pool, broadcast_id, recipient, error_message)
)]
async fn record_delivery(
    pool: &SqlitePool,
    broadcast_id: Uuid,
    recipient: &RecipientContact,
    status: &str,
    error_message: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO broadcast_logs (id, broadcast_id, recipient_id, status, error_message, sent_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(broadcast_id.to_string())
    .bind(&recipient.id)
    .bind(status)
    .bind(error_message)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

#[tracing::instrument(name = "Finalizing the broadcast record", skip(pool, broadcast_id))]
async fn finalize_broadcast(
    pool: &SqlitePool,
    broadcast_id: Uuid,
    status: &str,
    successful_sends: i64,
    failed_sends: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE broadcasts \
         SET status = ?, successful_sends = ?, failed_sends = ?, sent_at = ? \
         WHERE id = ?",
    )
    .bind(status)
    .bind(successful_sends)
    .bind(failed_sends)
    .bind(Utc::now())
    .bind(broadcast_id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}
