use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use reqwest::StatusCode;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::startup::AppState;

#[derive(sqlx::FromRow)]
pub struct StoredTemplate {
    pub subject: String,
    pub content: String,
}

#[tracing::instrument(name = "Loading a stored email template", skip(app_state))]
pub async fn load_template(
    State(app_state): State<Arc<AppState>>,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, TemplateError> {
    let template = get_template(&app_state.pool, template_id)
        .await?
        .ok_or(TemplateError::TemplateNotFound)?;

    Ok(Json(json!({
        "success": true,
        "subject": template.subject,
        "content": template.content,
    })))
}

#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("email template not found")]
    TemplateNotFound,
    #[error("couldn't load the email template, sqlx error {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl IntoResponse for TemplateError {
    fn into_response(self) -> Response {
        let status = match &self {
            TemplateError::TemplateNotFound => StatusCode::NOT_FOUND,
            TemplateError::SqlxError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!("{}", self);
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

#[tracing::instrument(name = "Fetching an active template by id", skip(pool))]
pub async fn get_template(
    pool: &SqlitePool,
    template_id: Uuid,
) -> Result<Option<StoredTemplate>, sqlx::Error> {
    sqlx::query_as::<_, StoredTemplate>(
        "SELECT subject, content FROM email_templates WHERE id = ? AND is_active = 1",
    )
    .bind(template_id.to_string())
    .fetch_optional(pool)
    .await
}
