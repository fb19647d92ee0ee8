use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    domain::{RecipientSelection, RecipientSummary},
    startup::AppState,
};

/// Server-side cap on how many recipients a preview response carries; the
/// count in the response is always the full total.
pub const PREVIEW_SAMPLE_LIMIT: i64 = 10;

#[derive(Deserialize)]
pub struct PreviewFormData {
    recipient_type: String,
    custom_recipient_ids: String,
    csrf_token: String,
}

#[tracing::instrument(
    name = "Previewing broadcast recipients",
    skip(app_state, form),
    fields(recipient_type = %form.recipient_type)
)]
pub async fn preview_recipients(
    State(app_state): State<Arc<AppState>>,
    Form(form): Form<PreviewFormData>,
) -> Result<impl IntoResponse, PreviewEndpointError> {
    if form.csrf_token != app_state.csrf_token.expose_secret() {
        return Err(PreviewEndpointError::ForgedRequest);
    }

    let selection = RecipientSelection::parse(&form.recipient_type, &form.custom_recipient_ids)
        .map_err(PreviewEndpointError::InvalidSelection)?;

    let count = count_recipients(&app_state.pool, &selection).await?;
    let recipients = sample_recipients(&app_state.pool, &selection, PREVIEW_SAMPLE_LIMIT).await?;

    Ok(Json(json!({
        "success": true,
        "count": count,
        "recipients": recipients,
    })))
}

#[derive(thiserror::Error, Debug)]
pub enum PreviewEndpointError {
    #[error("anti-forgery token mismatch")]
    ForgedRequest,
    #[error("invalid recipient selection, {0}")]
    InvalidSelection(String),
    #[error("couldn't resolve recipients from the database, sqlx error {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl IntoResponse for PreviewEndpointError {
    fn into_response(self) -> Response {
        let status = match &self {
            PreviewEndpointError::ForgedRequest => StatusCode::FORBIDDEN,
            PreviewEndpointError::InvalidSelection(_) => StatusCode::BAD_REQUEST,
            PreviewEndpointError::SqlxError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!("{}", self);
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

/// WHERE clause shared by every query that resolves a selection. Custom
/// selections get one placeholder per id; the caller binds them in the
/// set's iteration order.
pub(crate) fn selection_predicate(selection: &RecipientSelection) -> String {
    let base = "is_active = 1 AND email <> ''";
    match selection {
        RecipientSelection::All => base.to_string(),
        RecipientSelection::StaffOnly => format!("{} AND is_staff = 1", base),
        RecipientSelection::Custom(ids) => {
            let placeholders = vec!["?"; ids.len()].join(", ");
            format!("{} AND id IN ({})", base, placeholders)
        }
    }
}

fn is_empty_custom(selection: &RecipientSelection) -> bool {
    matches!(selection, RecipientSelection::Custom(ids) if ids.is_empty())
}

#[tracing::instrument(name = "Counting matching recipients", skip(pool, selection))]
pub async fn count_recipients(
    pool: &SqlitePool,
    selection: &RecipientSelection,
) -> Result<u64, sqlx::Error> {
    // An empty custom selection means zero recipients, not "everyone".
    if is_empty_custom(selection) {
        return Ok(0);
    }

    let sql = format!(
        "SELECT COUNT(*) FROM users WHERE {}",
        selection_predicate(selection)
    );
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    if let RecipientSelection::Custom(ids) = selection {
        for id in ids {
            query = query.bind(id.to_string());
        }
    }
    let count = query.fetch_one(pool).await?;
    Ok(count as u64)
}

#[tracing::instrument(name = "Sampling matching recipients", skip(pool, selection))]
pub async fn sample_recipients(
    pool: &SqlitePool,
    selection: &RecipientSelection,
    limit: i64,
) -> Result<Vec<RecipientSummary>, sqlx::Error> {
    if is_empty_custom(selection) {
        return Ok(vec![]);
    }

    let sql = format!(
        "SELECT email, first_name, last_name, is_staff, is_superuser \
         FROM users WHERE {} ORDER BY email LIMIT ?",
        selection_predicate(selection)
    );
    let mut query = sqlx::query_as::<_, RecipientSummary>(&sql);
    if let RecipientSelection::Custom(ids) = selection {
        for id in ids {
            query = query.bind(id.to_string());
        }
    }
    query.bind(limit).fetch_all(pool).await
}
