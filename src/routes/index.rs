use std::sync::Arc;

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use rinja_axum::Template;
use sqlx::SqlitePool;

use crate::{
    domain::{PreviewResult, RecipientSelection},
    preview::{PreviewViewState, render_preview},
    routes::preview_recipients::{
        PREVIEW_SAMPLE_LIMIT, PreviewEndpointError, count_recipients, sample_recipients,
    },
    startup::AppState,
};

#[derive(sqlx::FromRow)]
struct TemplateOption {
    id: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct RecipientOption {
    id: String,
    email: String,
}

#[derive(Template)]
#[template(path = "broadcast_form.html")]
struct BroadcastFormTemplate {
    title: String,
    recipients: Vec<RecipientOption>,
    templates: Vec<TemplateOption>,
    preview_html: String,
}

/// The compose page. The preview surface starts out filled for the default
/// "all" selection, mirroring the refresh that fires when the form loads.
#[tracing::instrument(name = "Rendering the broadcast form", skip(app_state))]
pub async fn broadcast_form(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, PreviewEndpointError> {
    let recipients = sqlx::query_as::<_, RecipientOption>(
        "SELECT id, email FROM users WHERE is_active = 1 AND email <> '' ORDER BY email",
    )
    .fetch_all(&app_state.pool)
    .await?;
    let templates = list_active_templates(&app_state.pool).await?;

    let selection = RecipientSelection::All;
    let initial_preview = PreviewResult {
        count: count_recipients(&app_state.pool, &selection).await?,
        sample: sample_recipients(&app_state.pool, &selection, PREVIEW_SAMPLE_LIMIT).await?,
    };

    let template = BroadcastFormTemplate {
        title: String::from("New email broadcast"),
        recipients,
        templates,
        preview_html: render_preview(&PreviewViewState::Success(initial_preview)),
    };
    Ok(Html(template.render().unwrap()))
}

async fn list_active_templates(pool: &SqlitePool) -> Result<Vec<TemplateOption>, sqlx::Error> {
    sqlx::query_as::<_, TemplateOption>(
        "SELECT id, name FROM email_templates WHERE is_active = 1 ORDER BY name",
    )
    .fetch_all(pool)
    .await
}
