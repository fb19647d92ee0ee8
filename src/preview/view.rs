use rinja_axum::Template;

use crate::domain::PreviewResult;

/// What the preview surface should currently show. The controller publishes
/// these; rendering is a pure function of the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewViewState {
    Loading,
    Success(PreviewResult),
    Error(String),
}

#[derive(Template)]
#[template(path = "preview_loading.html")]
struct PreviewLoadingTemplate;

#[derive(Template)]
#[template(path = "preview_result.html")]
struct PreviewResultTemplate<'a> {
    result: &'a PreviewResult,
}

#[derive(Template)]
#[template(path = "preview_error.html")]
struct PreviewErrorTemplate<'a> {
    message: &'a str,
}

/// Binds a view state to its HTML fragment.
pub fn render_preview(state: &PreviewViewState) -> String {
    match state {
        PreviewViewState::Loading => PreviewLoadingTemplate.render().unwrap(),
        PreviewViewState::Success(result) => PreviewResultTemplate { result }.render().unwrap(),
        PreviewViewState::Error(message) => PreviewErrorTemplate { message }.render().unwrap(),
    }
}
