use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::domain::RecipientSelection;
use crate::preview::client::{PreviewClient, PreviewError};
use crate::preview::view::PreviewViewState;

/// What the preview surface shows whenever a round-trip fails, regardless of
/// how it failed.
pub const PREVIEW_UNAVAILABLE: &str = "Error loading recipient preview";

/// Owns the preview surface: publishes a stream of view states over a watch
/// channel and refreshes them against the preview endpoint.
///
/// Overlapping refreshes are resolved by request token. Every refresh takes
/// the next token; only the holder of the latest-issued token may publish,
/// so a response arriving for a superseded request is dropped instead of
/// overwriting a newer render.
pub struct RecipientPreviewController {
    client: PreviewClient,
    issued: AtomicU64,
    state: watch::Sender<PreviewViewState>,
}

impl RecipientPreviewController {
    pub fn new(client: PreviewClient) -> Self {
        let (state, _) = watch::channel(PreviewViewState::Loading);
        Self {
            client,
            issued: AtomicU64::new(0),
            state,
        }
    }

    /// A live view of the surface; observers see every published state.
    pub fn subscribe(&self) -> watch::Receiver<PreviewViewState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> PreviewViewState {
        self.state.borrow().clone()
    }

    #[tracing::instrument(
        name = "Refreshing the recipient preview",
        skip(self, selection),
        fields(recipient_type = %selection.recipient_type())
    )]
    pub async fn refresh(&self, selection: RecipientSelection) {
        let token = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        // The loading placeholder goes up before the request suspends.
        self.publish_if_latest(token, PreviewViewState::Loading);

        let next = match self.client.preview_recipients(&selection).await {
            Ok(result) => PreviewViewState::Success(result),
            Err(error) => {
                match &error {
                    PreviewError::Network(source) => {
                        tracing::error!(%source, "preview request failed in transit");
                    }
                    PreviewError::Protocol(detail) => {
                        tracing::error!(%detail, "preview response was malformed");
                    }
                    PreviewError::Domain(message) => {
                        tracing::warn!(%message, "preview rejected by the server");
                    }
                }
                PreviewViewState::Error(PREVIEW_UNAVAILABLE.to_string())
            }
        };
        self.publish_if_latest(token, next);
    }

    fn publish_if_latest(&self, token: u64, next: PreviewViewState) {
        if self.issued.load(Ordering::SeqCst) == token {
            self.state.send_replace(next);
        }
    }
}
