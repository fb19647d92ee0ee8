use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{PreviewResult, RecipientSelection, RecipientSummary};

/// Client side of the recipient-preview wire contract: a form-encoded POST
/// carrying the selection plus the anti-forgery token, answered with a
/// `{success, count, recipients, error}` JSON body.
pub struct PreviewClient {
    http_client: Client,
    base_url: String,
    csrf_token: SecretString,
}

/// Everything that can go wrong during a preview round-trip. All variants
/// collapse to the same user-visible rendering; they differ only in the
/// diagnostic that gets logged.
#[derive(thiserror::Error, Debug)]
pub enum PreviewError {
    #[error("preview request could not complete, {0}")]
    Network(#[source] reqwest::Error),
    #[error("malformed preview response, {0}")]
    Protocol(String),
    #[error("preview rejected by the server, {0}")]
    Domain(String),
}

/// Subject and body of a stored email template, as served by the
/// template-loading endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContent {
    pub subject: String,
    pub content: String,
}

#[derive(Deserialize)]
struct PreviewResponseBody {
    success: bool,
    count: Option<u64>,
    recipients: Option<Vec<RecipientSummary>>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct TemplateResponseBody {
    success: bool,
    subject: Option<String>,
    content: Option<String>,
    error: Option<String>,
}

impl PreviewClient {
    pub fn new(base_url: String, csrf_token: SecretString, timeout: std::time::Duration) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            base_url,
            csrf_token,
        }
    }

    #[tracing::instrument(
        name = "Requesting a recipient preview",
        skip(self, selection),
        fields(recipient_type = %selection.recipient_type())
    )]
    pub async fn preview_recipients(
        &self,
        selection: &RecipientSelection,
    ) -> Result<PreviewResult, PreviewError> {
        let url = format!("{}/admin/emails/preview-recipients", self.base_url);
        let form = [
            ("recipient_type", selection.recipient_type().to_string()),
            ("custom_recipient_ids", selection.custom_recipient_ids()),
            ("csrf_token", self.csrf_token.expose_secret().to_string()),
        ];

        let response = self
            .http_client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(PreviewError::Network)?;
        let bytes = response.bytes().await.map_err(PreviewError::Network)?;

        let body: PreviewResponseBody = serde_json::from_slice(&bytes)
            .map_err(|e| PreviewError::Protocol(e.to_string()))?;
        if !body.success {
            return Err(PreviewError::Domain(
                body.error
                    .unwrap_or_else(|| "no error message supplied".to_string()),
            ));
        }

        let count = body
            .count
            .ok_or_else(|| PreviewError::Protocol("count is missing".to_string()))?;
        let sample = body
            .recipients
            .ok_or_else(|| PreviewError::Protocol("recipients are missing".to_string()))?;
        if sample.len() as u64 > count {
            return Err(PreviewError::Protocol(format!(
                "a sample of {} exceeds the reported count of {}",
                sample.len(),
                count
            )));
        }

        Ok(PreviewResult { count, sample })
    }

    #[tracing::instrument(name = "Loading an email template", skip(self))]
    pub async fn load_template(&self, template_id: Uuid) -> Result<TemplateContent, PreviewError> {
        let url = format!("{}/admin/emails/load-template/{}", self.base_url, template_id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(PreviewError::Network)?;
        let bytes = response.bytes().await.map_err(PreviewError::Network)?;

        let body: TemplateResponseBody = serde_json::from_slice(&bytes)
            .map_err(|e| PreviewError::Protocol(e.to_string()))?;
        if !body.success {
            return Err(PreviewError::Domain(
                body.error
                    .unwrap_or_else(|| "no error message supplied".to_string()),
            ));
        }

        Ok(TemplateContent {
            subject: body
                .subject
                .ok_or_else(|| PreviewError::Protocol("subject is missing".to_string()))?,
            content: body
                .content
                .ok_or_else(|| PreviewError::Protocol("content is missing".to_string()))?,
        })
    }
}
