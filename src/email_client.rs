use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::RecipientEmail;

/// Thin client for the external delivery API. One POST per recipient; the
/// broadcast loop decides what to do with failures.
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: RecipientEmail,
    authorization_token: SecretString,
}

impl EmailClient {
    pub fn new(
        sender: RecipientEmail,
        base_url: String,
        authorization_token: SecretString,
        timeout: std::time::Duration,
    ) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            base_url,
            sender,
            authorization_token,
        }
    }

    #[tracing::instrument(
        name = "Sending an email through the delivery API",
        skip(self, html_body, text_body),
        fields(recipient = %recipient)
    )]
    pub async fn send_email(
        &self,
        recipient: &RecipientEmail,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), reqwest::Error> {
        let url = format!("{}/email", self.base_url);
        let request_body = SendEmailRequest {
            from: self.sender.as_ref(),
            to: recipient.as_ref(),
            subject,
            html_body,
            text_body,
        };
        self.http_client
            .post(&url)
            .header(
                "X-Server-Token",
                self.authorization_token.expose_secret(),
            )
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}
