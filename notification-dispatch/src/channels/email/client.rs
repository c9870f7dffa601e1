//! The opaque email-rendering RPC (§6: `sendEmail`), consumed over HTTP.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SendEmailRequest {
    pub tenant_id: String,
    pub account_id: String,
    pub to_email: String,
    pub template: String,
    pub locale: String,
    pub variables: HashMap<String, String>,
    pub source_service: String,
    pub from_email: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailResponse {
    pub success: bool,
    pub email_log_id: String,
    pub message: String,
}

pub struct EmailClient {
    http: reqwest::Client,
}

impl EmailClient {
    pub fn new(http: reqwest::Client) -> Self {
        EmailClient { http }
    }

    pub async fn send_email(
        &self,
        service_url: &str,
        request: &SendEmailRequest,
    ) -> Result<SendEmailResponse, reqwest::Error> {
        self.http
            .post(format!("{service_url}/sendEmail"))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<SendEmailResponse>()
            .await
    }
}
