//! Concrete `AuditSink`: the opaque audit RPC (§6 `logAuthEvent`), consumed
//! over HTTP. Failures are logged and swallowed (§4.7) — the trait's
//! `Result<(), String>` return is for logging and metrics, never propagated.

use async_trait::async_trait;
use notification_common::audit::{AuditEvent, AuditSink};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LogAuthEventResponse {
    #[allow(dead_code)]
    success: bool,
    #[allow(dead_code)]
    event_id: String,
    #[allow(dead_code)]
    message: String,
}

pub struct HttpAuditSink {
    service_url: String,
    http: reqwest::Client,
}

impl HttpAuditSink {
    pub fn new(service_url: String, http: reqwest::Client) -> Self {
        HttpAuditSink { service_url, http }
    }

    fn is_configured(&self) -> bool {
        !self.service_url.is_empty()
    }
}

#[async_trait]
impl AuditSink for HttpAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), String> {
        if !self.is_configured() {
            return Err("audit sink not configured".to_string());
        }
        self.http
            .post(format!("{}/logAuthEvent", self.service_url))
            .json(&event)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json::<LogAuthEventResponse>()
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Swallows `AuditSink` failures behind a log line (§4.7 failure policy), so
/// `DispatchService` never has to know about the sink's error type.
pub async fn record_and_swallow(sink: &dyn AuditSink, event: AuditEvent) {
    if let Err(e) = sink.record(event).await {
        warn!("audit event delivery failed: {}", e);
    }
}
