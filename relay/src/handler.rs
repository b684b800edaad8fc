use crate::audit::AuditStore;
use crate::errors::{RelayError, Result, error_chain};
use crate::fanout::{BatchResult, Publisher, fan_out};
use crate::metrics_defs::AUDIT_WRITE_FAILURES;
use crate::request::PublishRequest;
use serde::Serialize;
use std::sync::Arc;

/// Response envelope returned for every send request.
///
/// Logical failure is carried inside the body; the transport status stays
/// 200 either way.
#[derive(Debug, Serialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl ResponseEnvelope {
    pub fn ok(result: BatchResult) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            traceback: None,
        }
    }

    pub fn failure(error: &RelayError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(format!("{}: {}", error.class(), error)),
            traceback: Some(error_chain(error)),
        }
    }
}

/// Orchestrates one send request: validate, fan out, record the audit
/// trail, summarize.
pub struct RelayApp {
    publisher: Arc<dyn Publisher>,
    audit: Arc<dyn AuditStore>,
}

impl RelayApp {
    pub fn new(publisher: Arc<dyn Publisher>, audit: Arc<dyn AuditStore>) -> Self {
        Self { publisher, audit }
    }

    /// Process one raw request body into a response envelope.
    ///
    /// Whatever happens, the caller gets a well-formed envelope.
    pub async fn send_messages(&self, body: &[u8]) -> ResponseEnvelope {
        match self.try_send(body).await {
            Ok(result) => ResponseEnvelope::ok(result),
            Err(error) => {
                tracing::error!(error = %error, "failed to process send request");
                ResponseEnvelope::failure(&error)
            }
        }
    }

    async fn try_send(&self, body: &[u8]) -> Result<BatchResult> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|error| RelayError::MalformedBody(error.to_string()))?;
        let request = PublishRequest::parse(&value)?;

        let report = fan_out(self.publisher.as_ref(), &request).await;

        // Best effort. A lost audit batch is logged and dropped; the
        // publish counts are already final.
        if !report.outcomes.is_empty() {
            if let Err(error) = self.audit.append(&report.outcomes).await {
                metrics::counter!(AUDIT_WRITE_FAILURES.name).increment(1);
                tracing::error!(error = %error, "failed to record delivery audit rows, dropping batch");
            }
        }

        Ok(report.summary())
    }

    pub async fn healthcheck(&self) -> bool {
        self.publisher.healthcheck().await.is_ok() && self.audit.healthcheck().await.is_ok()
    }
}
