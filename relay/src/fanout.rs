//! Fan-out publishing
//!
//! One request carries one payload and N routing keys. The fan-out walks the
//! keys in input order and attempts an independent publish per key against
//! the default exchange. Attempts are isolated: a failed publish becomes a
//! failed outcome and the batch continues.
//!
//! Attempts run sequentially: the process shares a single broker channel
//! across requests, and a channel is not safe for interleaved use.

use crate::errors::{PublishError, error_chain};
use crate::metrics_defs::PUBLISH_OUTCOMES;
use crate::request::PublishRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Broker publish capability: deliver one body under a routing key.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), PublishError>;

    /// Cheap liveness probe of the underlying connection.
    async fn healthcheck(&self) -> Result<(), PublishError>;
}

/// Record of one delivery attempt, durable once the audit recorder stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub ts: DateTime<Utc>,
    pub payload: String,
    pub routing_key: String,
    pub success: bool,
    /// Rendered error chain, present iff the attempt failed.
    pub error: Option<String>,
}

impl DeliveryOutcome {
    fn delivered(payload: String, routing_key: String) -> Self {
        Self {
            ts: Utc::now(),
            payload,
            routing_key,
            success: true,
            error: None,
        }
    }

    fn failed(payload: String, routing_key: String, error: &PublishError) -> Self {
        Self {
            ts: Utc::now(),
            payload,
            routing_key,
            success: false,
            error: Some(error_chain(error)),
        }
    }
}

/// Ordered outcomes of one fan-out pass plus the running counts.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
    pub success_count: u64,
    pub failed_count: u64,
}

impl DeliveryReport {
    /// Reduce the report to the caller-facing counts.
    pub fn summary(&self) -> BatchResult {
        BatchResult {
            success_count: self.success_count,
            failed_count: self.failed_count,
        }
    }
}

/// Per-request result summary returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub success_count: u64,
    pub failed_count: u64,
}

/// Publish the payload to every routing key in input order.
///
/// Produces exactly one outcome per attempt. Duplicate keys are attempted
/// independently; an empty key list is a valid zero-outcome batch.
pub async fn fan_out(publisher: &dyn Publisher, request: &PublishRequest) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for routing_key in &request.routing_keys {
        match publisher
            .publish(routing_key, request.payload.as_bytes())
            .await
        {
            Ok(()) => {
                report.success_count += 1;
                report
                    .outcomes
                    .push(DeliveryOutcome::delivered(request.payload.clone(), routing_key.clone()));
                metrics::counter!(PUBLISH_OUTCOMES.name, "outcome" => "success").increment(1);
            }
            Err(error) => {
                tracing::error!(routing_key = %routing_key, error = %error, "failed to publish message");
                report.failed_count += 1;
                report.outcomes.push(DeliveryOutcome::failed(
                    request.payload.clone(),
                    routing_key.clone(),
                    &error,
                ));
                metrics::counter!(PUBLISH_OUTCOMES.name, "outcome" => "failure").increment(1);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct FlakyPublisher {
        fail_keys: HashSet<String>,
        attempts: Mutex<Vec<String>>,
    }

    impl FlakyPublisher {
        fn failing_on(keys: &[&str]) -> Self {
            Self {
                fail_keys: keys.iter().map(|key| key.to_string()).collect(),
                attempts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Publisher for FlakyPublisher {
        async fn publish(&self, routing_key: &str, _body: &[u8]) -> Result<(), PublishError> {
            self.attempts.lock().unwrap().push(routing_key.to_string());
            if self.fail_keys.contains(routing_key) {
                Err(PublishError::Unavailable(format!("queue {routing_key} is gone")))
            } else {
                Ok(())
            }
        }

        async fn healthcheck(&self) -> Result<(), PublishError> {
            Ok(())
        }
    }

    fn request(keys: &[&str]) -> PublishRequest {
        PublishRequest {
            payload: "any_string".to_string(),
            routing_keys: keys.iter().map(|key| key.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_counts_cover_every_key() {
        let publisher = FlakyPublisher::failing_on(&["bad"]);

        let report = fan_out(&publisher, &request(&["a", "bad", "b"])).await;

        assert_eq!(report.success_count, 2);
        assert_eq!(report.failed_count, 1);
        assert_eq!(
            report.success_count + report.failed_count,
            report.outcomes.len() as u64
        );
    }

    #[tokio::test]
    async fn test_outcomes_keep_input_order() {
        let publisher = FlakyPublisher::failing_on(&["b"]);

        let report = fan_out(&publisher, &request(&["a", "b", "c"])).await;

        let keys: Vec<_> = report
            .outcomes
            .iter()
            .map(|outcome| outcome.routing_key.as_str())
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let publisher = FlakyPublisher::failing_on(&["a"]);

        let report = fan_out(&publisher, &request(&["a", "b"])).await;

        assert_eq!(*publisher.attempts.lock().unwrap(), vec!["a", "b"]);
        assert!(!report.outcomes[0].success);
        assert!(report.outcomes[1].success);
    }

    #[tokio::test]
    async fn test_failed_outcome_carries_diagnostic() {
        let publisher = FlakyPublisher::failing_on(&["bad"]);

        let report = fan_out(&publisher, &request(&["bad", "good"])).await;

        let diagnostic = report.outcomes[0].error.as_deref().unwrap();
        assert!(diagnostic.contains("queue bad is gone"));
        assert!(report.outcomes[1].error.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_keys_attempted_independently() {
        let publisher = FlakyPublisher::failing_on(&[]);

        let report = fan_out(&publisher, &request(&["k", "k"])).await;

        assert_eq!(*publisher.attempts.lock().unwrap(), vec!["k", "k"]);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.success_count, 2);
    }

    #[tokio::test]
    async fn test_empty_key_list_is_a_valid_batch() {
        let publisher = FlakyPublisher::failing_on(&[]);

        let report = fan_out(&publisher, &request(&[])).await;

        assert!(report.outcomes.is_empty());
        assert_eq!(report.summary(), BatchResult { success_count: 0, failed_count: 0 });
    }
}
