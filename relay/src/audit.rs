//! Delivery audit trail
//!
//! Every fan-out attempt leaves one row in the `events` table, written as a
//! single batched insert per request. The write is best-effort: the publish
//! counts are already final when it happens, and a lost batch is an accepted
//! observability gap, not a delivery failure.

use crate::errors::AuditError;
use crate::fanout::DeliveryOutcome;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

const CREATE_EVENTS_TABLE: &str = "\
create table if not exists events (
    ts timestamptz,
    payload text,
    queue text,
    success boolean,
    error text
)";

/// Durable store for delivery audit rows.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Create the audit table if it does not exist yet. Idempotent.
    async fn ensure_schema(&self) -> Result<(), AuditError>;

    /// Append one row per outcome, all in one batched statement.
    async fn append(&self, outcomes: &[DeliveryOutcome]) -> Result<(), AuditError>;

    async fn healthcheck(&self) -> Result<(), AuditError>;
}

/// PostgreSQL-backed audit store over a shared connection pool.
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub async fn connect(url: &str) -> Result<Self, AuditError> {
        let pool = PgPoolOptions::new().max_connections(4).connect(url).await?;
        tracing::info!("audit store connection established");
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn ensure_schema(&self) -> Result<(), AuditError> {
        sqlx::query(CREATE_EVENTS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn append(&self, outcomes: &[DeliveryOutcome]) -> Result<(), AuditError> {
        if outcomes.is_empty() {
            return Ok(());
        }

        let mut insert: QueryBuilder<Postgres> =
            QueryBuilder::new("insert into events (ts, payload, queue, success, error) ");
        insert.push_values(outcomes, |mut row, outcome| {
            row.push_bind(outcome.ts)
                .push_bind(&outcome.payload)
                .push_bind(&outcome.routing_key)
                .push_bind(outcome.success)
                .push_bind(&outcome.error);
        });
        insert.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn healthcheck(&self) -> Result<(), AuditError> {
        sqlx::query("select 1").execute(&self.pool).await?;
        Ok(())
    }
}
