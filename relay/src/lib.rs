pub mod amqp;
pub mod audit;
pub mod auth;
pub mod config;
pub mod errors;
pub mod fanout;
pub mod handler;
pub mod metrics_defs;
pub mod request;
pub mod service;

use crate::amqp::AmqpPublisher;
use crate::audit::{AuditStore, PgAuditStore};
use crate::auth::AuthGate;
use crate::config::Config;
use crate::errors::Result;
use crate::handler::RelayApp;
use crate::service::RelayService;
use std::sync::Arc;

/// Connect the broker and the audit store, then serve until shutdown.
///
/// Both connections are established once here and shared by every request;
/// failure to establish either one is fatal.
pub async fn run(config: Config) -> Result<()> {
    metrics_defs::describe_all();

    let publisher = Arc::new(AmqpPublisher::connect(config.amqp_url.as_str()).await?);
    let audit = Arc::new(PgAuditStore::connect(config.database_url.as_str()).await?);
    audit.ensure_schema().await?;

    let app = Arc::new(RelayApp::new(publisher.clone(), audit.clone()));
    let service = RelayService::new(app, AuthGate::new(config.auth));

    tracing::info!(host = %config.listener.host, port = config.listener.port, "relay listening");

    tokio::select! {
        result = shared::http::serve(&config.listener.host, config.listener.port, service) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    publisher.close().await;
    audit.close().await;
    Ok(())
}
