//! Authorization gate
//!
//! A separate entry point from the send path: given a bearer token and a
//! resource identifier, produce an allow/deny decision against the
//! configured allow-list. Pure function of its inputs, no side effects.

use crate::config::AuthConfig;
use hyper::header::{AUTHORIZATION, HeaderMap};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// Decision for one (token, resource) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    pub principal: String,
    pub effect: Effect,
    pub resource: String,
}

/// Token gate over the configured allow-list.
#[derive(Debug, Clone)]
pub struct AuthGate {
    principal: String,
    tokens: Vec<String>,
}

impl AuthGate {
    /// A missing `auth` config section denies everything.
    pub fn new(config: Option<AuthConfig>) -> Self {
        match config {
            Some(config) => Self {
                principal: config.principal,
                tokens: config.tokens,
            },
            None => Self {
                principal: "anonymous".to_string(),
                tokens: Vec::new(),
            },
        }
    }

    pub fn evaluate(&self, token: &str, resource: &str) -> PolicyDecision {
        let allowed = !token.is_empty() && self.tokens.iter().any(|candidate| candidate == token);
        PolicyDecision {
            principal: self.principal.clone(),
            effect: if allowed { Effect::Allow } else { Effect::Deny },
            resource: resource.to_string(),
        }
    }
}

/// Extract a bearer token from the Authorization header. A bare token
/// without the `Bearer ` prefix is accepted as well.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    Some(value.strip_prefix("Bearer ").unwrap_or(value))
}
