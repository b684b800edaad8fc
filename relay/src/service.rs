use crate::auth::{AuthGate, bearer_token};
use crate::errors::RelayError;
use crate::handler::{RelayApp, ResponseEnvelope};
use crate::metrics_defs::REQUEST_DURATION;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::http::text_response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

type ServiceBody = BoxBody<Bytes, RelayError>;

/// Hyper service exposing the relay endpoints.
#[derive(Clone)]
pub struct RelayService {
    app: Arc<RelayApp>,
    gate: Arc<AuthGate>,
}

impl RelayService {
    pub fn new(app: Arc<RelayApp>, gate: AuthGate) -> Self {
        Self {
            app,
            gate: Arc::new(gate),
        }
    }
}

impl Service<Request<Incoming>> for RelayService {
    type Response = Response<ServiceBody>;
    type Error = RelayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let app = self.app.clone();
        let gate = self.gate.clone();

        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            let response = match (method, path.as_str()) {
                (Method::POST, "/api/messages") => send_messages(&app, request).await,
                (Method::GET, "/api/auth") => authorize(&gate, &request),
                (Method::GET, "/health") => health(&app).await,
                _ => {
                    tracing::warn!(path = %path, "no route matched");
                    text_response(StatusCode::NOT_FOUND, "no route matched\n")
                }
            };

            Ok(response)
        })
    }
}

async fn send_messages(app: &RelayApp, request: Request<Incoming>) -> Response<ServiceBody> {
    let started = Instant::now();

    let envelope = match request.into_body().collect().await {
        Ok(collected) => app.send_messages(&collected.to_bytes()).await,
        Err(error) => {
            tracing::error!(error = %error, "failed to read request body");
            ResponseEnvelope::failure(&RelayError::RequestBody(error.to_string()))
        }
    };

    let status = if envelope.success { "success" } else { "failure" };
    metrics::histogram!(REQUEST_DURATION.name, "status" => status)
        .record(started.elapsed().as_secs_f64());

    // Transport status is 200 for logical failures as well; the outcome is
    // carried in the envelope body.
    json_response(&envelope)
}

fn authorize(gate: &AuthGate, request: &Request<Incoming>) -> Response<ServiceBody> {
    let Some(resource) = resource_param(request.uri().query()) else {
        return text_response(StatusCode::BAD_REQUEST, "missing resource parameter\n");
    };

    let token = bearer_token(request.headers()).unwrap_or("");
    json_response(&gate.evaluate(token, &resource))
}

async fn health(app: &RelayApp) -> Response<ServiceBody> {
    if app.healthcheck().await {
        text_response(StatusCode::OK, "ok\n")
    } else {
        text_response(StatusCode::SERVICE_UNAVAILABLE, "unavailable\n")
    }
}

fn resource_param(query: Option<&str>) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name.as_ref() == "resource")
        .map(|(_, value)| value.into_owned())
}

fn json_response<T: serde::Serialize>(value: &T) -> Response<ServiceBody> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response =
                Response::new(Full::new(Bytes::from(body)).map_err(|e| match e {}).boxed());
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(error) => {
            tracing::error!(error = %error, "failed to serialize response body");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_param() {
        assert_eq!(
            resource_param(Some("resource=send-messages&foo=bar")),
            Some("send-messages".to_string())
        );
        assert_eq!(
            resource_param(Some("resource=a%2Fb")),
            Some("a/b".to_string())
        );
        assert_eq!(resource_param(Some("foo=bar")), None);
        assert_eq!(resource_param(None), None);
    }

    #[tokio::test]
    async fn test_json_response_sets_content_type() {
        let response = json_response(&serde_json::json!({"success": true}));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), br#"{"success":true}"#);
    }
}
