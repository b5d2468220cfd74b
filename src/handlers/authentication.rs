// API key middleware for the gateway
//
// Every request must carry the configured header with the configured secret,
// except requests to public paths (`/health`) and OPTIONS requests, which are
// always allowed to support CORS pre-flight requests.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error, ResponseError,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use log::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::GatewayError;
use crate::metrics::Metrics;

/// Paths served without an API key
pub const PUBLIC_PATHS: [&str; 1] = ["/health"];

/// Middleware factory for the API key check
#[derive(Clone)]
pub struct ApiKeyGate {
    config: AuthConfig,
    metrics: Metrics,
}

impl ApiKeyGate {
    pub fn new(config: AuthConfig, metrics: Metrics) -> Self {
        Self { config, metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        info!(
            "API key check enabled on header '{}'",
            self.config.header_name
        );
        ok(ApiKeyGateMiddleware {
            service,
            config: self.config.clone(),
            metrics: self.metrics.clone(),
        })
    }
}

/// API key middleware implementation
pub struct ApiKeyGateMiddleware<S> {
    service: S,
    config: AuthConfig,
    metrics: Metrics,
}

impl<S, B> Service<ServiceRequest> for ApiKeyGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if req.method() == Method::OPTIONS || PUBLIC_PATHS.contains(&req.path()) {
            debug!("{} {} - bypassing API key check", req.method(), req.path());
            let fut = self.service.call(req);
            return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
        }

        let metrics = self.metrics.clone();

        if let Err(error) = authenticate(&req, &self.config) {
            return Box::pin(async move {
                metrics.record_auth_attempt("failure").await;
                let response = error.error_response();
                Ok(req.into_response(response).map_into_right_body())
            });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            metrics.record_auth_attempt("success").await;
            Ok(fut.await?.map_into_left_body())
        })
    }
}

/// Check the configured header against the configured secret
fn authenticate(req: &ServiceRequest, config: &AuthConfig) -> Result<(), GatewayError> {
    let Some(value) = req.headers().get(config.header_name.as_str()) else {
        warn!(
            "Missing {} header on {} {}",
            config.header_name,
            req.method(),
            req.path()
        );
        return Err(GatewayError::Forbidden);
    };

    if constant_time_compare(value.as_bytes(), config.api_key.as_bytes()) {
        Ok(())
    } else {
        warn!(
            "Invalid API key presented on {} {}",
            req.method(),
            req.path()
        );
        Err(GatewayError::Forbidden)
    }
}

/// Byte comparison whose duration does not depend on where the inputs differ
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"secret", b"secret"));
        assert!(!constant_time_compare(b"secret", b"secreT"));
        assert!(!constant_time_compare(b"secret", b"secret!"));
        assert!(!constant_time_compare(b"", b"secret"));
        assert!(constant_time_compare(b"", b""));
    }
}
