use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::api::ApiError;
use crate::config::AuthConfig;

/// Guards the visitor listing with static API keys
pub struct AuthService {
    api_keys: Vec<String>,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            api_keys: config.admin_api_keys.clone(),
        }
    }

    /// Whether any admin key is configured
    pub fn is_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    pub fn validate_key(&self, key: &str) -> bool {
        // If no API keys are configured the listing is open
        if !self.is_enabled() {
            return true;
        }

        self.api_keys
            .iter()
            .any(|k| bool::from(k.as_bytes().ct_eq(key.as_bytes())))
    }
}

/// Key from `X-API-Key` or `Authorization: Bearer <key>`
fn presented_key(headers: &HeaderMap) -> &str {
    if let Some(key) = headers.get("x-api-key").and_then(|h| h.to_str().ok()) {
        return key.trim();
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or("")
}

pub async fn auth_middleware(
    auth_service: Arc<AuthService>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if auth_service.validate_key(presented_key(&headers)) {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request without a valid API key");
        ApiError::Unauthorized.into_response()
    }
}
