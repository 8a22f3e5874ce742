//! Envelope response format for all API responses.
//!
//! Every response is wrapped in a consistent envelope:
//! ```json
//! {
//!   "data": { ... },
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 },
//!   "errors": [],
//!   "_links": { "self": "..." }
//! }
//! ```

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Envelope response wrapping all API data.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// The main response payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Request metadata.
    pub meta: ApiMeta,

    /// Error list (empty on success).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorDetail>,

    /// HATEOAS-style links for discoverability.
    #[serde(rename = "_links", skip_serializing_if = "HashMap::is_empty")]
    pub links: HashMap<String, String>,
}

/// Metadata included in every response.
#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Unique request identifier for tracing.
    pub request_id: String,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
}

/// Individual error detail.
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response with data.
    pub fn success(data: T, request_id: String, response_time_ms: u64) -> Self {
        Self {
            data: Some(data),
            meta: ApiMeta {
                request_id,
                timestamp: chrono::Utc::now().to_rfc3339(),
                response_time_ms,
            },
            errors: Vec::new(),
            links: HashMap::new(),
        }
    }

    /// Add a HATEOAS link.
    pub fn with_link(mut self, rel: &str, href: &str) -> Self {
        self.links.insert(rel.to_string(), href.to_string());
        self
    }
}

impl ApiResponse<()> {
    /// Create an error response (no data).
    pub fn error(code: &str, message: &str, request_id: String) -> Self {
        Self {
            data: None,
            meta: ApiMeta {
                request_id,
                timestamp: chrono::Utc::now().to_rfc3339(),
                response_time_ms: 0,
            },
            errors: vec![ApiErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            }],
            links: HashMap::new(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = if self.errors.is_empty() {
            StatusCode::OK
        } else {
            // Derive status code from the error code string
            match self.errors[0].code.as_str() {
                "SESSION_NOT_FOUND" | "NOT_FOUND" => StatusCode::NOT_FOUND,
                "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        };

        let body = serde_json::to_string(&self).unwrap_or_else(|_| {
            r#"{"errors":[{"code":"SERIALIZATION_ERROR","message":"Failed to serialize response"}]}"#.to_string()
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_empty_errors_and_links() {
        let resp = ApiResponse::success(
            serde_json::json!({"ok": true}),
            "req-1".to_string(),
            7,
        );
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["data"]["ok"], true);
        assert_eq!(json["meta"]["request_id"], "req-1");
        assert_eq!(json["meta"]["response_time_ms"], 7);
        assert!(json.get("errors").is_none());
        assert!(json.get("_links").is_none());
    }

    #[test]
    fn with_link_surfaces_under_links_key() {
        let resp = ApiResponse::success(serde_json::json!({}), "req-2".to_string(), 0)
            .with_link("self", "/api/v1/stats");
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["_links"]["self"], "/api/v1/stats");
    }

    #[test]
    fn error_code_drives_http_status() {
        let not_found =
            ApiResponse::error("SESSION_NOT_FOUND", "no session", "r".to_string());
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let bad_request = ApiResponse::error("VALIDATION_ERROR", "bad", "r".to_string());
        assert_eq!(bad_request.into_response().status(), StatusCode::BAD_REQUEST);

        let other = ApiResponse::error("STORE_ERROR", "boom", "r".to_string());
        assert_eq!(
            other.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn success_is_http_ok() {
        let resp = ApiResponse::success(serde_json::json!({}), "r".to_string(), 0);
        assert_eq!(resp.into_response().status(), StatusCode::OK);
    }
}
