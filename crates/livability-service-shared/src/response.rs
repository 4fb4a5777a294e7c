//! Response wrapper for successful HTTP responses.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Wrapper for successful responses with content type metadata.
///
/// Mirrors the `content_type` field of `ProblemDetails`; the payload fields
/// are flattened to the top level.
///
/// ```
/// use livability_service_shared::ServiceResponse;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Places {
///     best_places: Vec<String>,
/// }
///
/// let response = ServiceResponse::new(Places { best_places: vec![] });
/// assert_eq!(response.content_type, "application/json");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    #[serde(flatten)]
    pub data: T,

    pub content_type: String,
}

impl<T> ServiceResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            content_type: "application/json".to_string(),
        }
    }
}

impl<T> From<T> for ServiceResponse<T> {
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

impl<T: Serialize> IntoResponse for ServiceResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Ranked {
        best_places: Vec<String>,
    }

    #[test]
    fn test_payload_is_flattened() {
        let response = ServiceResponse::new(Ranked {
            best_places: vec!["Ganhi".to_string()],
        });
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains("\"best_places\":[\"Ganhi\"]"));
        assert!(json.contains("\"content_type\":\"application/json\""));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn test_round_trip() {
        let json = r#"{"best_places":[],"content_type":"application/json"}"#;
        let response: ServiceResponse<Ranked> = serde_json::from_str(json).unwrap();
        assert!(response.data.best_places.is_empty());
    }
}
