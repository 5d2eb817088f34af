use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Uniform JSON envelope for every response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, Some(data))
    }

    fn with_status(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            error: None,
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, message, None)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_envelope_omits_error() {
        let body = serde_json::to_value(ApiResponse::ok("Fetched", json!({"id": 1}))).unwrap();
        assert_eq!(
            body,
            json!({"success": true, "message": "Fetched", "data": {"id": 1}})
        );
    }

    #[test]
    fn message_envelope_omits_data() {
        let response = ApiResponse::message("Logged out");
        assert_eq!(response.status(), StatusCode::OK);
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body, json!({"success": true, "message": "Logged out"}));
    }

    #[test]
    fn created_uses_201() {
        let response = ApiResponse::created("Created", 7);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.into_response().status(), StatusCode::CREATED);
    }
}
