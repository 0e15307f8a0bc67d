//! Submission error taxonomy and its HTTP mapping.
//!
//! Client mistakes are answered with a plain-text reason. Storage and delivery
//! failures are logged with full detail and answered with a generic page.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::mail::DeliveryError;
use crate::render;

/// Why a submission did not produce a confirmation.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Missing required file: {0}")]
    MissingFile(&'static str),

    #[error("Only one file may be uploaded for {0}")]
    DuplicateFile(&'static str),

    /// The multipart body could not be read.
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// Staging or reading an upload failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl SubmitError {
    /// True for problems with the request itself.
    pub fn is_client_error(&self) -> bool {
        match self {
            SubmitError::MissingField(_)
            | SubmitError::MissingFile(_)
            | SubmitError::DuplicateFile(_) => true,
            SubmitError::Multipart(e) => e.status().is_client_error(),
            SubmitError::Storage(_) | SubmitError::Delivery(_) => false,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SubmitError::MissingField(_)
            | SubmitError::MissingFile(_)
            | SubmitError::DuplicateFile(_) => StatusCode::BAD_REQUEST,
            SubmitError::Multipart(e) => e.status(),
            SubmitError::Storage(_) | SubmitError::Delivery(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Write the failure to the operational log.
    pub fn log(&self) {
        match self {
            SubmitError::Delivery(e) => {
                error!(error = %e, detail = %e.detail(), "submission_delivery_failed");
            }
            SubmitError::Storage(e) => {
                error!(error = %e, kind = ?e.kind(), "submission_storage_failed");
            }
            SubmitError::Multipart(e) if !self.is_client_error() => {
                error!(error = %e, "submission_body_read_failed");
            }
            client => {
                warn!(error = %client, status = client.status().as_u16(), "submission_rejected");
            }
        }
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            SubmitError::Multipart(e) if status.is_client_error() => {
                (status, e.body_text()).into_response()
            }
            client if client.is_client_error() => (status, client.to_string()).into_response(),
            _ => (status, Html(render::error_page())).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        for err in [
            SubmitError::MissingField("income"),
            SubmitError::MissingFile("pan"),
            SubmitError::DuplicateFile("bank"),
        ] {
            assert!(err.is_client_error());
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_server_errors_map_to_internal_error() {
        let storage = SubmitError::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(!storage.is_client_error());
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let delivery = SubmitError::from(DeliveryError::Rejected {
            status: 401,
            body: "{}".to_string(),
        });
        assert!(!delivery.is_client_error());
        assert_eq!(delivery.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_client_error_response_carries_reason() {
        let response = SubmitError::MissingField("income").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Missing required field: income");
    }

    #[tokio::test]
    async fn test_server_error_response_hides_detail() {
        let response = SubmitError::from(DeliveryError::Rejected {
            status: 401,
            body: r#"{"code":"unauthorized","message":"Key not found"}"#.to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Something went wrong"));
        assert!(!text.contains("unauthorized"));
        assert!(!text.contains("401"));
    }
}
