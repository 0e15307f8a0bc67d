//! Route handlers.
//!
//! `submit` runs one application through:
//! 1. Stream the multipart body, staging `pan` and `bank`
//! 2. Validate fields and documents
//! 3. Encode the documents and compose the email
//! 4. Hand the email to the mailer (single attempt)
//! 5. Delete staged files, then respond

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::error::SubmitError;
use crate::mail::{self, Envelope, Mailer};
use crate::render::{self, Confirmation};
use crate::staging::{StagedFiles, UploadDir};
use crate::submission;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub envelope: Arc<Envelope>,
    pub uploads: UploadDir,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            envelope: Arc::new(Envelope::from_config(&config)),
            uploads: UploadDir::new(config.upload_dir.clone()),
            config: Arc::new(config),
            mailer,
        }
    }
}

// =============================================================================
// Liveness
// =============================================================================

/// Plain-text liveness answer on `/`.
pub async fn liveness() -> &'static str {
    "Server is running \u{2705}"
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Submission
// =============================================================================

/// Loan application endpoint.
///
/// Staged files are removed before the response is built, whatever the
/// outcome.
pub async fn submit(State(state): State<AppState>, multipart: Multipart) -> Response {
    let mut staged = StagedFiles::new();

    let outcome = process_submission(&state, multipart, &mut staged).await;

    let staged_count = staged.len();
    let removed = staged.cleanup().await;

    match outcome {
        Ok(confirmation) => {
            info!(
                applicant = %confirmation.name,
                staged_files = staged_count,
                removed_files = removed,
                "submission_completed"
            );
            (
                StatusCode::OK,
                Html(render::confirmation_page(&confirmation)),
            )
                .into_response()
        }
        Err(err) => {
            err.log();
            err.into_response()
        }
    }
}

async fn process_submission(
    state: &AppState,
    multipart: Multipart,
    staged: &mut StagedFiles,
) -> Result<Confirmation, SubmitError> {
    let raw = submission::read_submission(multipart, &state.uploads, staged).await?;
    let application = raw.validate()?;

    info!(
        applicant = %application.applicant.name,
        pan_bytes = application.pan.size,
        bank_bytes = application.bank.size,
        "submission_received"
    );

    let payload = mail::compose(&state.envelope, &application).await?;
    let delivery = state.mailer.send(&payload).await?;

    info!(
        applicant = %application.applicant.name,
        message_id = delivery.message_id.as_deref().unwrap_or(""),
        "submission_delivered"
    );

    Ok(Confirmation::new(&application.applicant, Utc::now()))
}
