use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::MalformedTranscript(e) => AppError::Validation(e.to_string()),
            PipelineError::Cancelled { .. } => AppError::ServiceUnavailable(err.to_string()),
            PipelineError::StageInvocation { .. } | PipelineError::Validation { .. } => {
                AppError::Llm(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Request abandoned: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "The service is shutting down".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::pipeline::Stage;
    use crate::transcript::MalformedTranscript;

    #[test]
    fn test_pipeline_errors_map_to_status_codes() {
        let cases = [
            (
                PipelineError::MalformedTranscript(MalformedTranscript(
                    "Transcript cannot be empty".to_string(),
                )),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::StageInvocation {
                    stage: Stage::Analyst,
                    attempts: 3,
                    source: LlmError::EmptyContent,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PipelineError::Cancelled {
                    stage: Stage::Synthesis,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_malformed_transcript_message_reaches_client() {
        let err = AppError::from(PipelineError::MalformedTranscript(MalformedTranscript(
            "Entry 'candidate_2' is empty".to_string(),
        )));
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("candidate_2")));
    }
}
