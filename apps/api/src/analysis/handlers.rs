//! Axum route handlers for the Analysis API.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::analysis::models::FinalReport;
use crate::errors::AppError;
use crate::pipeline::cache::CacheStats;
use crate::state::AppState;
use crate::transcript::TranscriptPayload;

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub cleared: usize,
}

/// POST /api/v1/analyze
///
/// Runs the Analyst → Synthesis pipeline over one transcript and returns the
/// validated final report. Identical transcripts are served from the cache.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(payload): Json<TranscriptPayload>,
) -> Result<Json<FinalReport>, AppError> {
    let report = state
        .pipeline
        .analyze_payload(payload, &state.shutdown)
        .await?;

    Ok(Json(report))
}

/// GET /api/v1/cache/stats
pub async fn handle_cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.pipeline.cache().stats())
}

/// DELETE /api/v1/cache
///
/// Drops every cached stage result and resets the hit/miss counters.
pub async fn handle_clear_cache(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let cache = state.pipeline.cache();
    let cleared = cache.stats().entries;
    cache.clear();
    info!("Cache cleared ({cleared} entries)");

    Json(ClearCacheResponse { cleared })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::llm_client::{LlmBackend, LlmError, StructuredRequest};
    use crate::pipeline::cache::ResultCache;
    use crate::pipeline::cancel::CancellationToken;
    use crate::pipeline::orchestrator::{InterviewPipeline, PipelineSettings};
    use crate::pipeline::retry::{RetryPolicy, RetryingInvoker};
    use crate::routes::build_router;
    use crate::state::AppState;

    const ANALYSIS_JSON: &str = r#"{"snippets": [
        {"id": "S1", "excerpt": "It speeds up lookups.", "category": "technical-knowledge", "polarity": "strength"}
    ]}"#;

    const FINAL_JSON: &str = r#"{
        "candidate_summary": {
            "headline": "Knows what indexes are for",
            "overall_impression": "Gave a correct, one-line answer about indexes."
        },
        "insights": [{"id": "I1", "kind": "strength", "skill": "Databases", "evidence": ["S1"]}],
        "roadmap": [{"priority": 1, "action": "Read about B-trees", "rationale": "Depth", "addresses": ["I1"]}],
        "recommended_resources": [{"topic": "Indexes", "link": "https://use-the-index-luke.com", "reason": "Primer"}]
    }"#;

    struct FixedLlm {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmBackend for FixedLlm {
        async fn complete(&self, request: &StructuredRequest<'_>) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match request.label {
                "analyst" => ANALYSIS_JSON,
                _ => FINAL_JSON,
            }
            .to_string())
        }
    }

    fn app_state() -> (AppState, Arc<FixedLlm>) {
        let llm = Arc::new(FixedLlm {
            calls: AtomicU32::new(0),
        });
        let pipeline = InterviewPipeline::new(
            RetryingInvoker::new(llm.clone(), RetryPolicy::default()),
            Arc::new(ResultCache::new()),
            PipelineSettings::default(),
        );
        let state = AppState {
            pipeline: Arc::new(pipeline),
            shutdown: CancellationToken::new(),
        };
        (state, llm)
    }

    fn analyze_request(transcript: Value) -> Request<Body> {
        let body = json!({
            "metadata": {"candidate_id": "C-1", "position": "Backend Intern"},
            "transcript": transcript
        });
        Request::builder()
            .method("POST")
            .uri("/api/v1/analyze")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn valid_transcript() -> Value {
        json!({"interviewer": "What is an index?", "candidate": "It speeds up lookups."})
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_analyze_returns_final_report() {
        let (state, llm) = app_state();

        let (status, body) = send(&state, analyze_request(valid_transcript())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["candidate_summary"]["headline"], "Knows what indexes are for");
        assert_eq!(body["insights"][0]["evidence"][0], "S1");
        assert_eq!(body["roadmap"][0]["priority"], 1);
        assert!(body["roadmap"][0].get("timespan").is_none());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_malformed_transcript_is_bad_request() {
        let (state, llm) = app_state();

        let (status, body) = send(
            &state,
            analyze_request(json!({"interviewer": "Only a question"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_returns_service_unavailable() {
        let (state, llm) = app_state();
        state.shutdown.cancel();

        let (status, body) = send(&state, analyze_request(valid_transcript())).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_stats_and_clear() {
        let (state, llm) = app_state();
        send(&state, analyze_request(valid_transcript())).await;
        send(&state, analyze_request(valid_transcript())).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);

        let stats = Request::builder()
            .uri("/api/v1/cache/stats")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, stats).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"], 2);
        assert_eq!(body["hits"], 2);
        let stages: Vec<&Value> = body["keys"]
            .as_array()
            .unwrap()
            .iter()
            .map(|key| &key["stage"])
            .collect();
        assert!(stages.contains(&&json!("analyst")));
        assert!(stages.contains(&&json!("synthesis")));

        let clear = Request::builder()
            .method("DELETE")
            .uri("/api/v1/cache")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, clear).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cleared"], 2);

        send(&state, analyze_request(valid_transcript())).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = app_state();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "interview-api");
    }
}
