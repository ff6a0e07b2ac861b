//! Pipeline orchestrator: runs Analyst then Synthesis for one transcript.
//!
//! Flow: format transcript → analyst fingerprint → cache (single-flight) →
//!       invoke + validate (+ regenerate) → synthesis fingerprint → cache →
//!       invoke + validate (+ regenerate) → quality review → FinalReport.
//!
//! Transport retries (RetryingInvoker) and regenerations after a validation
//! failure are independent bounded loops: every regeneration gets a fresh
//! transport-retry budget.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::models::{AnalysisReport, FinalReport};
use crate::analysis::quality::review_quality;
use crate::analysis::validator::{validate_analysis, validate_final, ValidationError};
use crate::llm_client::StructuredRequest;
use crate::pipeline::cache::{CacheKey, Lookup, ResultCache, StageResult};
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::fingerprint::Fingerprint;
use crate::pipeline::prompts::{
    analyst_system, build_analyst_prompt, build_synthesis_prompt, synthesis_system,
    with_rejection_feedback, ANALYSIS_SCHEMA, ANALYST_TEMPERATURE, FINAL_REPORT_SCHEMA,
    PROMPT_TEMPLATE_VERSION, SYNTHESIS_TEMPERATURE,
};
use crate::pipeline::retry::RetryingInvoker;
use crate::pipeline::{PipelineError, Stage};
use crate::transcript::formatter::{format_transcript, CanonicalTranscript};
use crate::transcript::{TranscriptInput, TranscriptPayload};

/// Extra generations allowed after a stage output fails validation.
const DEFAULT_REGENERATION_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub regeneration_attempts: u32,
    /// Folded into every fingerprint; change it to invalidate cached results.
    pub template_version: String,
    pub enable_cache: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            regeneration_attempts: DEFAULT_REGENERATION_ATTEMPTS,
            template_version: PROMPT_TEMPLATE_VERSION.to_string(),
            enable_cache: true,
        }
    }
}

pub struct InterviewPipeline {
    invoker: RetryingInvoker,
    cache: Arc<ResultCache>,
    settings: PipelineSettings,
}

impl InterviewPipeline {
    pub fn new(invoker: RetryingInvoker, cache: Arc<ResultCache>, settings: PipelineSettings) -> Self {
        info!(
            "Pipeline initialized (template {}, cache {}, {} transport attempts, {} regenerations)",
            settings.template_version,
            if settings.enable_cache { "on" } else { "off" },
            invoker.policy().max_attempts,
            settings.regeneration_attempts
        );
        Self {
            invoker,
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Parses a service payload, then runs `analyze`.
    pub async fn analyze_payload(
        &self,
        payload: TranscriptPayload,
        cancel: &CancellationToken,
    ) -> Result<FinalReport, PipelineError> {
        let input = TranscriptInput::from_payload(payload).map_err(|e| {
            warn!("Rejected transcript payload: {e}");
            e
        })?;
        self.analyze(&input, cancel).await
    }

    /// Runs both stages and returns the validated report.
    ///
    /// Two calls whose transcripts normalize to the same canonical text never
    /// invoke the model twice while the cache holds their results.
    pub async fn analyze(
        &self,
        input: &TranscriptInput,
        cancel: &CancellationToken,
    ) -> Result<FinalReport, PipelineError> {
        let span = info_span!(
            "analyze",
            request_id = %Uuid::new_v4(),
            candidate_id = %input.metadata().candidate_id
        );
        self.run(input, cancel).instrument(span).await
    }

    pub fn analyst_key(&self, transcript: &CanonicalTranscript) -> CacheKey {
        CacheKey::new(
            Stage::Analyst,
            Fingerprint::for_analyst(transcript, &self.settings.template_version),
        )
    }

    pub fn synthesis_key(
        &self,
        transcript: &CanonicalTranscript,
        analysis: &AnalysisReport,
    ) -> CacheKey {
        CacheKey::new(
            Stage::Synthesis,
            Fingerprint::for_synthesis(transcript, analysis, &self.settings.template_version),
        )
    }

    async fn run(
        &self,
        input: &TranscriptInput,
        cancel: &CancellationToken,
    ) -> Result<FinalReport, PipelineError> {
        info!(
            "Starting interview analysis for position '{}'",
            input.metadata().position
        );

        let transcript = format_transcript(input)?;
        info!(
            "Transcript formatted ({} chars, {} utterances)",
            transcript.as_str().len(),
            input.utterances().len()
        );

        cancel.checkpoint(Stage::Analyst)?;
        info!("Stage 1: Running Analyst");
        let analysis = self.run_analyst(&transcript, cancel).await?;
        info!("Analysis complete: {} snippets", analysis.snippets.len());

        cancel.checkpoint(Stage::Synthesis)?;
        info!("Stage 2: Running Synthesis");
        let report = self.run_synthesis(&transcript, &analysis, cancel).await?;

        let issues = review_quality(&report);
        if issues.is_empty() {
            info!("Report quality validated");
        }
        for issue in &issues {
            warn!("Report quality issue: {issue}");
        }

        info!("Pipeline completed");
        Ok(report)
    }

    async fn run_analyst(
        &self,
        transcript: &CanonicalTranscript,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport, PipelineError> {
        let system = analyst_system();
        let prompt = build_analyst_prompt(transcript.as_str());
        let request = StructuredRequest {
            label: Stage::Analyst.as_str(),
            system: &system,
            prompt: &prompt,
            schema: ANALYSIS_SCHEMA,
            temperature: ANALYST_TEMPERATURE,
        };
        let validate = |report: AnalysisReport| validate_analysis(report, transcript);

        self.cached_stage(Stage::Analyst, self.analyst_key(transcript), &validate, || {
            self.generate(Stage::Analyst, &request, &validate, cancel)
        })
        .await
    }

    async fn run_synthesis(
        &self,
        transcript: &CanonicalTranscript,
        analysis: &AnalysisReport,
        cancel: &CancellationToken,
    ) -> Result<FinalReport, PipelineError> {
        let system = synthesis_system();
        let prompt = build_synthesis_prompt(analysis, transcript.as_str());
        let request = StructuredRequest {
            label: Stage::Synthesis.as_str(),
            system: &system,
            prompt: &prompt,
            schema: FINAL_REPORT_SCHEMA,
            temperature: SYNTHESIS_TEMPERATURE,
        };
        let validate = |report: FinalReport| validate_final(report, analysis);

        self.cached_stage(
            Stage::Synthesis,
            self.synthesis_key(transcript, analysis),
            &validate,
            || self.generate(Stage::Synthesis, &request, &validate, cancel),
        )
        .await
    }

    /// Serves a stage from the cache, or computes and stores it.
    ///
    /// Cached values are re-validated on read. One that fails is evicted and
    /// recomputed; it is never returned.
    async fn cached_stage<T, V, F, Fut>(
        &self,
        stage: Stage,
        key: CacheKey,
        validate: &V,
        compute: F,
    ) -> Result<T, PipelineError>
    where
        T: Clone + Into<StageResult> + TryFrom<StageResult>,
        V: Fn(T) -> Result<T, ValidationError>,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        if !self.settings.enable_cache {
            return compute().await;
        }

        for _ in 0..2 {
            let (cached, lookup) = self
                .cache
                .get_or_try_compute(&key, || {
                    let fut = compute();
                    async move { fut.await.map(|value| -> StageResult { value.into() }) }
                })
                .await?;

            let rejection = match T::try_from(cached) {
                Ok(value) => match validate(value) {
                    Ok(value) => {
                        match lookup {
                            Lookup::Hit => info!("[{stage}] Cache hit"),
                            Lookup::Computed => info!("[{stage}] Result cached"),
                        }
                        return Ok(value);
                    }
                    Err(reason) => reason.to_string(),
                },
                Err(_) => "cached value belongs to another stage".to_string(),
            };

            warn!(
                stage = %stage,
                fingerprint = %key.fingerprint,
                reason = %rejection,
                "Cache inconsistency: cached result failed validation, recomputing"
            );
            self.cache.evict(&key);
        }

        // Two inconsistent reads in a row: compute outside single-flight and
        // overwrite whatever was stored.
        let value = compute().await?;
        self.cache.put(key, value.clone().into());
        Ok(value)
    }

    /// Invokes the stage and validates the output, regenerating up to
    /// `regeneration_attempts` times with the rejection reason fed back.
    async fn generate<T, V>(
        &self,
        stage: Stage,
        request: &StructuredRequest<'_>,
        validate: &V,
        cancel: &CancellationToken,
    ) -> Result<T, PipelineError>
    where
        T: DeserializeOwned,
        V: Fn(T) -> Result<T, ValidationError>,
    {
        let max_generations = self.settings.regeneration_attempts + 1;
        let mut generation = 1;
        let mut last_rejection: Option<ValidationError> = None;

        loop {
            let prompt = match &last_rejection {
                Some(reason) => with_rejection_feedback(request.prompt, &reason.to_string()),
                None => request.prompt.to_string(),
            };
            let attempt_request = StructuredRequest {
                prompt: &prompt,
                ..*request
            };

            let candidate: T = self.invoker.invoke(stage, &attempt_request, cancel).await?;

            match validate(candidate) {
                Ok(accepted) => {
                    if generation > 1 {
                        info!("[{stage}] Output accepted on generation {generation}/{max_generations}");
                    }
                    return Ok(accepted);
                }
                Err(reason) if generation < max_generations => {
                    warn!(
                        stage = %stage,
                        generation,
                        max_generations,
                        reason = %reason,
                        "Stage output failed validation, regenerating"
                    );
                    last_rejection = Some(reason);
                    generation += 1;
                    cancel.checkpoint(stage)?;
                }
                Err(reason) => {
                    error!(
                        stage = %stage,
                        generations = generation,
                        reason = %reason,
                        "Stage output failed validation on every generation"
                    );
                    return Err(PipelineError::Validation {
                        stage,
                        attempts: generation,
                        reason,
                    });
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
