// Interview analysis pipeline: Analyst → Synthesis.
// All LLM calls go through the retrying invoker; nothing here talks to
// Anthropic directly.

pub mod cache;
pub mod cancel;
pub mod fingerprint;
pub mod orchestrator;
pub mod prompts;
pub mod retry;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::analysis::validator::ValidationError;
use crate::llm_client::LlmError;
use crate::transcript::MalformedTranscript;

/// The two ordered phases of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyst,
    Synthesis,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Analyst => "analyst",
            Stage::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    MalformedTranscript(#[from] MalformedTranscript),

    #[error("{stage} stage failed after {attempts} attempt(s): {source}")]
    StageInvocation {
        stage: Stage,
        attempts: u32,
        #[source]
        source: LlmError,
    },

    #[error("{stage} stage output rejected after {attempts} generation(s): {reason}")]
    Validation {
        stage: Stage,
        attempts: u32,
        reason: ValidationError,
    },

    #[error("analysis cancelled before the {stage} stage completed")]
    Cancelled { stage: Stage },
}
