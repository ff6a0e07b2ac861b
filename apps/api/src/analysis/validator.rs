//! Schema validator: the gate every stage output passes before it is accepted.
//!
//! Pure checks, no external calls. Failures carry an enumerated reason so the
//! pipeline can decide to regenerate rather than re-validate.

use std::collections::HashSet;

use thiserror::Error;

use crate::analysis::models::{AnalysisReport, FinalReport};
use crate::transcript::formatter::CanonicalTranscript;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // Analysis report
    #[error("analysis report contains no snippets")]
    NoSnippets,

    #[error("snippet #{index} has no id")]
    MissingSnippetId { index: usize },

    #[error("snippet id '{id}' is used more than once")]
    DuplicateSnippetId { id: String },

    #[error("snippet '{snippet}' has an empty excerpt")]
    EmptyExcerpt { snippet: String },

    #[error("snippet '{snippet}' has no category")]
    EmptyCategory { snippet: String },

    #[error("snippet '{snippet}' quotes text that is not in the transcript")]
    ExcerptNotInTranscript { snippet: String },

    // Final report
    #[error("candidate summary headline is empty")]
    EmptyHeadline,

    #[error("candidate summary overall impression is empty")]
    EmptyImpression,

    #[error("insight #{index} has no id")]
    MissingInsightId { index: usize },

    #[error("insight id '{id}' is used more than once")]
    DuplicateInsightId { id: String },

    #[error("insight '{insight}' cites no evidence")]
    InsightWithoutEvidence { insight: String },

    #[error("insight '{insight}' cites unknown snippet '{snippet}'")]
    UnknownEvidence { insight: String, snippet: String },

    #[error("roadmap priority {rank} appears more than once")]
    DuplicatePriority { rank: u32 },

    #[error("roadmap priorities must run 1..=n: expected {expected}, found {found}")]
    PriorityGap { expected: u32, found: u32 },

    #[error("roadmap step {rank} has no action")]
    EmptyRoadmapAction { rank: u32 },

    #[error("roadmap step {rank} addresses no strength or weakness")]
    UnaddressedRoadmapItem { rank: u32 },

    #[error("roadmap step {rank} addresses unknown insight '{insight}'")]
    UnknownInsight { rank: u32, insight: String },

    #[error("resource '{topic}' has an invalid link")]
    InvalidResourceLink { topic: String },
}

/// Accepts an analyst report only if it is non-empty and every excerpt is a
/// literal substring of the transcript it was produced from.
pub fn validate_analysis(
    report: AnalysisReport,
    transcript: &CanonicalTranscript,
) -> Result<AnalysisReport, ValidationError> {
    if report.snippets.is_empty() {
        return Err(ValidationError::NoSnippets);
    }

    let mut ids = HashSet::new();
    for (index, snippet) in report.snippets.iter().enumerate() {
        if snippet.id.trim().is_empty() {
            return Err(ValidationError::MissingSnippetId { index });
        }
        if !ids.insert(snippet.id.as_str()) {
            return Err(ValidationError::DuplicateSnippetId {
                id: snippet.id.clone(),
            });
        }
        if snippet.excerpt.trim().is_empty() {
            return Err(ValidationError::EmptyExcerpt {
                snippet: snippet.id.clone(),
            });
        }
        if snippet.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory {
                snippet: snippet.id.clone(),
            });
        }
        if !transcript.contains(&snippet.excerpt) {
            return Err(ValidationError::ExcerptNotInTranscript {
                snippet: snippet.id.clone(),
            });
        }
    }

    Ok(report)
}

/// Accepts a synthesis report only if every insight is backed by analyst
/// evidence, and the roadmap is ranked 1..=n with every step tied to an insight.
pub fn validate_final(
    report: FinalReport,
    analysis: &AnalysisReport,
) -> Result<FinalReport, ValidationError> {
    if report.candidate_summary.headline.trim().is_empty() {
        return Err(ValidationError::EmptyHeadline);
    }
    if report.candidate_summary.overall_impression.trim().is_empty() {
        return Err(ValidationError::EmptyImpression);
    }

    let mut insight_ids = HashSet::new();
    for (index, insight) in report.insights.iter().enumerate() {
        if insight.id.trim().is_empty() {
            return Err(ValidationError::MissingInsightId { index });
        }
        if !insight_ids.insert(insight.id.as_str()) {
            return Err(ValidationError::DuplicateInsightId {
                id: insight.id.clone(),
            });
        }
        if insight.evidence.is_empty() {
            return Err(ValidationError::InsightWithoutEvidence {
                insight: insight.id.clone(),
            });
        }
        if let Some(unknown) = insight
            .evidence
            .iter()
            .find(|id| analysis.snippet(id).is_none())
        {
            return Err(ValidationError::UnknownEvidence {
                insight: insight.id.clone(),
                snippet: unknown.clone(),
            });
        }
    }

    check_priority_ranks(report.roadmap.iter().map(|item| item.priority))?;

    for item in &report.roadmap {
        if item.action.trim().is_empty() {
            return Err(ValidationError::EmptyRoadmapAction {
                rank: item.priority,
            });
        }
        if item.addresses.is_empty() {
            return Err(ValidationError::UnaddressedRoadmapItem {
                rank: item.priority,
            });
        }
        if let Some(unknown) = item
            .addresses
            .iter()
            .find(|id| !insight_ids.contains(id.as_str()))
        {
            return Err(ValidationError::UnknownInsight {
                rank: item.priority,
                insight: unknown.clone(),
            });
        }
    }

    for resource in &report.recommended_resources {
        let link = resource.link.trim();
        if !(link.starts_with("http://") || link.starts_with("https://")) {
            return Err(ValidationError::InvalidResourceLink {
                topic: resource.topic.clone(),
            });
        }
    }

    Ok(report)
}

/// Ranks must be exactly {1..=n}: no repeats, no gaps, no zero.
fn check_priority_ranks(ranks: impl Iterator<Item = u32>) -> Result<(), ValidationError> {
    let mut ranks: Vec<u32> = ranks.collect();
    ranks.sort_unstable();

    for (position, &rank) in ranks.iter().enumerate() {
        if position > 0 && ranks[position - 1] == rank {
            return Err(ValidationError::DuplicatePriority { rank });
        }
        let expected = position as u32 + 1;
        if rank != expected {
            return Err(ValidationError::PriorityGap {
                expected,
                found: rank,
            });
        }
    }
    Ok(())
}
