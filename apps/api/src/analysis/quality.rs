use std::fmt;

use crate::analysis::models::FinalReport;

const MIN_HEADLINE_CHARS: usize = 20;
const MIN_IMPRESSION_CHARS: usize = 50;
const MIN_ROADMAP_STEPS: usize = 2;

/// Advisory findings about an accepted report. Never blocking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityIssue {
    ShortHeadline,
    ThinImpression,
    NoStrengths,
    NoWeaknesses,
    NoPriorityTopics,
    SparseRoadmap { steps: usize },
    NoResources,
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::ShortHeadline => f.write_str("Headline is too short/generic"),
            QualityIssue::ThinImpression => f.write_str("Overall impression lacks detail"),
            QualityIssue::NoStrengths => f.write_str("No strengths identified"),
            QualityIssue::NoWeaknesses => f.write_str("No weaknesses identified"),
            QualityIssue::NoPriorityTopics => f.write_str("No priority topics defined"),
            QualityIssue::SparseRoadmap { steps } => {
                write!(f, "Roadmap insufficiently detailed ({steps} steps)")
            }
            QualityIssue::NoResources => f.write_str("No learning resources provided"),
        }
    }
}

pub fn review_quality(report: &FinalReport) -> Vec<QualityIssue> {
    let mut issues = Vec::new();

    if report.candidate_summary.headline.chars().count() < MIN_HEADLINE_CHARS {
        issues.push(QualityIssue::ShortHeadline);
    }
    if report.candidate_summary.overall_impression.chars().count() < MIN_IMPRESSION_CHARS {
        issues.push(QualityIssue::ThinImpression);
    }
    if report.strengths().next().is_none() {
        issues.push(QualityIssue::NoStrengths);
    }
    if report.weaknesses().next().is_none() {
        issues.push(QualityIssue::NoWeaknesses);
    }
    if report.priority_topics.iter().all(|t| t.trim().is_empty()) {
        issues.push(QualityIssue::NoPriorityTopics);
    }
    if report.roadmap.len() < MIN_ROADMAP_STEPS {
        issues.push(QualityIssue::SparseRoadmap {
            steps: report.roadmap.len(),
        });
    }
    if report.recommended_resources.is_empty() {
        issues.push(QualityIssue::NoResources);
    }

    issues
}
