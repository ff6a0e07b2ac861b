//! Structured outputs of the two LLM stages.
//!
//! These are the exact JSON shapes the model is asked to return. Nothing here
//! is trusted until it has passed `analysis::validator`.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Analyst stage
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    #[serde(alias = "positive")]
    Strength,
    #[serde(alias = "negative")]
    Weakness,
    Neutral,
}

impl Polarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Strength => "strength",
            Polarity::Weakness => "weakness",
            Polarity::Neutral => "neutral",
        }
    }
}

/// One objective observation, quoted verbatim from the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    /// Stable reference used by synthesis insights, e.g. "S1".
    pub id: String,
    /// Verbatim quote; must be a substring of the canonical transcript.
    pub excerpt: String,
    /// Topic tag, e.g. "technical-knowledge".
    pub category: String,
    pub polarity: Polarity,
    /// Short, neutral assessment of the quoted response.
    #[serde(default)]
    pub assessment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub snippets: Vec<EvidenceSnippet>,
}

impl AnalysisReport {
    pub fn snippet(&self, id: &str) -> Option<&EvidenceSnippet> {
        self.snippets.iter().find(|s| s.id == id)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Synthesis stage
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub headline: String,
    pub overall_impression: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Strength,
    Weakness,
}

/// How urgently a weakness should be worked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[serde(alias = "High")]
    High,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Low")]
    Low,
}

/// A key strength or weakness, backed by analyst snippet ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub kind: InsightKind,
    pub skill: String,
    /// Ids of the `EvidenceSnippet`s supporting this insight.
    pub evidence: Vec<String>,
    /// Set on weaknesses only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapItem {
    /// 1-based rank; ranks across a roadmap are exactly 1..=n.
    pub priority: u32,
    pub action: String,
    pub rationale: String,
    /// Ids of the insights this step addresses.
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timespan: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedResource {
    pub topic: String,
    pub link: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    pub candidate_summary: CandidateSummary,
    pub insights: Vec<Insight>,
    /// The few topics the candidate should focus on first.
    #[serde(default)]
    pub priority_topics: Vec<String>,
    pub roadmap: Vec<RoadmapItem>,
    pub recommended_resources: Vec<RecommendedResource>,
}

impl FinalReport {
    pub fn strengths(&self) -> impl Iterator<Item = &Insight> {
        self.insights
            .iter()
            .filter(|i| i.kind == InsightKind::Strength)
    }

    pub fn weaknesses(&self) -> impl Iterator<Item = &Insight> {
        self.insights
            .iter()
            .filter(|i| i.kind == InsightKind::Weakness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_accepts_legacy_aliases() {
        let p: Polarity = serde_json::from_str(r#""positive""#).unwrap();
        assert_eq!(p, Polarity::Strength);
        let p: Polarity = serde_json::from_str(r#""negative""#).unwrap();
        assert_eq!(p, Polarity::Weakness);
        let p: Polarity = serde_json::from_str(r#""neutral""#).unwrap();
        assert_eq!(p, Polarity::Neutral);
    }

    #[test]
    fn test_snippet_without_excerpt_fails_deserialization() {
        let bad_json = r#"{"id": "S1", "category": "x", "polarity": "strength"}"#;
        let result: Result<EvidenceSnippet, _> = serde_json::from_str(bad_json);
        assert!(result.is_err(), "a snippet must carry its excerpt");
    }

    #[test]
    fn test_final_report_deserializes_and_splits_insights() {
        let json = r#"{
            "candidate_summary": {"headline": "Solid fundamentals", "overall_impression": "Good."},
            "insights": [
                {"id": "I1", "kind": "strength", "skill": "Databases", "evidence": ["S1"]},
                {"id": "I2", "kind": "weakness", "skill": "ACID", "evidence": ["S2"], "urgency": "High"}
            ],
            "roadmap": [
                {"priority": 1, "action": "Review ACID", "rationale": "Confused C", "addresses": ["I2"], "timespan": "Day 1-3"}
            ],
            "recommended_resources": [
                {"topic": "ACID", "link": "https://example.com/acid", "reason": "Primer"}
            ]
        }"#;
        let report: FinalReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.strengths().count(), 1);
        assert_eq!(report.weaknesses().next().unwrap().skill, "ACID");
        assert_eq!(report.roadmap[0].timespan.as_deref(), Some("Day 1-3"));
        assert_eq!(report.weaknesses().next().unwrap().urgency, Some(Urgency::High));
        assert!(report.strengths().next().unwrap().urgency.is_none());
        assert!(report.priority_topics.is_empty());
    }

    #[test]
    fn test_priority_topics_and_urgency_round_trip_to_json() {
        let json = r#"{
            "candidate_summary": {"headline": "h", "overall_impression": "i"},
            "insights": [{"id": "I1", "kind": "weakness", "skill": "ACID", "evidence": ["S1"], "urgency": "medium"}],
            "priority_topics": ["Transactions"],
            "roadmap": [],
            "recommended_resources": []
        }"#;
        let report: FinalReport = serde_json::from_str(json).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["priority_topics"][0], "Transactions");
        assert_eq!(value["insights"][0]["urgency"], "medium");
    }
}
