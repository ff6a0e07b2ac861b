use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::analysis::models::AnalysisReport;
use crate::pipeline::Stage;
use crate::transcript::formatter::CanonicalTranscript;

/// Stable SHA-256 over a stage's inputs and the prompt-template version.
///
/// Bumping the template version changes every fingerprint, so results produced
/// by older prompts are never served.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn for_analyst(transcript: &CanonicalTranscript, template_version: &str) -> Self {
        digest(&[
            ("stage", Stage::Analyst.as_str()),
            ("template", template_version),
            ("transcript", transcript.as_str()),
        ])
    }

    /// Synthesis depends on the transcript and on the accepted analyst report.
    pub fn for_synthesis(
        transcript: &CanonicalTranscript,
        analysis: &AnalysisReport,
        template_version: &str,
    ) -> Self {
        let mut parts = vec![
            ("stage", Stage::Synthesis.as_str()),
            ("template", template_version),
            ("transcript", transcript.as_str()),
        ];
        for snippet in &analysis.snippets {
            parts.push(("snippet.id", snippet.id.as_str()));
            parts.push(("snippet.excerpt", snippet.excerpt.as_str()));
            parts.push(("snippet.category", snippet.category.as_str()));
            parts.push(("snippet.polarity", snippet.polarity.as_str()));
            parts.push(("snippet.assessment", snippet.assessment.as_str()));
        }
        digest(&parts)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn fixed(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Length-prefixed so that no two part lists hash the same byte stream.
fn digest(parts: &[(&str, &str)]) -> Fingerprint {
    let mut hasher = Sha256::new();
    for (name, value) in parts {
        hasher.update(name.as_bytes());
        hasher.update((value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
    Fingerprint(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::{EvidenceSnippet, Polarity};
    use crate::transcript::formatter::format_transcript;
    use crate::transcript::{InterviewMetadata, Speaker, TranscriptInput, Utterance};

    fn transcript(answer: &str) -> CanonicalTranscript {
        let input = TranscriptInput::new(
            InterviewMetadata {
                candidate_id: "C-1".to_string(),
                position: "Backend Intern".to_string(),
            },
            vec![
                Utterance {
                    speaker: Speaker::Interviewer,
                    text: "What is an index?".to_string(),
                },
                Utterance {
                    speaker: Speaker::Candidate,
                    text: answer.to_string(),
                },
            ],
        )
        .unwrap();
        format_transcript(&input).unwrap()
    }

    fn analysis(polarity: Polarity) -> AnalysisReport {
        AnalysisReport {
            snippets: vec![EvidenceSnippet {
                id: "S1".to_string(),
                excerpt: "It speeds up lookups.".to_string(),
                category: "technical-knowledge".to_string(),
                polarity,
                assessment: String::new(),
            }],
        }
    }

    #[test]
    fn test_fingerprint_is_stable_hex_sha256() {
        let t = transcript("It speeds up lookups.");
        let a = Fingerprint::for_analyst(&t, "v1");
        let b = Fingerprint::for_analyst(&t, "v1");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_template_version_changes_fingerprint() {
        let t = transcript("It speeds up lookups.");
        assert_ne!(
            Fingerprint::for_analyst(&t, "v1"),
            Fingerprint::for_analyst(&t, "v2")
        );
    }

    #[test]
    fn test_transcript_changes_fingerprint() {
        assert_ne!(
            Fingerprint::for_analyst(&transcript("It speeds up lookups."), "v1"),
            Fingerprint::for_analyst(&transcript("It makes writes slower."), "v1")
        );
    }

    #[test]
    fn test_stages_never_share_fingerprints() {
        let t = transcript("It speeds up lookups.");
        assert_ne!(
            Fingerprint::for_analyst(&t, "v1"),
            Fingerprint::for_synthesis(&t, &AnalysisReport { snippets: vec![] }, "v1")
        );
    }

    #[test]
    fn test_synthesis_fingerprint_tracks_analysis_content() {
        let t = transcript("It speeds up lookups.");
        assert_ne!(
            Fingerprint::for_synthesis(&t, &analysis(Polarity::Strength), "v1"),
            Fingerprint::for_synthesis(&t, &analysis(Polarity::Neutral), "v1")
        );
    }
}
