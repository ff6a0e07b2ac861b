use std::fmt;

use crate::transcript::{MalformedTranscript, TranscriptInput};

/// The deterministic text form of a transcript. Cache fingerprints and the
/// objectivity check both operate on this exact string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalTranscript(String);

impl CanonicalTranscript {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, excerpt: &str) -> bool {
        self.0.contains(excerpt)
    }
}

impl fmt::Display for CanonicalTranscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders `<Role>: <utterance>` lines separated by blank lines.
///
/// Pure: the same input always yields the same text. Metadata is not part of
/// the canonical form. Input invariants are re-checked before rendering.
pub fn format_transcript(input: &TranscriptInput) -> Result<CanonicalTranscript, MalformedTranscript> {
    let checked = TranscriptInput::new(input.metadata().clone(), input.utterances().to_vec())?;

    let text = checked
        .utterances()
        .iter()
        .map(|u| format!("{}: {}", u.speaker.label(), u.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(CanonicalTranscript(text))
}
