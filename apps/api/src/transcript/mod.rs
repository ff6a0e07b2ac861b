//! Transcript input model: parses the service payload into an ordered,
//! role-tagged utterance sequence and renders it canonically.

pub mod formatter;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Raised when a transcript payload violates the input invariants.
/// The message is surfaced to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid transcript: {0}")]
pub struct MalformedTranscript(pub String);

impl MalformedTranscript {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Speaker {
    Interviewer,
    Candidate,
}

impl Speaker {
    pub fn label(self) -> &'static str {
        match self {
            Speaker::Interviewer => "Interviewer",
            Speaker::Candidate => "Candidate",
        }
    }

    fn from_key_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "interviewer" => Some(Speaker::Interviewer),
            "candidate" => Some(Speaker::Candidate),
            _ => None,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who was interviewed, and for what.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterviewMetadata {
    pub candidate_id: String,
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
}

/// Wire shape accepted by the service: metadata plus a flat map of
/// `interviewer`, `candidate`, `interviewer_1`, `candidate_1`, ... keys.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptPayload {
    pub metadata: InterviewMetadata,
    pub transcript: BTreeMap<String, String>,
}

/// A validated interview transcript. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptInput {
    metadata: InterviewMetadata,
    utterances: Vec<Utterance>,
}

impl TranscriptInput {
    /// Builds a transcript from an already-ordered utterance sequence.
    pub fn new(
        metadata: InterviewMetadata,
        utterances: Vec<Utterance>,
    ) -> Result<Self, MalformedTranscript> {
        if metadata.candidate_id.trim().is_empty() {
            return Err(MalformedTranscript::new("metadata.candidate_id cannot be empty"));
        }
        if metadata.position.trim().is_empty() {
            return Err(MalformedTranscript::new("metadata.position cannot be empty"));
        }
        if utterances.is_empty() {
            return Err(MalformedTranscript::new("Transcript cannot be empty"));
        }
        if utterances.len() < 2 {
            return Err(MalformedTranscript::new(
                "Transcript must have at least 2 exchanges",
            ));
        }
        if !utterances.iter().any(|u| u.speaker == Speaker::Interviewer) {
            return Err(MalformedTranscript::new(
                "Transcript must include interviewer questions",
            ));
        }
        if !utterances.iter().any(|u| u.speaker == Speaker::Candidate) {
            return Err(MalformedTranscript::new(
                "Transcript must include candidate responses",
            ));
        }
        if let Some(position) = utterances.iter().position(|u| u.text.trim().is_empty()) {
            return Err(MalformedTranscript::new(format!(
                "Utterance {} ({}) is empty",
                position + 1,
                utterances[position].speaker
            )));
        }

        Ok(Self {
            metadata,
            utterances,
        })
    }

    /// Parses the role-and-index keyed payload. Keys sort by index, then
    /// interviewer before candidate, so `interviewer_1` precedes `candidate_1`.
    pub fn from_payload(payload: TranscriptPayload) -> Result<Self, MalformedTranscript> {
        let mut keyed = Vec::with_capacity(payload.transcript.len());
        let mut seen = HashSet::new();

        for (key, text) in payload.transcript {
            let (speaker, index) = parse_key(&key)?;
            if !seen.insert((speaker, index)) {
                return Err(MalformedTranscript::new(format!(
                    "Entry '{key}' duplicates another {} entry at index {index}",
                    speaker.label().to_lowercase()
                )));
            }
            if text.trim().is_empty() {
                return Err(MalformedTranscript::new(format!("Entry '{key}' is empty")));
            }
            keyed.push(((index, speaker), Utterance { speaker, text }));
        }

        keyed.sort_by_key(|(order, _)| *order);
        let utterances = keyed.into_iter().map(|(_, u)| u).collect();
        Self::new(payload.metadata, utterances)
    }

    pub fn metadata(&self) -> &InterviewMetadata {
        &self.metadata
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }
}

/// Splits `candidate_2` into (Candidate, 2). A bare role is index 0.
fn parse_key(key: &str) -> Result<(Speaker, u32), MalformedTranscript> {
    let trimmed = key.trim();
    let (prefix, suffix) = match trimmed.split_once('_') {
        Some((prefix, suffix)) => (prefix, Some(suffix)),
        None => (trimmed, None),
    };

    let speaker = Speaker::from_key_prefix(prefix).ok_or_else(|| {
        MalformedTranscript::new(format!(
            "Entry '{key}' must be keyed 'interviewer[_N]' or 'candidate[_N]'"
        ))
    })?;

    let index = match suffix {
        None => 0,
        Some(digits) => digits.parse::<u32>().map_err(|_| {
            MalformedTranscript::new(format!("Entry '{key}' has a non-numeric index"))
        })?,
    };

    Ok((speaker, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> InterviewMetadata {
        InterviewMetadata {
            candidate_id: "C-1".to_string(),
            position: "Backend Intern".to_string(),
        }
    }

    fn payload(entries: &[(&str, &str)]) -> TranscriptPayload {
        TranscriptPayload {
            metadata: metadata(),
            transcript: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_empty_transcript() {
        let err = TranscriptInput::from_payload(payload(&[])).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("empty"));
    }

    #[test]
    fn test_too_short_transcript() {
        let err = TranscriptInput::from_payload(payload(&[("interviewer", "Hi")])).unwrap_err();
        assert!(err.to_string().contains("at least 2 exchanges"));
    }

    #[test]
    fn test_missing_candidate() {
        let err = TranscriptInput::from_payload(payload(&[
            ("interviewer", "Q1"),
            ("interviewer_1", "Q2"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("candidate"));
    }

    #[test]
    fn test_missing_interviewer() {
        let err = TranscriptInput::from_payload(payload(&[
            ("candidate", "A1"),
            ("candidate_1", "A2"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("interviewer"));
    }

    #[test]
    fn test_whitespace_only_entry_rejected() {
        let err = TranscriptInput::from_payload(payload(&[
            ("interviewer", "Q1"),
            ("candidate", "   "),
        ]))
        .unwrap_err();
        assert_eq!(err.0, "Entry 'candidate' is empty");
    }

    #[test]
    fn test_unknown_role_rejected() {
        let err = TranscriptInput::from_payload(payload(&[
            ("interviewer", "Q1"),
            ("candidate", "A1"),
            ("observer", "notes"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("observer"));
    }

    #[test]
    fn test_non_numeric_index_rejected() {
        let err = TranscriptInput::from_payload(payload(&[
            ("interviewer", "Q1"),
            ("candidate_x", "A1"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("non-numeric"));
    }

    #[test]
    fn test_duplicate_role_index_rejected() {
        let err = TranscriptInput::from_payload(payload(&[
            ("interviewer", "Q1"),
            ("Interviewer_0", "Q1 again"),
            ("candidate", "A1"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("duplicates"));
    }

    #[test]
    fn test_blank_metadata_rejected() {
        let mut p = payload(&[("interviewer", "Q1"), ("candidate", "A1")]);
        p.metadata.position = " ".to_string();
        let err = TranscriptInput::from_payload(p).unwrap_err();
        assert!(err.to_string().contains("position"));
    }

    #[test]
    fn test_exchanges_are_interleaved_by_index() {
        let input = TranscriptInput::from_payload(payload(&[
            ("candidate_1", "answer 2"),
            ("candidate", "answer"),
            ("interviewer_1", "question 2"),
            ("interviewer", "question"),
        ]))
        .unwrap();

        let order: Vec<(Speaker, &str)> = input
            .utterances()
            .iter()
            .map(|u| (u.speaker, u.text.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Speaker::Interviewer, "question"),
                (Speaker::Candidate, "answer"),
                (Speaker::Interviewer, "question 2"),
                (Speaker::Candidate, "answer 2"),
            ]
        );
    }

    #[test]
    fn test_index_ordering_is_numeric_not_lexical() {
        let input = TranscriptInput::from_payload(payload(&[
            ("interviewer", "q0"),
            ("candidate", "a0"),
            ("interviewer_10", "q10"),
            ("interviewer_2", "q2"),
        ]))
        .unwrap();
        let texts: Vec<&str> = input.utterances().iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["q0", "a0", "q2", "q10"]);
    }

    #[test]
    fn test_payload_deserializes_from_json() {
        let json = serde_json::json!({
            "metadata": {"candidate_id": "C-EDGE-01", "position": "Backend Engineer Intern"},
            "transcript": {"interviewer": "Hello", "candidate": "Hi"}
        });
        let payload: TranscriptPayload = serde_json::from_value(json).unwrap();
        let input = TranscriptInput::from_payload(payload).unwrap();
        assert_eq!(input.metadata().candidate_id, "C-EDGE-01");
        assert_eq!(input.utterances().len(), 2);
    }
}
