// Shared prompt constants and prompt-building utilities.
// Each stage defines its own prompts alongside the pipeline.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that keeps every claim tied to the transcript.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Every quote you produce must be copied VERBATIM from the transcript, \
    character for character. Do NOT paraphrase, correct, merge or shorten quotes. \
    If the transcript does not support an observation, omit it entirely.";

/// Instruction that keeps synthesis claims traceable to analyst evidence.
pub const EVIDENCE_INSTRUCTION: &str = "\
    CRITICAL: Every strength or weakness must cite the `id` of one or more analyst \
    snippets in its `evidence` list. Every roadmap step must list the `id` of one or \
    more strengths/weaknesses it addresses. Never cite ids that do not exist.";
