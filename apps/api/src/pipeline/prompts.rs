// All LLM prompt constants for the two pipeline stages.
// Reuses cross-cutting fragments from llm_client::prompts.
//
// Any edit to a prompt or schema below MUST bump PROMPT_TEMPLATE_VERSION so
// cached results produced by the old prompts are not served.

use crate::analysis::models::AnalysisReport;
use crate::llm_client::prompts::{EVIDENCE_INSTRUCTION, GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};

pub const PROMPT_TEMPLATE_VERSION: &str = "v4";

pub const ANALYST_TEMPERATURE: f32 = 0.0;
pub const SYNTHESIS_TEMPERATURE: f32 = 0.5;

/// System prompt for the Analyst stage.
pub const ANALYST_SYSTEM: &str = "You are a meticulous, unbiased interview analyst. \
    Your sole job is to read an interview transcript and extract key performance snippets. \
    You must not judge or synthesize the overall performance.";

/// Analyst prompt template. Replace `{grounding_instruction}` and `{transcript}`.
pub const ANALYST_PROMPT_TEMPLATE: &str = r#"Extract performance snippets from the interview transcript below.

Rules:
1. Extract 3-7 snippets (fewer only if the transcript is very short).
2. Each snippet must be an objective, self-contained observation.
3. `excerpt` must be an EXACT quote from the transcript.
4. Tag each snippet's `polarity`: "strength", "weakness" or "neutral".
5. Give each snippet a short `category` tag, e.g. "technical-knowledge", "communication".
6. Number snippet ids "S1", "S2", ... in order of appearance.
7. No overall judgments — observations only.

{grounding_instruction}

Interview Transcript:
{transcript}"#;

/// Target schema for the Analyst stage.
pub const ANALYSIS_SCHEMA: &str = r#"{
  "snippets": [
    {
      "id": "S1",
      "excerpt": "verbatim quote from the transcript",
      "category": "technical-knowledge",
      "polarity": "strength | weakness | neutral",
      "assessment": "one concise, neutral sentence"
    }
  ]
}"#;

/// System prompt for the Synthesis stage.
pub const SYNTHESIS_SYSTEM: &str = "You are a world-class Senior Engineering Manager and \
    empathetic mentor. You have been given a factual, pre-analyzed report from an analyst \
    about an intern candidate, together with the original transcript. \
    Tone: professional but encouraging. Focus on growth.";

/// Synthesis prompt template. Replace `{evidence_instruction}`, `{analysis}`
/// and `{transcript}`.
pub const SYNTHESIS_PROMPT_TEMPLATE: &str = r#"Generate a comprehensive, actionable report.

Process:
1. Summarize the candidate: a one-sentence headline and a 2-3 sentence overall impression.
2. Identify 2-3 key strengths and 2-3 key weaknesses, each citing analyst snippet ids.
   Give every weakness an `urgency`: "high", "medium" or "low".
3. List the 2-3 `priority_topics` the candidate should focus on first.
4. Create a prioritized 2-week development roadmap of 5-7 steps. `priority` runs 1, 2, 3, ... with no gaps.
5. Recommend 3-5 high-quality learning resources with full https:// links.

{evidence_instruction}

Analyst Report:
{analysis}

Interview Transcript:
{transcript}"#;

/// Target schema for the Synthesis stage.
pub const FINAL_REPORT_SCHEMA: &str = r#"{
  "candidate_summary": {
    "headline": "single impactful sentence",
    "overall_impression": "2-3 sentence paragraph"
  },
  "insights": [
    {"id": "I1", "kind": "strength", "skill": "competency", "evidence": ["S1"]},
    {"id": "I2", "kind": "weakness", "skill": "competency", "evidence": ["S2"], "urgency": "high | medium | low"}
  ],
  "priority_topics": ["most critical topic"],
  "roadmap": [
    {"priority": 1, "action": "concrete task", "rationale": "why it matters", "addresses": ["I1"], "timespan": "Day 1-3"}
  ],
  "recommended_resources": [
    {"topic": "topic", "link": "https://...", "reason": "why this resource"}
  ]
}"#;

pub fn analyst_system() -> String {
    format!("{ANALYST_SYSTEM} {JSON_ONLY_SYSTEM}")
}

pub fn synthesis_system() -> String {
    format!("{SYNTHESIS_SYSTEM} {JSON_ONLY_SYSTEM}")
}

pub fn build_analyst_prompt(transcript: &str) -> String {
    fill_template(
        ANALYST_PROMPT_TEMPLATE,
        &[
            ("grounding_instruction", GROUNDING_INSTRUCTION),
            ("transcript", transcript),
        ],
    )
}

pub fn build_synthesis_prompt(analysis: &AnalysisReport, transcript: &str) -> String {
    fill_template(
        SYNTHESIS_PROMPT_TEMPLATE,
        &[
            ("evidence_instruction", EVIDENCE_INSTRUCTION),
            ("analysis", &render_analysis(analysis)),
            ("transcript", transcript),
        ],
    )
}

/// Substitutes `{name}` placeholders in a single pass over the template.
/// Inserted values are never rescanned, so transcript text that happens to
/// contain `{analysis}` or `{transcript}` reaches the model unchanged.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let hit = values.iter().find(|(name, _)| {
            tail.strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// One line per snippet: `[S1] strength / technical-knowledge: "quote" (assessment)`.
fn render_analysis(analysis: &AnalysisReport) -> String {
    analysis
        .snippets
        .iter()
        .map(|s| {
            let mut line = format!(
                "[{}] {} / {}: \"{}\"",
                s.id,
                s.polarity.as_str(),
                s.category,
                s.excerpt
            );
            if !s.assessment.trim().is_empty() {
                line.push_str(&format!(" ({})", s.assessment.trim()));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for a regeneration after the previous output was rejected.
pub fn with_rejection_feedback(prompt: &str, reason: &str) -> String {
    format!(
        "{prompt}\n\nYour previous answer was rejected: {reason}. \
        Produce a corrected answer that satisfies every rule above."
    )
}
