//! LLM-assisted write-path classification (§4.D): decides whether a new
//! memory is genuinely new, updates an existing one, or extends it,
//! against the handful of candidates most similar to it.
//!
//! Prompt/parse shape grounded on the nightly-reflection idiom elsewhere in
//! this codebase: one key-prefixed line per answer, `NONE` when nothing
//! applies, unknown lines ignored rather than rejected.

use crate::error::ProviderError;
use crate::llm::{CompleteRequest, LlmProvider};
use crate::types::{Memory, RelationType};

const CLASSIFIER_SYSTEM_PROMPT: &str = "You decide how a new memory relates to the most similar \
existing memories already on file. Answer in the EXACT format shown, one line per field.";

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Unrelated enough to existing memories to stand alone.
    New,
    /// Supersedes an existing memory outright.
    Updates { target_index: usize, confidence: f32 },
    /// Adds detail to an existing memory without superseding it.
    Extends { target_index: usize, confidence: f32 },
}

impl Classification {
    pub fn relation_type(&self) -> Option<RelationType> {
        match self {
            Classification::New => None,
            Classification::Updates { .. } => Some(RelationType::Updates),
            Classification::Extends { .. } => Some(RelationType::Extends),
        }
    }

    pub fn target_index(&self) -> Option<usize> {
        match self {
            Classification::New => None,
            Classification::Updates { target_index, .. } | Classification::Extends { target_index, .. } => {
                Some(*target_index)
            }
        }
    }
}

pub fn classify_prompt(new_content: &str, candidates: &[Memory]) -> String {
    let candidate_block = candidates
        .iter()
        .enumerate()
        .map(|(i, m)| format!("  [{i}] {}", m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "NEW MEMORY:\n  {new_content}\n\nEXISTING CANDIDATES (most similar first):\n{candidate_block}\n\n\
Answer ALL of the following fields, each on its own line:\n\n\
RELATION: <UPDATES, EXTENDS, or NEW>\n\
TARGET: <candidate index the relation applies to, or NONE if RELATION is NEW>\n\
CONFIDENCE: <0.0-1.0, or NONE if RELATION is NEW>\n\n\
Use UPDATES when the new memory supersedes a candidate (it replaces stale or contradicted information). \
Use EXTENDS when the new memory adds detail to a candidate without making it stale. \
Use NEW when none of the candidates are meaningfully related."
    )
}

pub async fn classify(
    provider: &dyn LlmProvider,
    new_content: &str,
    candidates: &[Memory],
) -> Result<Classification, ProviderError> {
    if candidates.is_empty() {
        return Ok(Classification::New);
    }

    let prompt = classify_prompt(new_content, candidates);
    let request = CompleteRequest::simple(CLASSIFIER_SYSTEM_PROMPT, prompt);
    let response = provider.complete(request).await?;
    Ok(parse_classification(&response.text(), candidates.len()))
}

pub fn parse_classification(reply: &str, candidate_count: usize) -> Classification {
    let mut relation: Option<String> = None;
    let mut target: Option<usize> = None;
    let mut confidence: f32 = 0.7;

    for line in reply.lines() {
        let line = line.trim();
        if let Some(rest) = strip_key(line, "RELATION:") {
            relation = Some(rest.to_uppercase());
        } else if let Some(rest) = strip_key(line, "TARGET:") {
            if !is_none(rest) {
                target = rest.trim().parse::<usize>().ok();
            }
        } else if let Some(rest) = strip_key(line, "CONFIDENCE:") {
            if !is_none(rest) {
                if let Ok(c) = rest.trim().parse::<f32>() {
                    confidence = c.clamp(0.0, 1.0);
                }
            }
        }
    }

    let target_index = target.filter(|i| *i < candidate_count);

    match (relation.as_deref(), target_index) {
        (Some("UPDATES"), Some(idx)) => Classification::Updates { target_index: idx, confidence },
        (Some("EXTENDS"), Some(idx)) => Classification::Extends { target_index: idx, confidence },
        _ => Classification::New,
    }
}

fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key).map(str::trim)
}

fn is_none(s: &str) -> bool {
    let low = s.trim().to_lowercase();
    low == "none" || low.is_empty()
}
