//! Self-reflection (§4.G): turns a session summary into insight memories
//! plus an updated persona document, in the same key-prefixed-line
//! prompt/parse idiom used for write-path classification.

use chrono::Utc;

use crate::error::{CoreError, Result};
use crate::llm::{CompleteRequest, LlmProvider};
use crate::store::{MemoryQuery, Store};
use crate::types::{Category, LearnedFrom, Memory, Profile, SessionSummary, Source};

const REFLECTION_SYSTEM_PROMPT: &str = "You reflect on a finished conversation session and extract durable \
insights about the user. Answer in the EXACT format shown, one line per field, using NONE when nothing applies.";

#[derive(Debug, Clone, Default)]
pub struct ReflectionInsights {
    pub learned: Vec<String>,
    pub persona_update: Option<String>,
}

pub fn reflection_prompt(summary: &SessionSummary, current_persona: &str) -> String {
    format!(
        "SESSION SUMMARY:\n  {}\n\nCURRENT PERSONA DOCUMENT:\n  {}\n\n\
Answer ALL of the following, each on its own line:\n\n\
LEARNED: <one durable fact or preference learned about the user, or NONE>\n\
LEARNED: <optionally a second, or omit>\n\
PERSONA_UPDATE: <a revised version of the persona document incorporating what changed, or NONE if nothing changed>",
        summary.summary,
        if current_persona.is_empty() { "(no persona yet)" } else { current_persona },
    )
}

pub fn parse_reflection(reply: &str) -> ReflectionInsights {
    let mut insights = ReflectionInsights::default();
    for line in reply.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("LEARNED:") {
            if !is_none(rest) {
                insights.learned.push(rest.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix("PERSONA_UPDATE:") {
            if !is_none(rest) {
                insights.persona_update = Some(rest.trim().to_string());
            }
        }
    }
    insights
}

fn is_none(s: &str) -> bool {
    let low = s.trim().to_lowercase();
    low == "none" || low.is_empty()
}

/// Runs reflection for one finished session: writes an insight memory per
/// learned fact and, if the LLM proposed one, commits an updated persona
/// document (§4.G).
pub async fn reflect(
    store: &Store,
    provider: &dyn LlmProvider,
    summary: &SessionSummary,
) -> Result<ReflectionInsights> {
    let current_profile = store
        .get_profile(&summary.user_id)
        .map_err(CoreError::from)?
        .unwrap_or_else(|| Profile::empty(&summary.user_id));

    let prompt = reflection_prompt(summary, &current_profile.persona_document);
    let request = CompleteRequest::simple(REFLECTION_SYSTEM_PROMPT, prompt);
    let response = provider.complete(request).await.map_err(CoreError::Provider)?;
    let insights = parse_reflection(&response.text());

    for learned in &insights.learned {
        let mut memory = Memory::new(&summary.user_id, learned.clone(), Category::Insight);
        memory.source = Source::Agent;
        memory.learned_from = Some(LearnedFrom::SelfReflection);
        store.add_memory(&memory).map_err(CoreError::from)?;
    }

    if let Some(persona_document) = &insights.persona_update {
        let profile = Profile {
            user_id: summary.user_id.clone(),
            persona_document: persona_document.clone(),
            last_reflected_session_id: Some(summary.session_id.clone()),
            updated_at: Utc::now(),
        };
        store.upsert_profile(&profile).map_err(CoreError::from)?;
    }

    Ok(insights)
}
