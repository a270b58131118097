//! Shared test doubles for the end-to-end scenarios. Not a test binary
//! itself — pulled in via `mod support;` from each scenario file.

use async_trait::async_trait;
use memory_core::error::ProviderError;
use memory_core::llm::{CompleteRequest, CompleteResponse, ContentBlock, StopReason, SubAgentExecutor, SubAgentResult, Usage};

/// Routes each `complete` call to a reply chosen by a closure over the
/// request, so one provider double can stand in for classifier, fusion,
/// judge, triage, and reflection calls within the same scenario.
pub struct ScriptedProvider<F>(pub F)
where
    F: Fn(&CompleteRequest) -> String + Send + Sync;

#[async_trait]
impl<F> memory_core::llm::LlmProvider for ScriptedProvider<F>
where
    F: Fn(&CompleteRequest) -> String + Send + Sync,
{
    async fn complete(&self, request: CompleteRequest) -> Result<CompleteResponse, ProviderError> {
        let text = (self.0)(&request);
        Ok(CompleteResponse {
            content: vec![ContentBlock::text(text)],
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
            model: "scripted".to_string(),
        })
    }
}

fn last_user_text(request: &CompleteRequest) -> String {
    request
        .messages
        .last()
        .map(|m| ContentBlock::join_text(&m.content))
        .unwrap_or_default()
}

/// A provider tuned for the classification-update scenario: always reports
/// an UPDATES relation against candidate index 0.
pub fn updates_target_zero() -> ScriptedProvider<impl Fn(&CompleteRequest) -> String + Send + Sync> {
    ScriptedProvider(|_req: &CompleteRequest| "RELATION: UPDATES\nTARGET: 0\nCONFIDENCE: 0.9\n".to_string())
}

/// A provider tuned for NREM fusion: replies with the JSON contract the
/// fusion prompt expects, synthesizing a fixed summary regardless of cluster
/// contents.
pub fn fixed_fusion(text: &'static str) -> ScriptedProvider<impl Fn(&CompleteRequest) -> String + Send + Sync> {
    ScriptedProvider(move |_req: &CompleteRequest| {
        format!(r#"{{"summary": "{text}", "importance": 5, "category": "insight"}}"#)
    })
}

/// A provider tuned for REM judging: always returns the given score.
pub fn fixed_judge_score(score: f32) -> ScriptedProvider<impl Fn(&CompleteRequest) -> String + Send + Sync> {
    ScriptedProvider(move |_req: &CompleteRequest| format!("SCORE: {score}\nREASON: bridges two related threads\n"))
}

/// A provider tuned for gap triage: always accepts.
pub fn always_send() -> ScriptedProvider<impl Fn(&CompleteRequest) -> String + Send + Sync> {
    ScriptedProvider(|_req: &CompleteRequest| "VERDICT: SEND\n".to_string())
}

/// Dispatches by a marker substring in the rendered prompt so one provider
/// can serve several distinct call sites in a single `sleepTick` scenario.
pub fn dispatch_by_marker(
    routes: Vec<(&'static str, &'static str)>,
    default: &'static str,
) -> ScriptedProvider<impl Fn(&CompleteRequest) -> String + Send + Sync> {
    ScriptedProvider(move |req: &CompleteRequest| {
        let prompt = last_user_text(req);
        for (marker, reply) in &routes {
            if prompt.contains(marker) {
                return reply.to_string();
            }
        }
        default.to_string()
    })
}

pub struct NoopExecutor;

#[async_trait]
impl SubAgentExecutor for NoopExecutor {
    async fn run(&self, _goal: &str, _tools: &[String]) -> Result<SubAgentResult, ProviderError> {
        Ok(SubAgentResult { output: String::new(), task_complete: true, iterations_used: 1 })
    }
}
