//! Optional LLM rerank pass over the fused candidate list (§4.C).

use crate::error::ProviderError;
use crate::llm::{CompleteRequest, LlmProvider};
use crate::types::Memory;

const RERANK_SYSTEM_PROMPT: &str = "You rank candidate memories by relevance to a search query. \
Reply with a comma-separated list of candidate indices, most relevant first. Include every index exactly once.";

/// Reranks `candidates` (already fused and truncated to a manageable size)
/// against `query` using the provider. On any parse failure, falls back to
/// the input order rather than failing the search.
pub async fn rerank(
    provider: &dyn LlmProvider,
    query: &str,
    candidates: &[Memory],
) -> Result<Vec<usize>, ProviderError> {
    if candidates.len() <= 1 {
        return Ok((0..candidates.len()).collect());
    }

    let mut prompt = format!("Query: {query}\n\nCandidates:\n");
    for (i, c) in candidates.iter().enumerate() {
        prompt.push_str(&format!("{i}. {}\n", c.content));
    }

    let request = CompleteRequest::simple(RERANK_SYSTEM_PROMPT, prompt);
    let response = provider.complete(request).await?;
    let text = response.text();

    match parse_rerank_order(&text, candidates.len()) {
        Some(order) => Ok(order),
        None => {
            tracing::warn!(reply = %text, "rerank reply did not parse, keeping fused order");
            Ok((0..candidates.len()).collect())
        }
    }
}

fn parse_rerank_order(text: &str, count: usize) -> Option<Vec<usize>> {
    let mut seen = vec![false; count];
    let mut order = Vec::with_capacity(count);

    for token in text.split(|c: char| c == ',' || c.is_whitespace()) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Ok(idx) = token.parse::<usize>() {
            if idx < count && !seen[idx] {
                seen[idx] = true;
                order.push(idx);
            }
        }
    }

    if order.len() == count {
        Some(order)
    } else {
        None
    }
}
