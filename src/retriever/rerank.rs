//! AI-assisted reranking of the merged source list, with a deterministic
//! raw-score sort as the fallback path.

use tracing::warn;

use crate::constants::retriever as cfg;
use crate::llm::{self, ChatMessage, ChatOptions, LlmProvider};
use crate::types::RetrievalSource;

/// Sort by `relevance_score` descending, stable on ties (insertion order
/// preserved).
fn sort_by_raw_score(sources: &mut [RetrievalSource]) {
    sources.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap_or(std::cmp::Ordering::Equal));
}

/// Rerank `sources` in place. Short-circuits to a raw-score sort when the
/// source set is small (≤ 3), reranking is disabled, no provider is
/// available, or the provider call fails or times out.
pub async fn rerank(sources: &mut Vec<RetrievalSource>, enabled: bool, provider: Option<&dyn LlmProvider>) {
    if !enabled || sources.len() <= cfg::AI_RERANK_MAX_SOURCES_TO_SKIP {
        sort_by_raw_score(sources);
        return;
    }
    let Some(provider) = provider else {
        sort_by_raw_score(sources);
        return;
    };

    let summaries: Vec<String> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{i}: {}", s.content.chars().take(200).collect::<String>()))
        .collect();
    let prompt = format!(
        "Rank these context snippets from most to least relevant. Respond with a JSON array of their original indices only.\n{}",
        summaries.join("\n")
    );

    let response = llm::call_with_fallback(
        std::time::Duration::from_secs(5),
        provider.chat(&[ChatMessage::user(prompt)], ChatOptions::default()),
    )
    .await;

    let Some(response) = response else {
        sort_by_raw_score(sources);
        return;
    };

    let ranking = match serde_json::from_str::<Vec<usize>>(&response.text) {
        Ok(indices) => indices,
        Err(e) => {
            warn!(error = %e, "failed to parse AI rerank response, falling back to raw-score sort");
            sort_by_raw_score(sources);
            return;
        }
    };

    let mut ranked: Vec<RetrievalSource> = Vec::with_capacity(sources.len());
    let mut taken = vec![false; sources.len()];
    for (position, &idx) in ranking.iter().enumerate() {
        if idx >= sources.len() || taken[idx] {
            continue;
        }
        taken[idx] = true;
        let mut source = sources[idx].clone();
        let decay = 1.0 - cfg::AI_RERANK_POSITION_DECAY * position as f32;
        source.relevance_score = (source.relevance_score * decay.max(0.0)).clamp(0.0, 1.0);
        ranked.push(source);
    }
    for (i, source) in sources.iter().enumerate() {
        if !taken[i] {
            ranked.push(source.clone());
        }
    }
    *sources = ranked;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tier;

    fn source(content: &str, score: f32) -> RetrievalSource {
        RetrievalSource::new(content, Tier::Semantic, score, "test")
    }

    #[tokio::test]
    async fn small_source_set_short_circuits_to_raw_sort() {
        let mut sources = vec![source("a", 0.2), source("b", 0.9)];
        rerank(&mut sources, true, None).await;
        assert_eq!(sources[0].content, "b");
    }

    #[tokio::test]
    async fn disabled_rerank_sorts_by_raw_score() {
        let mut sources = vec![source("a", 0.1), source("b", 0.9), source("c", 0.5), source("d", 0.3)];
        rerank(&mut sources, false, None).await;
        assert_eq!(sources[0].content, "b");
        assert_eq!(sources[1].content, "c");
    }

    #[tokio::test]
    async fn no_provider_falls_back_to_raw_sort() {
        let mut sources = vec![source("a", 0.1), source("b", 0.9), source("c", 0.5), source("d", 0.3)];
        rerank(&mut sources, true, None).await;
        assert_eq!(sources[0].content, "b");
    }
}
