//! Deduplication and context-block assembly: the last two steps of the
//! retriever's algorithm, after fan-out and reranking.

use std::collections::BTreeMap;

use crate::constants::retriever as cfg;
use crate::types::RetrievalSource;

/// Drop sources sharing the same lowercased first-100-char prefix,
/// preserving first-seen order, then cap at `maxTotalResults`.
#[must_use]
pub fn dedup(sources: Vec<RetrievalSource>) -> Vec<RetrievalSource> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped: Vec<RetrievalSource> = sources
        .into_iter()
        .filter(|s| seen.insert(s.dedup_key(cfg::DEDUP_PREFIX_CHARS)))
        .collect();
    deduped.truncate(cfg::MAX_TOTAL_RESULTS);
    deduped
}

/// Group by `tier.displayName` in lexicographic order, render `• content`
/// lines per group, join groups with a blank line, header `**<tier>:**`.
#[must_use]
pub fn build_context_block(sources: &[RetrievalSource]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let mut groups: BTreeMap<&'static str, Vec<&str>> = BTreeMap::new();
    for source in sources {
        groups.entry(source.tier.display_name()).or_default().push(&source.content);
    }

    let blocks: Vec<String> = groups
        .into_iter()
        .map(|(header, lines)| {
            let body: String = lines.iter().map(|l| format!("• {l}")).collect::<Vec<_>>().join("\n");
            format!("**{header}:**\n{body}")
        })
        .collect();

    blocks.join("\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tier;

    #[test]
    fn dedup_drops_shared_prefix_keeping_first() {
        let prefix = "the quarterly planning review covered budget allocations staffing changes and roadmap priorities for next year";
        let sources = vec![
            RetrievalSource::new(format!("{prefix} in the engineering org"), Tier::Semantic, 0.5, "a"),
            RetrievalSource::new(format!("{prefix} in the sales org"), Tier::Episodic, 0.9, "b"),
        ];
        let deduped = dedup(sources);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].origin, "a");
    }

    #[test]
    fn context_block_groups_lexicographically() {
        let sources = vec![
            RetrievalSource::new("likes coffee", Tier::Semantic, 0.5, "a"),
            RetrievalSource::new("met alice yesterday", Tier::Episodic, 0.5, "b"),
        ];
        let block = build_context_block(&sources);
        assert!(block.starts_with("**Episodic Memory:**"));
        assert!(block.contains("**Semantic Memory:**"));
    }

    #[test]
    fn empty_sources_yield_empty_block() {
        assert_eq!(build_context_block(&[]), "");
    }
}
