//! Tag-overlap knowledge search.

use callpilot_types::KnowledgeDocument;

/// Number of documents returned when the caller does not specify one.
pub const DEFAULT_TOP_K: usize = 3;

/// Counts how many of the document's tags occur as a literal substring of the
/// already-lowercased query.
pub fn score_document(doc: &KnowledgeDocument, query_lower: &str) -> usize {
    doc.tags
        .iter()
        .filter(|tag| !tag.is_empty() && query_lower.contains(tag.as_str()))
        .count()
}

/// An immutable, ordered corpus of knowledge articles.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    documents: Vec<KnowledgeDocument>,
}

impl KnowledgeBase {
    /// Creates a knowledge base over the given documents. Corpus order is
    /// preserved and used as the tie-breaker when ranking.
    pub fn new(documents: Vec<KnowledgeDocument>) -> Self {
        Self { documents }
    }

    /// Returns the knowledge base seeded with the default insurance corpus.
    pub fn with_default_corpus() -> Self {
        Self::new(crate::corpus::knowledge_documents())
    }

    /// Returns every document in corpus order.
    pub fn documents(&self) -> &[KnowledgeDocument] {
        &self.documents
    }

    /// Returns up to `top_k` documents with a positive score, highest score
    /// first. Equal scores keep corpus order.
    ///
    /// An empty query, `top_k == 0`, or a query without any tag hit yields an
    /// empty result.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<KnowledgeDocument> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<(usize, &KnowledgeDocument)> = self
            .documents
            .iter()
            .map(|doc| (score_document(doc, &query_lower), doc))
            .filter(|(score, _)| *score > 0)
            .collect();

        // `sort_by` is stable, so ties stay in corpus order.
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        tracing::debug!(
            candidates = candidates.len(),
            top_k,
            "knowledge search scored corpus"
        );

        candidates
            .into_iter()
            .take(top_k)
            .map(|(_, doc)| doc.clone())
            .collect()
    }
}
