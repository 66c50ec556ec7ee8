//! Seeded FAQ knowledge base for Indian personal finance.
//!
//! Populated once at startup. Question embeddings are optional: when the
//! provider cannot embed, the index still answers keyword lookups.

use crate::vector::cosine_similarity;
use finguru_core::provider::{EmbeddingRequest, Provider};
use finguru_core::ProviderError;
use serde::Serialize;
use tracing::{info, warn};

/// One question/answer pair.
#[derive(Debug, Clone, Serialize)]
pub struct FaqEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

/// A scored lookup hit.
#[derive(Debug, Clone, Serialize)]
pub struct FaqMatch {
    pub entry: FaqEntry,
    pub score: f32,
}

const SEED: &[(&str, &str)] = &[
    (
        "How do I start investing in India?",
        "• Open demat account with bank/broker\n• Complete KYC documents\n• Start with ELSS for tax saving\n• Begin SIP in large-cap fund\n• Keep 6-month emergency fund",
    ),
    (
        "How much should I save for retirement in India?",
        "• Save 15-20% of income for retirement\n• Use NPS for additional tax benefits\n• Invest in PPF for safe long-term growth\n• Consider equity funds for inflation beating returns\n• Start early for compounding benefits",
    ),
    (
        "What is emergency fund?",
        "• 6-12 months of living expenses\n• Keep in savings account or liquid funds\n• Covers medical emergencies, job loss\n• Should be easily accessible\n• Don't invest emergency fund in equity",
    ),
    (
        "What tax-saving investments are available?",
        "• ELSS mutual funds (₹1.5L under 80C)\n• PPF (₹1.5L under 80C)\n• NPS (₹50K additional under 80CCD)\n• Health insurance premiums\n• Home loan principal repayment",
    ),
    (
        "What is SIP?",
        "• Systematic Investment Plan in mutual funds\n• Invest fixed amount monthly\n• Benefits from rupee cost averaging\n• Builds discipline in investing\n• Start with ₹500-1000 per month",
    ),
];

/// In-memory FAQ store.
#[derive(Debug, Clone, Default)]
pub struct FaqIndex {
    entries: Vec<FaqEntry>,
}

impl FaqIndex {
    /// An index holding the built-in FAQ set, not yet embedded.
    pub fn seeded() -> Self {
        let entries = SEED
            .iter()
            .enumerate()
            .map(|(i, (question, answer))| FaqEntry {
                id: format!("id_{i}"),
                question: (*question).into(),
                answer: (*answer).into(),
                embedding: None,
            })
            .collect();
        Self { entries }
    }

    /// Embed every question with `provider`.
    ///
    /// On failure the index is left without embeddings and the error is returned.
    pub async fn build_embeddings(
        &mut self,
        provider: &dyn Provider,
        model: &str,
    ) -> Result<usize, ProviderError> {
        let request = EmbeddingRequest {
            model: model.into(),
            inputs: self.entries.iter().map(|e| e.question.clone()).collect(),
        };

        let response = match provider.embed(request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = %provider.name(), error = %e, "FAQ embedding failed");
                return Err(e);
            }
        };

        if response.embeddings.len() != self.entries.len() {
            return Err(ProviderError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                self.entries.len(),
                response.embeddings.len()
            )));
        }

        for (entry, embedding) in self.entries.iter_mut().zip(response.embeddings) {
            entry.embedding = Some(embedding);
        }
        info!(count = self.entries.len(), model, "FAQ questions embedded");
        Ok(self.entries.len())
    }

    /// Whether every entry carries an embedding.
    pub fn is_embedded(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.embedding.is_some())
    }

    /// Closest entries to `query` by cosine similarity, best first.
    pub fn nearest(&self, query: &[f32], limit: usize) -> Vec<FaqMatch> {
        let mut scored: Vec<FaqMatch> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let emb = entry.embedding.as_ref()?;
                Some(FaqMatch {
                    score: cosine_similarity(emb, query),
                    entry: entry.clone(),
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    /// Entries whose question shares words with `text`, ranked by overlap.
    pub fn keyword_search(&self, text: &str, limit: usize) -> Vec<FaqMatch> {
        let query_words: Vec<String> = words(text).filter(|w| w.len() > 2).collect();
        if query_words.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<FaqMatch> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let question_words: Vec<String> = words(&entry.question).collect();
                let hits = query_words
                    .iter()
                    .filter(|w| question_words.contains(w))
                    .count();
                (hits > 0).then(|| FaqMatch {
                    score: hits as f32 / query_words.len() as f32,
                    entry: entry.clone(),
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use finguru_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    /// Embeds text as a bag of three marker words.
    struct MarkerEmbedder;

    fn marker_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        ["sip", "retirement", "emergency"]
            .iter()
            .map(|m| if lower.contains(m) { 1.0 } else { 0.0 })
            .chain(std::iter::once(0.1))
            .collect()
    }

    #[async_trait]
    impl Provider for MarkerEmbedder {
        fn name(&self) -> &str {
            "marker"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("completion".into()))
        }

        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: request.inputs.iter().map(|t| marker_vector(t)).collect(),
                model: request.model,
            })
        }
    }

    struct NoEmbeddings;

    #[async_trait]
    impl Provider for NoEmbeddings {
        fn name(&self) -> &str {
            "plain"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("completion".into()))
        }
    }

    #[test]
    fn seeded_with_five_entries() {
        let index = FaqIndex::seeded();
        assert_eq!(index.len(), 5);
        assert_eq!(index.entries()[4].question, "What is SIP?");
        assert_eq!(index.entries()[0].id, "id_0");
        assert!(!index.is_embedded());
    }

    #[tokio::test]
    async fn embeddings_enable_nearest_lookup() {
        let mut index = FaqIndex::seeded();
        let count = index.build_embeddings(&MarkerEmbedder, "marker-embed").await.unwrap();
        assert_eq!(count, 5);
        assert!(index.is_embedded());

        let hits = index.nearest(&marker_vector("tell me about emergency savings"), 1);
        assert_eq!(hits[0].entry.question, "What is emergency fund?");
    }

    #[tokio::test]
    async fn embedding_failure_is_reported_and_harmless() {
        let mut index = FaqIndex::seeded();
        let result = index.build_embeddings(&NoEmbeddings, "none").await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
        assert!(!index.is_embedded());
        assert!(index.nearest(&[1.0, 0.0, 0.0, 0.1], 3).is_empty());
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn keyword_search_ranks_overlap() {
        let index = FaqIndex::seeded();
        let hits = index.keyword_search("how much to save for retirement?", 2);
        assert_eq!(
            hits[0].entry.question,
            "How much should I save for retirement in India?"
        );
    }

    #[test]
    fn keyword_search_ignores_short_words() {
        let index = FaqIndex::seeded();
        assert!(index.keyword_search("is a", 5).is_empty());
    }
}
