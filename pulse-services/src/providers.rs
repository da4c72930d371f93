//! Signal provider handles
//!
//! Built once at startup and shared by the poller and the request handlers.

use std::sync::Arc;

use pulse_embedding::{EmbeddingProvider, HashingEmbedder, OpenAiEmbedder};
use tracing::info;

use crate::config::PulseConfig;
use crate::entities::{EntityExtractor, HeuristicEntityExtractor};
use crate::keywords::{KeywordExtractor, PhraseExtractor};

#[derive(Clone)]
pub struct SignalProviders {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub entities: Arc<dyn EntityExtractor>,
    pub keywords: Arc<dyn KeywordExtractor>,
}

impl SignalProviders {
    /// OpenAI embeddings when a key is configured, local hashing otherwise
    pub fn from_config(config: &PulseConfig) -> Self {
        let embedder: Arc<dyn EmbeddingProvider> = match &config.openai_api_key {
            Some(key) => Arc::new(OpenAiEmbedder::new(key.clone())),
            None => Arc::new(HashingEmbedder::default()),
        };
        info!(
            "Signal providers ready (embedder: {}, {} dims)",
            embedder.name(),
            embedder.dimension()
        );

        Self {
            embedder,
            ..Self::local()
        }
    }

    /// Fully local providers with no network access
    pub fn local() -> Self {
        Self {
            embedder: Arc::new(HashingEmbedder::default()),
            entities: Arc::new(HeuristicEntityExtractor::new()),
            keywords: Arc::new(PhraseExtractor::new()),
        }
    }
}

impl std::fmt::Debug for SignalProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalProviders")
            .field("embedder", &self.embedder.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falls_back_to_local_embedder() {
        let providers = SignalProviders::from_config(&PulseConfig::default());
        assert_eq!(providers.embedder.name(), "local-hashing");
        assert_eq!(providers.embedder.dimension(), 384);
    }
}
