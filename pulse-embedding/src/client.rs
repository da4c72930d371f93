//! OpenAI embedding client

use async_openai::{
    config::OpenAIConfig,
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::{
    error::{EmbeddingError, Result},
    provider::EmbeddingProvider,
    types::EmbeddingVector,
};

/// Inputs per API request
const MAX_BATCH_SIZE: usize = 256;

/// OpenAI embedding provider
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    /// Create a new embedding client
    ///
    /// Uses text-embedding-3-small model (1536 dimensions)
    pub fn new(api_key: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }

    /// Get the embedding model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// One API round-trip for up to `MAX_BATCH_SIZE` inputs
    async fn request_chunk(&self, chunk: &[String]) -> Result<Vec<EmbeddingVector>> {
        let request = CreateEmbeddingRequest {
            model: self.model.clone(),
            input: EmbeddingInput::StringArray(chunk.to_vec()),
            encoding_format: None,
            dimensions: None,
            user: None,
        };

        let response = self.client.embeddings().create(request).await?;

        if response.data.len() != chunk.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunk.len(),
                actual: response.data.len(),
            });
        }

        let mut data = response.data;
        data.sort_by_key(|e| e.index);

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            // Validate dimension
            if item.embedding.len() != self.dimension {
                return Err(EmbeddingError::InvalidDimension {
                    expected: self.dimension,
                    actual: item.embedding.len(),
                });
            }
            vectors.push(item.embedding);
        }

        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH_SIZE) {
            debug!("Embedding chunk of {} texts", chunk.len());
            vectors.extend(self.request_chunk(chunk).await?);
        }

        info!(
            "Generated {} embeddings: dimension={}, model={}",
            vectors.len(),
            self.dimension,
            self.model
        );

        Ok(vectors)
    }
}
