//! Service configuration, loaded from a TOML file.
//!
//! Every section has workable defaults except the credentials: the index and
//! llm API keys have no default and are validated by the components that
//! consume them. Missing sections fall back wholesale.

use anyhow::{Context, Result};
use counsel_ai_context::prompt::{HistoryWindow, RelevanceThresholds};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub index: IndexConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub prompt: PromptConfig,
    pub conversation: ConversationConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index_name: String,
    pub target_dimension: usize,
    pub namespace: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            index_name: "legal-documents".to_string(),
            target_dimension: counsel_ai_embed::DEFAULT_TARGET_DIMENSION,
            namespace: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: counsel_ai_context::DEFAULT_CHUNK_SIZE,
            overlap: counsel_ai_context::DEFAULT_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub analysis_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            analysis_top_k: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub thresholds: RelevanceThresholds,
    pub history: HistoryWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_messages: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_messages: crate::conversation::DEFAULT_MAX_MESSAGES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: String::new(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

impl RetrieverConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}
