//! Conversational and analysis flows over retrieved document context.
//!
//! [`ChatService`] owns the full request path: retrieve relevant chunks,
//! assemble the prompt with bounded history, call the language model, and
//! record both sides of the exchange. Retrieval failures degrade the chat to
//! a documentless answer; a model failure fails the request.

use crate::conversation::ConversationStore;
use crate::error::RetrieverError;
use crate::llm::{LlmClient, LlmReply, parse_reply};
use crate::retrieval::{RetrievalEngine, RetrievedChunk};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use counsel_ai_context::prompt::{HistoryEntry, MessageRole, PromptAssembler, ScoredSection};
use std::sync::Arc;

/// Characters of chunk text included in section previews.
const PREVIEW_CHARS: usize = 200;

const CHAT_SYSTEM_PROMPT: &str = "You are a legal document assistant. Answer using only the \
    provided document sections and conversation history. When the sections do not cover the \
    question, say so rather than guessing.";

/// Canned analysis passes over a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    RiskAnalysis,
    Negotiation,
    Summary,
}

impl AnalysisKind {
    /// The primary retrieval query for this analysis.
    fn primary_query(self) -> &'static str {
        match self {
            Self::RiskAnalysis => {
                "liability indemnification termination penalty breach damages obligations"
            }
            Self::Negotiation => "payment terms renewal pricing exclusivity non-compete license",
            Self::Summary => "parties purpose term scope obligations deliverables",
        }
    }

    fn secondary_queries(self) -> Vec<String> {
        let queries: &[&str] = match self {
            Self::RiskAnalysis => &["warranty disclaimer limitation of liability", "dispute resolution governing law"],
            Self::Negotiation => &["fees compensation discount", "termination for convenience notice period"],
            Self::Summary => &["definitions key dates milestones"],
        };
        queries.iter().map(|q| q.to_string()).collect()
    }

    fn instruction(self) -> &'static str {
        match self {
            Self::RiskAnalysis => {
                "Identify the clauses that expose the client to risk. Respond with a JSON object \
                 with keys \"risks\" (array of {\"clause\", \"severity\", \"explanation\"}) and \
                 \"overall_assessment\" (string)."
            }
            Self::Negotiation => {
                "Identify the terms most worth negotiating. Respond with a JSON object with keys \
                 \"opportunities\" (array of {\"term\", \"current_position\", \"suggestion\"}) \
                 and \"priority_order\" (array of strings)."
            }
            Self::Summary => {
                "Summarize the document. Respond with a JSON object with keys \"parties\", \
                 \"purpose\", \"key_terms\" (array of strings), and \"summary\" (string)."
            }
        }
    }
}

/// What one chat turn produced.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub used_rag: bool,
    pub chunks_retrieved: usize,
    pub relevant_sections: Vec<SectionPreview>,
    /// 1-based index of this user turn in the conversation
    pub conversation_turn: usize,
    pub timestamp: DateTime<Utc>,
}

/// A short preview of one retrieved section, for display alongside the
/// answer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SectionPreview {
    pub chunk_index: usize,
    pub score: f32,
    pub preview: String,
}

/// Result of one analysis pass.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub kind: AnalysisKind,
    pub reply: LlmReply,
    pub chunks_used: usize,
}

pub struct ChatService {
    engine: RetrievalEngine,
    conversations: ConversationStore,
    llm: Arc<dyn LlmClient>,
    assembler: PromptAssembler,
    top_k: usize,
    analysis_top_k: usize,
}

impl ChatService {
    pub fn new(
        engine: RetrievalEngine,
        conversations: ConversationStore,
        llm: Arc<dyn LlmClient>,
        assembler: PromptAssembler,
        top_k: usize,
        analysis_top_k: usize,
    ) -> Self {
        Self {
            engine,
            conversations,
            llm,
            assembler,
            top_k,
            analysis_top_k,
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Answer one user message, grounding it in the named document when
    /// `use_rag` is set.
    pub async fn chat(
        &self,
        session_id: &str,
        message: &str,
        document_id: Option<&str>,
        use_rag: bool,
    ) -> Result<ChatOutcome> {
        if message.trim().is_empty() {
            return Err(RetrieverError::EmptyQuery.into());
        }

        let retrieved = match (use_rag, document_id) {
            (true, Some(document_id)) => {
                match self
                    .engine
                    .retrieve(session_id, document_id, message, &[], self.top_k)
                    .await
                {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        if e.downcast_ref::<RetrieverError>().is_some() {
                            return Err(e);
                        }
                        tracing::warn!(
                            session_id,
                            document_id,
                            error = %e,
                            "retrieval failed, answering without document context"
                        );
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        };

        let sections = scored_sections(&retrieved);
        let history = self.history_entries(session_id);
        let conversation_turn = history.len() / 2 + 1;
        let prompt = self.assembler.assemble(&sections, &history, message);

        let response = self
            .llm
            .generate(&prompt, Some(CHAT_SYSTEM_PROMPT))
            .await
            .context("chat generation failed")?;

        let document = document_id.map(|d| d.to_string());
        self.conversations
            .append(session_id, MessageRole::User, message, document.clone());
        self.conversations
            .append(session_id, MessageRole::Assistant, &response, document);

        Ok(ChatOutcome {
            response,
            used_rag: !retrieved.is_empty(),
            chunks_retrieved: retrieved.len(),
            relevant_sections: previews(&retrieved),
            conversation_turn,
            timestamp: Utc::now(),
        })
    }

    /// Run one canned analysis pass over a stored document.
    ///
    /// Sections are presented in document order. An empty retrieval still
    /// reaches the model, which is instructed to say the document could not
    /// be consulted.
    pub async fn analyze(
        &self,
        session_id: &str,
        document_id: &str,
        kind: AnalysisKind,
    ) -> Result<AnalysisOutcome> {
        let retrieved = self
            .engine
            .retrieve_for_analysis(
                session_id,
                document_id,
                kind.primary_query(),
                &kind.secondary_queries(),
                self.analysis_top_k,
            )
            .await?;

        let sections = scored_sections(&retrieved);
        let context = self.assembler.assemble_analysis(&sections);
        let prompt = format!("{}\n\nDocument sections:\n\n{}", kind.instruction(), context);

        let raw = self
            .llm
            .generate(&prompt, Some(CHAT_SYSTEM_PROMPT))
            .await
            .context("analysis generation failed")?;

        Ok(AnalysisOutcome {
            kind,
            reply: parse_reply(&raw),
            chunks_used: retrieved.len(),
        })
    }

    fn history_entries(&self, session_id: &str) -> Vec<HistoryEntry> {
        self.conversations
            .history(session_id)
            .into_iter()
            .map(|m| HistoryEntry {
                role: m.role,
                content: m.content,
            })
            .collect()
    }
}

fn scored_sections(retrieved: &[RetrievedChunk]) -> Vec<ScoredSection> {
    retrieved
        .iter()
        .map(|chunk| ScoredSection {
            chunk_index: chunk.metadata.chunk_index,
            text: chunk.metadata.text.clone(),
            score: chunk.score,
        })
        .collect()
}

fn previews(retrieved: &[RetrievedChunk]) -> Vec<SectionPreview> {
    retrieved
        .iter()
        .map(|chunk| SectionPreview {
            chunk_index: chunk.metadata.chunk_index,
            score: chunk.score,
            preview: chunk.metadata.text.chars().take(PREVIEW_CHARS).collect(),
        })
        .collect()
}
