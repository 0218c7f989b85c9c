//! Prompt assembly for the language-model collaborator.
//!
//! Retrieval produces scored document sections; the conversation store
//! produces prior turns. This module folds both into a single prompt body.
//! It is purely a formatting layer: no I/O, no state, and the same inputs
//! always produce the same string.
//!
//! Two branches exist. When at least one document section was retrieved, the
//! prompt instructs the model to ground its answer in the supplied sections
//! and cite them. When nothing was retrieved, the prompt switches to a
//! general-knowledge mode with an explicit disclaimer that no document was
//! consulted. Branch selection depends only on whether the section list is
//! empty.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "User"),
            MessageRole::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One prior conversation turn, as seen by the assembler.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub role: MessageRole,
    pub content: String,
}

/// A retrieved document section with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredSection {
    pub chunk_index: usize,
    pub text: String,
    pub score: f32,
}

/// Score cutoffs separating relevance tiers.
///
/// The defaults (0.7 / 0.5) are heuristic constants carried over from the
/// production deployment; they are configuration, not learned values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RelevanceThresholds {
    pub high: f32,
    pub moderate: f32,
}

impl Default for RelevanceThresholds {
    fn default() -> Self {
        Self {
            high: 0.7,
            moderate: 0.5,
        }
    }
}

/// Relevance annotation attached to each rendered section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevanceTier {
    High,
    Moderate,
    ContextOnly,
}

impl RelevanceTier {
    /// Classify a similarity score against the configured thresholds.
    pub fn from_score(score: f32, thresholds: &RelevanceThresholds) -> Self {
        if score > thresholds.high {
            RelevanceTier::High
        } else if score > thresholds.moderate {
            RelevanceTier::Moderate
        } else {
            RelevanceTier::ContextOnly
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelevanceTier::High => "high relevance",
            RelevanceTier::Moderate => "moderate relevance",
            RelevanceTier::ContextOnly => "context only",
        }
    }
}

/// Bounds on how much conversation history enters the prompt.
///
/// Only the most recent `max_messages` turns are included, oldest first, and
/// each turn is cut to `max_chars` characters. This protects prompt size; it
/// makes no judgment about which turns matter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryWindow {
    pub max_messages: usize,
    pub max_chars: usize,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            max_messages: 6,
            max_chars: 300,
        }
    }
}

/// Formats retrieved sections and bounded history into one prompt body.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    thresholds: RelevanceThresholds,
    window: HistoryWindow,
}

impl PromptAssembler {
    pub fn new(thresholds: RelevanceThresholds, window: HistoryWindow) -> Self {
        Self { thresholds, window }
    }

    pub fn history_window(&self) -> HistoryWindow {
        self.window
    }

    /// Build the chat prompt for one user turn.
    ///
    /// `sections` should already be capped and ranked by the retrieval
    /// engine; this method only formats. History is windowed and truncated
    /// per [`HistoryWindow`].
    pub fn assemble(
        &self,
        sections: &[ScoredSection],
        history: &[HistoryEntry],
        current_message: &str,
    ) -> String {
        let mut prompt = String::new();

        let recent = windowed(history, self.window.max_messages);
        if !recent.is_empty() {
            prompt.push_str("Conversation so far:\n");
            for entry in recent {
                let content = truncate_chars(&entry.content, self.window.max_chars);
                prompt.push_str(&format!("{}: {}\n", entry.role, content));
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!("User question: {current_message}\n\n"));

        if sections.is_empty() {
            prompt.push_str(
                "No document content is available for this question. Answer from \
                 general legal knowledge, and state clearly that no uploaded \
                 document was consulted.\n",
            );
        } else {
            prompt.push_str("Relevant document content:\n");
            for section in sections {
                let tier = RelevanceTier::from_score(section.score, &self.thresholds);
                prompt.push_str(&format!(
                    "[Section {}] ({}, score {:.2}):\n{}\n\n",
                    section.chunk_index,
                    tier.label(),
                    section.score,
                    section.text
                ));
            }
            prompt.push_str(
                "Answer the user's question based on the document sections above. \
                 Cite section numbers where possible. If the sections do not \
                 contain the answer, say so rather than guessing.\n",
            );
        }

        prompt
    }

    /// Build the document-context block for structured analysis.
    ///
    /// Sections are rendered in the order given; analysis callers pass them
    /// sorted by `chunk_index` so the model reads the document in its
    /// original order. Section headers are 1-based for readability.
    pub fn assemble_analysis(&self, sections: &[ScoredSection]) -> String {
        sections
            .iter()
            .map(|s| format!("SECTION {}:\n{}", s.chunk_index + 1, s.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn windowed(history: &[HistoryEntry], max_messages: usize) -> &[HistoryEntry] {
    let skip = history.len().saturating_sub(max_messages);
    &history[skip..]
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
