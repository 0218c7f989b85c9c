//! In-memory conversation history, one bounded transcript per session.
//!
//! The store is process-local and unpersisted. Each session keeps at most
//! [`DEFAULT_MAX_MESSAGES`] messages; when full, the oldest messages are
//! evicted first.

use chrono::{DateTime, Utc};
use counsel_ai_context::prompt::MessageRole;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Per-session message cap.
pub const DEFAULT_MAX_MESSAGES: usize = 50;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Document consulted while producing this message, if any
    pub document_id: Option<String>,
}

/// Summary of one session's transcript.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationSummary {
    pub session_id: String,
    pub exists: bool,
    pub message_count: usize,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    /// Distinct documents referenced, in first-mention order
    pub documents_discussed: Vec<String>,
}

#[derive(Clone)]
pub struct ConversationStore {
    sessions: Arc<Mutex<HashMap<String, Vec<ConversationMessage>>>>,
    max_messages: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_MESSAGES)
    }

    pub fn with_capacity(max_messages: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_messages: max_messages.max(1),
        }
    }

    /// Append a message to a session, evicting the oldest message if the
    /// session is at capacity.
    pub fn append(
        &self,
        session_id: &str,
        role: MessageRole,
        content: impl Into<String>,
        document_id: Option<String>,
    ) {
        let message = ConversationMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            document_id,
        };
        let mut sessions = self.sessions.lock().unwrap();
        let transcript = sessions.entry(session_id.to_string()).or_default();
        transcript.push(message);
        if transcript.len() > self.max_messages {
            let excess = transcript.len() - self.max_messages;
            transcript.drain(..excess);
        }
    }

    /// Full transcript for a session, oldest first. Unknown sessions yield
    /// an empty transcript.
    pub fn history(&self, session_id: &str) -> Vec<ConversationMessage> {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    /// The most recent `last_n` messages of a session, oldest first.
    pub fn recent(&self, session_id: &str, last_n: usize) -> Vec<ConversationMessage> {
        let sessions = self.sessions.lock().unwrap();
        let transcript = match sessions.get(session_id) {
            Some(transcript) => transcript,
            None => return Vec::new(),
        };
        let skip = transcript.len().saturating_sub(last_n);
        transcript[skip..].to_vec()
    }

    /// Drop a session's transcript. Returns whether one existed.
    pub fn clear(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(session_id).is_some()
    }

    pub fn summary(&self, session_id: &str) -> ConversationSummary {
        let sessions = self.sessions.lock().unwrap();
        let transcript = sessions.get(session_id);
        let mut documents_discussed = Vec::new();
        if let Some(transcript) = transcript {
            for message in transcript {
                if let Some(document) = &message.document_id {
                    if !documents_discussed.contains(document) {
                        documents_discussed.push(document.clone());
                    }
                }
            }
        }
        ConversationSummary {
            session_id: session_id.to_string(),
            exists: transcript.is_some(),
            message_count: transcript.map_or(0, |t| t.len()),
            first_activity: transcript.and_then(|t| t.first()).map(|m| m.timestamp),
            last_activity: transcript.and_then(|t| t.last()).map(|m| m.timestamp),
            documents_discussed,
        }
    }
}
