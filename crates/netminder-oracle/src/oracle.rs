//! Oracle abstraction
//!
//! The assistant delegates all natural-language understanding and
//! generation to an [`Oracle`]. The production implementation is
//! [`crate::ModelClient`]; [`ScriptedOracle`] is the test double.

use async_trait::async_trait;
use netminder_core::{ChatMessage, NetminderError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Natural-language classification and generation
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Pick one of `labels` for the latest participant message.
    ///
    /// The returned string is whatever the oracle produced; callers parse
    /// it into their closed label type and treat out-of-set output as a
    /// classification failure.
    async fn classify(&self, history: &[ChatMessage], labels: &[&str]) -> Result<String>;

    /// Answer a yes/no question about the conversation so far.
    async fn analyze(&self, history: &[ChatMessage], question: &str) -> Result<bool>;

    /// Produce participant-facing text. `directive` steers the reply and
    /// is appended to the outgoing request, not to the stored history.
    async fn generate(&self, history: &[ChatMessage], directive: &str) -> Result<String>;
}

/// One scripted oracle response
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Returned by `classify`
    Label(String),
    /// Returned by `analyze`
    Verdict(bool),
    /// Returned by `generate`
    Text(String),
}

/// Queue-scripted oracle for tests. Replies are consumed in order; a
/// call that finds the wrong kind of reply (or an empty queue) errors,
/// which makes test scripts self-checking.
#[derive(Clone, Default)]
pub struct ScriptedOracle {
    queue: Arc<Mutex<VecDeque<ScriptedReply>>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_label(self, label: &str) -> Self {
        self.push(ScriptedReply::Label(label.to_string()));
        self
    }

    pub fn then_verdict(self, verdict: bool) -> Self {
        self.push(ScriptedReply::Verdict(verdict));
        self
    }

    pub fn then_text(self, text: &str) -> Self {
        self.push(ScriptedReply::Text(text.to_string()));
        self
    }

    /// Append more replies mid-test
    pub fn push(&self, reply: ScriptedReply) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn pop(&self, expected: &str) -> Result<ScriptedReply> {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| {
                NetminderError::Oracle(format!("Script exhausted; expected {}", expected))
            })
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn classify(&self, _history: &[ChatMessage], _labels: &[&str]) -> Result<String> {
        match self.pop("a label")? {
            ScriptedReply::Label(label) => Ok(label),
            other => Err(NetminderError::Oracle(format!(
                "Script mismatch: wanted a label, got {:?}",
                other
            ))),
        }
    }

    async fn analyze(&self, _history: &[ChatMessage], _question: &str) -> Result<bool> {
        match self.pop("a verdict")? {
            ScriptedReply::Verdict(verdict) => Ok(verdict),
            other => Err(NetminderError::Oracle(format!(
                "Script mismatch: wanted a verdict, got {:?}",
                other
            ))),
        }
    }

    async fn generate(&self, _history: &[ChatMessage], _directive: &str) -> Result<String> {
        match self.pop("text")? {
            ScriptedReply::Text(text) => Ok(text),
            other => Err(NetminderError::Oracle(format!(
                "Script mismatch: wanted text, got {:?}",
                other
            ))),
        }
    }
}
