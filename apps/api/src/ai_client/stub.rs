//! Scripted collaborators that count their calls.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AiError, Embedder, JudgeVerdict, PairwiseJudge, Summarizer};

fn outage() -> AiError {
    AiError::Api {
        status: 503,
        message: "stub outage".to_string(),
    }
}

/// Replies from `script` in order, then `fallback` forever. `None` means a failed call.
pub struct StubSummarizer {
    script: Mutex<VecDeque<Option<String>>>,
    fallback: Option<String>,
    calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

impl StubSummarizer {
    pub fn fixed(summary: &str) -> Self {
        Self::scripted(vec![], Some(summary))
    }

    pub fn failing() -> Self {
        Self::scripted(vec![], None)
    }

    pub fn scripted(script: Vec<Option<&str>>, fallback: Option<&str>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(|s| s.map(str::to_string)).collect()),
            fallback: fallback.map(str::to_string),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone()).ok_or_else(outage)
    }
}

pub struct StubEmbedder {
    vector: Option<Vec<f32>>,
    calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

impl StubEmbedder {
    pub fn fixed(vector: Vec<f32>) -> Self {
        Self {
            vector: Some(vector),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            vector: None,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        self.vector.clone().ok_or(AiError::EmptyContent)
    }
}

/// Scores by posting summary; unknown summaries fail like an unreachable judge.
pub struct StubJudge {
    scores: HashMap<String, f64>,
    calls: AtomicUsize,
    pub inputs: Mutex<Vec<(String, String)>>,
}

impl StubJudge {
    pub fn by_posting_summary(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: scores.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self::by_posting_summary(&[])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PairwiseJudge for StubJudge {
    async fn judge(&self, resume: &str, posting: &str) -> Result<JudgeVerdict, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs
            .lock()
            .unwrap()
            .push((resume.to_string(), posting.to_string()));
        self.scores
            .get(posting)
            .map(|&score| JudgeVerdict {
                score,
                reason: format!("scored {score}"),
            })
            .ok_or_else(outage)
    }
}
