//! In-memory stand-ins for every boundary of the engine.

use crate::{
    store::{PendingStore, QuestionSource, SubscriberStore},
    transport::{Poll, Receipt, Result as TransportResult, Transport, TransportError},
};
use async_trait::async_trait;
use core::num::NonZeroU64;
use db::error::{Error, Result};
use model::{PollKind, Question, Quiz, Subscriber};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio::sync::Semaphore;

pub fn question(id: &str, tag: &str, choices: &[&str], correct: &[u16]) -> Question {
    Question {
        id: id.into(),
        text: format!("Question {id}?"),
        choices: choices.iter().map(|choice| choice.to_string()).collect(),
        correct: correct.to_vec(),
        tags: vec![tag.to_string()],
    }
}

#[derive(Default)]
pub struct MemorySubscribers {
    rows: Mutex<HashMap<NonZeroU64, Subscriber>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemorySubscribers {
    pub fn insert(&self, sub: Subscriber) {
        self.rows.lock().unwrap().insert(sub.id, sub);
    }

    pub fn row(&self, id: NonZeroU64) -> Option<Subscriber> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    /// Number of successful upserts.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriberStore for MemorySubscribers {
    async fn upsert(&self, sub: &Subscriber) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Fatal);
        }
        self.insert(sub.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Result<Subscriber>>> {
        Ok(self.rows.lock().unwrap().values().cloned().map(Ok).collect())
    }
}

#[derive(Default)]
pub struct MemoryPending {
    entries: Mutex<HashMap<Box<str>, Box<str>>>,
    failing: AtomicBool,
}

impl MemoryPending {
    pub fn insert(&self, token: &str, question: &str) {
        self.entries.lock().unwrap().insert(token.into(), question.into());
    }

    pub fn get(&self, token: &str) -> Option<Box<str>> {
        self.entries.lock().unwrap().get(token).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PendingStore for MemoryPending {
    async fn put(&self, token: &str, question: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Fatal);
        }
        self.insert(token, question);
        Ok(())
    }

    async fn take(&self, token: &str) -> Result<Option<Box<str>>> {
        Ok(self.entries.lock().unwrap().remove(token))
    }
}

pub struct MemoryQuestions {
    questions: Vec<Question>,
    fetches: AtomicUsize,
}

impl MemoryQuestions {
    pub fn new(questions: impl IntoIterator<Item = Question>) -> Self {
        Self { questions: questions.into_iter().collect(), fetches: AtomicUsize::new(0) }
    }

    /// Number of lookups that reached [`QuestionSource::get_question`].
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionSource for MemoryQuestions {
    async fn load_quiz(&self, section: &str) -> Result<Quiz> {
        let questions = self
            .questions
            .iter()
            .filter(|question| question.tags.iter().any(|tag| tag == section))
            .cloned()
            .collect();
        Ok(Quiz::new(section.into(), questions))
    }

    async fn get_question(&self, id: &str) -> Result<Question> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.questions.iter().find(|question| question.id.as_ref() == id).cloned().ok_or(Error::NotFound)
    }
}

/// A successful call made against [`RecordingTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Message(NonZeroU64, String),
    Poll(NonZeroU64, String, Vec<String>, PollKind),
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    next_token: AtomicU64,
    failing: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes every subsequent poll wait for a permit on the returned semaphore.
    pub fn gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn check(&self) -> TransportResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable);
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(&self, to: NonZeroU64, text: &str) -> TransportResult<()> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Message(to, text.to_string()));
        Ok(())
    }

    async fn send_poll(&self, to: NonZeroU64, poll: &Poll<'_>) -> TransportResult<Receipt> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.map_err(|_| TransportError::Unreachable)?.forget();
        }
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Poll(to, poll.prompt.to_string(), poll.options.to_vec(), poll.kind));
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        Ok(Receipt { token: format!("poll-{token}").into_boxed_str(), display_name: Some(format!("channel-{to}")) })
    }
}
