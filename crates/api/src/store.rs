//! Persistence seams used by the engine. [`Database`] implements all of them;
//! tests swap in the in-memory versions from `crate::testing`.

use alloc::{boxed::Box, vec::Vec};
use async_trait::async_trait;
use db::{error::Result, Database, TryStreamExt};
use model::{Question, Quiz, Subscriber};

/// Durable mirror of the subscriber registry.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Inserts or replaces the full row for `subscriber`.
    async fn upsert(&self, subscriber: &Subscriber) -> Result<()>;
    /// Reads every persisted row. Malformed rows are reported individually.
    async fn scan(&self) -> Result<Vec<Result<Subscriber>>>;
}

/// Token to question association for polls awaiting an answer.
#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn put(&self, token: &str, question: &str) -> Result<()>;
    /// Atomically looks up and deletes the entry for `token`. Of any number of
    /// concurrent callers for the same token, at most one observes `Some`.
    async fn take(&self, token: &str) -> Result<Option<Box<str>>>;
}

/// Read-only access to the question corpus.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Loads the well-formed questions tagged with `section`.
    async fn load_quiz(&self, section: &str) -> Result<Quiz>;
    async fn get_question(&self, id: &str) -> Result<Question>;
}

#[async_trait]
impl SubscriberStore for Database {
    async fn upsert(&self, subscriber: &Subscriber) -> Result<()> {
        self.upsert_subscriber(subscriber).await
    }

    async fn scan(&self) -> Result<Vec<Result<Subscriber>>> {
        self.get_subscribers().await
    }
}

#[async_trait]
impl PendingStore for Database {
    async fn put(&self, token: &str, question: &str) -> Result<()> {
        self.put_pending(token, question).await
    }

    async fn take(&self, token: &str) -> Result<Option<Box<str>>> {
        self.take_pending(token).await
    }
}

#[async_trait]
impl QuestionSource for Database {
    async fn load_quiz(&self, section: &str) -> Result<Quiz> {
        let rows: Vec<_> = self.get_questions_by_tag(section).await?.try_collect().await?;
        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            match row {
                Ok(question) if question.is_well_formed() => questions.push(question),
                Ok(question) => log::warn!("skipping malformed question {} in section {section}", question.id),
                Err(err) => log::warn!("skipping unreadable question in section {section}: {err}"),
            }
        }
        Ok(Quiz::new(section.into(), questions))
    }

    async fn get_question(&self, id: &str) -> Result<Question> {
        Database::get_question(self, id).await
    }
}
