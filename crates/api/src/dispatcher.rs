//! Turns questions into polls and keeps track of what was sent where.

use crate::{
    corpus::Corpus,
    error::{Error, Result},
    registry::Registry,
    store::PendingStore,
    transport::{Poll, Receipt, Transport},
};
use alloc::sync::Arc;
use core::num::NonZeroU64;
use model::{prompt, Question};

pub struct Dispatcher {
    registry: Arc<Registry>,
    corpus: Arc<Corpus>,
    pending: Arc<dyn PendingStore>,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        corpus: Arc<Corpus>,
        pending: Arc<dyn PendingStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self { registry, corpus, pending, transport }
    }

    /// Draws a question from the subscriber's current section and sends it.
    pub async fn deliver(&self, id: NonZeroU64) -> Result<Receipt> {
        let sub = self.registry.get(id).await.ok_or(Error::UnknownSubscriber)?;
        let quiz = self.corpus.quiz(&sub.section).ok_or(Error::UnknownSection)?;
        let question = {
            let mut rng = rand::rng();
            quiz.pick(&mut rng)?.clone()
        };
        self.send(id, &question).await
    }

    /// Sends `question` to the subscriber. Nothing is recorded unless every
    /// message went through.
    pub async fn send(&self, id: NonZeroU64, question: &Question) -> Result<Receipt> {
        let prompt::Prompt { preamble, prompt } = prompt::split(&question.text);
        for chunk in preamble {
            self.transport.send_message(id, chunk).await?;
        }

        let poll = Poll { prompt, options: &question.choices, kind: question.poll_kind() };
        let receipt = self.transport.send_poll(id, &poll).await?;
        log::debug!("sent question {} to {id} as {}", question.id, receipt.token);

        // The poll must be counted before it becomes answerable.
        let name = receipt.display_name.as_deref();
        let counted = self.registry.update(id, |sub| sub.record_sent(name)).await.is_some();

        if let Err(err) = self.pending.put(&receipt.token, &question.id).await {
            log::error!("failed to record pending poll {} for {id}: {err}", receipt.token);
        }

        if counted {
            Ok(receipt)
        } else {
            Err(Error::UnknownSubscriber)
        }
    }
}
