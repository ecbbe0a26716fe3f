//! Matches answers back to the polls they belong to.

use crate::{corpus::Corpus, registry::Registry, store::PendingStore};
use alloc::{boxed::Box, sync::Arc, vec::Vec};
use chrono::{DateTime, Utc};
use core::num::NonZeroU64;
use model::Verdict;

/// An answer reported by the transport.
#[derive(Clone, Debug)]
pub struct Answer {
    /// Token of the poll being answered.
    pub token: Box<str>,
    /// Choice indices picked by the subscriber, in any order.
    pub picked: Vec<u16>,
    pub subscriber: NonZeroU64,
}

pub struct Correlator {
    registry: Arc<Registry>,
    corpus: Arc<Corpus>,
    pending: Arc<dyn PendingStore>,
}

impl Correlator {
    pub fn new(registry: Arc<Registry>, corpus: Arc<Corpus>, pending: Arc<dyn PendingStore>) -> Self {
        Self { registry, corpus, pending }
    }

    /// Grades `answer` if its poll is still pending. Returns `None` for
    /// unknown, expired, or already resolved tokens.
    pub async fn resolve(&self, answer: Answer, now: DateTime<Utc>) -> Option<Verdict> {
        let Answer { token, picked, subscriber } = answer;
        let question = match self.pending.take(&token).await {
            Ok(Some(question)) => question,
            Ok(None) => {
                log::debug!("no pending poll for token {token}");
                return None;
            }
            Err(err) => {
                log::error!("failed to take pending poll {token}: {err}");
                return None;
            }
        };

        // The entry is gone from here on. Any failure below loses this answer.
        let question = match self.corpus.question(&question).await {
            Ok(question) => question,
            Err(err) => {
                log::error!("poll {token} refers to unavailable question {question}: {err}");
                return None;
            }
        };

        let verdict = question.grade(&picked);
        log::debug!("subscriber {subscriber} answered {} (correct: {})", question.id, verdict.correct);
        if self.registry.update(subscriber, |sub| sub.record_answer(verdict.correct, now)).await.is_none() {
            log::warn!("answer to {token} came from unregistered subscriber {subscriber}");
        }
        Some(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        registry::Defaults,
        testing::{question, MemoryPending, MemoryQuestions, MemorySubscribers},
    };
    use chrono::{TimeDelta, TimeZone};

    struct Fixture {
        registry: Arc<Registry>,
        pending: Arc<MemoryPending>,
        subscribers: Arc<MemorySubscribers>,
        correlator: Arc<Correlator>,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn id() -> NonZeroU64 {
        NonZeroU64::new(11).unwrap()
    }

    async fn fixture() -> Fixture {
        let subscribers = Arc::new(MemorySubscribers::default());
        let defaults = Defaults { section: String::from("network+"), interval: TimeDelta::hours(1) };
        let registry = Arc::new(Registry::new(subscribers.clone(), defaults));
        let source = MemoryQuestions::new([
            question("abc", "network+", &["A", "B", "C"], &[1]),
            question("multi", "network+", &["W", "X", "Y", "Z"], &[0, 2]),
            question("archived", "retired", &["yes", "no"], &[0]),
        ]);
        let corpus = Arc::new(Corpus::load(Arc::new(source), &["network+"]).await);
        let pending = Arc::new(MemoryPending::default());
        let correlator = Arc::new(Correlator::new(registry.clone(), corpus, pending.clone()));
        registry.register(id(), t0()).await;
        // Pretend a few polls went out.
        for _ in 0..3 {
            registry.update(id(), |sub| sub.record_sent(None)).await;
        }
        Fixture { registry, pending, subscribers, correlator }
    }

    fn answer(token: &str, picked: &[u16]) -> Answer {
        Answer { token: token.into(), picked: picked.to_vec(), subscriber: id() }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn correct_answer_is_counted_once() {
        let fx = fixture().await;
        fx.pending.insert("t1", "abc");

        let now = t0() + TimeDelta::minutes(3);
        let verdict = fx.correlator.resolve(answer("t1", &[1]), now).await.unwrap();
        assert!(verdict.correct);
        assert!(fx.pending.is_empty());

        let sub = fx.registry.get(id()).await.unwrap();
        assert_eq!((sub.questions_asked, sub.questions_correct), (1, 1));
        assert_eq!(sub.last_answered_at, Some(now));
        assert_eq!(fx.subscribers.row(id()), Some(sub.clone()));

        // Duplicate event
        assert_eq!(fx.correlator.resolve(answer("t1", &[1]), now).await, None);
        assert_eq!(fx.registry.get(id()).await, Some(sub));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn incorrect_answer_lists_the_solution() {
        let fx = fixture().await;
        fx.pending.insert("t1", "abc");
        let verdict = fx.correlator.resolve(answer("t1", &[0]), t0()).await.unwrap();
        assert!(!verdict.correct);
        assert!(verdict.feedback.contains("B"));

        let sub = fx.registry.get(id()).await.unwrap();
        assert_eq!((sub.questions_asked, sub.questions_correct), (1, 0));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn multi_select_is_order_independent() {
        let fx = fixture().await;
        fx.pending.insert("t1", "multi");
        assert!(fx.correlator.resolve(answer("t1", &[2, 0]), t0()).await.unwrap().correct);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unknown_token_is_ignored() {
        let fx = fixture().await;
        assert_eq!(fx.correlator.resolve(answer("nope", &[1]), t0()).await, None);
        assert_eq!(fx.registry.get(id()).await.unwrap().questions_asked, 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn uncached_questions_are_fetched() {
        let fx = fixture().await;
        fx.pending.insert("t1", "archived");
        assert!(fx.correlator.resolve(answer("t1", &[0]), t0()).await.unwrap().correct);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_duplicates_resolve_once() {
        let fx = fixture().await;
        fx.pending.insert("t1", "abc");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let correlator = fx.correlator.clone();
                tokio::spawn(async move { correlator.resolve(answer("t1", &[1]), t0()).await })
            })
            .collect();

        let mut resolved = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                resolved += 1;
            }
        }
        assert_eq!(resolved, 1);
        assert_eq!(fx.registry.get(id()).await.unwrap().questions_asked, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn persistence_failure_still_consumes_the_token() {
        let fx = fixture().await;
        fx.pending.insert("t1", "abc");
        fx.subscribers.set_failing(true);

        assert!(fx.correlator.resolve(answer("t1", &[1]), t0()).await.is_some());
        assert!(fx.pending.is_empty());
        assert_eq!(fx.registry.get(id()).await.unwrap().questions_asked, 1);
        assert_eq!(fx.subscribers.row(id()).unwrap().questions_asked, 0);
        assert_eq!(fx.correlator.resolve(answer("t1", &[1]), t0()).await, None);
    }
}
