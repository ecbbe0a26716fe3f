#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod error;

use alloc::{boxed::Box, string::String, vec::Vec};
use chrono::{DateTime, TimeDelta, Utc};
use core::num::NonZeroU64;
use tokio_postgres::Row;

pub use futures_util::{TryStream, TryStreamExt};
pub use model::{Question, Subscriber};
pub use tokio_postgres::{tls::NoTls, Client, Config};

pub struct Database(Client);

impl From<Client> for Database {
    fn from(client: Client) -> Self {
        Self(client)
    }
}

fn deserialize_subscriber_from_row(row: &Row) -> error::Result<Subscriber> {
    let id: i64 = row.try_get("id").map_err(|_| error::Error::Fatal)?;
    let interval: i64 = row.try_get("interval_secs").map_err(|_| error::Error::Fatal)?;
    let next_delivery_at: DateTime<Utc> = row.try_get("next_delivery_at").map_err(|_| error::Error::Fatal)?;
    let last_answered_at: Option<DateTime<Utc>> = row.try_get("last_answered_at").map_err(|_| error::Error::Fatal)?;
    let section: String = row.try_get("section").map_err(|_| error::Error::Fatal)?;
    let sent: i32 = row.try_get("questions_sent").map_err(|_| error::Error::Fatal)?;
    let asked: i32 = row.try_get("questions_asked").map_err(|_| error::Error::Fatal)?;
    let correct: i32 = row.try_get("questions_correct").map_err(|_| error::Error::Fatal)?;
    let display_name: Option<String> = row.try_get("display_name").map_err(|_| error::Error::Fatal)?;

    let id = NonZeroU64::new(id as u64).ok_or(error::Error::Malformed)?;
    let interval =
        TimeDelta::try_seconds(interval).filter(|delta| *delta > TimeDelta::zero()).ok_or(error::Error::Malformed)?;
    let counter = |value: i32| u32::try_from(value).map_err(|_| error::Error::Malformed);
    Ok(Subscriber {
        id,
        interval,
        next_delivery_at,
        last_answered_at,
        section,
        questions_sent: counter(sent)?,
        questions_asked: counter(asked)?,
        questions_correct: counter(correct)?,
        display_name,
    })
}

fn deserialize_question_from_row(row: &Row) -> error::Result<Question> {
    let id: String = row.try_get("id").map_err(|_| error::Error::Fatal)?;
    let text = row.try_get("text").map_err(|_| error::Error::Fatal)?;
    let choices = row.try_get("choices").map_err(|_| error::Error::Fatal)?;
    let answers: Vec<i16> = row.try_get("answers").map_err(|_| error::Error::Fatal)?;
    let tags = row.try_get("tags").map_err(|_| error::Error::Fatal)?;

    let correct = answers
        .into_iter()
        .map(u16::try_from)
        .collect::<Result<_, _>>()
        .map_err(|_| error::Error::Malformed)?;
    let question = Question { id: id.into_boxed_str(), text, choices, correct, tags };
    if question.correct.is_empty() {
        return Err(error::Error::Malformed);
    }
    Ok(question)
}

impl Database {
    pub async fn upsert_subscriber(&self, sub: &Subscriber) -> error::Result<()> {
        let id = sub.id.get() as i64;
        let interval = sub.interval.num_seconds();
        let counter = |value: u32| i32::try_from(value).map_err(|_| error::Error::Malformed);
        let sent = counter(sub.questions_sent)?;
        let asked = counter(sub.questions_asked)?;
        let correct = counter(sub.questions_correct)?;
        let rows = self
            .0
            .execute(
                "INSERT INTO subscriber (id, interval_secs, next_delivery_at, last_answered_at, section, \
                 questions_sent, questions_asked, questions_correct, display_name) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 ON CONFLICT (id) DO UPDATE SET \
                 interval_secs = EXCLUDED.interval_secs, \
                 next_delivery_at = EXCLUDED.next_delivery_at, \
                 last_answered_at = EXCLUDED.last_answered_at, \
                 section = EXCLUDED.section, \
                 questions_sent = EXCLUDED.questions_sent, \
                 questions_asked = EXCLUDED.questions_asked, \
                 questions_correct = EXCLUDED.questions_correct, \
                 display_name = EXCLUDED.display_name",
                &[
                    &id,
                    &interval,
                    &sub.next_delivery_at,
                    &sub.last_answered_at,
                    &sub.section,
                    &sent,
                    &asked,
                    &correct,
                    &sub.display_name,
                ],
            )
            .await
            .map_err(|_| error::Error::Fatal)?;
        match rows {
            1 => Ok(()),
            _ => Err(error::Error::Fatal),
        }
    }

    /// Reads every subscriber row. Malformed rows are reported individually so
    /// that one bad row does not hide the rest.
    pub async fn get_subscribers(&self) -> error::Result<Vec<error::Result<Subscriber>>> {
        let rows = self
            .0
            .query(
                "SELECT id, interval_secs, next_delivery_at, last_answered_at, section, \
                 questions_sent, questions_asked, questions_correct, display_name FROM subscriber",
                &[],
            )
            .await
            .map_err(|_| error::Error::Fatal)?;
        Ok(rows.iter().map(deserialize_subscriber_from_row).collect())
    }

    pub async fn get_questions_by_tag(
        &self,
        tag: &str,
    ) -> error::Result<impl TryStream<Ok = error::Result<Question>, Error = error::Error> + '_> {
        Ok(self
            .0
            .query_raw("SELECT id, text, choices, answers, tags FROM question WHERE $1 = ANY(tags)", &[&tag])
            .await
            .map_err(|_| error::Error::Fatal)?
            .map_err(|_| error::Error::Fatal)
            .map_ok(|row| deserialize_question_from_row(&row)))
    }

    pub async fn get_question(&self, id: &str) -> error::Result<Question> {
        let row = self
            .0
            .query_opt("SELECT id, text, choices, answers, tags FROM question WHERE id = $1", &[&id])
            .await
            .map_err(|_| error::Error::Fatal)?
            .ok_or(error::Error::NotFound)?;
        deserialize_question_from_row(&row)
    }

    pub async fn put_pending(&self, token: &str, question: &str) -> error::Result<()> {
        let rows = self
            .0
            .execute(
                "INSERT INTO pending (token, question) VALUES ($1, $2) \
                 ON CONFLICT (token) DO UPDATE SET question = EXCLUDED.question",
                &[&token, &question],
            )
            .await
            .map_err(|_| error::Error::Fatal)?;
        match rows {
            1 => Ok(()),
            _ => Err(error::Error::Fatal),
        }
    }

    /// Removes the pending entry for `token` and returns its question ID. This is
    /// a single statement, so concurrent callers racing on the same token see the
    /// entry at most once between them.
    pub async fn take_pending(&self, token: &str) -> error::Result<Option<Box<str>>> {
        let Some(row) = self
            .0
            .query_opt("DELETE FROM pending WHERE token = $1 RETURNING question", &[&token])
            .await
            .map_err(|_| error::Error::Fatal)?
        else {
            return Ok(None);
        };
        let question: String = row.try_get("question").map_err(|_| error::Error::Fatal)?;
        Ok(Some(question.into_boxed_str()))
    }
}
