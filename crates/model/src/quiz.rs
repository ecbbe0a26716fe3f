use crate::Question;
use alloc::{boxed::Box, vec::Vec};
use core::fmt::{self, Display};
use rand::Rng;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The quiz has no questions at all.
    Empty,
    /// Both the first pick and the retry had fewer than two choices.
    Malformed,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "quiz has no questions",
            Self::Malformed => "quiz keeps yielding questions with fewer than two choices",
        })
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// All questions tagged with a particular section.
#[derive(Clone, Debug, Default)]
pub struct Quiz {
    pub section: Box<str>,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(section: Box<str>, questions: Vec<Question>) -> Self {
        Self { section, questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Picks a question uniformly at random. See [`Self::pick_with`].
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Result<&Question> {
        self.pick_with(|len| rng.random_range(0..len))
    }

    /// Picks a question using `index` to draw a position in `0..len`. A question
    /// with at most one choice is re-drawn once; a second bad draw is an error.
    pub fn pick_with(&self, mut index: impl FnMut(usize) -> usize) -> Result<&Question> {
        let len = self.questions.len();
        if len == 0 {
            return Err(Error::Empty);
        }

        let first = &self.questions[index(len) % len];
        if first.choices.len() > 1 {
            return Ok(first);
        }

        let second = &self.questions[index(len) % len];
        if second.choices.len() > 1 {
            return Ok(second);
        }

        Err(Error::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn question(id: &str, choices: usize) -> Question {
        Question {
            id: id.into(),
            text: format!("Question {id}"),
            choices: (0..choices).map(|i| format!("Choice {i}")).collect(),
            correct: vec![0],
            tags: vec![String::from("security+")],
        }
    }

    #[test]
    fn empty_quiz_cannot_pick() {
        let quiz = Quiz::new("security+".into(), Vec::new());
        assert_eq!(quiz.pick_with(|_| 0), Err(Error::Empty));
    }

    #[test]
    fn bad_first_pick_is_retried_once() {
        let quiz = Quiz::new("security+".into(), vec![question("bad", 1), question("good", 4)]);
        let mut draws = [0, 1].into_iter();
        let picked = quiz.pick_with(|_| draws.next().unwrap()).unwrap();
        assert_eq!(picked.id.as_ref(), "good");
    }

    #[test]
    fn two_bad_picks_are_rejected() {
        let quiz = Quiz::new("security+".into(), vec![question("bad", 1), question("good", 4)]);
        let mut calls = 0;
        let result = quiz.pick_with(|_| {
            calls += 1;
            0
        });
        assert_eq!(result, Err(Error::Malformed));
        assert_eq!(calls, 2);
    }

    #[test]
    fn random_pick_stays_in_bounds() {
        let quiz = Quiz::new("security+".into(), (0..10).map(|i| question(&i.to_string(), 3)).collect());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let picked = quiz.pick(&mut rng).unwrap();
            assert!(quiz.questions.contains(picked));
        }
    }
}
