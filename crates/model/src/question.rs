use alloc::{boxed::Box, collections::BTreeSet, string::String, vec::Vec};

/// A single multiple-choice question from the corpus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    /// Identifier used to re-fetch the question when only a reference survives.
    pub id: Box<str>,
    /// Prompt to be displayed in chat.
    pub text: String,
    /// Possible answers to select from. Their order is significant.
    pub choices: Vec<String>,
    /// Indices into `choices` that are correct.
    pub correct: Vec<u16>,
    /// Sections that this question belongs to.
    pub tags: Vec<String>,
}

/// How the transport should present the choices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollKind {
    /// Exactly one choice may be picked. Carries the correct index as a hint for
    /// transports that grade natively.
    Single { correct: u16 },
    /// Any number of choices may be picked.
    Multi,
}

/// Result of grading a single answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub correct: bool,
    /// Message to show the subscriber.
    pub feedback: String,
}

impl Question {
    /// Whether the question can be shown to a subscriber at all.
    pub fn is_well_formed(&self) -> bool {
        let count = self.choices.len();
        count > 1 && !self.correct.is_empty() && self.correct.iter().all(|&idx| usize::from(idx) < count)
    }

    pub fn poll_kind(&self) -> PollKind {
        match *self.correct.as_slice() {
            [correct] => PollKind::Single { correct },
            _ => PollKind::Multi,
        }
    }

    /// The answer is correct iff the set of picked indices is exactly the set of
    /// correct indices. Order is irrelevant.
    pub fn is_correct(&self, picked: &[u16]) -> bool {
        let picked: BTreeSet<_> = picked.iter().copied().collect();
        let correct: BTreeSet<_> = self.correct.iter().copied().collect();
        picked == correct
    }

    pub fn grade(&self, picked: &[u16]) -> Verdict {
        if self.is_correct(picked) {
            return Verdict { correct: true, feedback: String::from("You got it! ✔️") };
        }

        let mut feedback = String::from(if self.correct.len() > 1 {
            "Sorry, that's not right. ❌ The correct answers are:"
        } else {
            "Sorry, that's not right. ❌ The correct answer is:"
        });
        for choice in self.correct.iter().filter_map(|&idx| self.choices.get(usize::from(idx))) {
            feedback.push_str("\n- ");
            feedback.push_str(choice);
        }
        Verdict { correct: false, feedback }
    }
}
