//! Question corpus loaded once at startup.

use crate::store::QuestionSource;
use alloc::{boxed::Box, collections::BTreeMap, sync::Arc, vec::Vec};
use model::{Question, Quiz};

pub struct Corpus {
    quizzes: BTreeMap<Box<str>, Arc<Quiz>>,
    /// Question ID to `(section, position)` within `quizzes`.
    index: BTreeMap<Box<str>, (Box<str>, usize)>,
    source: Arc<dyn QuestionSource>,
}

impl Corpus {
    /// Loads the quiz of every section. A section that fails to load is logged
    /// and left empty so that the rest stay usable.
    pub async fn load<S: AsRef<str>>(source: Arc<dyn QuestionSource>, sections: &[S]) -> Self {
        let mut quizzes = BTreeMap::new();
        let mut index = BTreeMap::new();
        for section in sections.iter().map(AsRef::as_ref) {
            let quiz = match source.load_quiz(section).await {
                Ok(quiz) => quiz,
                Err(err) => {
                    log::error!("failed to load section {section}: {err}");
                    Quiz::new(section.into(), Vec::new())
                }
            };
            if quiz.is_empty() {
                log::warn!("section {section} has no usable questions");
            } else {
                log::info!("loaded {} questions for section {section}", quiz.len());
            }
            for (pos, question) in quiz.questions.iter().enumerate() {
                index.entry(question.id.clone()).or_insert_with(|| (Box::from(section), pos));
            }
            quizzes.insert(Box::from(section), Arc::new(quiz));
        }
        Self { quizzes, index, source }
    }

    pub fn quiz(&self, section: &str) -> Option<Arc<Quiz>> {
        self.quizzes.get(section).cloned()
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.quizzes.keys().map(AsRef::as_ref)
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.quizzes.contains_key(section)
    }

    /// Looks up a question by ID, falling back to the source for questions that
    /// are not part of any loaded section.
    pub async fn question(&self, id: &str) -> db::error::Result<Question> {
        let cached = self.index.get(id).and_then(|(section, pos)| self.quizzes.get(section)?.questions.get(*pos));
        if let Some(question) = cached {
            return Ok(question.clone());
        }
        log::debug!("question {id} is not cached; fetching from the source");
        self.source.get_question(id).await
    }
}
