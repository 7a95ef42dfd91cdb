//! Question catalog collaborator.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::config::{CatalogConfig, QuestionConfig};
use crate::protocol::{Difficulty, QuestionRef};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no {0} question is available")]
    NoQuestion(Difficulty),
    #[error("question '{0}' is not in the catalog")]
    UnknownQuestion(String),
}

#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    async fn pick_question(&self, difficulty: Difficulty) -> Result<QuestionRef, CatalogError>;

    /// Starter code for one language; `None` when the question has none for it.
    async fn starter_code(
        &self,
        question: &QuestionRef,
        language: &str,
    ) -> Result<Option<String>, CatalogError>;

    /// Starter code for every language the question supports.
    async fn all_starter_code(
        &self,
        question: &QuestionRef,
    ) -> Result<BTreeMap<String, String>, CatalogError> {
        let mut starters = BTreeMap::new();
        for language in &question.languages {
            if let Some(code) = self.starter_code(question, language).await? {
                starters.insert(language.clone(), code);
            }
        }
        Ok(starters)
    }
}

/// Catalog held in memory, built from the `catalog` config section.
#[derive(Debug, Default)]
pub struct InMemoryQuestionCatalog {
    by_difficulty: HashMap<Difficulty, Vec<QuestionRef>>,
    starters: HashMap<String, BTreeMap<String, String>>,
}

impl InMemoryQuestionCatalog {
    pub fn new(questions: impl IntoIterator<Item = QuestionConfig>) -> Self {
        let mut catalog = Self::default();
        for question in questions {
            let reference = QuestionRef {
                slug: question.slug.clone(),
                title: question.title,
                difficulty: question.difficulty,
                languages: question.languages,
            };
            catalog
                .by_difficulty
                .entry(question.difficulty)
                .or_default()
                .push(reference);
            catalog.starters.insert(question.slug, question.starter_code);
        }
        catalog
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.questions.iter().cloned())
    }

    pub fn count(&self, difficulty: Difficulty) -> usize {
        self.by_difficulty.get(&difficulty).map_or(0, Vec::len)
    }
}

#[async_trait]
impl QuestionCatalog for InMemoryQuestionCatalog {
    async fn pick_question(&self, difficulty: Difficulty) -> Result<QuestionRef, CatalogError> {
        let questions = self
            .by_difficulty
            .get(&difficulty)
            .filter(|questions| !questions.is_empty())
            .ok_or(CatalogError::NoQuestion(difficulty))?;
        let index = fastrand::usize(..questions.len());
        questions
            .get(index)
            .cloned()
            .ok_or(CatalogError::NoQuestion(difficulty))
    }

    async fn starter_code(
        &self,
        question: &QuestionRef,
        language: &str,
    ) -> Result<Option<String>, CatalogError> {
        let starters = self
            .starters
            .get(&question.slug)
            .ok_or_else(|| CatalogError::UnknownQuestion(question.slug.clone()))?;
        Ok(starters.get(language).cloned())
    }
}
