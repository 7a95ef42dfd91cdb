//! Question catalog configuration.

use super::defaults::default_questions;
use crate::protocol::Difficulty;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One catalog question.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct QuestionConfig {
    pub slug: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub languages: Vec<String>,
    /// Starter code keyed by language
    #[serde(default)]
    pub starter_code: BTreeMap<String, String>,
}

/// Question catalog configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_questions")]
    pub questions: Vec<QuestionConfig>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
        }
    }
}
