use std::fs;
use std::path::Path;

use async_trait::async_trait;

use crate::collab::{CollabError, WordSource};
use crate::word::{Word, WordSet};

/// Serves categories out of a word set held in memory.
pub struct WordSetSource {
    set: WordSet,
}

impl WordSetSource {
    pub fn new(set: WordSet) -> Self {
        Self { set }
    }

    pub fn from_path(path: &Path) -> Result<Self, CollabError> {
        let content = fs::read_to_string(path)?;
        Ok(Self::new(WordSet::from_json(&content)?))
    }

    pub fn category_names(&self) -> Vec<String> {
        self.set.category_names()
    }
}

#[async_trait]
impl WordSource for WordSetSource {
    async fn fetch_category(&self, category: &str) -> Result<Vec<Word>, CollabError> {
        self.set
            .category(category)
            .map(|c| c.words.clone())
            .ok_or_else(|| CollabError::Source(format!("no category named {category}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_category_is_an_error() {
        let source = WordSetSource::new(WordSet::sample());
        assert!(matches!(
            source.fetch_category("Nope").await,
            Err(CollabError::Source(_))
        ));
        let first = source.category_names()[0].clone();
        assert!(!source.fetch_category(&first).await.unwrap().is_empty());
    }

    #[test]
    fn test_from_path_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.json");
        fs::write(
            &path,
            r#"{"name": "tiny", "categories": [{"name": "One", "words": [{"id": 1, "title": "uno"}]}]}"#,
        )
        .unwrap();
        let source = WordSetSource::from_path(&path).unwrap();
        assert_eq!(source.category_names(), vec!["One".to_string()]);
    }
}
