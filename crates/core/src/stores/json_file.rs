use crate::error::StoreError;
use crate::models::{NewQuestionSet, QuestionSetSummary, StoredQuestionSet};
use crate::traits::QuestionStore;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// Stores each question set as `<id>.json` inside one directory.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let parsed = Uuid::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))?;
        Ok(self.root.join(format!("{}.json", parsed.hyphenated())))
    }
}

#[async_trait]
impl QuestionStore for JsonFileStore {
    async fn save(&self, set: NewQuestionSet) -> Result<StoredQuestionSet, StoreError> {
        let stored = StoredQuestionSet::from_new(Uuid::new_v4().to_string(), set, Utc::now());
        let path = self.path_for(&stored.id)?;
        let staging = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.root).await?;
        let body = serde_json::to_vec_pretty(&stored)?;
        tokio::fs::write(&staging, body).await?;
        tokio::fs::rename(&staging, &path).await?;

        tracing::debug!(id = %stored.id, path = %path.display(), "question set written");
        Ok(stored)
    }

    async fn fetch(&self, id: &str) -> Result<Option<StoredQuestionSet>, StoreError> {
        let path = self.path_for(id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn list(&self) -> Result<Vec<QuestionSetSummary>, StoreError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || list_summaries(&root))
            .await
            .map_err(|error| StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, error)))
    }
}

fn list_summaries(root: &Path) -> Vec<QuestionSetSummary> {
    let mut summaries = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_json = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            continue;
        }

        let parsed = std::fs::read(entry.path())
            .map_err(StoreError::from)
            .and_then(|bytes| {
                serde_json::from_slice::<StoredQuestionSet>(&bytes).map_err(StoreError::from)
            });

        match parsed {
            Ok(set) => summaries.push(set.summary()),
            Err(error) => {
                tracing::warn!(
                    path = %entry.path().display(),
                    %error,
                    "skipping unreadable question set"
                )
            }
        }
    }

    summaries.sort_by(|left, right| {
        left.created_at
            .cmp(&right.created_at)
            .then_with(|| left.id.cmp(&right.id))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionKind, QuestionRecord};
    use std::fs;
    use tempfile::tempdir;

    fn new_set(name: &str) -> NewQuestionSet {
        NewQuestionSet {
            questions: vec![QuestionRecord::multiple_choice_at(
                "pick",
                vec!["right".to_string(), "wrong".to_string()],
                0,
            )
            .expect("valid record")],
            original_filename: name.to_string(),
            question_type: QuestionKind::MultipleChoice,
            source_checksum: "abc".to_string(),
        }
    }

    #[tokio::test]
    async fn round_trip_through_disk() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path().join("sets"));

        let saved = store.save(new_set("lecture.pdf")).await?;
        let fetched = store.fetch(&saved.id).await?;

        assert_eq!(fetched, Some(saved.clone()));
        assert!(dir.path().join("sets").join(format!("{}.json", saved.id)).exists());
        Ok(())
    }

    #[tokio::test]
    async fn missing_and_malformed_ids() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path());

        let missing = store.fetch(&Uuid::new_v4().to_string()).await?;
        assert!(missing.is_none());

        let malformed = store.fetch("../../etc/passwd").await;
        assert!(matches!(malformed, Err(StoreError::InvalidId(_))));
        Ok(())
    }

    #[tokio::test]
    async fn history_lists_sets_and_skips_garbage() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path());

        let first = store.save(new_set("one.pdf")).await?;
        let second = store.save(new_set("two.pdf")).await?;
        fs::write(dir.path().join("broken.json"), b"{not json")?;
        fs::write(dir.path().join("notes.txt"), b"ignored")?;

        let listed = store.list().await?;
        assert_eq!(listed.len(), 2);

        let ids: Vec<_> = listed.iter().map(|summary| summary.id.clone()).collect();
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&second.id));
        assert!(listed[0].created_at <= listed[1].created_at);
        Ok(())
    }

    #[tokio::test]
    async fn history_of_missing_directory_is_empty() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path().join("never-created"));
        assert!(store.list().await?.is_empty());
        Ok(())
    }
}
