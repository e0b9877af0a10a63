use crate::error::StoreError;
use crate::models::{NewQuestionSet, QuestionSetSummary, StoredQuestionSet};
use crate::traits::QuestionStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process store; contents live as long as the value.
#[derive(Default)]
pub struct MemoryStore {
    sets: RwLock<HashMap<String, StoredQuestionSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn save(&self, set: NewQuestionSet) -> Result<StoredQuestionSet, StoreError> {
        let stored = StoredQuestionSet::from_new(Uuid::new_v4().to_string(), set, Utc::now());
        self.sets
            .write()
            .await
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn fetch(&self, id: &str) -> Result<Option<StoredQuestionSet>, StoreError> {
        Ok(self.sets.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<QuestionSetSummary>, StoreError> {
        let mut summaries: Vec<_> = self
            .sets
            .read()
            .await
            .values()
            .map(StoredQuestionSet::summary)
            .collect();
        summaries.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(summaries)
    }
}
