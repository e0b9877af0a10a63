use crate::error::{QuizError, StoreError, SynthesisError};
use crate::models::{
    Chunk, NewQuestionSet, QuestionKind, QuestionRecord, QuestionSetSummary, StoredQuestionSet,
};
use async_trait::async_trait;
use rand::RngCore;

/// How the controller picks the chunks a synthesizer works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Sample chunks without replacement, then synthesize each sample.
    SampleThenSynthesize,
    /// Walk chunks in order and stop once enough questions exist.
    SynthesizeInOrder,
}

#[async_trait]
pub trait QuestionSynthesizer {
    fn name(&self) -> &'static str;

    fn selection_policy(&self) -> SelectionPolicy;

    /// Runs once per request before any chunk is synthesized. A failure here
    /// aborts the whole request.
    async fn prepare(&self) -> Result<(), QuizError> {
        Ok(())
    }

    /// `None` means no question could be made from this chunk; the caller
    /// skips it.
    async fn synthesize(
        &self,
        chunk: &Chunk,
        kind: QuestionKind,
        rng: &mut (dyn RngCore + Send),
    ) -> Option<QuestionRecord>;

    /// Readiness of any backing model; `None` when there is no model.
    fn model_ready(&self) -> Option<bool> {
        None
    }
}

#[async_trait]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, SynthesisError>;
}

#[async_trait]
pub trait ModelLoader {
    type Model: TextGenerator + Send + Sync;

    async fn load(&self) -> Result<Self::Model, SynthesisError>;
}

#[async_trait]
pub trait QuestionStore {
    async fn save(&self, set: NewQuestionSet) -> Result<StoredQuestionSet, StoreError>;

    async fn fetch(&self, id: &str) -> Result<Option<StoredQuestionSet>, StoreError>;

    async fn list(&self) -> Result<Vec<QuestionSetSummary>, StoreError>;
}
