use crate::document::{validate_upload, Upload};
use crate::error::QuizError;
use crate::extractor::{extract_text, LopdfExtractor, PdfExtractor};
use crate::models::{
    NewQuestionSet, QuestionCount, QuestionKind, QuestionRecord, QuestionSetSummary,
    StoredQuestionSet,
};
use crate::normalize::normalize_text;
use crate::orchestrator::QuizGenerator;
use crate::traits::{QuestionStore, QuestionSynthesizer};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub upload: Upload,
    pub kind: QuestionKind,
    pub count: QuestionCount,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceStatus {
    Saved,
    Disabled,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub questions: Vec<QuestionRecord>,
    pub document_id: Option<String>,
    pub persistence: PersistenceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub strategy: &'static str,
    pub model_ready: Option<bool>,
}

/// Entry point for hosts: submit a document, read back saved sets, probe
/// liveness.
pub struct QuizService<S, P> {
    generator: QuizGenerator<S>,
    extractor: Arc<dyn PdfExtractor + Send + Sync>,
    store: Option<P>,
}

impl<S, P> QuizService<S, P>
where
    S: QuestionSynthesizer + Send + Sync,
    P: QuestionStore + Send + Sync,
{
    pub fn new(generator: QuizGenerator<S>, store: Option<P>) -> Self {
        Self {
            generator,
            extractor: Arc::new(LopdfExtractor),
            store,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PdfExtractor + Send + Sync>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn generator(&self) -> &QuizGenerator<S> {
        &self.generator
    }

    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitOutcome, QuizError> {
        let document = validate_upload(request.upload, self.generator.options())?;
        let filename = document.filename().to_string();
        let checksum = document.checksum();

        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || extract_text(extractor.as_ref(), &document))
            .await
            .map_err(|error| {
                tracing::warn!(filename = %filename, %error, "extraction task failed");
                QuizError::InvalidFormat
            })??;

        if normalize_text(&text).is_empty() {
            tracing::info!(filename = %filename, "document has no extractable text");
            return Err(QuizError::EmptyExtraction);
        }

        let questions = self
            .generator
            .generate(&text, request.kind, request.count)
            .await?;

        let (document_id, persistence) = match &self.store {
            None => (None, PersistenceStatus::Disabled),
            Some(store) => {
                let new_set = NewQuestionSet {
                    questions: questions.clone(),
                    original_filename: filename.clone(),
                    question_type: request.kind,
                    source_checksum: checksum,
                };
                match store.save(new_set).await {
                    Ok(saved) => {
                        tracing::info!(id = %saved.id, filename = %filename, "question set saved");
                        (Some(saved.id), PersistenceStatus::Saved)
                    }
                    Err(error) => {
                        tracing::warn!(filename = %filename, %error, "question set was not saved");
                        (None, PersistenceStatus::Failed)
                    }
                }
            }
        };

        Ok(SubmitOutcome {
            questions,
            document_id,
            persistence,
        })
    }

    pub async fn fetch(&self, id: &str) -> Result<StoredQuestionSet, QuizError> {
        let store = self.store_or_fail()?;
        store.fetch(id.trim()).await?.ok_or(QuizError::NotFound)
    }

    pub async fn history(&self) -> Result<Vec<QuestionSetSummary>, QuizError> {
        let store = self.store_or_fail()?;
        Ok(store.list().await?)
    }

    pub fn health(&self) -> HealthReport {
        let synthesizer = self.generator.synthesizer();
        HealthReport {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
            strategy: synthesizer.name(),
            model_ready: synthesizer.model_ready(),
        }
    }

    fn store_or_fail(&self) -> Result<&P, QuizError> {
        self.store.as_ref().ok_or_else(|| {
            tracing::warn!("question set lookup requested but persistence is disabled");
            QuizError::PersistenceFailure
        })
    }
}
