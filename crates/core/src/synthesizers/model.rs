use crate::error::{QuizError, SynthesisError};
use crate::models::{Chunk, QuestionKind, QuestionRecord};
use crate::synthesizers::template::FILLER_OPTIONS;
use crate::traits::{ModelLoader, QuestionSynthesizer, SelectionPolicy, TextGenerator};
use async_trait::async_trait;
use rand::RngCore;
use std::time::Duration;
use tokio::sync::OnceCell;

pub const TARGET_OPTION_COUNT: usize = 4;

/// Process-wide handle to a generative model. The loader runs at most once
/// at a time; after the first success the model is never replaced.
pub struct SharedModel<L: ModelLoader> {
    loader: L,
    cell: OnceCell<L::Model>,
}

impl<L: ModelLoader + Send + Sync> SharedModel<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<&L::Model, SynthesisError> {
        self.cell
            .get_or_try_init(|| async {
                tracing::info!("initializing generative model");
                let model = self.loader.load().await?;
                tracing::info!("generative model ready");
                Ok::<_, SynthesisError>(model)
            })
            .await
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }
}

#[derive(Debug, Clone)]
pub struct ModelSynthesisOptions {
    pub language: String,
    pub timeout: Duration,
    pub empty_generation_retries: usize,
}

impl Default for ModelSynthesisOptions {
    fn default() -> Self {
        Self {
            language: "Arabic".to_string(),
            timeout: Duration::from_secs(30),
            empty_generation_retries: 1,
        }
    }
}

/// Synthesizer that asks a generative model for each question.
///
/// The first option the model lists is taken as the correct one. Nothing
/// checks that claim; callers that need verified answers should use the
/// template synthesizer.
pub struct ModelSynthesizer<L: ModelLoader> {
    model: SharedModel<L>,
    options: ModelSynthesisOptions,
}

impl<L: ModelLoader + Send + Sync> ModelSynthesizer<L> {
    pub fn new(loader: L, options: ModelSynthesisOptions) -> Self {
        Self {
            model: SharedModel::new(loader),
            options,
        }
    }

    async fn generate_once(
        &self,
        model: &L::Model,
        prompt: &str,
    ) -> Result<String, SynthesisError> {
        match tokio::time::timeout(self.options.timeout, model.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(SynthesisError::Timeout(self.options.timeout)),
        }
    }

    async fn question_for(
        &self,
        chunk: &Chunk,
        kind: QuestionKind,
    ) -> Result<QuestionRecord, SynthesisError> {
        let model = self.model.get().await?;
        let prompt = build_prompt(kind, &chunk.text, &self.options.language);

        for attempt in 0..=self.options.empty_generation_retries {
            let raw = self.generate_once(model, &prompt).await?;
            if raw.trim().is_empty() {
                tracing::debug!(chunk = chunk.index, attempt, "model returned empty text");
                continue;
            }
            return parse_generation(&raw, &chunk.text, kind);
        }

        Err(SynthesisError::EmptyGeneration)
    }
}

#[async_trait]
impl<L> QuestionSynthesizer for ModelSynthesizer<L>
where
    L: ModelLoader + Send + Sync,
{
    fn name(&self) -> &'static str {
        "model"
    }

    fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy::SynthesizeInOrder
    }

    async fn prepare(&self) -> Result<(), QuizError> {
        self.model.get().await.map(|_| ()).map_err(|error| {
            tracing::warn!(%error, "generative model could not be initialized");
            QuizError::GenerationUnavailable
        })
    }

    async fn synthesize(
        &self,
        chunk: &Chunk,
        kind: QuestionKind,
        _rng: &mut (dyn RngCore + Send),
    ) -> Option<QuestionRecord> {
        match self.question_for(chunk, kind).await {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(chunk = chunk.index, %error, "model synthesis skipped chunk");
                None
            }
        }
    }

    fn model_ready(&self) -> Option<bool> {
        Some(self.model.is_ready())
    }
}

pub fn build_prompt(kind: QuestionKind, chunk: &str, language: &str) -> String {
    match kind {
        QuestionKind::Essay => format!(
            "Write one open-ended exam question in {language} about the passage below. \
             Output only the question on a single line.\n\nPassage: {chunk}"
        ),
        QuestionKind::MultipleChoice => format!(
            "Write one multiple-choice exam question in {language} about the passage below. \
             Put the question on the first line, then exactly {TARGET_OPTION_COUNT} answer \
             options, one per line, with the correct option first.\n\nPassage: {chunk}"
        ),
    }
}

/// Reads a model reply: the first non-empty line is the question, the rest
/// are options with the correct one first.
pub fn parse_generation(
    raw: &str,
    chunk: &str,
    kind: QuestionKind,
) -> Result<QuestionRecord, SynthesisError> {
    let mut lines = raw.lines().map(str::trim).filter(|line| !line.is_empty());
    let question = lines.next().ok_or(SynthesisError::EmptyGeneration)?;

    match kind {
        QuestionKind::Essay => Ok(QuestionRecord::essay(question, chunk.trim())),
        QuestionKind::MultipleChoice => {
            let mut options: Vec<String> = Vec::with_capacity(TARGET_OPTION_COUNT);
            for line in lines {
                if !options.iter().any(|existing| existing == line) {
                    options.push(line.to_string());
                }
            }

            if options.is_empty() {
                return Err(SynthesisError::Options(
                    "model reply had a question but no options".to_string(),
                ));
            }

            for filler in FILLER_OPTIONS {
                if options.len() >= TARGET_OPTION_COUNT {
                    break;
                }
                if !options.iter().any(|existing| existing == filler) {
                    options.push(filler.to_string());
                }
            }
            options.truncate(TARGET_OPTION_COUNT);

            QuestionRecord::multiple_choice_at(question, options, 0)
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use crate::error::SynthesisError;
    use crate::traits::{ModelLoader, TextGenerator};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Replays scripted replies; `None` entries fail the call.
    pub(crate) struct ScriptedGenerator {
        replies: Mutex<VecDeque<Option<String>>>,
        delay: Option<Duration>,
    }

    impl ScriptedGenerator {
        pub(crate) fn new(replies: Vec<Option<&str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|reply| reply.map(str::to_string))
                        .collect(),
                ),
                delay: None,
            }
        }

        pub(crate) fn slow(delay: Duration) -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                delay: Some(delay),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, SynthesisError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self
                .replies
                .lock()
                .map_err(|_| SynthesisError::BackendResponse("poisoned".to_string()))?
                .pop_front();
            match next {
                Some(Some(reply)) => Ok(reply),
                Some(None) => Err(SynthesisError::BackendResponse("scripted failure".to_string())),
                None => Ok(String::new()),
            }
        }
    }

    /// Fails the first `failures` loads, then hands out the scripted
    /// generator.
    pub(crate) struct FakeLoader {
        pub(crate) loads: Arc<AtomicUsize>,
        failures: usize,
        generator: Mutex<Option<ScriptedGenerator>>,
    }

    impl FakeLoader {
        pub(crate) fn with(generator: ScriptedGenerator) -> Self {
            Self::failing_then(0, generator)
        }

        pub(crate) fn failing() -> Self {
            Self {
                loads: Arc::new(AtomicUsize::new(0)),
                failures: usize::MAX,
                generator: Mutex::new(None),
            }
        }

        pub(crate) fn failing_then(failures: usize, generator: ScriptedGenerator) -> Self {
            Self {
                loads: Arc::new(AtomicUsize::new(0)),
                failures,
                generator: Mutex::new(Some(generator)),
            }
        }
    }

    #[async_trait]
    impl ModelLoader for FakeLoader {
        type Model = ScriptedGenerator;

        async fn load(&self) -> Result<ScriptedGenerator, SynthesisError> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            if attempt < self.failures {
                return Err(SynthesisError::ModelUnavailable("fake loader".to_string()));
            }
            self.generator
                .lock()
                .map_err(|_| SynthesisError::ModelUnavailable("poisoned".to_string()))?
                .take()
                .ok_or_else(|| SynthesisError::ModelUnavailable("already loaded".to_string()))
        }
    }
}
