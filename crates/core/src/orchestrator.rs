use crate::chunking::{build_chunks, ChunkingConfig};
use crate::error::QuizError;
use crate::models::{Chunk, PipelineOptions, QuestionCount, QuestionKind, QuestionRecord};
use crate::normalize::normalize_text;
use crate::synthesizers::template::fallback_question;
use crate::traits::{QuestionSynthesizer, SelectionPolicy};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{RngCore, SeedableRng};
use std::sync::Mutex;

/// Turns extracted text into a bounded list of questions using one
/// synthesis strategy chosen at construction time.
pub struct QuizGenerator<S> {
    synthesizer: S,
    options: PipelineOptions,
    rng: Mutex<StdRng>,
}

impl<S> QuizGenerator<S>
where
    S: QuestionSynthesizer + Send + Sync,
{
    pub fn new(synthesizer: S, options: PipelineOptions) -> Self {
        Self::with_rng(synthesizer, options, StdRng::from_entropy())
    }

    /// Same seed, same text and same synthesizer give the same output.
    pub fn with_seed(synthesizer: S, options: PipelineOptions, seed: u64) -> Self {
        Self::with_rng(synthesizer, options, StdRng::seed_from_u64(seed))
    }

    fn with_rng(synthesizer: S, options: PipelineOptions, rng: StdRng) -> Self {
        Self {
            synthesizer,
            options,
            rng: Mutex::new(rng),
        }
    }

    pub fn synthesizer(&self) -> &S {
        &self.synthesizer
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    // Each request gets its own generator so the lock is never held across
    // an await point.
    fn request_rng(&self) -> StdRng {
        match self.rng.lock() {
            Ok(mut source) => StdRng::seed_from_u64(source.next_u64()),
            Err(_) => StdRng::from_entropy(),
        }
    }

    pub async fn generate(
        &self,
        text: &str,
        kind: QuestionKind,
        count: QuestionCount,
    ) -> Result<Vec<QuestionRecord>, QuizError> {
        let canonical = normalize_text(text);
        let chunks = build_chunks(&canonical, ChunkingConfig::from(&self.options));
        if chunks.is_empty() {
            tracing::info!(chars = canonical.chars().count(), "no chunk survived segmentation");
            return Err(QuizError::InsufficientContent);
        }

        self.synthesizer.prepare().await?;

        let mut rng = self.request_rng();
        let wanted = count.get();

        let mut questions = match self.synthesizer.selection_policy() {
            SelectionPolicy::SampleThenSynthesize => {
                self.sample_then_synthesize(&chunks, kind, wanted, &mut rng).await
            }
            SelectionPolicy::SynthesizeInOrder => {
                self.synthesize_in_order(&chunks, kind, wanted, &mut rng).await
            }
        };

        if questions.is_empty() {
            tracing::warn!(
                strategy = self.synthesizer.name(),
                chunks = chunks.len(),
                "no chunk produced a question; using fallback question"
            );
            let fallback = fallback_question(
                &canonical,
                kind,
                self.options.fallback_prefix_chars,
                &mut rng,
            )
            .map_err(|error| {
                tracing::warn!(%error, "fallback question could not be built");
                QuizError::InsufficientContent
            })?;
            questions.push(fallback);
        }

        tracing::info!(
            strategy = self.synthesizer.name(),
            kind = %kind,
            requested = wanted,
            chunks = chunks.len(),
            produced = questions.len(),
            "question set assembled"
        );

        Ok(questions)
    }

    async fn sample_then_synthesize(
        &self,
        chunks: &[Chunk],
        kind: QuestionKind,
        wanted: usize,
        rng: &mut StdRng,
    ) -> Vec<QuestionRecord> {
        let picked = index::sample(rng, chunks.len(), wanted.min(chunks.len()));

        let mut questions = Vec::with_capacity(picked.len());
        for position in picked.into_iter() {
            match self.synthesizer.synthesize(&chunks[position], kind, rng).await {
                Some(record) => questions.push(record),
                None => tracing::debug!(chunk = position, "chunk skipped"),
            }
        }
        questions
    }

    async fn synthesize_in_order(
        &self,
        chunks: &[Chunk],
        kind: QuestionKind,
        wanted: usize,
        rng: &mut StdRng,
    ) -> Vec<QuestionRecord> {
        let mut questions = Vec::with_capacity(wanted);
        for chunk in chunks {
            if questions.len() >= wanted {
                break;
            }
            match self.synthesizer.synthesize(chunk, kind, rng).await {
                Some(record) => questions.push(record),
                None => tracing::debug!(chunk = chunk.index, "chunk skipped"),
            }
        }
        questions
    }
}
