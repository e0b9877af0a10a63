use crate::error::SynthesisError;
use crate::models::{Chunk, QuestionKind, QuestionRecord};
use crate::traits::{QuestionSynthesizer, SelectionPolicy};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

pub const ESSAY_INSTRUCTION: &str = "اشرح بالتفصيل العبارة التالية";
pub const CHOICE_INSTRUCTION: &str = "اختر العبارة الصحيحة كما وردت في النص";

/// Distractors used when a chunk is too short to perturb.
pub const FILLER_OPTIONS: [&str; 3] = [
    "لا شيء مما سبق",
    "جميع ما سبق",
    "لا يمكن تحديد الإجابة من النص",
];

const QUESTION_WORDS: [&str; 8] = ["ما", "ماذا", "كيف", "لماذا", "متى", "أين", "من", "هل"];
const DISTRACTOR_COUNT: usize = 3;
const MIN_WORDS_TO_PERTURB: usize = 4;
const MAX_PERTURBATION_ATTEMPTS: usize = 32;

/// Rule-based synthesizer that needs no external model.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateSynthesizer;

#[async_trait]
impl QuestionSynthesizer for TemplateSynthesizer {
    fn name(&self) -> &'static str {
        "template"
    }

    fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy::SampleThenSynthesize
    }

    async fn synthesize(
        &self,
        chunk: &Chunk,
        kind: QuestionKind,
        rng: &mut (dyn RngCore + Send),
    ) -> Option<QuestionRecord> {
        match template_question(&chunk.text, kind, rng) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::debug!(chunk = chunk.index, %error, "template synthesis skipped chunk");
                None
            }
        }
    }
}

pub fn template_question(
    text: &str,
    kind: QuestionKind,
    rng: &mut (dyn RngCore + Send),
) -> Result<QuestionRecord, SynthesisError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SynthesisError::EmptyChunk);
    }

    match kind {
        QuestionKind::Essay => Ok(QuestionRecord::essay(
            format!("{ESSAY_INSTRUCTION}: {}", strip_leading_question_word(text)),
            text,
        )),
        QuestionKind::MultipleChoice => {
            let words: Vec<&str> = text.split_whitespace().collect();
            let distractors = if words.len() >= MIN_WORDS_TO_PERTURB {
                perturbed_distractors(&words, text, rng)
            } else {
                filler_distractors(text)
            };

            QuestionRecord::multiple_choice(CHOICE_INSTRUCTION, text, distractors, rng)
        }
    }
}

/// The single question returned when no chunk produced one.
pub fn fallback_question(
    text: &str,
    kind: QuestionKind,
    prefix_chars: usize,
    rng: &mut (dyn RngCore + Send),
) -> Result<QuestionRecord, SynthesisError> {
    let prefix: String = text.trim().chars().take(prefix_chars).collect();
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Err(SynthesisError::EmptyChunk);
    }

    match kind {
        QuestionKind::Essay => Ok(QuestionRecord::essay(
            format!("{ESSAY_INSTRUCTION}: {prefix}"),
            prefix,
        )),
        QuestionKind::MultipleChoice => QuestionRecord::multiple_choice(
            CHOICE_INSTRUCTION,
            prefix,
            filler_distractors(prefix),
            rng,
        ),
    }
}

/// Drops a leading interrogative when it is the whole first word.
pub fn strip_leading_question_word(sentence: &str) -> &str {
    let trimmed = sentence.trim_start();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) if QUESTION_WORDS.contains(&first) && !rest.trim().is_empty() => {
            rest.trim_start()
        }
        _ => trimmed,
    }
}

fn filler_distractors(correct: &str) -> Vec<String> {
    FILLER_OPTIONS
        .iter()
        .filter(|filler| **filler != correct)
        .map(|filler| filler.to_string())
        .collect()
}

fn perturbed_distractors(
    words: &[&str],
    correct: &str,
    rng: &mut (dyn RngCore + Send),
) -> Vec<String> {
    let mut distractors: Vec<String> = Vec::with_capacity(DISTRACTOR_COUNT);
    let mut attempts = 0;

    while distractors.len() < DISTRACTOR_COUNT && attempts < MAX_PERTURBATION_ATTEMPTS {
        attempts += 1;

        let candidate = if rng.gen_bool(0.5) {
            replace_one_word(words, rng)
        } else {
            Some(words.iter().rev().copied().collect::<Vec<_>>().join(" "))
        };

        if let Some(candidate) = candidate {
            if candidate != correct && !distractors.contains(&candidate) {
                distractors.push(candidate);
            }
        }
    }

    // Repetitive chunks may not yield enough distinct perturbations.
    for filler in filler_distractors(correct) {
        if distractors.len() >= DISTRACTOR_COUNT {
            break;
        }
        if !distractors.contains(&filler) {
            distractors.push(filler);
        }
    }

    distractors
}

fn replace_one_word(words: &[&str], rng: &mut (dyn RngCore + Send)) -> Option<String> {
    let target = rng.gen_range(0..words.len());
    let donors: Vec<&str> = words
        .iter()
        .copied()
        .filter(|word| *word != words[target])
        .collect();
    let donor = donors.choose(rng)?;

    let mut replaced = words.to_vec();
    replaced[target] = *donor;
    Some(replaced.join(" "))
}
