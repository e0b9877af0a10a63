use crate::error::SynthesisError;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Essay,
    MultipleChoice,
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "essay" => Ok(QuestionKind::Essay),
            "multiple_choice" | "multiple-choice" | "multiplechoice" | "mcq" => {
                Ok(QuestionKind::MultipleChoice)
            }
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Essay => write!(f, "essay"),
            QuestionKind::MultipleChoice => write!(f, "multiple_choice"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationPolicy {
    #[default]
    Sentence,
    WordBudget,
}

impl FromStr for SegmentationPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sentence" | "sentences" => Ok(SegmentationPolicy::Sentence),
            "word_budget" | "word-budget" | "words" => Ok(SegmentationPolicy::WordBudget),
            other => Err(format!("unknown segmentation policy: {other}")),
        }
    }
}

/// A bounded unit of canonical text handed to a synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionRecord {
    Essay {
        question: String,
        answer: String,
    },
    MultipleChoice {
        question: String,
        options: Vec<String>,
        correct_index: usize,
    },
}

impl QuestionRecord {
    pub fn essay(question: impl Into<String>, answer: impl Into<String>) -> Self {
        QuestionRecord::Essay {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Builds a multiple-choice record from the correct answer and its
    /// distractors. The options are shuffled and the correct index is located
    /// after the shuffle.
    pub fn multiple_choice(
        question: impl Into<String>,
        correct: &str,
        distractors: Vec<String>,
        rng: &mut (dyn RngCore + Send),
    ) -> Result<Self, SynthesisError> {
        let mut options = Vec::with_capacity(distractors.len() + 1);
        options.push(correct.to_string());
        options.extend(distractors);
        options.shuffle(rng);

        let correct_index = options
            .iter()
            .position(|option| option == correct)
            .ok_or_else(|| SynthesisError::Options("correct answer lost in shuffle".to_string()))?;

        Self::multiple_choice_at(question, options, correct_index)
    }

    /// Builds a multiple-choice record whose options are already ordered.
    pub fn multiple_choice_at(
        question: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, SynthesisError> {
        if options.len() < 2 {
            return Err(SynthesisError::Options(format!(
                "need at least 2 options, got {}",
                options.len()
            )));
        }

        let correct = options.get(correct_index).ok_or_else(|| {
            SynthesisError::Options(format!(
                "correct index {correct_index} out of range for {} options",
                options.len()
            ))
        })?;

        if options.iter().filter(|option| *option == correct).count() != 1 {
            return Err(SynthesisError::Options(
                "correct answer must appear exactly once".to_string(),
            ));
        }

        Ok(QuestionRecord::MultipleChoice {
            question: question.into(),
            options,
            correct_index,
        })
    }

    pub fn prompt(&self) -> &str {
        match self {
            QuestionRecord::Essay { question, .. } => question,
            QuestionRecord::MultipleChoice { question, .. } => question,
        }
    }

    pub fn correct_answer(&self) -> Option<&str> {
        match self {
            QuestionRecord::Essay { answer, .. } => Some(answer),
            QuestionRecord::MultipleChoice {
                options,
                correct_index,
                ..
            } => options.get(*correct_index).map(String::as_str),
        }
    }
}

/// Requested number of questions, clamped into `[1, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCount(usize);

impl QuestionCount {
    pub fn clamped(requested: i64, max: usize) -> Self {
        let max = max.max(1);
        let value = requested.clamp(1, max as i64) as usize;
        Self(value)
    }

    /// Parses a user-supplied count. Anything that is not an integer falls
    /// back to the configured default instead of failing the request.
    pub fn parse(input: &str, options: &PipelineOptions) -> Self {
        let max = options.max_question_count;
        match input.trim().parse::<i64>() {
            Ok(requested) => Self::clamped(requested, max),
            Err(error) => match error.kind() {
                IntErrorKind::PosOverflow => Self::clamped(i64::MAX, max),
                IntErrorKind::NegOverflow => Self::clamped(i64::MIN, max),
                _ => Self::clamped(options.default_question_count as i64, max),
            },
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// Fields supplied by the pipeline when a set is handed to a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestionSet {
    pub questions: Vec<QuestionRecord>,
    pub original_filename: String,
    pub question_type: QuestionKind,
    pub source_checksum: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQuestionSet {
    pub id: String,
    pub questions: Vec<QuestionRecord>,
    pub original_filename: String,
    pub question_type: QuestionKind,
    pub source_checksum: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredQuestionSet {
    pub fn from_new(id: String, set: NewQuestionSet, at: DateTime<Utc>) -> Self {
        Self {
            id,
            questions: set.questions,
            original_filename: set.original_filename,
            question_type: set.question_type,
            source_checksum: set.source_checksum,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn summary(&self) -> QuestionSetSummary {
        QuestionSetSummary {
            id: self.id.clone(),
            original_filename: self.original_filename.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSetSummary {
    pub id: String,
    pub original_filename: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_document_bytes: usize,
    pub chunk_max_chars: usize,
    pub min_chunk_chars: usize,
    pub segmentation: SegmentationPolicy,
    pub default_question_count: usize,
    pub max_question_count: usize,
    pub fallback_prefix_chars: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_document_bytes: 16 * 1024 * 1024,
            chunk_max_chars: 512,
            min_chunk_chars: 20,
            segmentation: SegmentationPolicy::Sentence,
            default_question_count: 5,
            max_question_count: 10,
            fallback_prefix_chars: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn correct_index_tracks_the_answer_across_shuffles() {
        let distractors = vec![
            "first wrong".to_string(),
            "second wrong".to_string(),
            "third wrong".to_string(),
        ];

        for seed in 0..500u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let record = QuestionRecord::multiple_choice(
                "pick one",
                "the answer",
                distractors.clone(),
                &mut rng,
            )
            .expect("options are distinct");

            assert_eq!(record.correct_answer(), Some("the answer"));
            if let QuestionRecord::MultipleChoice { options, .. } = &record {
                assert_eq!(options.len(), 4);
            }
        }
    }

    #[test]
    fn duplicate_correct_option_is_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        let result = QuestionRecord::multiple_choice(
            "pick one",
            "same",
            vec!["same".to_string()],
            &mut rng,
        );
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let options = vec!["a".to_string(), "b".to_string()];
        assert!(QuestionRecord::multiple_choice_at("q", options, 2).is_err());
    }

    #[test]
    fn count_is_clamped_and_defaults_on_garbage() {
        let options = PipelineOptions::default();
        assert_eq!(QuestionCount::parse("0", &options).get(), 1);
        assert_eq!(QuestionCount::parse("-4", &options).get(), 1);
        assert_eq!(QuestionCount::parse("7", &options).get(), 7);
        assert_eq!(QuestionCount::parse("99", &options).get(), 10);
        assert_eq!(QuestionCount::parse("99999999999999999999", &options).get(), 10);
        assert_eq!(QuestionCount::parse("-99999999999999999999", &options).get(), 1);
        assert_eq!(QuestionCount::parse(" +3 ", &options).get(), 3);
        assert_eq!(QuestionCount::parse("five", &options).get(), 5);
        assert_eq!(QuestionCount::parse("12abc", &options).get(), 5);
        assert_eq!(QuestionCount::parse("", &options).get(), 5);
    }

    #[test]
    fn question_kind_parses_common_spellings() {
        assert_eq!("essay".parse::<QuestionKind>(), Ok(QuestionKind::Essay));
        assert_eq!(
            "multiple-choice".parse::<QuestionKind>(),
            Ok(QuestionKind::MultipleChoice)
        );
        assert!("quiz".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn records_serialize_with_a_type_tag() {
        let record = QuestionRecord::essay("q", "a");
        let value = serde_json::to_value(&record).expect("serializable");
        assert_eq!(value["type"], "essay");
        assert_eq!(value["answer"], "a");
    }
}
