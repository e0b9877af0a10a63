use thiserror::Error;

/// Errors that cross the pipeline boundary. The display text is the short
/// message shown to the person who uploaded the document.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("لم يتم تحديد ملف")]
    MissingInput,

    #[error("يجب رفع ملف PDF فقط")]
    InvalidFormat,

    #[error("حجم الملف يتجاوز الحد المسموح به")]
    OversizedInput,

    #[error("لم يتم العثور على نص قابل للاستخراج في الملف")]
    EmptyExtraction,

    #[error("لا يحتوي الملف على جمل كافية لتوليد الأسئلة")]
    InsufficientContent,

    #[error("خدمة توليد الأسئلة غير متاحة حاليا")]
    GenerationUnavailable,

    #[error("لم يتم العثور على الأسئلة")]
    NotFound,

    #[error("حدث خطأ أثناء حفظ البيانات")]
    PersistenceFailure,
}

impl QuizError {
    pub fn code(&self) -> &'static str {
        match self {
            QuizError::MissingInput => "missing_input",
            QuizError::InvalidFormat => "invalid_format",
            QuizError::OversizedInput => "oversized_input",
            QuizError::EmptyExtraction => "empty_extraction",
            QuizError::InsufficientContent => "insufficient_content",
            QuizError::GenerationUnavailable => "generation_unavailable",
            QuizError::NotFound => "not_found",
            QuizError::PersistenceFailure => "persistence_failure",
        }
    }
}

/// Failure to turn one chunk into a question. The controller logs these and
/// skips the chunk.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("chunk has no usable text")]
    EmptyChunk,

    #[error("could not assemble options: {0}")]
    Options(String),

    #[error("model returned an empty generation")]
    EmptyGeneration,

    #[error("model call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("model is not initialized: {0}")]
    ModelUnavailable(String),

    #[error("invalid response from model backend: {0}")]
    BackendResponse(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid question set id: {0}")]
    InvalidId(String),
}

impl From<StoreError> for QuizError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::InvalidId(id) => {
                tracing::debug!(id = %id, "lookup with malformed question set id");
                QuizError::NotFound
            }
            other => {
                tracing::warn!(error = %other, "question store failure");
                QuizError::PersistenceFailure
            }
        }
    }
}

pub type Result<T, E = QuizError> = std::result::Result<T, E>;
