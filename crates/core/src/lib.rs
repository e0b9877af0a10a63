pub mod chunking;
pub mod document;
pub mod error;
pub mod extractor;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod service;
pub mod stores;
pub mod synthesizers;
pub mod traits;

pub use chunking::{build_chunks, ChunkingConfig};
pub use document::{validate_upload, PdfDocument, Upload, PDF_MEDIA_TYPE};
pub use error::{QuizError, Result, StoreError, SynthesisError};
pub use extractor::{extract_text, LopdfExtractor, PageText, PdfExtractor};
pub use models::{
    Chunk, NewQuestionSet, PipelineOptions, QuestionCount, QuestionKind, QuestionRecord,
    QuestionSetSummary, SegmentationPolicy, StoredQuestionSet,
};
pub use normalize::normalize_text;
pub use orchestrator::QuizGenerator;
pub use service::{HealthReport, PersistenceStatus, QuizService, SubmitOutcome, SubmitRequest};
pub use stores::{JsonFileStore, MemoryStore};
pub use synthesizers::{
    HttpModelConfig, HttpModelLoader, HttpTextGenerator, ModelSynthesisOptions, ModelSynthesizer,
    SharedModel, TemplateSynthesizer, API_KEY_ENV, ENDPOINT_ENV,
};
pub use traits::{ModelLoader, QuestionStore, QuestionSynthesizer, SelectionPolicy, TextGenerator};
