use crate::error::QuizError;
use crate::models::PipelineOptions;
use sha2::{Digest, Sha256};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";
// The header may be preceded by junk bytes; readers scan the first kilobyte.
const HEADER_SCAN_BYTES: usize = 1024;

/// An uploaded document as received from the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type,
            bytes,
        }
    }
}

/// A document that passed validation and may be handed to an extractor.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    filename: String,
    bytes: Vec<u8>,
}

impl PdfDocument {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// Runs every check that must pass before extraction is attempted: presence,
/// size cap, media type and the PDF header.
pub fn validate_upload(
    upload: Upload,
    options: &PipelineOptions,
) -> Result<PdfDocument, QuizError> {
    let filename = upload.filename.trim().to_string();
    if filename.is_empty() || upload.bytes.is_empty() {
        return Err(QuizError::MissingInput);
    }

    if upload.bytes.len() > options.max_document_bytes {
        tracing::info!(
            filename = %filename,
            size = upload.bytes.len(),
            limit = options.max_document_bytes,
            "rejecting oversized document"
        );
        return Err(QuizError::OversizedInput);
    }

    if !resolves_to_pdf(upload.media_type.as_deref(), &filename) {
        tracing::info!(
            filename = %filename,
            media_type = ?upload.media_type,
            "rejecting non-pdf upload"
        );
        return Err(QuizError::InvalidFormat);
    }

    if !has_pdf_header(&upload.bytes) {
        tracing::info!(filename = %filename, "rejecting upload without a pdf header");
        return Err(QuizError::InvalidFormat);
    }

    Ok(PdfDocument {
        filename,
        bytes: upload.bytes,
    })
}

fn resolves_to_pdf(media_type: Option<&str>, filename: &str) -> bool {
    let has_pdf_extension = filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"));

    let essence = media_type.map(|value| {
        value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    });

    match essence.as_deref() {
        Some(PDF_MEDIA_TYPE) => true,
        None | Some("") | Some("application/octet-stream") => has_pdf_extension,
        Some(_) => false,
    }
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SCAN_BYTES)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}
