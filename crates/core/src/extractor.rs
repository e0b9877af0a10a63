use crate::document::PdfDocument;
use crate::error::QuizError;
use lopdf::Document;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, document: &PdfDocument) -> Result<Vec<PageText>, QuizError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, document: &PdfDocument) -> Result<Vec<PageText>, QuizError> {
        let parsed = Document::load_mem(document.bytes()).map_err(|error| {
            tracing::info!(filename = %document.filename(), %error, "pdf parse failed");
            QuizError::InvalidFormat
        })?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in parsed.get_pages() {
            // A page that cannot be decoded contributes nothing.
            let text = match parsed.extract_text(&[page_no]) {
                Ok(text) => text.trim().to_string(),
                Err(error) => {
                    tracing::debug!(page = page_no, %error, "page text extraction failed");
                    String::new()
                }
            };

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        tracing::debug!(
            filename = %document.filename(),
            pages = pages.len(),
            pages_with_text = pages.iter().filter(|page| !page.text.is_empty()).count(),
            "extracted pdf pages"
        );

        Ok(pages)
    }
}

/// Concatenates page texts in page order, one page per line.
pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|page| page.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn extract_text<E: PdfExtractor + ?Sized>(
    extractor: &E,
    document: &PdfDocument,
) -> Result<String, QuizError> {
    let pages = extractor.extract_pages(document)?;
    Ok(join_pages(&pages))
}
