use crate::boilerplate::PAGE_BREAK;
use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;
            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        if pages.iter().all(|page| page.text.trim().is_empty()) {
            return Err(IngestError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(pages)
    }
}

/// Concatenates page texts in page order, separated by the page-break marker.
pub fn join_pages(pages: &[PageText]) -> String {
    let mut ordered: Vec<&PageText> = pages.iter().collect();
    ordered.sort_by_key(|page| page.number);
    let separator = PAGE_BREAK.to_string();
    ordered
        .iter()
        .map(|page| page.text.as_str())
        .collect::<Vec<_>>()
        .join(&separator)
}

pub fn extract_document_text(
    extractor: &dyn PdfExtractor,
    path: &Path,
) -> Result<String, IngestError> {
    Ok(join_pages(&extractor.extract_pages(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pages_are_joined_in_order_with_page_breaks() {
        let pages = vec![
            PageText {
                number: 2,
                text: "Second".to_string(),
            },
            PageText {
                number: 1,
                text: "First".to_string(),
            },
        ];
        assert_eq!(join_pages(&pages), "First\u{c}Second");
        assert_eq!(join_pages(&[]), "");
    }

    #[test]
    fn non_pdf_input_is_a_parse_error() -> Result<(), IngestError> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"definitely not a pdf")?;

        let result = extract_document_text(&LopdfExtractor, file.path());
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
        Ok(())
    }
}
