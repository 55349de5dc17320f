use crate::error::IngestError;
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::Document;
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::runtime::RuntimeFlavor;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// How hard the partitioner tries to get text out of a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionStrategy {
    /// Embedded text layer only.
    Fast,
    /// Text layer, falling back to multimodal OCR for scanned documents.
    #[default]
    HiRes,
}

impl FromStr for PartitionStrategy {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "hi_res" | "hi-res" | "hires" => Ok(Self::HiRes),
            other => Err(IngestError::InvalidArgument(format!(
                "unknown partition strategy {other:?} (expected fast or hi_res)"
            ))),
        }
    }
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => f.write_str("fast"),
            Self::HiRes => f.write_str("hi_res"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Title,
    NarrativeText,
    ListItem,
    Other,
}

impl ElementKind {
    /// Kinds that carry legal text worth indexing.
    pub fn is_retained(self) -> bool {
        matches!(self, Self::Title | Self::NarrativeText | Self::ListItem)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    pub page: u32,
    pub text: String,
}

/// Upper bound for one OCR round trip; scanned gazettes can be large.
const OCR_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Serialize)]
struct OcrRequest<'a> {
    pdf_base64: String,
    source_path: &'a str,
    language: &'static str,
}

/// Either `pages` or a form-feed separated `text` blob.
#[derive(Debug, Default, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OcrPage {
    page: Option<u32>,
    #[serde(default)]
    text: String,
}

impl OcrResponse {
    fn into_pages(self) -> Vec<PageText> {
        let listed = self
            .pages
            .iter()
            .filter_map(|page| page_text(page.page.unwrap_or(1), &page.text))
            .collect::<Vec<_>>();
        if !listed.is_empty() {
            return listed;
        }

        self.text
            .as_deref()
            .unwrap_or_default()
            .split('\u{000c}')
            .zip(1..)
            .filter_map(|(raw, number)| page_text(number, raw))
            .collect()
    }
}

fn page_text(number: u32, raw: &str) -> Option<PageText> {
    let text = raw.trim();
    (!text.is_empty()).then(|| PageText {
        number,
        text: text.to_string(),
    })
}

/// Multimodal OCR service used by [`PartitionStrategy::HiRes`] when a PDF
/// has no usable text layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrEndpointConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl OcrEndpointConfig {
    /// Returns `None` when no endpoint is configured.
    pub fn from_parts(endpoint: Option<String>, api_key: Option<String>) -> Option<Self> {
        Some(Self {
            endpoint: non_blank(endpoint)?,
            api_key: non_blank(api_key),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

pub trait PdfPartitioner: Send + Sync {
    fn partition(&self, path: &Path, strategy: PartitionStrategy)
        -> Result<Vec<Element>, IngestError>;
}

#[derive(Debug)]
pub struct LopdfPartitioner {
    classifier: LineClassifier,
    ocr: Option<OcrEndpointConfig>,
}

impl LopdfPartitioner {
    pub fn new(ocr: Option<OcrEndpointConfig>) -> Result<Self, IngestError> {
        Ok(Self {
            classifier: LineClassifier::new()?,
            ocr,
        })
    }
}

impl PdfPartitioner for LopdfPartitioner {
    fn partition(
        &self,
        path: &Path,
        strategy: PartitionStrategy,
    ) -> Result<Vec<Element>, IngestError> {
        let pages = match (read_text_layer(path), strategy, &self.ocr) {
            (Ok(pages), _, _) => pages,
            (Err(IngestError::PdfParse(parse_error)), PartitionStrategy::HiRes, Some(cfg)) => {
                debug!(path = %path.display(), %parse_error, "text layer unusable, trying OCR");
                extract_with_llm_ocr(cfg, path).map_err(|ocr_error| {
                    IngestError::PdfParse(format!(
                        "{parse_error}; multimodal OCR fallback failed: {ocr_error}"
                    ))
                })?
            }
            (Err(error), _, _) => return Err(error),
        };

        Ok(pages
            .iter()
            .flat_map(|page| self.classifier.partition_page(page.number, &page.text))
            .collect())
    }
}

fn read_text_layer(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let parse_error =
        |error: lopdf::Error| IngestError::PdfParse(format!("{}: {error}", path.display()));
    let document = Document::load(path).map_err(parse_error)?;

    let mut pages = Vec::new();
    for page_no in document.get_pages().into_keys() {
        let raw = document.extract_text(&[page_no]).map_err(parse_error)?;
        pages.extend(page_text(page_no, &raw));
    }

    if pages.is_empty() {
        return Err(IngestError::PdfParse(format!(
            "{} has no text layer",
            path.display()
        )));
    }
    Ok(pages)
}

/// Concatenates the text of retained elements, separated by a blank line.
pub fn retained_text(elements: &[Element]) -> String {
    elements
        .iter()
        .filter(|element| element.kind.is_retained())
        .map(|element| element.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Line-level heuristics that turn extracted page text into elements.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    list_item: Regex,
    heading: Regex,
}

impl LineClassifier {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            list_item: Regex::new(r"^(?:[-•*▪◦]\s+|\(?[a-zçğıöşü0-9]{1,3}\)\s+|\d{1,3}[.)]\s+)")?,
            heading: Regex::new(
                r"^(?:MADDE\s+\d+|(?:[A-ZÇĞİÖŞÜ]+\s+)?(?:BÖLÜM|KISIM)\b|GEÇİCİ\s+MADDE)",
            )?,
        })
    }

    /// Splits one page of extracted text into structural elements.
    ///
    /// Consecutive sentence lines form one `NarrativeText`; blank lines and
    /// non-narrative lines end the paragraph.
    pub fn partition_page(&self, page: u32, text: &str) -> Vec<Element> {
        let mut elements = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();

        for line in text.lines().map(str::trim) {
            if line.is_empty() {
                flush_paragraph(page, &mut paragraph, &mut elements);
                continue;
            }

            match self.classify_line(line) {
                ElementKind::NarrativeText => paragraph.push(line),
                kind => {
                    flush_paragraph(page, &mut paragraph, &mut elements);
                    elements.push(Element {
                        kind,
                        page,
                        text: line.to_string(),
                    });
                }
            }
        }
        flush_paragraph(page, &mut paragraph, &mut elements);

        elements
    }

    pub fn classify_line(&self, line: &str) -> ElementKind {
        let letters = line.chars().filter(|c| c.is_alphabetic()).count();
        if letters < 2 {
            return ElementKind::Other;
        }

        if self.list_item.is_match(line) {
            return ElementKind::ListItem;
        }

        let word_count = line.split_whitespace().count();
        let ends_like_sentence = line.ends_with(['.', ';', ':', ',']);
        let all_upper = line
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase);

        if word_count <= 12 && !ends_like_sentence && (all_upper || self.heading.is_match(line)) {
            return ElementKind::Title;
        }

        ElementKind::NarrativeText
    }
}

fn flush_paragraph(page: u32, paragraph: &mut Vec<&str>, elements: &mut Vec<Element>) {
    if !paragraph.is_empty() {
        elements.push(Element {
            kind: ElementKind::NarrativeText,
            page,
            text: paragraph.join(" "),
        });
        paragraph.clear();
    }
}

fn extract_with_llm_ocr(
    cfg: &OcrEndpointConfig,
    path: &Path,
) -> Result<Vec<PageText>, IngestError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| request_ocr(cfg, path))
        }
        // block_in_place is unavailable on a current-thread runtime.
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| request_ocr(cfg, path))
                .join()
                .map_err(|_| IngestError::OcrFailed("OCR worker thread panicked".to_string()))?
        }),
        Err(_) => request_ocr(cfg, path),
    }
}

fn request_ocr(cfg: &OcrEndpointConfig, path: &Path) -> Result<Vec<PageText>, IngestError> {
    let source_path = path.to_string_lossy();
    let body = OcrRequest {
        pdf_base64: STANDARD.encode(std::fs::read(path)?),
        source_path: &source_path,
        language: "tr",
    };

    let client = Client::builder().timeout(OCR_TIMEOUT).build()?;
    let mut request = client.post(&cfg.endpoint).json(&body);
    if let Some(api_key) = &cfg.api_key {
        request = request.bearer_auth(api_key);
    }

    let response = request.send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::OcrFailed(format!(
            "{} answered {status}",
            cfg.endpoint
        )));
    }

    let pages = response.json::<OcrResponse>()?.into_pages();
    if pages.is_empty() {
        return Err(IngestError::OcrFailed(format!(
            "no text recognised in {}",
            path.display()
        )));
    }
    debug!(path = %path.display(), pages = pages.len(), "OCR recovered text");
    Ok(pages)
}
