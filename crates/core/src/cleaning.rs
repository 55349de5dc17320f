use crate::error::IngestError;
use regex::Regex;

/// Page footers and gazette headers repeated on every page of the corpus.
pub const BOILERPLATE_PATTERNS: [&str; 2] = [r"Sayfa \d+ / \d+", r"T\.C\. Resmi Gazete"];

#[derive(Debug, Clone)]
pub struct TextCleaner {
    patterns: Vec<Regex>,
    spaces: Regex,
    newlines: Regex,
}

impl TextCleaner {
    pub fn new<I, S>(patterns: I) -> Result<Self, IngestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| Regex::new(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            spaces: Regex::new(r"[ \t\u{a0}]{2,}")?,
            newlines: Regex::new(r"\n{3,}")?,
        })
    }

    pub fn with_default_patterns() -> Result<Self, IngestError> {
        Self::new(BOILERPLATE_PATTERNS)
    }

    /// Strips boilerplate and normalizes whitespace until the text is stable,
    /// so `clean(clean(t)) == clean(t)`.
    ///
    /// Removing a footer can splice two halves of another one together, so a
    /// single pass is not enough. Every pass that changes the text makes it
    /// strictly shorter, which bounds the loop.
    pub fn clean(&self, text: &str) -> String {
        let mut current = self.clean_once(text);
        loop {
            let next = self.clean_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn clean_once(&self, text: &str) -> String {
        let mut cleaned = text.replace("\r\n", "\n");
        for pattern in &self.patterns {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
        let cleaned = self.spaces.replace_all(&cleaned, " ");
        let cleaned = self.newlines.replace_all(&cleaned, "\n\n");
        cleaned.trim().to_string()
    }
}
