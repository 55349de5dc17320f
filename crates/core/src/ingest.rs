use crate::chunking::build_chunks;
use crate::cleaning::TextCleaner;
use crate::embeddings::{embed_for_ingestion, Embedder};
use crate::extractor::{retained_text, Element, PdfPartitioner};
use crate::models::{DuplicatePolicy, IngestionOptions, StoreRecord};
use crate::traits::VectorStore;
use crate::IngestError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use walkdir::WalkDir;

/// Every `*.pdf` below `folder` (extension matched case-insensitively),
/// sorted so batches run in a stable order.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && has_pdf_extension(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect::<Vec<_>>();

    files.sort_unstable();
    files
}

/// Like [`discover_pdf_files`], but a `folder` that is not a directory is an
/// error instead of an empty list.
pub fn collect_pdf_files(folder: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if !folder.is_dir() {
        return Err(IngestError::InvalidArgument(format!(
            "pdf folder does not exist: {}",
            folder.display()
        )));
    }
    Ok(discover_pdf_files(folder))
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Ingested {
        path: PathBuf,
        chunks_stored: usize,
        chunks_dropped: usize,
    },
    /// Nothing from this document reached the store.
    Skipped {
        path: PathBuf,
        reason: String,
    },
    /// The store failed part way; the first `chunks_stored` chunks are on disk.
    Interrupted {
        path: PathBuf,
        chunks_stored: usize,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub pdfs_found: usize,
    pub outcomes: Vec<DocumentOutcome>,
}

impl IngestionReport {
    /// True when the folder held no PDFs at all.
    pub fn is_empty(&self) -> bool {
        self.pdfs_found == 0
    }

    pub fn documents_ingested(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, DocumentOutcome::Ingested { .. }))
            .count()
    }

    pub fn documents_skipped(&self) -> usize {
        self.outcomes.len() - self.documents_ingested()
    }

    /// Chunks written to the store, including those of interrupted documents.
    pub fn chunks_stored(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| match outcome {
                DocumentOutcome::Ingested { chunks_stored, .. }
                | DocumentOutcome::Interrupted { chunks_stored, .. } => *chunks_stored,
                DocumentOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    pub fn chunks_dropped(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| match outcome {
                DocumentOutcome::Ingested { chunks_dropped, .. } => *chunks_dropped,
                DocumentOutcome::Skipped { .. } | DocumentOutcome::Interrupted { .. } => 0,
            })
            .sum()
    }

    /// Documents that were not fully ingested, with the reason.
    pub fn skipped(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            DocumentOutcome::Skipped { path, reason }
            | DocumentOutcome::Interrupted { path, reason, .. } => {
                Some((path.as_path(), reason.as_str()))
            }
            DocumentOutcome::Ingested { .. } => None,
        })
    }
}

/// Offline batch: PDFs in, embedded chunks out to a [`VectorStore`].
pub struct Ingestor<P, E>
where
    P: PdfPartitioner,
    E: Embedder,
{
    partitioner: Arc<P>,
    embedder: E,
    cleaner: TextCleaner,
    options: IngestionOptions,
}

impl<P, E> Ingestor<P, E>
where
    P: PdfPartitioner + 'static,
    E: Embedder,
{
    pub fn new(partitioner: P, embedder: E, options: IngestionOptions) -> Result<Self, IngestError> {
        if options.words_per_chunk == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "words per chunk must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            partitioner: Arc::new(partitioner),
            embedder,
            cleaner: TextCleaner::with_default_patterns()?,
            options,
        })
    }

    /// Ingests every PDF under `folder`. A folder without PDFs yields an
    /// empty report and leaves the store untouched.
    pub async fn ingest_folder<S>(
        &self,
        folder: &Path,
        store: &S,
    ) -> Result<IngestionReport, IngestError>
    where
        S: VectorStore,
    {
        let files = collect_pdf_files(folder)?;
        if files.is_empty() {
            warn!(folder = %folder.display(), "no pdf files found");
            return Ok(IngestionReport::default());
        }

        info!(
            folder = %folder.display(),
            pdfs = files.len(),
            strategy = %self.options.strategy,
            "ingestion started"
        );
        Ok(self.ingest_files(&files, store).await)
    }

    pub async fn ingest_files<S>(&self, files: &[PathBuf], store: &S) -> IngestionReport
    where
        S: VectorStore,
    {
        let mut report = IngestionReport {
            pdfs_found: files.len(),
            outcomes: Vec::with_capacity(files.len()),
        };

        for (position, path) in files.iter().enumerate() {
            let span = info_span!("document", index = position + 1, total = files.len(), path = %path.display());
            let outcome = self.ingest_document(path, store).instrument(span).await;

            match &outcome {
                DocumentOutcome::Ingested {
                    chunks_stored,
                    chunks_dropped,
                    ..
                } => info!(
                    path = %path.display(),
                    chunks_stored,
                    chunks_dropped,
                    "document ingested"
                ),
                DocumentOutcome::Skipped { reason, .. } => {
                    warn!(path = %path.display(), %reason, "document skipped")
                }
                DocumentOutcome::Interrupted {
                    chunks_stored,
                    reason,
                    ..
                } => warn!(path = %path.display(), chunks_stored, %reason, "document interrupted"),
            }
            report.outcomes.push(outcome);
        }

        report
    }

    async fn ingest_document<S>(&self, path: &Path, store: &S) -> DocumentOutcome
    where
        S: VectorStore,
    {
        let source = path.to_string_lossy().to_string();
        let skipped = |reason: String| DocumentOutcome::Skipped {
            path: path.to_path_buf(),
            reason,
        };

        if self.options.duplicates == DuplicatePolicy::SkipExistingSources
            && store.contains_source(&source).await
        {
            return skipped("already ingested".to_string());
        }

        let elements = match self.partition(path).await {
            Ok(elements) => elements,
            Err(reason) => return skipped(reason),
        };

        let cleaned = self.cleaner.clean(&retained_text(&elements));
        let chunks = match build_chunks(&source, &cleaned, self.options.words_per_chunk) {
            Ok(chunks) => chunks,
            Err(error) => return skipped(error.to_string()),
        };

        if chunks.is_empty() {
            warn!(path = %path.display(), "no text left after cleaning");
        }

        let mut chunks_stored = 0;
        let mut chunks_dropped = 0;
        for chunk in chunks {
            let Some(embedding) = embed_for_ingestion(&self.embedder, &chunk.text).await else {
                chunks_dropped += 1;
                continue;
            };

            if let Err(error) = store.add(StoreRecord::from_chunk(chunk, embedding)).await {
                let reason = format!("store write failed: {error}");
                return if chunks_stored == 0 {
                    skipped(reason)
                } else {
                    DocumentOutcome::Interrupted {
                        path: path.to_path_buf(),
                        chunks_stored,
                        reason,
                    }
                };
            }
            chunks_stored += 1;
        }

        DocumentOutcome::Ingested {
            path: path.to_path_buf(),
            chunks_stored,
            chunks_dropped,
        }
    }

    /// Runs on the blocking pool. A partitioner panic becomes a skip reason.
    async fn partition(&self, path: &Path) -> Result<Vec<Element>, String> {
        let partitioner = Arc::clone(&self.partitioner);
        let owned = path.to_path_buf();
        let strategy = self.options.strategy;

        match tokio::task::spawn_blocking(move || partitioner.partition(&owned, strategy)).await {
            Ok(Ok(elements)) => Ok(elements),
            Ok(Err(error)) => Err(error.to_string()),
            Err(join_error) => Err(format!("pdf partitioner crashed: {join_error}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{HashingEmbedder, TaskType};
    use crate::extractor::{ElementKind, LopdfPartitioner, PartitionStrategy};
    use crate::stores::LocalCollection;
    use crate::{ProviderError, ScoredRecord, StoreError};
    use async_trait::async_trait;
    use std::fs::{self, File};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Returns canned elements per file name; unknown files fail to parse.
    struct CannedPartitioner {
        files: Vec<(&'static str, Vec<Element>)>,
    }

    impl PdfPartitioner for CannedPartitioner {
        fn partition(
            &self,
            path: &Path,
            _strategy: PartitionStrategy,
        ) -> Result<Vec<Element>, IngestError> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            self.files
                .iter()
                .find(|(file, _)| *file == name)
                .map(|(_, elements)| elements.clone())
                .ok_or_else(|| IngestError::PdfParse(format!("cannot parse {name}")))
        }
    }

    /// Fails on any chunk containing the word `bozuk`.
    struct PickyEmbedder;

    #[async_trait]
    impl Embedder for PickyEmbedder {
        fn model(&self) -> &str {
            "picky"
        }

        async fn embed(&self, text: &str, _task: TaskType) -> Result<Vec<f32>, ProviderError> {
            if text.contains("bozuk") {
                Err(ProviderError::Decode("malformed".to_string()))
            } else {
                Ok(HashingEmbedder::default().vector(text))
            }
        }
    }

    fn narrative(text: String) -> Vec<Element> {
        vec![Element {
            kind: ElementKind::NarrativeText,
            page: 1,
            text,
        }]
    }

    fn words(count: usize, word: &str) -> String {
        vec![word; count].join(" ")
    }

    fn touch(path: &Path) -> std::io::Result<()> {
        File::create(path).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        touch(&base.join("a.pdf"))?;
        touch(&nested.join("b.PDF"))?;
        fs::write(base.join("notes.txt"), b"not a pdf")?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn folder_without_pdfs_reports_empty_and_stores_nothing(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("readme.txt"), b"no pdfs here")?;
        let store = LocalCollection::open_or_create(dir.path().join("db"), "kvkk_docs").await?;
        let ingestor = Ingestor::new(
            LopdfPartitioner::new(None)?,
            HashingEmbedder::default(),
            IngestionOptions::default(),
        )?;

        let report = ingestor.ingest_folder(dir.path(), &store).await?;

        assert!(report.is_empty());
        assert_eq!(report.chunks_stored(), 0);
        assert_eq!(store.len().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = LocalCollection::open_or_create(dir.path(), "c").await?;
        let ingestor = Ingestor::new(
            LopdfPartitioner::new(None)?,
            HashingEmbedder::default(),
            IngestionOptions::default(),
        )?;

        let result = ingestor.ingest_folder(&dir.path().join("yok"), &store).await;
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_pdf_is_skipped_and_batch_continues(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        touch(&dir.path().join("a_broken.pdf"))?;
        touch(&dir.path().join("b_kanun.pdf"))?;

        let partitioner = CannedPartitioner {
            files: vec![("b_kanun.pdf", narrative(words(20, "rıza")))],
        };
        let store = LocalCollection::open_or_create(dir.path().join("db"), "c").await?;
        let ingestor = Ingestor::new(partitioner, HashingEmbedder::default(), IngestionOptions::default())?;

        let report = ingestor.ingest_folder(dir.path(), &store).await?;

        assert_eq!(report.pdfs_found, 2);
        assert_eq!(report.documents_skipped(), 1);
        assert_eq!(report.documents_ingested(), 1);
        let skipped = report.skipped().collect::<Vec<_>>();
        assert_eq!(
            skipped[0].0.file_name().and_then(|n| n.to_str()),
            Some("a_broken.pdf")
        );
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn twelve_hundred_words_become_three_records() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let pdf = dir.path().join("kanun.pdf");
        touch(&pdf)?;

        let partitioner = CannedPartitioner {
            files: vec![("kanun.pdf", narrative(words(1200, "veri")))],
        };
        let store = LocalCollection::open_or_create(dir.path().join("db"), "c").await?;
        let ingestor = Ingestor::new(partitioner, HashingEmbedder::default(), IngestionOptions::default())?;

        let report = ingestor.ingest_folder(dir.path(), &store).await?;

        assert_eq!(report.chunks_stored(), 3);
        let hits = store.query(&HashingEmbedder::default().vector("veri"), 10).await?;
        let mut sizes = hits
            .iter()
            .map(|hit| hit.document.split_whitespace().count())
            .collect::<Vec<_>>();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![200, 500, 500]);

        let ids = hits
            .iter()
            .map(|hit| hit.id.as_str())
            .collect::<std::collections::HashSet<_>>();
        assert_eq!(ids.len(), 3);
        assert!(hits
            .iter()
            .all(|hit| hit.metadata.source == pdf.to_string_lossy()));
        Ok(())
    }

    #[tokio::test]
    async fn failed_chunk_embedding_drops_only_that_chunk(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        touch(&dir.path().join("kanun.pdf"))?;

        let text = format!("{} {}", words(3, "iyi"), words(2, "bozuk"));
        let partitioner = CannedPartitioner {
            files: vec![("kanun.pdf", narrative(text))],
        };
        let options = IngestionOptions {
            words_per_chunk: 3,
            ..IngestionOptions::default()
        };
        let store = LocalCollection::open_or_create(dir.path().join("db"), "c").await?;
        let ingestor = Ingestor::new(partitioner, PickyEmbedder, options)?;

        let report = ingestor.ingest_folder(dir.path(), &store).await?;

        assert_eq!(report.chunks_stored(), 1);
        assert_eq!(report.chunks_dropped(), 1);
        assert_eq!(report.documents_ingested(), 1);
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn document_with_only_boilerplate_stores_nothing(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        touch(&dir.path().join("kapak.pdf"))?;

        let partitioner = CannedPartitioner {
            files: vec![(
                "kapak.pdf",
                vec![
                    Element {
                        kind: ElementKind::Title,
                        page: 1,
                        text: "T.C. Resmi Gazete".to_string(),
                    },
                    Element {
                        kind: ElementKind::Other,
                        page: 1,
                        text: "içindekiler dizini".to_string(),
                    },
                    Element {
                        kind: ElementKind::NarrativeText,
                        page: 1,
                        text: "Sayfa 1 / 1".to_string(),
                    },
                ],
            )],
        };
        let store = LocalCollection::open_or_create(dir.path().join("db"), "c").await?;
        let ingestor = Ingestor::new(partitioner, PickyEmbedder, IngestionOptions::default())?;

        let report = ingestor.ingest_folder(dir.path(), &store).await?;

        assert_eq!(report.documents_ingested(), 1);
        assert_eq!(report.chunks_stored(), 0);
        assert_eq!(report.chunks_dropped(), 0);
        assert_eq!(store.len().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn reingestion_appends_unless_told_to_skip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        touch(&dir.path().join("kanun.pdf"))?;
        let elements = narrative(words(10, "kişisel"));
        let store = LocalCollection::open_or_create(dir.path().join("db"), "c").await?;

        let appending = Ingestor::new(
            CannedPartitioner {
                files: vec![("kanun.pdf", elements.clone())],
            },
            HashingEmbedder::default(),
            IngestionOptions::default(),
        )?;
        appending.ingest_folder(dir.path(), &store).await?;
        appending.ingest_folder(dir.path(), &store).await?;
        assert_eq!(store.len().await, 2);

        let skipping = Ingestor::new(
            CannedPartitioner {
                files: vec![("kanun.pdf", elements)],
            },
            HashingEmbedder::default(),
            IngestionOptions {
                duplicates: DuplicatePolicy::SkipExistingSources,
                ..IngestionOptions::default()
            },
        )?;
        let report = skipping.ingest_folder(dir.path(), &store).await?;
        assert_eq!(report.documents_skipped(), 1);
        assert_eq!(store.len().await, 2);
        Ok(())
    }

    #[test]
    fn zero_words_per_chunk_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let options = IngestionOptions {
            words_per_chunk: 0,
            ..IngestionOptions::default()
        };
        let result = Ingestor::new(LopdfPartitioner::new(None)?, HashingEmbedder::default(), options);
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
        Ok(())
    }

    struct ContextEcho;

    #[async_trait]
    impl crate::generation::Generator for ContextEcho {
        async fn generate(
            &self,
            prompt: &crate::prompt::Prompt,
        ) -> Result<crate::generation::ModelReply, ProviderError> {
            Ok(crate::generation::ModelReply {
                answer: Some(prompt.context.clone()),
                output_text: None,
            })
        }
    }

    #[tokio::test]
    async fn ingested_collection_answers_after_reopening() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let pdf = dir.path().join("kanun.pdf");
        touch(&pdf)?;
        let db = dir.path().join("db");

        {
            let store = LocalCollection::open_or_create(&db, "kvkk_docs").await?;
            let ingestor = Ingestor::new(
                CannedPartitioner {
                    files: vec![(
                        "kanun.pdf",
                        narrative("Kişisel veri işlenmesi rıza gerektirir.".to_string()),
                    )],
                },
                HashingEmbedder::default(),
                IngestionOptions::default(),
            )?;
            ingestor.ingest_folder(dir.path(), &store).await?;
        }

        let store = LocalCollection::open_existing(&db, "kvkk_docs").await?;
        let pipeline = crate::rag::AnswerPipeline::new(HashingEmbedder::default(), store, ContextEcho);

        let outcome = pipeline.answer("Rıza ne zaman gerekir?").await;

        match outcome {
            crate::rag::QueryOutcome::Done {
                answer,
                prompt,
                sources,
            } => {
                assert_eq!(sources.len(), 1);
                assert_eq!(sources[0].metadata.source, pdf.to_string_lossy());
                assert_eq!(prompt.context, "Kişisel veri işlenmesi rıza gerektirir.");
                assert!(prompt.system.contains("Kişisel veri işlenmesi rıza gerektirir."));
                assert_eq!(answer, prompt.context);
            }
            other => panic!("expected an answer, got {other:?}"),
        }
        Ok(())
    }

    /// Panics on files whose name contains `panik`.
    struct PanickyPartitioner;

    impl PdfPartitioner for PanickyPartitioner {
        fn partition(
            &self,
            path: &Path,
            _strategy: PartitionStrategy,
        ) -> Result<Vec<Element>, IngestError> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.contains("panik") {
                panic!("malformed xref table in {name}");
            }
            Ok(narrative(words(5, "madde")))
        }
    }

    #[tokio::test]
    async fn partitioner_panic_skips_only_that_document() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        touch(&dir.path().join("a_panik.pdf"))?;
        touch(&dir.path().join("b_kanun.pdf"))?;
        let store = LocalCollection::open_or_create(dir.path().join("db"), "c").await?;
        let ingestor = Ingestor::new(PanickyPartitioner, HashingEmbedder::default(), IngestionOptions::default())?;

        let report = ingestor.ingest_folder(dir.path(), &store).await?;

        assert_eq!(report.documents_ingested(), 1);
        let skipped = report.skipped().collect::<Vec<_>>();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].0.ends_with("a_panik.pdf"));
        assert!(skipped[0].1.contains("crashed"), "reason: {}", skipped[0].1);
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    /// Accepts `limit` records, then fails every write.
    struct FillingStore {
        accepted: AtomicUsize,
        limit: usize,
    }

    #[async_trait]
    impl VectorStore for FillingStore {
        async fn add(&self, _record: StoreRecord) -> Result<(), StoreError> {
            if self.accepted.load(Ordering::SeqCst) >= self.limit {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.accepted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn query(&self, _e: &[f32], _k: usize) -> Result<Vec<ScoredRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn len(&self) -> usize {
            self.accepted.load(Ordering::SeqCst)
        }

        async fn contains_source(&self, _source: &str) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn store_failure_mid_document_counts_what_was_written(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        touch(&dir.path().join("kanun.pdf"))?;
        let partitioner = CannedPartitioner {
            files: vec![("kanun.pdf", narrative(words(9, "veri")))],
        };
        let options = IngestionOptions {
            words_per_chunk: 3,
            ..IngestionOptions::default()
        };
        let store = FillingStore {
            accepted: AtomicUsize::new(0),
            limit: 2,
        };
        let ingestor = Ingestor::new(partitioner, HashingEmbedder::default(), options)?;

        let report = ingestor.ingest_folder(dir.path(), &store).await?;

        assert!(matches!(
            report.outcomes.as_slice(),
            [DocumentOutcome::Interrupted { chunks_stored: 2, .. }]
        ));
        assert_eq!(report.chunks_stored(), 2);
        assert_eq!(report.documents_ingested(), 0);
        assert_eq!(report.skipped().count(), 1);
        Ok(())
    }

    #[derive(Default)]
    struct TaskRecordingEmbedder {
        tasks: Mutex<Vec<TaskType>>,
    }

    #[async_trait]
    impl Embedder for TaskRecordingEmbedder {
        fn model(&self) -> &str {
            "task-recording"
        }

        async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError> {
            if let Ok(mut tasks) = self.tasks.lock() {
                tasks.push(task);
            }
            Ok(HashingEmbedder::default().vector(text))
        }
    }

    #[tokio::test]
    async fn chunks_are_embedded_as_retrieval_documents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        touch(&dir.path().join("kanun.pdf"))?;
        let partitioner = CannedPartitioner {
            files: vec![("kanun.pdf", narrative(words(7, "rıza")))],
        };
        let options = IngestionOptions {
            words_per_chunk: 3,
            ..IngestionOptions::default()
        };
        let store = LocalCollection::open_or_create(dir.path().join("db"), "c").await?;
        let ingestor = Ingestor::new(partitioner, TaskRecordingEmbedder::default(), options)?;

        ingestor.ingest_folder(dir.path(), &store).await?;

        let tasks = ingestor
            .embedder
            .tasks
            .lock()
            .map(|tasks| tasks.clone())
            .unwrap_or_default();
        assert_eq!(tasks, vec![TaskType::RetrievalDocument; 3]);
        Ok(())
    }
}
