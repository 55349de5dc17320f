use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use kvkk_rag_core::config::{
    DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_PERSIST_DIR, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};
use kvkk_rag_core::{
    collect_pdf_files, AnswerPipeline, ApiKey, Conversation, ConversationTurn, DuplicatePolicy,
    Embedder, GeminiEmbedder, GeminiGenerator, IngestionOptions, IngestionReport, Ingestor,
    LocalCollection, LopdfPartitioner, OcrEndpointConfig, PartitionStrategy, PdfPartitioner,
    ProviderSettings, QueryOutcome, VectorStore, WORDS_PER_CHUNK,
};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kvkk-rag", version, about = "KVKK document assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the persisted vector collection
    #[arg(long, env = "KVKK_PERSIST_DIR", default_value = DEFAULT_PERSIST_DIR)]
    persist_dir: PathBuf,

    /// Collection name inside the persist directory
    #[arg(long, env = "KVKK_COLLECTION", default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Google Generative Language API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Generative Language API base URL
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Embedding model
    #[arg(long, env = "GEMINI_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Chat model
    #[arg(long, env = "GEMINI_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Sampling temperature for the chat model
    #[arg(long, env = "GEMINI_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Upper bound for a single provider call, in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, clean, chunk and embed every PDF under a folder.
    Ingest {
        /// Folder that contains PDFs recursively.
        #[arg(long, default_value = "kvkk_veri_Seti")]
        folder: PathBuf,

        /// Partitioning strategy: fast or hi_res.
        #[arg(long, default_value = "hi_res")]
        strategy: PartitionStrategy,

        /// Words per stored chunk.
        #[arg(long, default_value_t = WORDS_PER_CHUNK)]
        words_per_chunk: usize,

        /// Skip PDFs already present in the collection instead of appending duplicates.
        #[arg(long, default_value_t = false)]
        skip_existing: bool,

        /// Multimodal OCR endpoint used by hi_res for scanned PDFs.
        #[arg(long, env = "LLM_OCR_ENDPOINT")]
        ocr_endpoint: Option<String>,

        /// Bearer token for the OCR endpoint.
        #[arg(long, env = "LLM_OCR_API_KEY", hide_env_values = true)]
        ocr_api_key: Option<String>,
    },
    /// Ask questions interactively over the ingested collection.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Ok(path) = &dotenv {
        info!(path = %path.display(), "loaded .env");
    }

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "kvkk-rag boot"
    );

    let settings = provider_settings(&cli)?;

    match cli.command {
        Command::Ingest {
            folder,
            strategy,
            words_per_chunk,
            skip_existing,
            ocr_endpoint,
            ocr_api_key,
        } => {
            let options = IngestionOptions {
                strategy,
                words_per_chunk,
                duplicates: if skip_existing {
                    DuplicatePolicy::SkipExistingSources
                } else {
                    DuplicatePolicy::Append
                },
            };
            let ocr = OcrEndpointConfig::from_parts(ocr_endpoint, ocr_api_key);
            run_ingest(&settings, &cli.persist_dir, &cli.collection, &folder, options, ocr).await
        }
        Command::Chat => run_chat(&settings, &cli.persist_dir, &cli.collection).await,
    }
}

fn provider_settings(cli: &Cli) -> anyhow::Result<ProviderSettings> {
    let api_key = ApiKey::new(cli.api_key.clone())?;
    Ok(ProviderSettings::new(api_key, &cli.base_url)?
        .with_models(&cli.embedding_model, &cli.chat_model)
        .with_temperature(cli.temperature)
        .with_timeout(Duration::from_secs(cli.timeout_secs.max(1))))
}

async fn run_ingest(
    settings: &ProviderSettings,
    persist_dir: &Path,
    collection: &str,
    folder: &Path,
    options: IngestionOptions,
    ocr: Option<OcrEndpointConfig>,
) -> anyhow::Result<()> {
    println!("'{}' taranıyor... Strateji: {}", folder.display(), options.strategy);

    let ingestor = Ingestor::new(
        LopdfPartitioner::new(ocr)?,
        GeminiEmbedder::new(settings)?,
        options,
    )?;

    let Some((report, store)) =
        ingest_into_collection(&ingestor, folder, persist_dir, collection).await?
    else {
        println!("❌ Hiç PDF bulunamadı.");
        return Ok(());
    };

    for (path, reason) in report.skipped() {
        println!("⚠️ Hata: {} işlenemedi: {}", path.display(), reason);
    }
    if report.chunks_dropped() > 0 {
        warn!(
            chunks_dropped = report.chunks_dropped(),
            "some chunks were not stored because embedding failed"
        );
    }

    println!(
        "✅ {}/{} PDF işlendi, {} parça '{}' altına kaydedildi ({} parça atlandı). Koleksiyonda toplam {} kayıt var.",
        report.documents_ingested(),
        report.pdfs_found,
        report.chunks_stored(),
        store.dir().display(),
        report.chunks_dropped(),
        store.len().await
    );
    Ok(())
}

/// Opens the collection only once the folder is known to hold PDFs, so a
/// mistyped or empty folder never leaves an empty store for `chat` to find.
async fn ingest_into_collection<P, E>(
    ingestor: &Ingestor<P, E>,
    folder: &Path,
    persist_dir: &Path,
    collection: &str,
) -> anyhow::Result<Option<(IngestionReport, LocalCollection)>>
where
    P: PdfPartitioner + 'static,
    E: Embedder,
{
    let files = collect_pdf_files(folder)?;
    if files.is_empty() {
        return Ok(None);
    }
    println!("📄 Toplam {} PDF bulundu. İşlem başlıyor...", files.len());

    let store = LocalCollection::open_or_create(persist_dir, collection)
        .await
        .with_context(|| format!("cannot open collection in {}", persist_dir.display()))?;
    let report = ingestor.ingest_files(&files, &store).await;
    Ok(Some((report, store)))
}

async fn run_chat(
    settings: &ProviderSettings,
    persist_dir: &Path,
    collection: &str,
) -> anyhow::Result<()> {
    let store = LocalCollection::open_existing(persist_dir, collection).await?;
    if store.is_empty().await {
        warn!(dir = %store.dir().display(), "collection has no records; answers will rely on general knowledge");
    }

    let pipeline = AnswerPipeline::new(
        GeminiEmbedder::new(settings)?,
        store,
        GeminiGenerator::new(settings)?,
    );
    info!(top_k = pipeline.top_k(), "retrieval chain ready");

    let mut conversation = Conversation::new();
    for turn in conversation.turns() {
        print_turn(turn);
    }
    println!("(/history geçmişi gösterir, /exit çıkar)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "/exit" | "/quit" => break,
            "/history" => {
                for turn in conversation.turns() {
                    print_turn(turn);
                }
                continue;
            }
            _ => {}
        }

        if let Some(outcome) = conversation.ask(&pipeline, &line).await {
            println!("assistant: {}", outcome.response_text());
            print_sources(&outcome);
        }
    }

    Ok(())
}

fn print_turn(turn: &ConversationTurn) {
    println!("{}: {}", turn.role, turn.content);
}

fn print_sources(outcome: &QueryOutcome) {
    if let QueryOutcome::Done { sources, .. } = outcome {
        let unique = sources
            .iter()
            .map(|hit| hit.metadata.source.as_str())
            .collect::<BTreeSet<_>>();
        if !unique.is_empty() {
            println!(
                "  kaynaklar: {}",
                unique.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
    }
}
