use clap::{Parser, Subcommand};
use counsel_ai_context::text::DocumentChunker;
use counsel_ai_embed::{EmbedConfig, FastEmbedProvider, NormalizedEmbedder};
use counsel_ai_retriever::retrieval::{DocumentIndexer, RetrievalEngine};
use counsel_ai_retriever::vector_store::http::{HttpVectorStore, HttpVectorStoreConfig};
use counsel_ai_retriever::vector_store::VectorStore;
use counsel_ai_retriever::RetrieverConfig;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// A CLI tool to manage and query the legal document vector index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "counsel-ai.toml")]
    config: PathBuf,

    /// Session the documents belong to
    #[arg(short, long, default_value = "cli")]
    session: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk, embed, and store a document
    Store {
        /// Document identifier under this session
        document: String,
        /// File containing the document text
        file: PathBuf,
    },
    /// Retrieve the most relevant chunks of a document for a query
    Search {
        /// Document identifier under this session
        document: String,
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        top_k: Option<usize>,
    },
    /// Show what is stored for a document
    Info {
        /// Document identifier under this session
        document: String,
    },
    /// Delete every vector stored for a document
    Delete {
        /// Document identifier under this session
        document: String,
    },
    /// Show index statistics
    Stats,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = RetrieverConfig::load(&args.config)?;

    let store: Arc<dyn VectorStore> = Arc::new(HttpVectorStore::new(HttpVectorStoreConfig {
        endpoint: config.index.endpoint.clone(),
        api_key: config.index.api_key.clone(),
        namespace: config.index.namespace.clone(),
        dimension: config.index.target_dimension,
    })?);

    let provider =
        FastEmbedProvider::create(EmbedConfig::default().with_target_dimension(
            config.index.target_dimension,
        ))
        .await?;
    let embedder = NormalizedEmbedder::new(Arc::new(provider), config.index.target_dimension);

    match args.command {
        Commands::Store { document, file } => {
            let text = std::fs::read_to_string(&file)?;
            let chunker =
                DocumentChunker::new(config.chunking.chunk_size, config.chunking.overlap)?;
            let indexer = DocumentIndexer::new(store, embedder, chunker);
            let mut extra = BTreeMap::new();
            extra.insert(
                "filename".to_string(),
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
            let stored = indexer
                .store_document(&args.session, &document, &text, extra)
                .await?;
            println!(
                "Stored {} as {} chunks ({} vectors written)",
                stored.document_id, stored.chunk_count, stored.vectors_written
            );
        }
        Commands::Search {
            document,
            query,
            top_k,
        } => {
            let engine = RetrievalEngine::new(store, embedder);
            let chunks = engine
                .retrieve(
                    &args.session,
                    &document,
                    &query,
                    &[],
                    top_k.unwrap_or(config.retrieval.top_k),
                )
                .await?;
            if chunks.is_empty() {
                println!("No matching chunks.");
            }
            for chunk in chunks {
                println!(
                    "#{} score {:.3}\n{}\n",
                    chunk.metadata.chunk_index, chunk.score, chunk.metadata.text
                );
            }
        }
        Commands::Info { document } => {
            let chunker =
                DocumentChunker::new(config.chunking.chunk_size, config.chunking.overlap)?;
            let indexer = DocumentIndexer::new(store, embedder, chunker);
            match indexer.document_info(&args.session, &document).await? {
                Some(info) => println!(
                    "{}: {} chunks, {} words",
                    info.document_id, info.chunk_count, info.total_words
                ),
                None => println!("Document not found."),
            }
        }
        Commands::Delete { document } => {
            let chunker =
                DocumentChunker::new(config.chunking.chunk_size, config.chunking.overlap)?;
            let indexer = DocumentIndexer::new(store, embedder, chunker);
            let removed = indexer.delete_document(&args.session, &document).await?;
            println!("Deleted {removed} vectors.");
        }
        Commands::Stats => {
            let stats = store.describe().await?;
            println!(
                "{} vectors, dimension {}",
                stats.total_vectors, stats.dimension
            );
        }
    }

    Ok(())
}
