use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use pdf_rag::config::{load_dotenv, IngestConfig};
use pdf_rag::database::PgVectorStore;
use pdf_rag::embeddings::OpenAIEmbeddings;
use pdf_rag::ingest::Ingestor;
use pdf_rag::RagError;

/// Ingest the PDF named by PDF_PATH into the pgvector collection named by PGVECTOR_COLLECTION
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Read environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Remove everything already stored in the collection before ingesting
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize environment
    load_dotenv(args.env_file.as_deref()).context("Failed to load env file")?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = IngestConfig::from_env()?;
    info!("Starting ingestion of {}", config.pdf_path.display());

    let embedder = OpenAIEmbeddings::new(config.openai.clone());
    info!("Using embedding model {}", embedder.model());
    let store = PgVectorStore::new(&config.pgvector.url)?;

    let result = Ingestor::new(embedder, store)
        .with_reset(args.reset)
        .ingest(&config.pdf_path, &config.pgvector.collection)
        .await;

    match result {
        Ok(count) => {
            println!("\n[OK] Ingestão concluída com sucesso!");
            println!("   - {} chunks foram salvos no banco de dados", count);
            println!("   - Collection: {}", config.pgvector.collection);
            Ok(())
        }
        Err(RagError::NoChunks { .. }) => {
            println!("Nenhum chunk foi criado. Verifique o conteúdo do PDF.");
            Ok(())
        }
        Err(e) => {
            eprintln!("\n[ERRO] Erro durante a ingestão: {}", e);
            Err(e).context("Ingestion failed")
        }
    }
}
