use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::warn;
use std::io;
use std::path::PathBuf;
use tokio::io::BufReader;

use pdf_rag::config::{load_dotenv, ChatConfig};
use pdf_rag::database::{PgVectorStore, VectorStore};
use pdf_rag::embeddings::OpenAIEmbeddings;
use pdf_rag::llm::OpenAIChat;
use pdf_rag::rag::{print_header, run_query_loop, LoopExit, RagEngine};
use pdf_rag::retriever::Retriever;

/// Ask questions about the ingested PDF; answers come only from its content
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Read environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

type Engine = RagEngine<OpenAIEmbeddings, PgVectorStore, OpenAIChat>;

async fn build_engine(env_file: Option<PathBuf>) -> anyhow::Result<Engine> {
    load_dotenv(env_file.as_deref())?;
    let config = ChatConfig::from_env()?;

    let store = PgVectorStore::new(&config.pgvector.url)?;
    if !store.collection_exists(&config.pgvector.collection).await? {
        warn!(
            "Collection {} does not exist yet. Run the ingest binary first",
            config.pgvector.collection
        );
    }

    let embedder = OpenAIEmbeddings::new(config.openai.clone());
    let model = OpenAIChat::new(config.openai);
    let retriever = Retriever::new(embedder, store, config.pgvector.collection);

    Ok(RagEngine::new(retriever, model))
}

async fn interrupt() {
    // Without a handler there is nothing to wait for
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut stdout = io::stdout();
    print_header(&mut stdout)?;

    let engine = match build_engine(args.env_file).await {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("[ERRO] Erro ao inicializar o chat: {:#}", e);
            eprintln!("\nVerifique se:");
            eprintln!("  1. O arquivo .env está configurado corretamente");
            eprintln!("  2. O banco de dados está rodando (docker compose up -d)");
            eprintln!("  3. A ingestão do PDF foi executada (cargo run --bin ingest)");
            std::process::exit(1);
        }
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let exit = run_query_loop(&engine, stdin, &mut stdout, interrupt()).await?;

    // A blocked stdin read would otherwise hold up runtime shutdown
    if exit == LoopExit::Interrupted {
        std::process::exit(0);
    }

    Ok(())
}
