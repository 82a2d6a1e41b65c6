//! Quill query server: newline-delimited JSON over TCP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use quill_core::{Bm25, Index, RamWandData};
use quill_server::session::SearchContext;
use quill_server::{artifacts, session};

/// Quill query server
#[derive(Parser, Debug)]
#[command(name = "quill-server")]
#[command(about = "Boolean and ranked query evaluation over TCP/JSON")]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:7077")]
    addr: String,

    /// Plain-text postings file ("num_docs <N>" header, one term per line)
    #[arg(long)]
    index: PathBuf,

    /// Term dictionary file (one term per line, line number = term-id)
    #[arg(long)]
    terms: PathBuf,

    /// Optional binary old -> new doc-id map applied to relevance lists
    #[arg(long)]
    docid_map: Option<PathBuf>,

    /// Maximum number of tokio worker threads (default: min(cpus, 16))
    #[arg(long)]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("quill_server=info"),
    )
    .init();

    let args = Args::parse();

    let worker_threads = args
        .worker_threads
        .unwrap_or_else(|| num_cpus::get().min(16));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("quill-worker")
        .enable_all()
        .build()?;

    runtime.block_on(serve(args))
}

async fn serve(args: Args) -> Result<()> {
    info!("loading the term dictionary from {}", args.terms.display());
    let dictionary = artifacts::load_term_dictionary(&args.terms)?;
    info!("stored {} terms", dictionary.len());

    let docid_map = match &args.docid_map {
        Some(path) => {
            info!("loading the doc-id map from {}", path.display());
            let map = artifacts::load_docid_map(path)?;
            info!("stored {} doc-ids", map.len());
            Some(map)
        }
        None => None,
    };

    info!("loading the index from {}", args.index.display());
    let index = artifacts::load_index(&args.index)?;
    info!(
        "loaded {} terms over {} documents",
        index.num_terms(),
        index.num_docs()
    );

    info!("building wand data");
    let wdata = RamWandData::build::<Bm25>(&index);

    let context = Arc::new(SearchContext {
        index,
        wdata,
        dictionary,
        docid_map,
    });

    let listener = TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("binding {}", args.addr))?;
    info!("accepting connections on {}", args.addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let context = Arc::clone(&context);
        tokio::spawn(async move {
            if let Err(err) = session::run_session(stream, context).await {
                log::error!("session error: {err:#}");
            }
        });
    }
}
