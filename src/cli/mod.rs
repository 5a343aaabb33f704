// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::chunks::{build_chunks, ChunkStore};
use crate::config::NodeConfig;
use crate::dataset::load_records;
use crate::embeddings::{load_embedder, EmbedderBackend};
use crate::index::FlatIpIndex;

/// FoodScope RAG Node CLI
#[derive(Parser, Debug)]
#[command(name = "foodscope-cli")]
#[command(about = "Offline asset tooling for the FoodScope RAG node", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the paired vector-index + chunk-list artifacts from the source CSVs
    BuildAssets(BuildAssetsArgs),
}

#[derive(Args, Debug)]
pub struct BuildAssetsArgs {
    /// Primary county profile table
    #[arg(long, default_value = "rag_df.csv")]
    pub profiles_csv: PathBuf,

    /// Worst-risk-cluster table, joined on (County, State)
    #[arg(long)]
    pub risk_csv: Option<PathBuf>,

    /// Output path for the vector index artifact
    #[arg(long, default_value = "./assets/county_index.bin")]
    pub index_out: PathBuf,

    /// Output path for the chunk list artifact
    #[arg(long, default_value = "./assets/county_chunks.json")]
    pub chunks_out: PathBuf,

    /// Embedding backend (minilm or hashing)
    #[arg(long, default_value = "minilm")]
    pub embedder: String,

    /// ONNX model path (minilm backend)
    #[arg(long, env = "ONNX_MODEL_PATH")]
    pub onnx_model_path: Option<PathBuf>,

    /// Tokenizer path (minilm backend)
    #[arg(long, env = "TOKENIZER_PATH")]
    pub tokenizer_path: Option<PathBuf>,

    /// Rebuild even if both artifacts already exist
    #[arg(long)]
    pub force: bool,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::BuildAssets(args) => build_assets(args).await,
    }
}

/// Run the offline batch build: join the two tables, render one profile per
/// county, embed every profile, and persist the index + chunk pair.
///
/// Both artifacts are written temp-then-rename, chunk list last, so readers
/// never observe a half-replaced pair.
pub async fn build_assets(args: BuildAssetsArgs) -> Result<()> {
    if !args.force && args.index_out.exists() && args.chunks_out.exists() {
        bail!(
            "Artifacts already exist at {} and {}; pass --force to rebuild",
            args.index_out.display(),
            args.chunks_out.display()
        );
    }

    let records = load_records(&args.profiles_csv, args.risk_csv.as_deref())
        .context("Failed to load source tables")?;
    info!("Loaded {} county records", records.len());

    let store = ChunkStore::new(build_chunks(&records))?;
    info!("Rendered {} county profiles", store.len());

    let mut embedder_config = NodeConfig::default();
    embedder_config.embedder = args.embedder.parse::<EmbedderBackend>()?;
    if let Some(path) = args.onnx_model_path {
        embedder_config.onnx_model_path = path;
    }
    if let Some(path) = args.tokenizer_path {
        embedder_config.tokenizer_path = path;
    }
    let embedder = load_embedder(&embedder_config)
        .await
        .context("Failed to load embedding model")?;

    info!(
        "Embedding {} profiles with {}...",
        store.len(),
        embedder.model_name()
    );
    let embeddings = embedder.embed_batch(&store.texts()).await?;

    let index = FlatIpIndex::build(
        &embeddings,
        embedder.dimension(),
        store.fingerprint().to_string(),
    )?;

    for out in [&args.index_out, &args.chunks_out] {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    index.save(&args.index_out)?;
    store.save(&args.chunks_out)?;

    info!(
        "Assets written: {} ({} vectors, {}d) and {}",
        args.index_out.display(),
        index.len(),
        index.dimension(),
        args.chunks_out.display()
    );
    Ok(())
}
