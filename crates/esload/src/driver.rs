//! 🎬 *[camera pans across a directory of NDJSON dumps]*
//! 🎬 "In a world where files sit on disk..."
//! 🎬 "One driver dared to walk them into a cluster. One at a time."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The driver: connect, sort out the target index (asking first if it already exists),
//! find the files, then load → enrich → ingest each one in turn.
//!
//! 🧠 Knowledge graph:
//! - **Fatal**: bad prompt answer, no input configured, index settings that won't load,
//!   index create/delete rejected by the cluster (dated indices included). These
//!   propagate and end the run.
//! - **Per-file**: parse failures, unreachable cluster, rejected bulk calls. These are
//!   logged, written into the `RunReport`, and the loop moves on to the next file.
//! - **Existing index + "y"**: delete, then recreate from the descriptor, then ingest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::app_config::{AppConfig, IndexConfig, InputConfig};
use crate::cluster::{ClusterClient, IndexDescriptor, IndexManager};
use crate::enrich::Enricher;
use crate::errors::DriverError;
use crate::ingest::BulkIngestor;
use crate::loaders::load_records;
use crate::progress::{FileOutcome, FileProgress, RunReport};

const DELETE_QUESTION: &str = "Would you like to delete the index? [y/n]";

/// ❓ Something that can answer a yes/no question. Stdin in real life, a canned answer in tests.
#[async_trait]
pub trait Prompt: Send {
    async fn ask(&mut self, question: &str) -> Result<String>;
}

/// ⌨️ Asks on stdout, reads one line from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

#[async_trait]
impl Prompt for StdinPrompt {
    async fn ask(&mut self, question: &str) -> Result<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{question} ").as_bytes()).await?;
        stdout.flush().await?;

        let mut answer = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut answer)
            .await
            .context("💀 could not read an answer from stdin")?;
        Ok(answer)
    }
}

/// 🤖 Always gives the same answer. Backs `--assume-yes` / `--assume-no` and the tests.
#[derive(Debug, Clone)]
pub struct FixedAnswer(pub String);

#[async_trait]
impl Prompt for FixedAnswer {
    async fn ask(&mut self, question: &str) -> Result<String> {
        info!("❓ {} → {}", question, self.0);
        Ok(self.0.clone())
    }
}

/// 🚀 Run the whole pipeline. Returns the per-file report when nothing fatal happened.
pub async fn run(app_config: AppConfig, prompt: &mut dyn Prompt) -> Result<RunReport> {
    let client = ClusterClient::new(&app_config.cluster)
        .context("💀 could not set up the cluster client")?;
    let indices = IndexManager::new(client.clone());
    let index = app_config.index.name.clone();

    if client.is_connected().await {
        info!("📡 Connected to ES cluster - {}", client.host());
        prepare_index(&app_config.index, &indices, prompt).await?;
    } else {
        // -- the ingest loop will keep knocking on its own, no need to bail yet
        warn!(
            "⚠️ cluster at '{}' is not answering, skipping index preparation",
            client.host()
        );
    }

    let files = discover_files(&app_config.input).await?;
    let enricher = Enricher::from_config(&app_config.enrichment);
    let ingestor = BulkIngestor::new(client, &app_config.ingest, &app_config.index);

    let progress = FileProgress::new(files.len() as u64);
    let mut report = RunReport::default();
    for path in files {
        progress.start(&path);
        info!("📂 Working on file: {}", path.display());
        let outcome = process_file(&path, enricher.as_ref(), &ingestor, &index).await?;
        report.record(path, outcome);
        progress.advance();
    }
    progress.finish();

    info!(
        "🏁 done: {} files ok, {} files failed, {} docs indexed",
        report.succeeded_files(),
        report.failed_files(),
        report.docs_indexed()
    );
    Ok(report)
}

/// 🗂️ Make sure the target index is in the state the run wants before any data moves.
async fn prepare_index(
    index_config: &IndexConfig,
    indices: &IndexManager,
    prompt: &mut dyn Prompt,
) -> Result<()> {
    let index = &index_config.name;

    if index_config.date_suffix_field.is_some() {
        info!("📅 Creating indices - {}.<date> as batches arrive", index);
        return Ok(());
    }

    if !indices.exists(index).await? {
        info!("🏗️ Creating index - {}", index);
        return create_from_config(index_config, indices).await;
    }

    info!("📦 {} already exists on the cluster", index);
    let answer = prompt.ask(DELETE_QUESTION).await?;
    match answer.trim().to_lowercase().as_str() {
        "y" => {
            info!("🗑️ Deleting index - {}", index);
            indices
                .delete(index)
                .await
                .with_context(|| format!("💀 could not delete index '{index}'"))?;
            info!("🏗️ Recreating index - {}", index);
            create_from_config(index_config, indices).await
        }
        "n" => {
            info!("👍 keeping index '{}', appending to it", index);
            Ok(())
        }
        other => Err(DriverError::InvalidChoice(other.to_string()).into()),
    }
}

async fn create_from_config(index_config: &IndexConfig, indices: &IndexManager) -> Result<()> {
    let descriptor = IndexDescriptor::load(
        index_config.name.clone(),
        &index_config.settings_file,
        index_config.mapping_file.as_deref(),
    )
    .await
    .context("💀 could not load the index configuration")?;

    indices
        .create(&descriptor)
        .await
        .with_context(|| format!("💀 could not create index '{}'", descriptor.name))
}

/// 📂 The files to process. A directory beats a single file when both are set.
///
/// Directory mode keeps regular files ending in `.json` (any case), in listing order.
pub async fn discover_files(input: &InputConfig) -> Result<Vec<PathBuf>> {
    if let Some(ref dir) = input.json_directory {
        return list_json_files(dir).await;
    }
    match input.json_file {
        Some(ref file) => Ok(vec![file.clone()]),
        None => Err(DriverError::NoInput.into()),
    }
}

async fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("💀 could not list directory '{}'", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            continue;
        }
        // -- metadata() follows symlinks, so a link to a real file counts as a file
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if is_file {
            files.push(path);
        }
    }
    Ok(files)
}

async fn process_file(
    path: &Path,
    enricher: Option<&Enricher>,
    ingestor: &BulkIngestor,
    index: &str,
) -> Result<FileOutcome> {
    let mut batch = match load_records(path).await {
        Ok(batch) => batch,
        Err(err) => {
            warn!("🧨 skipping '{}': {}", path.display(), err);
            return Ok(FileOutcome::LoadFailed {
                reason: err.to_string(),
            });
        }
    };

    if let Some(enricher) = enricher {
        enricher.enrich_batch(&mut batch);
    }

    let records = batch.len();
    let outcome = ingestor
        .ingest(&batch, index)
        .await
        .with_context(|| format!("💀 '{}' could not be ingested", path.display()))?;
    Ok(FileOutcome::Ingested { records, outcome })
}
