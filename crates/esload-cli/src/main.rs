//! 🚀 esload-cli: the front door, the bouncer, the maitre d' of esload.
//!
//! 📦 Thin binary: sets up logging, parses flags, loads config, lets the library do the
//! heavy lifting, and turns a fatal error into exit status 1. Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use esload::app_config::AppConfig;
use esload::{FixedAnswer, Prompt, StdinPrompt};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🎛️ Load newline-delimited JSON files into an Elasticsearch index.
#[derive(Debug, Parser)]
#[command(name = "esload", version, about)]
struct Args {
    /// Elasticsearch host [default: http://localhost:9200]
    #[arg(long)]
    host: Option<String>,

    /// Name of the index to be created [default: base_index]
    #[arg(long)]
    index: Option<String>,

    /// Path of the json file input
    #[arg(long = "json_file")]
    json_file: Option<PathBuf>,

    /// Directory from which to parse all json files (overrides --json_file)
    #[arg(long = "json_directory")]
    json_directory: Option<PathBuf>,

    /// Optional TOML config file, layered over ESLOAD_* environment variables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Answer "y" to the delete-existing-index prompt
    #[arg(long, conflicts_with = "assume_no")]
    assume_yes: bool,

    /// Answer "n" to the delete-existing-index prompt
    #[arg(long)]
    assume_no: bool,
}

impl Args {
    /// 🔝 Flags beat the TOML file, which beats the environment.
    fn apply_to(&self, app_config: &mut AppConfig) {
        if let Some(ref host) = self.host {
            app_config.cluster.host = host.clone();
        }
        if let Some(ref index) = self.index {
            app_config.index.name = index.clone();
        }
        if let Some(ref json_file) = self.json_file {
            app_config.input.json_file = Some(json_file.clone());
        }
        if let Some(ref json_directory) = self.json_directory {
            app_config.input.json_directory = Some(json_directory.clone());
        }
    }

    fn prompt(&self) -> Box<dyn Prompt> {
        if self.assume_yes {
            Box::new(FixedAnswer("y".to_string()))
        } else if self.assume_no {
            Box::new(FixedAnswer("n".to_string()))
        } else {
            Box::new(StdinPrompt)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 📡 RUST_LOG wins when set; otherwise info, because a silent loader is a scary loader
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let result = load_and_run(&args).await;

    if let Err(err) = result {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
                || cause_str.contains("liveness check")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like Elasticsearch isn't reachable. \
                Check that it is running and that --host points at it. \
                If you're using Docker, `docker ps` will tell you who's home."
            );
        }

        std::process::exit(1);
    }

    Ok(())
}

async fn load_and_run(args: &Args) -> Result<()> {
    let mut app_config = esload::app_config::load_config(args.config.as_deref())
        .context("💀 couldn't load the configuration, take a look at the file and ESLOAD_* env vars")?;
    args.apply_to(&mut app_config);

    let mut prompt = args.prompt();
    let report = esload::run(app_config, prompt.as_mut()).await?;

    println!("{}", report.render());
    Ok(())
}
