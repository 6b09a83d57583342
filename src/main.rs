mod config;
mod engine;
mod llm;
mod ops;
mod sandbox;

use anyhow::{anyhow, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::engine::Engine;

fn print_help() {
    println!(
        "\
fileops-agent v{}

A natural-language file-operations agent driven by LLM tool selection.

USAGE:
    fileops-agent [OPTIONS] [INSTRUCTION]...

ARGUMENTS:
    INSTRUCTION...    Free-text instruction; multiple words are joined

OPTIONS:
    -h, --help           Print this help message and exit
    -V, --version        Print version and exit
    -c, --config PATH    Path to TOML configuration file [default: config/agent.toml]
        --read PATH      Print the content of a file under the data root and exit
        --list           List the operation catalog and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG          Log level filter for tracing
                      (e.g. debug, fileops_agent=debug,warn)
    OPENAI_API_KEY    API key for the OpenAI-compatible endpoint

EXAMPLES:
    fileops-agent \"count how many Mondays are in /data/dates.txt\"
    fileops-agent --list
    fileops-agent --read data/report.txt
    RUST_LOG=debug fileops-agent \"sort the contacts file by last name\"",
        env!("CARGO_PKG_VERSION"),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config_path = "config/agent.toml".to_string();
    let mut read_path: Option<String> = None;
    let mut list_catalog = false;
    let mut words: Vec<String> = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("fileops-agent v{}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--config" | "-c" => {
                config_path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a path"))?;
            }
            "--read" => {
                read_path = Some(args.next().ok_or_else(|| anyhow!("--read requires a path"))?);
            }
            "--list" => list_catalog = true,
            other if other.starts_with('-') => {
                return Err(anyhow!("unknown option: {other} (see --help)"));
            }
            word => words.push(word.to_string()),
        }
    }

    // Logs go to stderr; stdout carries only the result JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fileops_agent=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Loading configuration from {config_path}");
    let config = Config::load(&config_path)?;

    info!("LLM endpoint: {} (model {})", config.llm.endpoint, config.llm.model);
    info!("Data root: {}", config.engine.data_root.display());

    let engine = Engine::new(&config);

    if list_catalog {
        for def in engine.catalog() {
            println!("{:<22} — {}", def.name, def.description);
        }
        return Ok(());
    }

    if let Some(path) = read_path {
        match engine.read_file(&path).await {
            Ok(content) => {
                print!("{content}");
                return Ok(());
            }
            Err(e) => {
                error!("Read failed: {e}");
                println!("{}", serde_json::json!({ "error": e.to_string() }));
                std::process::exit(1);
            }
        }
    }

    if words.is_empty() {
        print_help();
        std::process::exit(2);
    }
    let instruction = words.join(" ");

    info!("Instruction: {instruction}");
    match engine.run_task(&instruction).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            error!("Task failed: {e}");
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "error": e.to_string() }))?
            );
            std::process::exit(1);
        }
    }
}
