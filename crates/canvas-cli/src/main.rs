use anyhow::{Context, Result};
use canvas_cli::{inspect, logging, replay, LogOptions, Script};
use canvas_core::EngineConfig;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::BufReader;

fn cli() -> Command {
    Command::new("canvas")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Streaming update engine for collaborative documents")
        .subcommand_required(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Log filter used when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write logs to stderr as JSON"),
        )
        .subcommand(
            Command::new("replay")
                .about("Run a scripted session and print every frame as NDJSON")
                .arg(
                    Arg::new("script")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Script file (JSON)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Engine configuration (TOML)"),
                ),
        )
        .subcommand(
            Command::new("decode")
                .about("Print family and type of each NDJSON frame")
                .arg(
                    Arg::new("file")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Frame file; stdin if omitted"),
                ),
        )
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    logging::init(&LogOptions {
        level: matches
            .get_one::<String>("log-level")
            .cloned()
            .unwrap_or_else(|| "info".into()),
        json: matches.get_flag("log-json"),
    });

    let result = match matches.subcommand() {
        Some(("replay", args)) => run_replay(args).await,
        Some(("decode", args)) => run_decode(args).await,
        _ => Ok(ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_replay(args: &ArgMatches) -> Result<ExitCode> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let path = args
        .get_one::<PathBuf>("script")
        .context("script path is required")?;
    let script = Script::load(path).await?;

    let summary = replay(&script, config, tokio::io::stdout()).await?;
    tracing::info!(
        frames = summary.frames,
        completed = summary.runs_completed,
        failed = summary.runs_failed,
        superseded = summary.runs_superseded,
        "replay finished"
    );
    Ok(ExitCode::SUCCESS)
}

async fn run_decode(args: &ArgMatches) -> Result<ExitCode> {
    let summary = match args.get_one::<PathBuf>("file") {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("cannot open {}", path.display()))?;
            inspect(BufReader::new(file), tokio::io::stdout()).await?
        }
        None => inspect(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?,
    };
    if summary.invalid > 0 {
        tracing::warn!(invalid = summary.invalid, frames = summary.frames, "undecodable frames");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
