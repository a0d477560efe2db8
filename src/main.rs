// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use bookwai::app_config::{self, Config};
use bookwai::app_controller::{Controller, RunOptions};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for bookwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// bookwai - resumable book translation with LLM providers
#[derive(Parser, Debug)]
#[command(name = "bookwai")]
#[command(version)]
#[command(about = "Translate books chunk by chunk with LLM providers")]
#[command(long_about = "bookwai splits a document into sentence-safe chunks and translates them through an
ordered list of LLM providers, falling back to the next provider when one fails.
Progress is cached next to the input so an interrupted run resumes where it stopped.

EXAMPLES:
    bookwai novel.txt                      # Translate using conf.json
    bookwai --test novel.txt               # Only translate the first 3 chunks
    bookwai --tlist novel.md               # Apply the proper-noun table first
    bookwai --check-providers              # Probe every configured provider
    bookwai completions bash > bookwai.bash

OUTPUT:
    <name>_translated.txt    translated text
    <name>_translated.html   chaptered output for markdown input
    <name>_process.json      resumption cache, removed after a clean run")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Document to translate (.txt or .md)
    #[arg(value_name = "FILENAME")]
    filename: Option<PathBuf>,

    /// Only translate the first 3 chunks
    #[arg(long)]
    test: bool,

    /// Apply the proper-noun substitution table before segmentation
    #[arg(long)]
    tlist: bool,

    /// Probe every configured provider and exit
    #[arg(long)]
    check_providers: bool,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json")]
    config_path: String,

    /// Source language name or code
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language name or code
    #[arg(short, long)]
    target_language: Option<String>,

    /// Maximum chunk size in characters
    #[arg(long)]
    max_chunk_size: Option<usize>,

    /// Emit source and translation for each chunk
    #[arg(long)]
    bilingual: Option<bool>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI color for level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "1;31"),
            Level::Warn => ("WARN ", "1;33"),
            Level::Info => ("INFO ", "1;32"),
            Level::Debug => ("DEBUG", "1;36"),
            Level::Trace => ("TRACE", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // The max level is raised later without reinstalling the logger
        metadata.level() <= self.level.max(log::max_level())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, color) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "bookwai", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_config(&cli)?;
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config).context("Configuration validation failed")?;

    if cli.check_providers {
        let results = controller.check_providers().await?;
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        if failed > 0 {
            return Err(anyhow!("{} of {} providers failed the connection test", failed, results.len()));
        }
        info!("All {} providers are reachable", results.len());
        return Ok(());
    }

    let filename = cli
        .filename
        .clone()
        .ok_or_else(|| anyhow!("FILENAME is required when no subcommand is specified"))?;
    if !filename.is_file() {
        return Err(anyhow!("Input file does not exist: {:?}", filename));
    }

    let options = RunOptions {
        test_mode: cli.test,
        use_glossary: cli.tlist,
    };

    tokio::select! {
        result = controller.run(&filename, options) => {
            if let Err(e) = &result {
                error!("Translation failed: {:#}", e);
            }
            result.map(|_| ())
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; finished chunks stay cached for the next run");
            Err(anyhow!("Interrupted by user"))
        }
    }
}

// @loads: Config file, or writes a default one when missing; applies CLI overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let config_path = Path::new(&cli.config_path);
    let mut config = if config_path.exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", cli.config_path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", cli.config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", cli.config_path);
        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", cli.config_path))?;
        config
    };

    if let Some(source_language) = &cli.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &cli.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(max_chunk_size) = cli.max_chunk_size {
        config.max_chunk_size = max_chunk_size;
    }
    if let Some(bilingual) = cli.bilingual {
        config.bilingual_output = bilingual;
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}
