use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use critlog::config::{self, Options, ReleaseType};
use critlog::Logger;

/// Append lines from stdin to a log file
#[derive(Debug, Parser)]
#[command(name = "critlog", version)]
struct Cli {
    /// TOML file with logger options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file to append to (default: ~/.critlog/critlog.log)
    #[arg(long)]
    log_file: Option<String>,

    /// Binary name written in the startup marker
    #[arg(long)]
    binary_name: Option<String>,

    /// Version written in the startup marker
    #[arg(long)]
    version_string: Option<String>,

    /// Release mode: release, dev or testing
    #[arg(long)]
    release: Option<String>,

    /// Enable debug lines and panic on severe or critical lines
    #[arg(long)]
    debug: bool,

    /// Severity each input line is logged with
    #[arg(long, value_enum, default_value_t = Level::Plain)]
    level: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Level {
    Plain,
    Debug,
    Error,
    Severe,
    Critical,
}

/// Merge the options file with command line overrides
fn resolve_options(cli: &Cli) -> Result<Options> {
    let mut options = match &cli.config {
        Some(path) => Options::load(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => Options {
            binary_name: "critlog".to_string(),
            release: ReleaseType::Release,
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Options::default()
        },
    };

    if let Some(name) = &cli.binary_name {
        options.binary_name = name.clone();
    }
    if let Some(version) = &cli.version_string {
        options.version = version.clone();
    }
    if let Some(release) = &cli.release {
        options.release = ReleaseType::from(release.clone());
    }
    options.debug |= cli.debug;

    // An uninitialized release type would abort; report it as a usage error instead.
    if options.release == ReleaseType::Uninitialized {
        anyhow::bail!("No release type configured; pass --release or set it in the options file");
    }
    Ok(options)
}

fn log_line(logger: &Logger, level: Level, line: &str) {
    match level {
        Level::Plain => logger.print(line),
        Level::Debug => logger.debug(line),
        Level::Error => logger.errorf(format_args!("{}", line)),
        Level::Severe => logger.severe(line),
        Level::Critical => logger.critical(line),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "critlog=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let options = resolve_options(&cli)?;

    let path = cli
        .log_file
        .as_deref()
        .map(config::expand_path)
        .unwrap_or_else(config::default_log_file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let logger = Logger::open(&path, options)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    tracing::info!("Logging to: {}", path.display());

    let mut count = 0;
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        log_line(&logger, cli.level, &line);
        count += 1;
    }

    logger.close().context("Failed to close log file")?;
    tracing::info!("Logged {} lines", count);
    Ok(())
}
