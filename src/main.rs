mod cli;

use tracktap::config::{self, Config, SourceConfig};
use tracktap::playback::{self, PlaybackStats};
use tracktap::{FileSource, ParseResult, TeeSource, TrackExtraction};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for a result after playback has finished.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config_or_default(cli.config.as_deref());

    // Respect RUST_LOG if set, then --verbose, then the config file
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tracktap=trace,tracktap_media=trace".to_string()
        } else {
            config
                .as_ref()
                .ok()
                .and_then(|c| c.logging.filter.clone())
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| "tracktap=info,tracktap_media=info".to_string())
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Ok(ref config) = config {
        config::warn_config(config);
    }

    match cli.command {
        Commands::Probe {
            file,
            json,
            chunk_size,
        } => {
            let mut source_config = config?.source;
            if let Some(chunk_size) = chunk_size {
                source_config.read_chunk_size = chunk_size;
            }
            probe_file(&file, json, source_config)
        }
        Commands::Sniff { file } => sniff_file(&file),
        Commands::Validate => validate_config(cli.config.as_deref(), config?),
        Commands::Version => {
            println!("tracktap {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct ProbeReport<'a> {
    file: &'a Path,
    bytes_read: u64,
    tracks: Option<ParseResult>,
}

fn probe_file(file: &Path, json: bool, source_config: SourceConfig) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }
    config::validate_config(&Config {
        source: source_config.clone(),
        ..Config::default()
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    let (tracks, stats) = rt.block_on(play_and_extract(file, source_config))?;

    if json {
        let report = ProbeReport {
            file,
            bytes_read: stats.bytes_read,
            tracks,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    match tracks {
        Some(tracks) if !tracks.is_empty() => {
            println!("Tracks: {}", tracks.len());
            for track in &tracks {
                print!("  [{}] {} ({})", track.track_id, track.kind, track.language_tag());
                if let Some(ref name) = track.name {
                    print!(" \"{}\"", name);
                }
                println!();
            }
        }
        _ => println!("No track metadata found"),
    }
    println!("Bytes read: {}", stats.bytes_read);

    Ok(())
}

/// Play `file` through a tee and wait for the extraction result.
async fn play_and_extract(
    file: &Path,
    source_config: SourceConfig,
) -> Result<(Option<ParseResult>, PlaybackStats)> {
    let (extraction, mut delivered) =
        TrackExtraction::with_channel(tokio::runtime::Handle::current());
    // Dropping the last handle cancels the session, so keep one until delivery
    let extraction = Arc::new(extraction);
    let mut source = TeeSource::new(FileSource::new(file), extraction.clone());

    let stats = tokio::task::spawn_blocking(move || {
        playback::play(&mut source, &mut std::io::sink(), &source_config)
    })
    .await
    .context("Playback task failed")??;

    let tracks = match tokio::time::timeout(DELIVERY_TIMEOUT, delivered.recv()).await {
        Ok(tracks) => tracks,
        Err(_) => {
            tracing::warn!("Timed out waiting for track metadata");
            None
        }
    };

    drop(extraction);
    Ok((tracks, stats))
}

fn sniff_file(file: &Path) -> Result<()> {
    let reader = std::fs::File::open(file)
        .with_context(|| format!("Failed to open {:?}", file))?;
    let (container, _) = tracktap_media::sniff(reader)?;

    match container {
        Some(container) => println!("{}", container),
        None => println!("unrecognized"),
    }
    Ok(())
}

fn validate_config(path: Option<&Path>, config: Config) -> Result<()> {
    match path {
        Some(p) => println!("Validating config: {:?}", p),
        None => println!("No config file specified, using default locations"),
    }
    println!("✓ Configuration is valid");
    println!("  Read chunk size: {} bytes", config.source.read_chunk_size);
    println!("  Throttle: {} ms", config.source.throttle_ms);
    if let Some(ref filter) = config.logging.filter {
        println!("  Log filter: {}", filter);
    }

    Ok(())
}
