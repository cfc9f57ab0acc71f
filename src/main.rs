//! media-probe - extract media metadata over byte-range reads.
//!
//! This binary wires a range reader to the format parsers and prints the
//! result.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_probe::{
    config::{Cli, Command, MediaType, OutputFormat, ProbeConfig},
    create_s3_client,
    format::{parse_video_rotation, probe_image},
    io::{FileRangeReader, RangeReader, S3RangeReader},
    metadata::{ImageMetadata, Rotation},
    FormatError, IoError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Probe(config) => run_probe(config).await,
    }
}

// =============================================================================
// Probe Command
// =============================================================================

/// What a probe produced.
enum ProbeReport {
    Image(ImageMetadata),
    Video(Option<Rotation>),
}

async fn run_probe(config: ProbeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let reader = match open_reader(&config).await {
        Ok(reader) => reader,
        Err(e) => {
            error!("Failed to open '{}': {}", config.input, e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        source = %reader.identifier(),
        size = reader.size(),
        "probing"
    );

    match probe(&config, reader.as_ref()).await {
        Ok(report) => {
            render_report(&report, config.format);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.is_truncation() {
                error!(
                    "Probe failed on '{}': {} (the file may still be uploading; retry later)",
                    config.input, e
                );
            } else {
                error!("Probe failed on '{}': {}", config.input, e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Build the range reader for the input: S3 for `s3://` URLs, local file
/// otherwise.
async fn open_reader(config: &ProbeConfig) -> Result<Box<dyn RangeReader>, IoError> {
    match config.s3_location() {
        Some((bucket, key)) => {
            let client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
            Ok(Box::new(S3RangeReader::new(client, bucket, key).await?))
        }
        None => Ok(Box::new(FileRangeReader::open(&config.input).await?)),
    }
}

/// Run the probe the configuration asks for.
///
/// In auto mode the image probe runs first; when the leading bytes match no
/// image format, the MP4 rotation probe gets a turn. A file matching
/// neither reports the image probe's verdict.
async fn probe(config: &ProbeConfig, reader: &dyn RangeReader) -> Result<ProbeReport, FormatError> {
    match config.media {
        MediaType::Image => Ok(ProbeReport::Image(probe_image(reader).await?)),
        MediaType::Video => Ok(ProbeReport::Video(parse_video_rotation(reader).await?)),
        MediaType::Auto => match probe_image(reader).await {
            Ok(metadata) => Ok(ProbeReport::Image(metadata)),
            Err(FormatError::UnknownImageType) => match parse_video_rotation(reader).await {
                Ok(rotation) => Ok(ProbeReport::Video(rotation)),
                Err(FormatError::NotMp4) => Err(FormatError::UnknownImageType),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        },
    }
}

/// Print the probe result to stdout.
fn render_report(report: &ProbeReport, format: OutputFormat) {
    match (report, format) {
        (ProbeReport::Image(metadata), OutputFormat::Json) => {
            // Serialization of these plain records cannot fail
            if let Ok(json) = serde_json::to_string_pretty(metadata) {
                println!("{}", json);
            }
        }
        (ProbeReport::Image(metadata), OutputFormat::Text) => {
            println!("type:     {}", metadata.kind.name());
            println!("width:    {}", metadata.width);
            println!("height:   {}", metadata.height);
            println!("rotation: {}", metadata.rotation);
            println!("mirrored: {}", metadata.mirrored);
            if let Some(preview) = metadata.preview {
                println!("preview:  bytes {}-{}", preview.start, preview.end);
            }
        }
        (ProbeReport::Video(rotation), OutputFormat::Json) => {
            let json = serde_json::json!({
                "type": "video",
                "rotation": rotation.map(|r| r.degrees()),
            });
            println!("{}", json);
        }
        (ProbeReport::Video(rotation), OutputFormat::Text) => {
            println!("type:     video");
            match rotation {
                Some(rotation) => println!("rotation: {}", rotation),
                None => println!("rotation: unknown (no track header found)"),
            }
        }
    }
}

/// Initialize the tracing/logging subsystem.
///
/// Diagnostics go to stderr so JSON output on stdout stays parseable.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "media_probe=debug"
    } else {
        "media_probe=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
