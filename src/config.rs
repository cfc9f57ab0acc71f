//! Configuration management for the media probe CLI.
//!
//! Supports command-line arguments via clap with environment variable
//! fallbacks under the `MEDIA_PROBE_` prefix, and sensible defaults for all
//! optional settings.
//!
//! # Environment Variables
//!
//! - `MEDIA_PROBE_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `MEDIA_PROBE_S3_REGION` - AWS region (default: us-east-1)

use clap::{Parser, Subcommand, ValueEnum};

// =============================================================================
// Default Values
// =============================================================================

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

// =============================================================================
// CLI Arguments
// =============================================================================

/// media-probe - extract image and video metadata over byte-range reads.
///
/// Probes media stored locally or in S3/S3-compatible storage, fetching only
/// the byte ranges the format headers occupy. The media itself is never
/// downloaded.
#[derive(Parser, Debug, Clone)]
#[command(name = "media-probe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Probe a media file and print its metadata.
    Probe(ProbeConfig),
}

/// What kind of metadata to look for.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// Try the image probe first; if the leading bytes match no image
    /// format, fall back to the MP4 rotation probe.
    Auto,
    /// GIF/PNG/JPEG dimensions, orientation, and preview range.
    Image,
    /// MP4 track rotation.
    Video,
}

/// Output rendering.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Machine-readable JSON on stdout.
    Json,
    /// Human-readable key/value lines.
    Text,
}

#[derive(Parser, Debug, Clone)]
pub struct ProbeConfig {
    /// Media to probe: a local path or an `s3://bucket/key` URL.
    pub input: String,

    /// Kind of metadata to extract.
    #[arg(long, value_enum, default_value = "auto")]
    pub media: MediaType,

    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    // =========================================================================
    // S3 Configuration
    // =========================================================================
    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    ///
    /// If not specified, uses the default AWS S3 endpoint.
    #[arg(long, env = "MEDIA_PROBE_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "MEDIA_PROBE_S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ProbeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.input.is_empty() {
            return Err("Input path is required".to_string());
        }

        if self.input.starts_with("s3://") && self.s3_location().is_none() {
            return Err(format!(
                "Invalid S3 URL '{}': expected s3://bucket/key",
                self.input
            ));
        }

        if self.s3_region.is_empty() {
            return Err(
                "S3 region must not be empty. Set --s3-region or MEDIA_PROBE_S3_REGION"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Split an `s3://bucket/key` input into bucket and key.
    ///
    /// Returns `None` if the input is a local path or a malformed S3 URL.
    pub fn s3_location(&self) -> Option<(String, String)> {
        let rest = self.input.strip_prefix("s3://")?;
        let (bucket, key) = rest.split_once('/')?;
        if bucket.is_empty() || key.is_empty() {
            return None;
        }
        Some((bucket.to_string(), key.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(input: &str) -> ProbeConfig {
        ProbeConfig {
            input: input.to_string(),
            media: MediaType::Auto,
            format: OutputFormat::Json,
            s3_endpoint: None,
            s3_region: DEFAULT_REGION.to_string(),
            verbose: false,
        }
    }

    #[test]
    fn test_valid_local_path() {
        let config = test_config("/data/photo.jpg");
        assert!(config.validate().is_ok());
        assert!(config.s3_location().is_none());
    }

    #[test]
    fn test_s3_location_parsed() {
        let config = test_config("s3://media/uploads/photo.jpg");
        assert!(config.validate().is_ok());
        assert_eq!(
            config.s3_location(),
            Some(("media".to_string(), "uploads/photo.jpg".to_string()))
        );
    }

    #[test]
    fn test_malformed_s3_url() {
        for input in ["s3://", "s3://bucket", "s3://bucket/", "s3:///key"] {
            let config = test_config(input);
            let result = config.validate();
            assert!(result.is_err(), "input {:?}", input);
            assert!(result.unwrap_err().contains("s3://bucket/key"));
        }
    }

    #[test]
    fn test_empty_input() {
        let config = test_config("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_region() {
        let mut config = test_config("/data/photo.jpg");
        config.s3_region = String::new();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("region"));
    }
}
