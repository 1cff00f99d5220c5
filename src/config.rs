use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments, read once at startup
/// and held immutable for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Screenshot store API backed by S3")]
pub struct Args {
    /// Host to bind to (overrides SCREENSHOT_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides SCREENSHOT_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Bucket holding screenshot objects (overrides AWS_BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,

    /// AWS region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible providers (overrides AWS_ENDPOINT_URL)
    #[arg(long)]
    pub endpoint_url: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    ///
    /// Storage credentials are not held here — the AWS SDK resolves them
    /// through its standard environment/credential chain.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("SCREENSHOT_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("SCREENSHOT_STORE_PORT") {
            Ok(value) => Some(
                value
                    .parse::<u16>()
                    .with_context(|| format!("parsing SCREENSHOT_STORE_PORT value `{}`", value))?,
            ),
            Err(env::VarError::NotPresent) => None,
            Err(err) => return Err(err).context("reading SCREENSHOT_STORE_PORT"),
        };
        let env_bucket = env::var("AWS_BUCKET_NAME").ok();
        let env_region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".into());
        let env_endpoint = env::var("AWS_ENDPOINT_URL").ok();

        // --- Merge ---
        let bucket = args
            .bucket
            .or(env_bucket)
            .context("bucket name required: set AWS_BUCKET_NAME or pass --bucket")?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.or(env_port).unwrap_or(3000),
            bucket,
            region: args.region.unwrap_or(env_region),
            endpoint_url: args.endpoint_url.or(env_endpoint),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_joins_host_and_port() {
        let cfg = AppConfig {
            host: "127.0.0.1".into(),
            port: 3000,
            bucket: "screens".into(),
            region: "us-east-1".into(),
            endpoint_url: None,
        };
        assert_eq!(cfg.addr(), "127.0.0.1:3000");
    }
}
