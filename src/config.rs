use crate::{
    models::upload::{AllowedExtensions, DEFAULT_ALLOWED_EXTENSIONS},
    services::ingest_service::{BYTES_PER_MB, IngestConfig},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub public_url: String,
    pub max_file_size_mb: u64,
    pub allowed_extensions: String,
    /// Raw comma separated caller ids; `None` when unset.
    pub allowed_callers: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Authenticated media upload service")]
pub struct Args {
    /// Host to bind to (overrides MEDIA_DROP_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MEDIA_DROP_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploads are written (overrides MEDIA_DROP_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Base URL prefixed to generated names (overrides MEDIA_DROP_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Maximum upload size in MB (overrides MEDIA_DROP_MAX_FILE_SIZE_MB)
    #[arg(long)]
    pub max_file_size_mb: Option<u64>,

    /// Comma separated extension allow-list (overrides MEDIA_DROP_ALLOWED_EXTENSIONS)
    #[arg(long)]
    pub allowed_extensions: Option<String>,

    /// Comma separated caller ids allowed to upload (overrides MEDIA_DROP_ALLOWED_CALLERS)
    #[arg(long)]
    pub allowed_callers: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse(), |key| env::var(key))
    }

    /// Flags win over environment, environment wins over defaults.
    fn merge(
        args: Args,
        var: impl Fn(&str) -> Result<String, env::VarError>,
    ) -> Result<Self> {
        let env_host = var("MEDIA_DROP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_var(&var, "MEDIA_DROP_PORT", 3000u16)?;
        let env_upload_dir =
            var("MEDIA_DROP_UPLOAD_DIR").unwrap_or_else(|_| "./data/media".into());
        let env_public_url =
            var("MEDIA_DROP_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000/media".into());
        let env_max_size = parse_var(&var, "MEDIA_DROP_MAX_FILE_SIZE_MB", 10u64)?;
        let env_extensions = var("MEDIA_DROP_ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_EXTENSIONS.into());
        let env_callers = var("MEDIA_DROP_ALLOWED_CALLERS").ok();

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or(env_upload_dir),
            public_url: args.public_url.unwrap_or(env_public_url),
            max_file_size_mb: args.max_file_size_mb.unwrap_or(env_max_size),
            allowed_extensions: args.allowed_extensions.unwrap_or(env_extensions),
            allowed_callers: args.allowed_callers.or(env_callers),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ingest(&self) -> IngestConfig {
        IngestConfig {
            storage_root: PathBuf::from(&self.upload_dir),
            public_base_url: self.public_url.clone(),
            max_size_bytes: self.max_file_size_mb.saturating_mul(BYTES_PER_MB),
            allowed_extensions: AllowedExtensions::parse(&self.allowed_extensions),
        }
    }
}

fn parse_var<T>(
    var: &impl Fn(&str) -> Result<String, env::VarError>,
    key: &str,
    default: T,
) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, env::VarError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::merge(Args::default(), lookup(&[])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.max_file_size_mb, 10);
        assert!(cfg.allowed_callers.is_none());

        let ingest = cfg.ingest();
        assert_eq!(ingest.max_size_bytes, 10 * 1024 * 1024);
        assert_eq!(ingest.allowed_extensions, AllowedExtensions::default());
    }

    #[test]
    fn flags_override_environment() {
        let args = Args {
            port: Some(8080),
            max_file_size_mb: Some(2),
            ..Args::default()
        };
        let cfg = AppConfig::merge(
            args,
            lookup(&[
                ("MEDIA_DROP_PORT", "9000"),
                ("MEDIA_DROP_MAX_FILE_SIZE_MB", "50"),
                ("MEDIA_DROP_ALLOWED_CALLERS", "1,2"),
                ("MEDIA_DROP_ALLOWED_EXTENSIONS", "gif"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.max_file_size_mb, 2);
        assert_eq!(cfg.allowed_callers.as_deref(), Some("1,2"));
        assert!(cfg.ingest().allowed_extensions.contains("gif"));
    }

    #[test]
    fn malformed_numbers_fail_startup() {
        let err = AppConfig::merge(
            Args::default(),
            lookup(&[("MEDIA_DROP_MAX_FILE_SIZE_MB", "ten")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("MEDIA_DROP_MAX_FILE_SIZE_MB"));
    }
}
