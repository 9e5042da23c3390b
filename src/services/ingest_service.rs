//! src/services/ingest_service.rs
//!
//! Ingestor — turns a byte buffer plus its original filename into a uniquely
//! named file under the storage root and a public URL for it.
//!
//! Stages run strictly in order and stop at the first failure:
//! size check, extension check, naming, persistence, reference derivation.

use crate::models::upload::{AllowedExtensions, Ingested, PublicReference, StoredObject};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const BYTES_PER_MB: u64 = 1024 * 1024;
/// Hex characters of the content digest kept in a generated name.
const FINGERPRINT_LEN: usize = 8;
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

fn to_mb(bytes: &u64) -> f64 {
    *bytes as f64 / BYTES_PER_MB as f64
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file is too large ({:.1} MB), maximum is {:.1} MB", to_mb(.observed_bytes), to_mb(.limit_bytes))]
    TooLarge { observed_bytes: u64, limit_bytes: u64 },
    #[error("only these file types are allowed: {allowed}")]
    DisallowedExtension {
        extension: String,
        allowed: AllowedExtensions,
    },
    #[error("failed to store file: {cause}")]
    StorageFailure {
        #[source]
        cause: io::Error,
    },
}

impl From<io::Error> for IngestError {
    fn from(cause: io::Error) -> Self {
        IngestError::StorageFailure { cause }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Pipeline settings, read-only after startup.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub max_size_bytes: u64,
    pub allowed_extensions: AllowedExtensions,
}

impl IngestConfig {
    pub fn max_size_mb(&self) -> f64 {
        to_mb(&self.max_size_bytes)
    }
}

/// Stateless across calls; cloning is cheap enough to hand one to every request.
#[derive(Clone, Debug)]
pub struct Ingestor {
    config: IngestConfig,
    clock: fn() -> DateTime<Utc>,
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock used for the timestamp part of generated names.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Validate, name, persist and reference a fully buffered payload.
    pub async fn ingest(&self, content: &[u8], original_name: &str) -> IngestResult<Ingested> {
        let result = self.run(content, original_name).await;
        self.record(&result, original_name, content.len() as u64);
        result
    }

    /// Same as [`ingest`](Self::ingest) but reads the payload from a stream.
    ///
    /// At most `max_size_bytes` plus one chunk is held in memory. Past the limit
    /// the rest of the stream is drained and only counted so the rejection can
    /// report the real size.
    pub async fn ingest_stream<S>(&self, original_name: &str, stream: S) -> IngestResult<Ingested>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let limit = self.config.max_size_bytes;
        let mut buf = BytesMut::new();
        let mut observed: u64 = 0;

        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(cause) => {
                    let result = Err(IngestError::StorageFailure { cause });
                    self.record(&result, original_name, observed);
                    return result;
                }
            };
            observed += chunk.len() as u64;
            if observed <= limit {
                buf.extend_from_slice(&chunk);
            } else if !buf.is_empty() {
                buf = BytesMut::new();
            }
        }

        if let Err(err) = self.check_size(observed) {
            let result = Err(err);
            self.record(&result, original_name, observed);
            return result;
        }

        self.ingest(&buf, original_name).await
    }

    /// Public URL for a generated name. Pure; the same name always maps to the
    /// same string.
    pub fn reference_for(&self, generated_name: &str) -> PublicReference {
        PublicReference::derive(&self.config.public_base_url, generated_name)
    }

    async fn run(&self, content: &[u8], original_name: &str) -> IngestResult<Ingested> {
        let size_bytes = content.len() as u64;
        self.check_size(size_bytes)?;
        let ext = self.check_extension(original_name)?;

        let created_at = (self.clock)();
        let generated_name = generate_name(content, &ext, created_at);

        let path = self.persist(&generated_name, content).await?;
        let reference = self.reference_for(&generated_name);

        Ok(Ingested {
            object: StoredObject {
                generated_name,
                path,
                size_bytes,
                created_at,
            },
            reference,
        })
    }

    fn check_size(&self, observed_bytes: u64) -> IngestResult<()> {
        if observed_bytes > self.config.max_size_bytes {
            return Err(IngestError::TooLarge {
                observed_bytes,
                limit_bytes: self.config.max_size_bytes,
            });
        }
        Ok(())
    }

    fn check_extension(&self, original_name: &str) -> IngestResult<String> {
        let ext = extension_of(original_name);
        if !self.config.allowed_extensions.contains(&ext) {
            return Err(IngestError::DisallowedExtension {
                extension: ext,
                allowed: self.config.allowed_extensions.clone(),
            });
        }
        Ok(ext)
    }

    /// Write `content` to `storage_root/name` through a temp file and rename,
    /// so the final path never holds a partial file.
    async fn persist(&self, name: &str, content: &[u8]) -> io::Result<PathBuf> {
        let root = &self.config.storage_root;
        // Succeeds when the directory already exists, including when another
        // request created it a moment ago.
        fs::create_dir_all(root).await?;

        let final_path = root.join(name);
        let tmp_path = root.join(format!(".tmp-{}", Uuid::new_v4()));

        if let Err(err) = write_synced(&tmp_path, content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        if let Err(err) = install(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        debug!("wrote {} bytes to {}", content.len(), final_path.display());
        Ok(final_path)
    }

    fn record(&self, result: &IngestResult<Ingested>, original_name: &str, size_bytes: u64) {
        match result {
            Ok(done) => info!(
                original_name,
                saved_as = %done.object.generated_name,
                size_bytes,
                public_url = %done.reference,
                "file saved"
            ),
            Err(err @ IngestError::StorageFailure { .. }) => error!(
                original_name,
                size_bytes,
                error = %err,
                "failed to save file"
            ),
            Err(err) => warn!(
                original_name,
                size_bytes,
                reason = %err,
                "upload rejected"
            ),
        }
    }
}

/// Text after the last `.`, lower-cased; empty when there is no `.`.
pub fn extension_of(original_name: &str) -> String {
    original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// `{YYYYmmdd_HHMMSS}_{md5 prefix}.{ext}`.
///
/// Sorts by creation second. Identical content within the same second maps to
/// the same name.
pub fn generate_name(content: &[u8], ext: &str, at: DateTime<Utc>) -> String {
    let digest = format!("{:x}", md5::compute(content));
    format!(
        "{}_{}.{}",
        at.format(TIMESTAMP_FORMAT),
        &digest[..FINGERPRINT_LEN],
        ext
    )
}

/// Move `tmp` onto `final_path`, replacing whatever is there.
async fn install(tmp: &Path, final_path: &Path) -> io::Result<()> {
    match fs::rename(tmp, final_path).await {
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            fs::remove_file(final_path).await?;
            fs::rename(tmp, final_path).await
        }
        other => other,
    }
}

async fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await
}
