//! Values flowing through a single upload: the inbound request, the stored
//! object it produces, and the public reference derived from it.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::BTreeSet, fmt, path::PathBuf};

use super::caller::CallerId;

/// A buffered submission handed over by the transport.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub content: Bytes,
    pub original_name: String,
    pub caller: CallerId,
}

/// A file written under the storage root.
///
/// Never updated in place; a same-second upload of identical content replaces
/// it wholesale through the same name.
#[derive(Serialize, Clone, Debug)]
pub struct StoredObject {
    /// `{timestamp}_{fingerprint}.{ext}`
    pub generated_name: String,

    /// Final on-disk location.
    #[serde(skip)]
    pub path: PathBuf,

    pub size_bytes: u64,

    pub created_at: DateTime<Utc>,
}

/// Externally resolvable URL of a stored object.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct PublicReference(String);

impl PublicReference {
    /// Join `base_url` and `name` with exactly one `/`.
    pub fn derive(base_url: &str, name: &str) -> Self {
        Self(format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            name.trim_start_matches('/')
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Successful pipeline output.
#[derive(Clone, Debug)]
pub struct Ingested {
    pub object: StoredObject,
    pub reference: PublicReference,
}

/// Lower-cased file extensions accepted by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowedExtensions(BTreeSet<String>);

pub const DEFAULT_ALLOWED_EXTENSIONS: &str = "jpg,jpeg,png,webp,pdf";

impl AllowedExtensions {
    /// Parse a comma list such as `"jpg, .PNG,pdf"`. Empty entries are dropped,
    /// so the empty extension can never be allowed.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, ext: &str) -> bool {
        self.0.contains(ext)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for AllowedExtensions {
    fn default() -> Self {
        Self::parse(DEFAULT_ALLOWED_EXTENSIONS)
    }
}

/// Sorted, comma separated: `jpeg, jpg, pdf`.
impl fmt::Display for AllowedExtensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.iter().collect::<Vec<_>>().join(", ");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_has_single_separator() {
        let a = PublicReference::derive("http://example.com/media", "x.png");
        let b = PublicReference::derive("http://example.com/media/", "x.png");
        let c = PublicReference::derive("http://example.com/media//", "x.png");
        assert_eq!(a.as_str(), "http://example.com/media/x.png");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn extensions_are_normalized() {
        let allowed = AllowedExtensions::parse(" JPG, .png,,pdf ");
        assert!(allowed.contains("jpg"));
        assert!(allowed.contains("png"));
        assert!(!allowed.contains(""));
        assert_eq!(allowed.to_string(), "jpg, pdf, png");
    }

    #[test]
    fn default_extensions() {
        assert_eq!(
            AllowedExtensions::default().to_string(),
            "jpeg, jpg, pdf, png, webp"
        );
    }
}
