//! Pre-flight XML checks run on rendered documents before they are sent.

use async_trait::async_trait;
use moka::future::Cache;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

use crate::document::MessageType;
use crate::error::{CxmlError, LibXml2Error, Result};
use crate::libxml2::{LibXml2Wrapper, ValidationResult, XmlDtdPtr};

/// Cached regex for the DOCTYPE system identifier
static DOCTYPE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_doctype_regex() -> &'static Regex {
    DOCTYPE_REGEX.get_or_init(|| {
        Regex::new(r#"<!DOCTYPE\s+[\w:.-]+\s+SYSTEM\s+"([^"]+)""#)
            .expect("Failed to compile DOCTYPE regex")
    })
}

/// File name of the DTD a document declares, falling back to the one its
/// message type uses
pub fn declared_dtd_file(message_type: MessageType, xml: &str) -> String {
    get_doctype_regex()
        .captures(xml)
        .and_then(|caps| {
            caps[1]
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| message_type.dtd_file().to_string())
}

#[async_trait]
pub trait SchemaValidator: Send + Sync {
    /// Parse the document; a failure lists libxml2's messages.
    async fn check_well_formed(&self, xml: &str) -> Result<ValidationResult>;

    /// Validate against the document's DTD; invalid → `SchemaInvalid`.
    async fn validate(&self, message_type: MessageType, xml: &str) -> Result<()>;
}

/// Parsed DTDs keyed by path; moka makes concurrent loads of one key share a
/// single parse
pub struct DtdCache {
    cache: Cache<PathBuf, XmlDtdPtr>,
}

impl DtdCache {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();

        Self { cache }
    }

    pub async fn get_or_load<F>(&self, path: PathBuf, loader: F) -> std::result::Result<XmlDtdPtr, LibXml2Error>
    where
        F: FnOnce(&Path) -> std::result::Result<XmlDtdPtr, LibXml2Error>,
    {
        let init = async { loader(&path) };
        self.cache
            .try_get_with(path.clone(), init)
            .await
            .map_err(|e| (*e).clone())
    }

    pub async fn contains(&self, path: &Path) -> bool {
        self.cache.get(path).await.is_some()
    }
}

/// libxml2-backed validator reading DTD files from a local directory
pub struct DtdValidator {
    libxml2: LibXml2Wrapper,
    dtd_dir: PathBuf,
    cache: DtdCache,
}

impl DtdValidator {
    pub fn new(dtd_dir: impl Into<PathBuf>, max_cached_dtds: u64) -> Self {
        Self {
            libxml2: LibXml2Wrapper::new(),
            dtd_dir: dtd_dir.into(),
            cache: DtdCache::new(max_cached_dtds),
        }
    }

    pub fn dtd_dir(&self) -> &Path {
        &self.dtd_dir
    }

    pub fn cache(&self) -> &DtdCache {
        &self.cache
    }

    async fn load_dtd(&self, file_name: &str) -> Result<XmlDtdPtr> {
        let path = self.dtd_dir.join(file_name);
        debug!(dtd = %path.display(), "loading DTD");

        let dtd = self
            .cache
            .get_or_load(path, |path| self.libxml2.parse_dtd_file(path))
            .await?;
        Ok(dtd)
    }
}

#[async_trait]
impl SchemaValidator for DtdValidator {
    async fn check_well_formed(&self, xml: &str) -> Result<ValidationResult> {
        Ok(self.libxml2.check_well_formed(xml)?)
    }

    async fn validate(&self, message_type: MessageType, xml: &str) -> Result<()> {
        if let ValidationResult::Invalid { errors } = self.libxml2.check_well_formed(xml)? {
            return Err(CxmlError::MalformedDocument {
                details: errors.join("; "),
            });
        }

        let file_name = declared_dtd_file(message_type, xml);
        let dtd = self.load_dtd(&file_name).await?;

        match self.libxml2.validate_against_dtd(&dtd, xml)? {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid { errors } => Err(CxmlError::SchemaInvalid {
                dtd: file_name,
                errors,
            }),
        }
    }
}
