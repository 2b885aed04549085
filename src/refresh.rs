//! Refresh orchestration: resolve raw content for a source (remote fetch,
//! uploaded bytes, or the canonical on-disk file at startup), persist it,
//! parse it, and commit the result into the store.
//!
//! A failed refresh leaves the source's prior snapshot untouched; refreshes
//! of different sources proceed independently, while refreshes of the same
//! source are serialized by a per-source mutex.

use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use zip::ZipArchive;

use crate::config::Config;
use crate::model::RefreshOutcome;
use crate::parser::{self, ParseError};
use crate::sources::{self, SourceKind, SourceSpec};
use crate::store::DataStore;

/// Errors from the fetch/extract/persist/parse pipeline.
#[derive(Debug)]
pub enum RefreshError {
    Http(String),
    Archive(String),
    /// Archive downloaded fine but contains no `.csv` entry.
    ArchiveMissingEntry,
    Io(std::io::Error),
    Parse(ParseError),
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(msg) => write!(f, "download failed: {msg}"),
            Self::Archive(msg) => write!(f, "archive read failed: {msg}"),
            Self::ArchiveMissingEntry => write!(f, "No CSV file found in the ZIP archive."),
            Self::Io(e) => write!(f, "file error: {e}"),
            Self::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RefreshError {}

impl From<std::io::Error> for RefreshError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ParseError> for RefreshError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<reqwest::Error> for RefreshError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<zip::result::ZipError> for RefreshError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}

/// Owns the HTTP client, the canonical data directory, and the per-source
/// refresh locks.
pub struct Refresher {
    http: reqwest::Client,
    data_dir: PathBuf,
    source_urls: HashMap<&'static str, String>,
    store: Arc<DataStore>,
    locks: HashMap<&'static str, Mutex<()>>,
}

impl Refresher {
    pub fn new(config: &Config, store: Arc<DataStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_s))
            .build()
            .expect("failed to build HTTP client");

        let locks = sources::SPECS
            .iter()
            .map(|spec| (spec.file_name, Mutex::new(())))
            .collect();

        Self {
            http,
            data_dir: config.data_dir.clone(),
            source_urls: config.source_urls.clone(),
            store,
            locks,
        }
    }

    fn lock(&self, spec: &SourceSpec) -> &Mutex<()> {
        self.locks
            .get(spec.file_name)
            .expect("every registered source has a refresh lock")
    }

    /// Fetch a source's remote content and commit it.
    ///
    /// A source with no configured URL is a soft no-op (`Skipped`), so a
    /// scheduled run against an unconfigured environment stays quiet.
    pub async fn refresh_remote(
        &self,
        spec: &'static SourceSpec,
    ) -> Result<RefreshOutcome, RefreshError> {
        let _serial = self.lock(spec).lock().await;

        let url = spec.url_env.and_then(|key| self.source_urls.get(key));
        let Some(url) = url else {
            let reason = match spec.url_env {
                Some(key) => format!("{key} not set; skipping refresh of {}.", spec.file_name),
                None => format!("{} has no remote source; skipping refresh.", spec.file_name),
            };
            tracing::warn!("{reason}");
            return Ok(RefreshOutcome::Skipped { reason });
        };

        tracing::info!("refreshing {} from remote", spec.file_name);
        let response = self.http.get(url).send().await?.error_for_status()?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.bytes().await?;

        // Content handler keyed on the declared type, never sniffed.
        let text = if is_zip_content_type(&content_type) {
            extract_csv_entry(&body)?
        } else {
            String::from_utf8_lossy(&body).into_owned()
        };

        self.persist_and_commit(spec, &text).await
    }

    /// Commit an uploaded stock file under its recognized name.
    pub async fn apply_stock_upload(
        &self,
        file_name: &str,
        content: &str,
    ) -> Result<RefreshOutcome, RefreshError> {
        let spec = match sources::by_file_name(file_name) {
            Some(spec) if matches!(spec.kind, SourceKind::Stocks(_)) => spec,
            _ => return Err(ParseError::UnsupportedSource(file_name.to_string()).into()),
        };
        let _serial = self.lock(spec).lock().await;
        self.persist_and_commit(spec, content).await
    }

    /// Replace the active rate snapshot from uploaded content. Commits under
    /// the canonical rates source name whatever the uploaded file was called.
    pub async fn apply_rates_upload(&self, content: &str) -> Result<RefreshOutcome, RefreshError> {
        let spec = sources::rates_spec();
        let _serial = self.lock(spec).lock().await;
        self.persist_and_commit(spec, content).await
    }

    /// Startup scan: reload every recognized canonical file from the data
    /// directory. One bad source never blocks the others.
    pub async fn init_from_disk(&self) {
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(_) => {
                tracing::warn!(
                    "data directory {} not found; starting with an empty cache",
                    self.data_dir.display()
                );
                return;
            }
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else { continue };
            let Some(spec) = sources::by_file_name(file_name) else { continue };

            let loaded = match tokio::fs::read_to_string(entry.path()).await {
                Ok(content) => {
                    let _serial = self.lock(spec).lock().await;
                    self.parse_and_store(spec, &content).await
                }
                Err(e) => Err(e.into()),
            };
            match loaded {
                Ok(RefreshOutcome::Stocks { records_loaded }) => {
                    tracing::info!("loaded {records_loaded} records from {file_name}");
                }
                Ok(RefreshOutcome::Rates { currencies_loaded }) => {
                    tracing::info!("loaded {currencies_loaded} currencies from {file_name}");
                }
                Ok(RefreshOutcome::Skipped { .. }) => {}
                Err(e) => {
                    tracing::error!("failed to load {file_name}: {e}");
                }
            }
        }
    }

    /// Write the canonical raw file, then parse and commit. The file is
    /// persisted before parsing so a later restart replays the same bytes
    /// without refetching.
    async fn persist_and_commit(
        &self,
        spec: &SourceSpec,
        content: &str,
    ) -> Result<RefreshOutcome, RefreshError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        tokio::fs::write(self.data_dir.join(spec.file_name), content).await?;
        self.parse_and_store(spec, content).await
    }

    async fn parse_and_store(
        &self,
        spec: &SourceSpec,
        content: &str,
    ) -> Result<RefreshOutcome, RefreshError> {
        match spec.kind {
            SourceKind::Stocks(variant) => {
                let records = parser::parse_stocks(variant, spec.file_name, content)?;
                let records_loaded = records.len();
                self.store.replace_source(spec.file_name, records).await;
                Ok(RefreshOutcome::Stocks { records_loaded })
            }
            SourceKind::Rates => {
                let snapshot = parser::parse_rates(spec.file_name, content)?;
                let currencies_loaded = snapshot.rates.len();
                self.store.replace_rates(snapshot).await;
                Ok(RefreshOutcome::Rates { currencies_loaded })
            }
        }
    }
}

fn is_zip_content_type(content_type: &str) -> bool {
    content_type.contains("application/zip")
        || content_type.contains("application/x-zip-compressed")
}

/// Pull the first `.csv` entry out of a downloaded archive.
fn extract_csv_entry(bytes: &[u8]) -> Result<String, RefreshError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.name().to_ascii_lowercase().ends_with(".csv") {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            return Ok(text);
        }
    }
    Err(RefreshError::ArchiveMissingEntry)
}
