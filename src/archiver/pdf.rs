use crate::error::ArchiverError;
use crate::linkding::mimetypes::file_extension;
use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use reqwest::blocking::Client;
use std::fs::File;
use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::debug;
use url::Url;

const DOWNLOAD_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_FILE_NAME: &str = "download.pdf";
const PDF_EXTENSION: &str = ".pdf";

/// Percent-decoded URL path. Paths that do not decode to UTF-8 are kept as
/// sent.
fn decoded_path(url: &Url) -> Cow<'_, str> {
    percent_decode_str(url.path())
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(url.path()))
}

/// True when the URL path ends in a lowercase `.pdf` extension. Query and
/// fragment are ignored; unparsable URLs are never PDFs.
pub fn is_pdf_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    file_extension(&decoded_path(&url)) == Some(PDF_EXTENSION)
}

/// File name for a downloaded URL: the last path segment when it looks like a
/// file, otherwise [`DEFAULT_FILE_NAME`].
pub fn file_name_for(url: &Url) -> String {
    let path = decoded_path(url);
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let usable = !segment.is_empty()
        && segment != "."
        && segment != ".."
        && file_extension(segment).is_some();
    if usable {
        segment.to_string()
    } else {
        DEFAULT_FILE_NAME.to_string()
    }
}

/// A downloaded file together with the private directory holding it. The
/// directory is removed when this value is dropped.
#[derive(Debug)]
pub struct DownloadedDocument {
    dir: TempDir,
    path: PathBuf,
}

impl DownloadedDocument {
    pub fn new(dir: TempDir, file_name: &str) -> Self {
        let path = dir.path().join(file_name);
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
    }

    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }
}

pub trait DocumentFetcher: Sync {
    fn download(&self, url: &str) -> Result<DownloadedDocument>;
}

/// Downloads into fresh `linkding-pdf-*` directories under a shared root.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    temp_root: PathBuf,
}

impl HttpFetcher {
    pub fn new(temp_root: impl Into<PathBuf>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .context("failed to build download http client")?;
        Ok(Self {
            http,
            temp_root: temp_root.into(),
        })
    }
}

impl DocumentFetcher for HttpFetcher {
    fn download(&self, url: &str) -> Result<DownloadedDocument> {
        debug!(url, "downloading file from url");
        let parsed = Url::parse(url).with_context(|| format!("invalid download url {url}"))?;

        let mut response = self
            .http
            .get(parsed.clone())
            .send()
            .with_context(|| format!("failed to fetch {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArchiverError::UnexpectedStatus {
                target: url.to_string(),
                status,
            }
            .into());
        }

        let dir = tempfile::Builder::new()
            .prefix("linkding-pdf-")
            .tempdir_in(&self.temp_root)
            .with_context(|| {
                format!(
                    "failed to create download dir under {}",
                    self.temp_root.display()
                )
            })?;

        let file_name = file_name_for(&parsed);
        debug!(url, file_name = %file_name, "resolved download file name");
        let document = DownloadedDocument::new(dir, &file_name);

        let mut file = File::create(document.path())
            .with_context(|| format!("failed to create {}", document.path().display()))?;
        response
            .copy_to(&mut file)
            .with_context(|| format!("failed to write body of {url}"))?;

        debug!(url, path = %document.path().display(), "file downloaded successfully");
        Ok(document)
    }
}
