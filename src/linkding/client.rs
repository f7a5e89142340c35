use crate::error::ArchiverError;
use crate::linkding::mimetypes::mime_type_for;
use crate::linkding::{Asset, Bookmark, BookmarkService, BookmarksQuery};
use anyhow::{Context, Result, anyhow};
use chrono::SecondsFormat;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs::File;
use std::time::Duration;
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const PAGE_LIMIT: &str = "100";

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default)]
    next: Option<String>,
    results: Vec<T>,
}

#[derive(Debug, Clone)]
pub struct LinkdingClient {
    http: Client,
    base_url: Url,
    token: String,
}

fn parse_base_url(raw: &str) -> Result<Url, ArchiverError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ArchiverError::MissingCredential("LDPA_BASEURL"));
    }
    let invalid = |reason: String| ArchiverError::InvalidBaseUrl {
        url: trimmed.to_string(),
        reason,
    };

    let mut url = Url::parse(trimmed).map_err(|err| invalid(err.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("url cannot be used as a base".to_string()));
    }
    // Relative joins only append when the base path ends in a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

impl LinkdingClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(ArchiverError::MissingCredential("LDPA_TOKEN").into());
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build linkding http client")?;

        Ok(Self {
            http,
            base_url,
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to build linkding url for {path}"))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("Token {}", self.token))
    }

    fn send(&self, request: RequestBuilder, target: &Url) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .with_context(|| format!("request to {} failed", target.path()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArchiverError::UnexpectedStatus {
                target: target.path().to_string(),
                status,
            }
            .into());
        }
        Ok(response)
    }

    fn get_all_pages<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                return Err(anyhow!("linkding pagination loops back to {}", url));
            }
            debug!(url = %url, "fetching linkding page");
            let response = self.send(self.http.get(url.clone()), &url)?;
            let page: Page<T> = response
                .json()
                .with_context(|| format!("failed to decode response from {}", url.path()))?;
            out.extend(page.results);

            if let Some(raw) = page.next.filter(|n| !n.trim().is_empty()) {
                let parsed = Url::parse(&raw)
                    .with_context(|| format!("invalid pagination link from linkding: {raw}"))?;
                next = Some(parsed);
            }
        }

        Ok(out)
    }
}

pub fn bookmarks_url(base: &Url, query: &BookmarksQuery) -> Result<Url> {
    let mut url = base
        .join("api/bookmarks/")
        .context("failed to build linkding bookmarks url")?;
    {
        let mut pairs = url.query_pairs_mut();
        if !query.tag.is_empty() {
            pairs.append_pair("q", &format!("#{}", query.tag));
        }
        if query.bundle_id > 0 {
            pairs.append_pair("bundle", &query.bundle_id.to_string());
        }
        if let Some(since) = query.modified_since {
            pairs.append_pair(
                "modified_since",
                &since.to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }
        pairs.append_pair("limit", PAGE_LIMIT);
    }
    Ok(url)
}

impl BookmarkService for LinkdingClient {
    fn list_bookmarks(&self, query: &BookmarksQuery) -> Result<Vec<Bookmark>> {
        let url = bookmarks_url(&self.base_url, query)?;
        self.get_all_pages(url)
            .with_context(|| format!("failed to list bookmarks for tag `{}`", query.tag))
    }

    fn list_assets(&self, bookmark_id: i64) -> Result<Vec<Asset>> {
        let url = self.endpoint(&format!("api/bookmarks/{bookmark_id}/assets/"))?;
        self.get_all_pages(url)
            .with_context(|| format!("failed to list assets of bookmark {bookmark_id}"))
    }

    fn add_asset(&self, bookmark_id: i64, file: File, file_name: &str) -> Result<Asset> {
        let url = self.endpoint(&format!("api/bookmarks/{bookmark_id}/assets/upload/"))?;

        // Sized so the form is sent with Content-Length, not chunked.
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat {file_name}"))?
            .len();
        let mut part = Part::reader_with_length(file, len).file_name(file_name.to_string());
        if let Ok(mime) = mime_type_for(file_name) {
            part = part.mime_str(mime)?;
        }
        let form = Form::new().part("file", part);

        let response = self.send(self.http.post(url.clone()).multipart(form), &url)?;
        response
            .json::<Asset>()
            .with_context(|| format!("failed to decode uploaded asset for bookmark {bookmark_id}"))
    }
}
