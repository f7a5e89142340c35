pub mod client;
pub mod mimetypes;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;

pub use client::LinkdingClient;

/// Asset kind Linkding assigns to files attached through the upload endpoint.
pub const ASSET_TYPE_UPLOAD: &str = "upload";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub tag_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    #[serde(default)]
    pub asset_type: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub display_name: String,
}

impl Asset {
    /// A user-uploaded file whose content-type the archiver knows how to produce.
    pub fn is_archived_document(&self) -> bool {
        self.asset_type == ASSET_TYPE_UPLOAD && mimetypes::is_known_mime_type(&self.content_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarksQuery {
    /// Empty means no tag constraint.
    pub tag: String,
    /// Zero means no bundle constraint.
    pub bundle_id: u64,
    pub modified_since: Option<DateTime<Utc>>,
}

/// Operations the archiver needs from the bookmark service. Implementations
/// are shared across worker threads.
pub trait BookmarkService: Sync {
    fn list_bookmarks(&self, query: &BookmarksQuery) -> Result<Vec<Bookmark>>;
    fn list_assets(&self, bookmark_id: i64) -> Result<Vec<Asset>>;
    fn add_asset(&self, bookmark_id: i64, file: File, file_name: &str) -> Result<Asset>;
}
