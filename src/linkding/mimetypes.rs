//! Static extension → content-type table for attachments the archiver produces.

use crate::error::ArchiverError;

/// Recognised `(extension, content-type)` pairs. Extensions carry their dot
/// and are matched lower-cased.
const EXTENSION_TABLE: &[(&str, &str)] = &[(".pdf", "application/pdf")];

/// Extension of the final `/`-separated segment, dot included, as written.
/// A segment that is only an extension (`.pdf`) counts as one.
pub fn file_extension(path: &str) -> Option<&str> {
    let last = path.rsplit('/').next().unwrap_or_default();
    last.rfind('.').map(|dot| &last[dot..])
}

pub fn mime_type_for(file_name: &str) -> Result<&'static str, ArchiverError> {
    file_extension(file_name)
        .map(str::to_ascii_lowercase)
        .and_then(|ext| {
            EXTENSION_TABLE
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| *mime)
        })
        .ok_or_else(|| ArchiverError::UnknownMimeType(file_name.to_string()))
}

pub fn is_known_mime_type(content_type: &str) -> bool {
    let normalized = content_type.trim().to_ascii_lowercase();
    EXTENSION_TABLE.iter().any(|(_, mime)| *mime == normalized)
}
