//! User-supplied attachments referenced by URL.
//!
//! The client uploads media elsewhere and sends back `{url, file_type,
//! friendly_name}`. Each entry is validated on its own; a bad entry is
//! dropped without failing the turn.

use serde::{Deserialize, Serialize};
use url::Url;

/// MIME types forwarded to the model as document references.
pub const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "text/plain",
    "text/html",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub file_type: String,
    pub friendly_name: String,
}

/// How an attachment is handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Document,
    /// Audio, video, and anything unrecognised.
    Unsupported,
}

impl Attachment {
    /// Keep the attachment only if its URL is an absolute `http(s)` URL with
    /// a host. The trimmed input string is stored.
    fn with_checked_url(mut self) -> Result<Self, String> {
        let trimmed = self.url.trim();
        if trimmed.is_empty() {
            return Err("empty url".to_string());
        }
        let parsed = Url::parse(trimmed).map_err(|e| format!("invalid url: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("unsupported url scheme '{}'", parsed.scheme()));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err("url has no host".to_string());
        }
        self.url = trimmed.to_string();
        Ok(self)
    }

    pub fn kind(&self) -> AttachmentKind {
        let mime = self.file_type.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            AttachmentKind::Image
        } else if DOCUMENT_MIME_TYPES.contains(&mime.as_str()) {
            AttachmentKind::Document
        } else {
            AttachmentKind::Unsupported
        }
    }
}

/// Outcome of parsing the raw `attachments` form field.
#[derive(Debug, Default)]
pub struct ParsedAttachments {
    /// Entries the model can consume, in submission order.
    pub accepted: Vec<Attachment>,
    /// Human-readable reasons for each dropped entry.
    pub rejected: Vec<String>,
}

/// Parse the JSON-encoded attachment list.
///
/// A field that is not a JSON array rejects everything; inside an array each
/// item is checked independently.
pub fn parse_attachments(raw: &str) -> ParsedAttachments {
    let mut parsed = ParsedAttachments::default();
    if raw.trim().is_empty() {
        return parsed;
    }

    let items = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(_) => {
            parsed.rejected.push("attachments must be a JSON array".to_string());
            return parsed;
        }
        Err(e) => {
            parsed.rejected.push(format!("attachments are not valid JSON: {e}"));
            return parsed;
        }
    };

    for (index, item) in items.into_iter().enumerate() {
        let attachment: Attachment = match serde_json::from_value(item) {
            Ok(a) => a,
            Err(e) => {
                parsed.rejected.push(format!("attachment {index}: {e}"));
                continue;
            }
        };
        let attachment = match attachment.with_checked_url() {
            Ok(a) => a,
            Err(reason) => {
                parsed.rejected.push(format!("attachment {index}: {reason}"));
                continue;
            }
        };
        match attachment.kind() {
            AttachmentKind::Unsupported => parsed.rejected.push(format!(
                "attachment {index}: unsupported file type '{}'",
                attachment.file_type
            )),
            _ => parsed.accepted.push(attachment),
        }
    }

    parsed
}
