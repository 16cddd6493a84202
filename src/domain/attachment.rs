use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

const ALLOWED_EXTENSIONS: [&str; 1] = ["pdf"];
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Deserialize, Debug)]
pub struct AttachmentUpload {
    pub filename: String,
    pub content_base64: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("No file selected.")]
    MissingFilename,
    #[error("Invalid file type. Only PDF allowed.")]
    InvalidFileType,
    #[error("The attachment is not valid base64.")]
    InvalidEncoding(#[source] base64::DecodeError),
    #[error("The attachment is empty.")]
    Empty,
    #[error("The attachment is {size} bytes, the limit is {limit} bytes.")]
    TooLarge { size: usize, limit: usize },
}

/// The CV sent with every message of a campaign. Decoded once, the bytes are
/// shared between messages.
#[derive(Debug, Clone)]
pub struct Attachment {
    filename: String,
    content: Arc<[u8]>,
}

impl Attachment {
    pub fn parse(upload: AttachmentUpload, max_bytes: usize) -> Result<Attachment, AttachmentError> {
        let filename = secure_filename(&upload.filename);

        if filename.is_empty() {
            return Err(AttachmentError::MissingFilename);
        }
        if !has_allowed_extension(&filename) {
            return Err(AttachmentError::InvalidFileType);
        }

        // Rejects oversized uploads before paying for the decode.
        if upload.content_base64.len() / 4 * 3 > max_bytes + 2 {
            return Err(AttachmentError::TooLarge {
                size: upload.content_base64.len() / 4 * 3,
                limit: max_bytes,
            });
        }

        let content = STANDARD
            .decode(upload.content_base64.trim())
            .map_err(AttachmentError::InvalidEncoding)?;

        if content.is_empty() {
            return Err(AttachmentError::Empty);
        }
        if content.len() > max_bytes {
            return Err(AttachmentError::TooLarge {
                size: content.len(),
                limit: max_bytes,
            });
        }

        Ok(Attachment {
            filename,
            content: content.into(),
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

fn has_allowed_extension(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, extension)) => {
            !stem.is_empty() && ALLOWED_EXTENSIONS.contains(&extension.to_lowercase().as_str())
        }
        None => false,
    }
}

/// Keeps the last path component and only ASCII alphanumerics, `.`, `-` and
/// `_`. Spaces become `_`.
pub fn secure_filename(filename: &str) -> String {
    let basename = filename
        .rsplit(|char| char == '/' || char == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = basename
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|char| char.is_ascii_alphanumeric() || matches!(char, '.' | '-' | '_'))
        .collect();

    cleaned.trim_matches(|char| char == '.' || char == '_').to_string()
}
