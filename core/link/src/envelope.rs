//! Typed envelope: what the encrypted bytes mean.
//!
//! Only the content itself is encrypted. Kind, filename, MIME type and the
//! download flag travel as cleartext link fields so a viewer can branch
//! before asking for a passcode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use burnlink_common::{Error, Result, SensitiveBytes};

/// MIME type assumed when a media link does not carry one.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Filename assumed when a media link does not carry one.
pub const DEFAULT_MEDIA_NAME: &str = "download";

/// Kind of content carried by a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Text,
    Media,
}

impl ContentKind {
    /// Wire name used in the `type` link field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Media => "media",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(ContentKind::Text),
            "media" => Ok(ContentKind::Media),
            other => Err(Error::MalformedPayload(format!(
                "unknown content type: {}",
                other
            ))),
        }
    }
}

/// Cleartext metadata describing the encrypted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub kind: ContentKind,
    pub media_name: Option<String>,
    pub media_type: Option<String>,
    pub allow_download: bool,
}

impl EnvelopeMeta {
    /// Metadata for a text message.
    pub fn text() -> Self {
        Self {
            kind: ContentKind::Text,
            media_name: None,
            media_type: None,
            allow_download: false,
        }
    }

    /// Metadata for an attached file.
    pub fn media(name: impl Into<String>, mime_type: impl Into<String>, allow_download: bool) -> Self {
        Self {
            kind: ContentKind::Media,
            media_name: Some(name.into()),
            media_type: Some(mime_type.into()),
            allow_download,
        }
    }
}

impl Default for EnvelopeMeta {
    fn default() -> Self {
        Self::text()
    }
}

/// An attached file, either about to be sealed or just revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub mime_type: String,
    pub allow_download: bool,
    pub bytes: SensitiveBytes,
}

impl MediaFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        allow_download: bool,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            allow_download,
            bytes: SensitiveBytes::new(bytes),
        }
    }
}

/// Content carried by a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Media(MediaFile),
}

impl Content {
    /// Cleartext metadata for this content.
    pub fn meta(&self) -> EnvelopeMeta {
        match self {
            Content::Text(_) => EnvelopeMeta::text(),
            Content::Media(file) => {
                EnvelopeMeta::media(&file.name, &file.mime_type, file.allow_download)
            }
        }
    }

    /// The bytes that get encrypted.
    pub fn plaintext(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Media(file) => file.bytes.as_bytes(),
        }
    }

    /// Rebuild content from decrypted bytes and the link's metadata.
    ///
    /// # Errors
    /// - `MalformedPayload` if a text payload is not valid UTF-8
    pub fn from_plaintext(meta: &EnvelopeMeta, plaintext: Vec<u8>) -> Result<Self> {
        match meta.kind {
            ContentKind::Text => String::from_utf8(plaintext)
                .map(Content::Text)
                .map_err(|_| Error::MalformedPayload("text payload is not UTF-8".to_string())),
            ContentKind::Media => Ok(Content::Media(MediaFile::new(
                meta.media_name.as_deref().unwrap_or(DEFAULT_MEDIA_NAME),
                meta.media_type.as_deref().unwrap_or(DEFAULT_MEDIA_TYPE),
                meta.allow_download,
                plaintext,
            ))),
        }
    }

    /// Check sender input before any cryptographic work.
    ///
    /// # Errors
    /// - `InvalidInput` for empty text, an empty or oversized file, or a
    ///   file without a name or MIME type
    pub fn validate(&self, max_file_bytes: usize) -> Result<()> {
        match self {
            Content::Text(text) if text.is_empty() => Err(Error::InvalidInput(
                "Message cannot be empty".to_string(),
            )),
            Content::Text(_) => Ok(()),
            Content::Media(file) => {
                if file.name.trim().is_empty() {
                    return Err(Error::InvalidInput("File name cannot be empty".to_string()));
                }
                if file.mime_type.trim().is_empty() {
                    return Err(Error::InvalidInput("File type cannot be empty".to_string()));
                }
                if file.bytes.is_empty() {
                    return Err(Error::InvalidInput("File cannot be empty".to_string()));
                }
                if file.bytes.len() > max_file_bytes {
                    return Err(Error::InvalidInput(format!(
                        "File is {} bytes, limit is {}",
                        file.bytes.len(),
                        max_file_bytes
                    )));
                }
                Ok(())
            }
        }
    }
}
