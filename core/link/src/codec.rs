//! Link codec: payload, policy and envelope metadata to and from a URL
//! query string.
//!
//! | field | meaning |
//! |---|---|
//! | `msg` | base64url of `salt || nonce || ciphertext+tag` |
//! | `type` | `text` or `media`, default `text` |
//! | `name`, `mtype`, `allowDL` | media filename, MIME type, `0`/`1` |
//! | `ttl` | `none`, `burn`, `1` or `24h`, default `none` |
//! | `exp` | epoch-millis expiry, required with `ttl=24h` |
//! | `kdf` | `argon2id` when not the default PBKDF2 |
//!
//! Decoding ignores unknown fields and is strict about `ttl`/`exp`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::DateTime;
use tracing::warn;
use url::form_urlencoded;

use crate::envelope::{ContentKind, EnvelopeMeta};
use crate::policy::{LinkPolicy, Ttl};
use burnlink_common::{Error, Result};
use burnlink_crypto::KdfAlgorithm;

/// Advisory size above which some messaging clients truncate links.
pub const DEFAULT_TRANSPORT_WARN_BYTES: usize = 150_000;

const FIELD_MSG: &str = "msg";
const FIELD_TYPE: &str = "type";
const FIELD_NAME: &str = "name";
const FIELD_MIME: &str = "mtype";
const FIELD_ALLOW_DOWNLOAD: &str = "allowDL";
const FIELD_TTL: &str = "ttl";
const FIELD_EXP: &str = "exp";
const FIELD_KDF: &str = "kdf";

/// Soft warning: the link will work, but may not survive every transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportWarning {
    /// Size of the measured value in bytes.
    pub size: usize,
    /// The advisory limit it exceeds.
    pub limit: usize,
}

impl TransportWarning {
    /// Returns a warning when `size` exceeds `limit`.
    pub fn check(size: usize, limit: usize) -> Option<Self> {
        (size > limit).then_some(Self { size, limit })
    }
}

/// Everything a link carries besides the payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFields {
    pub policy: LinkPolicy,
    pub meta: EnvelopeMeta,
    pub kdf: KdfAlgorithm,
}

/// Result of decoding a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLink {
    /// Framed payload bytes, not yet unpacked.
    pub payload: Vec<u8>,
    pub fields: LinkFields,
    pub warning: Option<TransportWarning>,
}

/// Encode a framed payload and its fields into a query string (no leading `?`).
pub fn encode(payload: &[u8], fields: &LinkFields) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair(FIELD_MSG, &URL_SAFE_NO_PAD.encode(payload));
    query.append_pair(FIELD_TYPE, fields.meta.kind.as_str());

    if fields.meta.kind == ContentKind::Media {
        if let Some(name) = &fields.meta.media_name {
            query.append_pair(FIELD_NAME, name);
        }
        if let Some(mime_type) = &fields.meta.media_type {
            query.append_pair(FIELD_MIME, mime_type);
        }
        query.append_pair(
            FIELD_ALLOW_DOWNLOAD,
            if fields.meta.allow_download { "1" } else { "0" },
        );
    }

    query.append_pair(FIELD_TTL, fields.policy.ttl().as_str());
    if let Some(expires_at) = fields.policy.expires_at() {
        query.append_pair(FIELD_EXP, &expires_at.timestamp_millis().to_string());
    }

    if fields.kdf != KdfAlgorithm::default() {
        query.append_pair(FIELD_KDF, fields.kdf.as_str());
    }

    query.finish()
}

/// Decode a query string (with or without leading `?`).
///
/// # Errors
/// - `MissingPayload` if `msg` is absent or empty
/// - `MalformedPayload` if `msg` is not base64 or `type` is unknown
/// - `InvalidPolicy` if `ttl` is unknown, or `ttl=24h` without a numeric `exp`
pub fn decode(query: &str, transport_warn_bytes: usize) -> Result<DecodedLink> {
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut msg = None;
    let mut kind = None;
    let mut media_name = None;
    let mut media_type = None;
    let mut allow_download = None;
    let mut ttl = None;
    let mut exp = None;
    let mut kdf = None;

    // First occurrence wins; unknown fields are ignored.
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let slot = match &*key {
            FIELD_MSG => &mut msg,
            FIELD_TYPE => &mut kind,
            FIELD_NAME => &mut media_name,
            FIELD_MIME => &mut media_type,
            FIELD_ALLOW_DOWNLOAD => &mut allow_download,
            FIELD_TTL => &mut ttl,
            FIELD_EXP => &mut exp,
            FIELD_KDF => &mut kdf,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    let msg = msg
        .filter(|m| !m.is_empty())
        .ok_or_else(|| Error::MissingPayload("link has no msg field".to_string()))?;
    let payload = decode_payload(&msg)?;

    let ttl: Ttl = ttl.as_deref().unwrap_or("none").parse()?;
    let expires_at = match ttl {
        Ttl::Expiring => {
            let raw = exp.ok_or_else(|| {
                Error::InvalidPolicy("ttl=24h requires an exp field".to_string())
            })?;
            let millis: i64 = raw.trim().parse().map_err(|_| {
                Error::InvalidPolicy(format!("exp is not epoch milliseconds: {}", raw))
            })?;
            Some(DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                Error::InvalidPolicy(format!("exp out of range: {}", millis))
            })?)
        }
        // A stray exp on a non-expiring link carries no meaning.
        _ => None,
    };
    let policy = LinkPolicy::new(ttl, expires_at)?;

    let kind: ContentKind = match kind.as_deref() {
        None | Some("") => ContentKind::Text,
        Some(other) => other.parse()?,
    };
    let meta = match kind {
        ContentKind::Text => EnvelopeMeta::text(),
        ContentKind::Media => EnvelopeMeta {
            kind,
            media_name: media_name.filter(|n| !n.is_empty()),
            media_type: media_type.filter(|t| !t.is_empty()),
            allow_download: matches!(allow_download.as_deref(), Some("1") | Some("true")),
        },
    };

    let kdf = match kdf.as_deref() {
        None | Some("") => KdfAlgorithm::default(),
        Some(name) => name
            .parse()
            .map_err(|_| Error::MalformedPayload(format!("unknown kdf: {}", name)))?,
    };

    let warning = TransportWarning::check(payload.len(), transport_warn_bytes);
    if let Some(w) = &warning {
        warn!(
            size = w.size,
            limit = w.limit,
            "Link payload exceeds advisory transport size"
        );
    }

    Ok(DecodedLink {
        payload,
        fields: LinkFields { policy, meta, kdf },
        warning,
    })
}

/// Decode the `msg` field.
///
/// Accepts base64url without padding as produced by [`encode`], and also
/// standard base64 with padding. Form decoding turns an unescaped `+` into a
/// space, so spaces are read back as `+`.
fn decode_payload(msg: &str) -> Result<Vec<u8>> {
    let normalized: String = msg
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            ' ' | '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| Error::MalformedPayload(format!("msg is not base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use chrono::Utc;

    fn fields(policy: LinkPolicy, meta: EnvelopeMeta) -> LinkFields {
        LinkFields {
            policy,
            meta,
            kdf: KdfAlgorithm::Pbkdf2,
        }
    }

    #[test]
    fn test_text_link_shape() {
        let query = encode(&[0xFB, 0xFF, 0x01], &fields(LinkPolicy::burn(), EnvelopeMeta::text()));

        assert_eq!(query, "msg=-_8B&type=text&ttl=burn");
    }

    #[test]
    fn test_media_roundtrip() {
        let meta = EnvelopeMeta::media("report final.pdf", "application/pdf", true);
        let expires = LinkPolicy::expiring_at(Utc::now());
        let query = encode(b"payload", &fields(expires, meta.clone()));

        let decoded = decode(&query, DEFAULT_TRANSPORT_WARN_BYTES).unwrap();
        assert_eq!(decoded.payload, b"payload");
        assert_eq!(decoded.fields.meta, meta);
        assert_eq!(decoded.fields.policy, expires);
        assert!(decoded.warning.is_none());
    }

    #[test]
    fn test_missing_msg() {
        assert!(matches!(
            decode("type=text&ttl=none", DEFAULT_TRANSPORT_WARN_BYTES),
            Err(Error::MissingPayload(_))
        ));
        assert!(matches!(
            decode("?msg=", DEFAULT_TRANSPORT_WARN_BYTES),
            Err(Error::MissingPayload(_))
        ));
    }

    #[test]
    fn test_expiring_requires_numeric_exp() {
        assert!(matches!(
            decode("msg=AAAA&ttl=24h", DEFAULT_TRANSPORT_WARN_BYTES),
            Err(Error::InvalidPolicy(_))
        ));
        assert!(matches!(
            decode("msg=AAAA&ttl=24h&exp=tomorrow", DEFAULT_TRANSPORT_WARN_BYTES),
            Err(Error::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_unknown_ttl_rejected() {
        assert!(matches!(
            decode("msg=AAAA&ttl=forever", DEFAULT_TRANSPORT_WARN_BYTES),
            Err(Error::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_defaults_and_unknown_fields() {
        let decoded = decode("?utm_source=chat&msg=AAAA&theme=dark", DEFAULT_TRANSPORT_WARN_BYTES)
            .unwrap();

        assert_eq!(decoded.payload, vec![0, 0, 0]);
        assert_eq!(decoded.fields.policy, LinkPolicy::never());
        assert_eq!(decoded.fields.meta, EnvelopeMeta::text());
        assert_eq!(decoded.fields.kdf, KdfAlgorithm::Pbkdf2);
    }

    #[test]
    fn test_stray_exp_ignored() {
        let decoded = decode("msg=AAAA&ttl=burn&exp=123", DEFAULT_TRANSPORT_WARN_BYTES).unwrap();
        assert_eq!(decoded.fields.policy, LinkPolicy::burn());
    }

    #[test]
    fn test_standard_base64_accepted() {
        let bytes = vec![0xFB, 0xEF, 0xFF, 0x10];
        let standard = STANDARD.encode(&bytes);
        assert!(standard.contains('+') || standard.contains('/'));

        // Unescaped, as a hand-built link would carry it.
        let decoded = decode(&format!("msg={}", standard), DEFAULT_TRANSPORT_WARN_BYTES).unwrap();
        assert_eq!(decoded.payload, bytes);
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            decode("msg=%%%%", DEFAULT_TRANSPORT_WARN_BYTES),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_kdf_field() {
        let mut f = fields(LinkPolicy::never(), EnvelopeMeta::text());
        f.kdf = KdfAlgorithm::Argon2id;
        let query = encode(b"x", &f);
        assert!(query.ends_with("kdf=argon2id"));

        let decoded = decode(&query, DEFAULT_TRANSPORT_WARN_BYTES).unwrap();
        assert_eq!(decoded.fields.kdf, KdfAlgorithm::Argon2id);

        assert!(decode("msg=AAAA&kdf=md5", DEFAULT_TRANSPORT_WARN_BYTES).is_err());
    }

    #[test]
    fn test_transport_warning() {
        let query = encode(&[7u8; 64], &fields(LinkPolicy::never(), EnvelopeMeta::text()));
        let decoded = decode(&query, 32).unwrap();

        assert_eq!(decoded.warning, Some(TransportWarning { size: 64, limit: 32 }));
    }
}
