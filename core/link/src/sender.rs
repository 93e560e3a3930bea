//! Sealing: turn content and a passcode into a share link.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::codec::{self, LinkFields, TransportWarning};
use crate::config::ShareConfig;
use crate::envelope::Content;
use crate::frame::Payload;
use crate::policy::LinkPolicy;
use burnlink_common::{Error, Passcode, Result};
use burnlink_crypto::CryptoProvider;

/// A freshly sealed link.
#[derive(Debug, Clone)]
pub struct SealedLink {
    /// Full share URL.
    pub url: String,
    /// Query string alone, without `?`.
    pub query: String,
    pub fields: LinkFields,
    /// Set when the payload exceeds the advisory transport size.
    pub warning: Option<TransportWarning>,
}

/// Encrypt `content` under `passcode` and encode it as a share link.
///
/// Salt and nonce are drawn fresh from `provider` on every call, so sealing
/// the same content twice under the same passcode yields different links.
/// Key derivation runs on the blocking pool.
///
/// # Errors
/// - `InvalidInput` for empty or oversized content, an already-expired
///   policy, or an unusable config
/// - `Crypto` if a primitive fails
pub async fn seal(
    content: Content,
    passcode: Passcode,
    policy: LinkPolicy,
    config: &ShareConfig,
    provider: Arc<dyn CryptoProvider>,
) -> Result<SealedLink> {
    config.validate()?;
    content.validate(config.max_file_bytes)?;
    if policy.is_expired_at(Utc::now()) {
        return Err(Error::InvalidInput(
            "Expiry time is already in the past".to_string(),
        ));
    }

    let fields = LinkFields {
        policy,
        meta: content.meta(),
        kdf: config.kdf,
    };
    let params = config.kdf.params();

    debug!(kind = %fields.meta.kind, kdf = %fields.kdf, "Sealing content");

    let payload = tokio::task::spawn_blocking(move || -> Result<Payload> {
        let salt = provider.generate_salt();
        let nonce = provider.generate_nonce();
        let key = provider.derive(&passcode, &salt, &params)?;
        let ciphertext = provider.seal(&key, &nonce, content.plaintext())?;
        Ok(Payload::new(salt, nonce, ciphertext))
    })
    .await
    .map_err(|e| Error::Crypto(format!("Seal task failed: {}", e)))??;

    let query = codec::encode(&payload.pack(), &fields);
    let url = share_url(&config.base_url, &query)?;

    let warning = TransportWarning::check(payload.packed_len(), config.transport_warn_bytes);
    if let Some(w) = &warning {
        warn!(
            size = w.size,
            limit = w.limit,
            "Sealed payload exceeds advisory transport size; some clients may truncate the link"
        );
    }

    info!(
        ttl = %fields.policy.ttl(),
        kind = %fields.meta.kind,
        bytes = payload.packed_len(),
        "Sealed link"
    );

    Ok(SealedLink {
        url,
        query,
        fields,
        warning,
    })
}

/// Attach `query` to `base_url`, replacing any existing query or fragment.
pub fn share_url(base_url: &str, query: &str) -> Result<String> {
    let mut url = Url::parse(base_url)
        .map_err(|e| Error::InvalidInput(format!("Invalid base URL: {}", e)))?;
    url.set_fragment(None);
    url.set_query(Some(query));
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::MediaFile;
    use crate::testing::fast_provider;
    use burnlink_crypto::StandardProvider;

    fn provider() -> Arc<dyn CryptoProvider> {
        Arc::new(StandardProvider::new())
    }

    fn passcode() -> Passcode {
        Passcode::new("correct-horse").unwrap()
    }

    #[test]
    fn test_share_url() {
        let url = share_url("https://share.example/open?old=1#frag", "msg=abc&ttl=none").unwrap();
        assert_eq!(url, "https://share.example/open?msg=abc&ttl=none");

        assert!(share_url("not a url", "msg=abc").is_err());
    }

    #[tokio::test]
    async fn test_seal_text_link() {
        let sealed = seal(
            Content::Text("hello".into()),
            passcode(),
            LinkPolicy::burn(),
            &ShareConfig::default(),
            provider(),
        )
        .await
        .unwrap();

        assert!(sealed.url.starts_with("https://burnlink.local/?msg="));
        assert!(sealed.query.contains("ttl=burn"));
        assert!(sealed.warning.is_none());
    }

    #[tokio::test]
    async fn test_seal_rejects_empty_message() {
        let result = seal(
            Content::Text(String::new()),
            passcode(),
            LinkPolicy::never(),
            &ShareConfig::default(),
            provider(),
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_seal_rejects_oversized_file() {
        let config = ShareConfig {
            max_file_bytes: 4,
            ..ShareConfig::default()
        };
        let file = MediaFile::new("big.bin", "application/octet-stream", true, vec![0u8; 5]);

        let result = seal(Content::Media(file), passcode(), LinkPolicy::never(), &config, provider()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_seal_rejects_untyped_file() {
        let file = MediaFile::new("a.bin", "", true, vec![1]);

        let result = seal(
            Content::Media(file),
            passcode(),
            LinkPolicy::never(),
            &ShareConfig::default(),
            fast_provider(),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_seal_warns_over_transport_size() {
        let config = ShareConfig {
            transport_warn_bytes: 64,
            ..ShareConfig::default()
        };
        let file = MediaFile::new("blob.bin", "application/octet-stream", true, vec![7u8; 100]);

        let sealed = seal(Content::Media(file), passcode(), LinkPolicy::never(), &config, fast_provider())
            .await
            .unwrap();

        let warning = sealed.warning.expect("payload over the advisory size");
        assert_eq!(warning.limit, 64);
        assert_eq!(warning.size, 28 + 100 + 16);
    }

    #[tokio::test]
    async fn test_seal_rejects_past_expiry() {
        let policy = LinkPolicy::expiring_at(Utc::now() - chrono::Duration::seconds(1));

        let result = seal(
            Content::Text("late".into()),
            passcode(),
            policy,
            &ShareConfig::default(),
            provider(),
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
