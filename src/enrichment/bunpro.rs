use std::time::Duration;

use reqwest::{
    blocking::Client,
    Url,
};
use tracing::debug;

use super::{
    page::parse_vocab_page,
    Enricher,
};
use crate::core::{
    http::{
        fetch_text,
        http_client,
    },
    EnrichmentResult,
    TangoError,
};

pub const BUNPRO_VOCAB_BASE: &str = "https://bunpro.jp/vocabs/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub struct BunproClient {
    client: Client,
    base: Url,
}

impl BunproClient {
    pub fn new() -> Result<Self, TangoError> {
        Self::with_base(BUNPRO_VOCAB_BASE, DEFAULT_TIMEOUT)
    }

    pub fn with_base(base: &str, timeout: Duration) -> Result<Self, TangoError> {
        let base = Url::parse(base)
            .map_err(|e| TangoError::Configuration(format!("Invalid lookup URL {}: {}", base, e)))?;
        if base.cannot_be_a_base() {
            return Err(TangoError::Configuration(format!("Invalid lookup URL {}", base)));
        }
        Ok(Self { client: http_client(timeout)?, base })
    }

    /// Base path plus the percent-encoded headword; case and script are preserved.
    pub fn lookup_url(&self, headword: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(headword.trim());
        }
        url
    }
}

impl Enricher for BunproClient {
    fn enrich(&self, headword: &str) -> Result<Option<EnrichmentResult>, TangoError> {
        let url = self.lookup_url(headword);
        debug!("Looking up {} at {}", headword, url);

        match fetch_text(&self.client, url.as_str())? {
            Some(html) => parse_vocab_page(&html),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_url_encodes_headword() {
        let client = BunproClient::new().unwrap();
        assert_eq!(
            client.lookup_url(" 忍者 ").as_str(),
            "https://bunpro.jp/vocabs/%E5%BF%8D%E8%80%85"
        );
        assert_eq!(client.lookup_url("AI/ML").as_str(), "https://bunpro.jp/vocabs/AI%2FML");
        assert_eq!(client.lookup_url("Tシャツ").as_str(), "https://bunpro.jp/vocabs/T%E3%82%B7%E3%83%A3%E3%83%84");
    }

    #[test]
    fn base_without_trailing_slash() {
        let client = BunproClient::with_base("http://localhost:9/vocabs", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.lookup_url("猫").as_str(), "http://localhost:9/vocabs/%E7%8C%AB");
    }

    #[test]
    fn rejects_unusable_base() {
        assert!(BunproClient::with_base("mailto:someone@example.com", DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    fn transport_failure_is_an_error() {
        // Port 9 (discard) refuses connections on test machines
        let client = BunproClient::with_base("http://127.0.0.1:9/vocabs/", Duration::from_secs(2))
            .unwrap();
        assert!(matches!(client.enrich("猫"), Err(TangoError::Fetch(_))));
    }
}
