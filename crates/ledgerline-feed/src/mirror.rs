//! Mirror feed abstraction.
//!
//! A mirror serves a topic's messages in consensus order, paginated, with
//! at-least-once delivery. Implementations may be a REST mirror node or an
//! in-memory topic.

use async_trait::async_trait;

use ledgerline_core::{ConsensusTimestamp, TopicId};

use crate::error::Result;
use crate::messages::RawMessage;

/// Read access to a topic's ordered message stream.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait MirrorFeed: Send + Sync {
    /// Fetch up to `limit` messages with a consensus timestamp strictly
    /// greater than `since`, oldest first.
    ///
    /// Redelivery of already-seen messages is allowed.
    async fn fetch_messages(
        &self,
        topic: &TopicId,
        since: Option<ConsensusTimestamp>,
        limit: usize,
    ) -> Result<Vec<RawMessage>>;
}

#[async_trait]
impl<F: MirrorFeed + ?Sized> MirrorFeed for std::sync::Arc<F> {
    async fn fetch_messages(
        &self,
        topic: &TopicId,
        since: Option<ConsensusTimestamp>,
        limit: usize,
    ) -> Result<Vec<RawMessage>> {
        (**self).fetch_messages(topic, since, limit).await
    }
}

/// A mirror feed over a Hedera-style REST API.
pub mod http {
    use super::*;
    use std::time::Duration;

    use crate::error::FeedError;
    use crate::messages::MirrorPage;

    /// Default public mirror.
    pub const DEFAULT_MIRROR_URL: &str = "https://testnet.mirrornode.hedera.com";

    /// Configuration for the HTTP mirror client.
    #[derive(Debug, Clone)]
    pub struct MirrorConfig {
        /// Base URL, without the `/api/v1` suffix.
        pub base_url: String,
        /// Timeout for one request.
        pub request_timeout: Duration,
        /// Timeout for establishing a connection.
        pub connect_timeout: Duration,
    }

    impl Default for MirrorConfig {
        fn default() -> Self {
            Self {
                base_url: DEFAULT_MIRROR_URL.to_string(),
                request_timeout: Duration::from_secs(10),
                connect_timeout: Duration::from_secs(5),
            }
        }
    }

    /// HTTP mirror client.
    #[derive(Debug, Clone)]
    pub struct HttpMirrorFeed {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpMirrorFeed {
        /// Create a client for the given configuration.
        pub fn new(config: MirrorConfig) -> Result<Self> {
            let client = reqwest::Client::builder()
                .connect_timeout(config.connect_timeout)
                .timeout(config.request_timeout)
                .build()
                .map_err(|e| FeedError::Transport(e.to_string()))?;

            Ok(Self {
                client,
                base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            })
        }

        /// Build the listing URL for one page.
        pub fn messages_url(
            &self,
            topic: &TopicId,
            since: Option<ConsensusTimestamp>,
            limit: usize,
        ) -> String {
            let mut url = format!(
                "{}/api/v1/topics/{}/messages?order=asc&limit={}",
                self.base_url, topic, limit
            );
            if let Some(since) = since {
                url.push_str(&format!("&timestamp=gt:{since}"));
            }
            url
        }
    }

    #[async_trait]
    impl MirrorFeed for HttpMirrorFeed {
        async fn fetch_messages(
            &self,
            topic: &TopicId,
            since: Option<ConsensusTimestamp>,
            limit: usize,
        ) -> Result<Vec<RawMessage>> {
            let url = self.messages_url(topic, since, limit);
            tracing::debug!(%url, "fetching mirror page");

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FeedError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FeedError::Status {
                    status: status.as_u16(),
                });
            }

            let page: MirrorPage = response
                .json()
                .await
                .map_err(|e| FeedError::Body(e.to_string()))?;

            tracing::debug!(count = page.messages.len(), "mirror page received");
            Ok(page.messages)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn feed(base: &str) -> HttpMirrorFeed {
            HttpMirrorFeed::new(MirrorConfig {
                base_url: base.to_string(),
                ..MirrorConfig::default()
            })
            .unwrap()
        }

        #[test]
        fn test_messages_url_from_start() {
            let url = feed("https://mirror.example/").messages_url(&TopicId::new("0.0.42"), None, 25);
            assert_eq!(
                url,
                "https://mirror.example/api/v1/topics/0.0.42/messages?order=asc&limit=25"
            );
        }

        #[test]
        fn test_messages_url_with_cursor() {
            let since: ConsensusTimestamp = "1700000000.5".parse().unwrap();
            let url = feed("https://mirror.example").messages_url(&TopicId::new("0.0.42"), Some(since), 10);
            assert!(url.ends_with("&timestamp=gt:1700000000.500000000"));
        }

        #[tokio::test]
        async fn test_unreachable_mirror_is_transport_error() {
            let feed = HttpMirrorFeed::new(MirrorConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                request_timeout: Duration::from_millis(500),
                connect_timeout: Duration::from_millis(500),
            })
            .unwrap();
            let result = feed.fetch_messages(&TopicId::new("0.0.1"), None, 1).await;
            assert!(matches!(result, Err(FeedError::Transport(_))));
        }
    }
}
