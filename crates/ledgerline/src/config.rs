//! Configuration for a Ledgerline deployment.
//!
//! Settings come from the environment:
//!
//! | variable | meaning | default |
//! |----------|---------|---------|
//! | `TOPIC_ID` | topic to publish to and poll | required |
//! | `OPERATOR_ID` | account submitting events | none |
//! | `MIRROR_URL` | mirror base URL | public testnet mirror |
//! | `POLL_INTERVAL_MS` | time between poll cycles | 4000 |
//! | `POLL_PAGE_LIMIT` | messages per page | 25 |
//! | `POLL_MAX_PAGES` | pages drained per cycle | 4 |

use std::str::FromStr;
use std::time::Duration;

use ledgerline_core::TopicId;
use ledgerline_feed::{FeedPoller, HttpMirrorFeed, MirrorConfig, PollerConfig};

use crate::error::{ConfigError, Result};

pub const TOPIC_ID: &str = "TOPIC_ID";
pub const OPERATOR_ID: &str = "OPERATOR_ID";
pub const MIRROR_URL: &str = "MIRROR_URL";
pub const POLL_INTERVAL_MS: &str = "POLL_INTERVAL_MS";
pub const POLL_PAGE_LIMIT: &str = "POLL_PAGE_LIMIT";
pub const POLL_MAX_PAGES: &str = "POLL_MAX_PAGES";

/// Configuration for the Ledger and its poller.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Topic events are published to and read from.
    pub topic: TopicId,
    /// Account submitting events, when the publisher needs one.
    pub operator_id: Option<String>,
    /// Mirror client configuration.
    pub mirror: MirrorConfig,
    /// Poll loop configuration.
    pub poller: PollerConfig,
}

impl LedgerConfig {
    /// Configuration with defaults for everything but the topic.
    pub fn new(topic: TopicId) -> Self {
        Self {
            topic,
            operator_id: None,
            mirror: MirrorConfig::default(),
            poller: PollerConfig::default(),
        }
    }

    /// Load from process environment variables.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let topic = get(TOPIC_ID).ok_or(ConfigError::Missing(TOPIC_ID))?;
        let mut config = Self::new(TopicId::new(topic));
        config.operator_id = get(OPERATOR_ID);

        if let Some(url) = get(MIRROR_URL) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    key: MIRROR_URL,
                    value: url,
                    reason: "must be an http(s) URL".into(),
                });
            }
            config.mirror.base_url = url;
        }

        if let Some(ms) = parse_positive::<u64>(POLL_INTERVAL_MS, get(POLL_INTERVAL_MS))? {
            config.poller.interval = Duration::from_millis(ms);
        }
        if let Some(limit) = parse_positive::<usize>(POLL_PAGE_LIMIT, get(POLL_PAGE_LIMIT))? {
            config.poller.page_limit = limit;
        }
        if let Some(pages) = parse_positive::<usize>(POLL_MAX_PAGES, get(POLL_MAX_PAGES))? {
            config.poller.max_pages_per_poll = pages;
        }

        Ok(config)
    }

    /// Build a poller reading this topic from the configured HTTP mirror.
    pub fn http_poller(&self) -> Result<FeedPoller<HttpMirrorFeed>> {
        let feed = HttpMirrorFeed::new(self.mirror.clone())?;
        Ok(FeedPoller::new(feed, self.topic.clone(), self.poller.clone()))
    }
}

fn parse_positive<T>(
    key: &'static str,
    value: Option<String>,
) -> std::result::Result<Option<T>, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let Some(value) = value else {
        return Ok(None);
    };
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(Some(n)),
        Ok(_) => Err(ConfigError::Invalid {
            key,
            value,
            reason: "must be greater than zero".into(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
