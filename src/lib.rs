//! Feed aggregation with social enrichment.
//!
//! `backchannel` polls user-configured RSS/Atom feeds, normalizes them into
//! one deduplicated article collection, and opportunistically attaches the
//! matching Hacker News and Reddit discussion threads to each article. The
//! combined discussion can be summarized through any OpenAI-compatible
//! chat-completion endpoint.
//!
//! The entry point is [`FeedManager`]: construct it over an injected
//! [`StateStorage`] backend, spawn the two schedulers, and subscribe to the
//! revision channel to re-render on change.

pub mod core;

pub use crate::core::assemble::interleave_by_recency;
pub use crate::core::config::{default_feeds, ManagerConfig};
pub use crate::core::feed::parser::{parse_feed, FeedParseError};
pub use crate::core::feed::types::{Article, Comment, Feed, HnThread, RedditThread, SocialData};
pub use crate::core::importer::{
    export_feed_list, merge_feed_lists, parse_feed_list, ImportError,
};
pub use crate::core::llm::{LlmConfig, LlmError};
pub use crate::core::manager::{FeedManager, ManagerError};
pub use crate::core::storage::{
    JsonFileStorage, MemoryStorage, StateStorage, StorageError, ARTICLES_KEY, FEEDS_KEY,
    LAST_UPDATED_KEY,
};
pub use crate::core::sync::{RefreshScheduler, SocialScheduler};
