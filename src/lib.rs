mod api;
mod cache;
mod config;
mod error;
mod feed;
mod locator;
mod models;
mod network;
mod view;

pub use api::{FeedApi, HttpFeedApi};
pub use cache::{CacheSnapshot, FeedCache, FileStore, MemoryStore, SnapshotStore, FEED_CACHE_KEY};
pub use config::Config;
pub use error::{FeedError, FetchError, Result};
pub use feed::{failure_action, FailureAction, FeedController, FeedState, LoadOutcome};
pub use locator::{target_from_query, LocatorHandle, LocatorState, PostLocator};
pub use models::{
    AuthorRef, FeedEnvelope, FeedPage, FeedPost, PageRequest, PaginationCursor, PostId,
};
pub use network::{watch_connectivity, NetworkEvent, NetworkMonitor, Transition};
pub use view::{FeedView, Notification, ScrollBehavior, ScrollBlock, ScrollOptions, POST_ID_PARAM};
