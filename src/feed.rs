use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::FeedApi;
use crate::cache::{FeedCache, SnapshotStore};
use crate::config::Config;
use crate::error::{FeedError, FetchError, Result};
use crate::locator::{LocatorHandle, PostLocator};
use crate::models::{FeedPage, FeedPost, PageRequest, PaginationCursor, PostId};
use crate::network::{NetworkEvent, NetworkMonitor, Transition};
use crate::view::{FeedView, Notification};

/// Everything the feed page knows, in one place.
#[derive(Debug, Clone)]
pub struct FeedState {
    pub posts: Vec<FeedPost>,
    pub cursor: PaginationCursor,
    /// Set while a fetch is awaiting the backend. `load_more` refuses to start
    /// another one; hosts sharing the controller (e.g. behind a mutex) read it
    /// to grey out their "load more" trigger.
    pub is_loading: bool,
    pub showing_cached: bool,
    pub network: NetworkMonitor,
    /// Parameters of the last fetch that ended in a retry prompt.
    pub last_failure: Option<PageRequest>,
}

impl FeedState {
    fn new(online: bool) -> Self {
        FeedState {
            posts: Vec::new(),
            cursor: PaginationCursor::default(),
            is_loading: false,
            showing_cached: false,
            network: NetworkMonitor::new(online),
            last_failure: None,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.network.is_offline()
    }

    pub fn post_ids(&self) -> Vec<PostId> {
        self.posts.iter().map(|p| p.id).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded {
        page: u32,
        received: usize,
        has_more: bool,
    },
    FromCache {
        posts: usize,
    },
    /// A fetch is in flight, or there is nothing more to page through.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    RedirectToLogin,
    FallBackToCache,
    OfferRetry,
}

/// Decides how a failed fetch is handled. First match wins.
pub fn failure_action(err: &FetchError, is_offline: bool) -> FailureAction {
    match err {
        FetchError::Unauthorized => FailureAction::RedirectToLogin,
        FetchError::NotConnected(_) => FailureAction::FallBackToCache,
        FetchError::Transient(_) if is_offline => FailureAction::FallBackToCache,
        FetchError::Transient(_) => FailureAction::OfferRetry,
    }
}

pub struct FeedController<A, S, V> {
    api: A,
    cache: FeedCache<S>,
    view: Arc<V>,
    state: FeedState,
    page_size: u32,
    activity: Option<i64>,
}

impl<A, S, V> FeedController<A, S, V>
where
    A: FeedApi,
    S: SnapshotStore,
    V: FeedView + 'static,
{
    /// - online: the platform's connectivity signal at start-up
    pub fn new(api: A, store: S, view: Arc<V>, online: bool) -> Self {
        FeedController {
            api,
            cache: FeedCache::new(store),
            view,
            state: FeedState::new(online),
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            activity: None,
        }
    }

    pub fn with_config(api: A, store: S, view: Arc<V>, online: bool, config: &Config) -> Self {
        Self::new(api, store, view, online)
            .page_size(config.page_size)
            .activity(config.activity)
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn activity(mut self, activity: Option<i64>) -> Self {
        self.activity = activity;
        self
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn posts(&self) -> &[FeedPost] {
        &self.state.posts
    }

    pub fn cache(&self) -> &FeedCache<S> {
        &self.cache
    }

    /// First load: the snapshot when starting offline, page 1 otherwise.
    pub async fn start(&mut self) -> Result<LoadOutcome> {
        if self.state.is_offline() {
            info!("Starting offline, showing saved posts");
            return Ok(self.show_cache());
        }
        self.load_page(1).await
    }

    pub async fn load_page(&mut self, page: u32) -> Result<LoadOutcome> {
        let request = PageRequest::new(page, self.page_size, self.activity);
        self.fetch(request).await
    }

    pub async fn load_more(&mut self) -> Result<LoadOutcome> {
        if self.state.is_loading || !self.state.cursor.has_more {
            return Ok(LoadOutcome::Skipped);
        }
        let next = self.state.cursor.current_page + 1;
        self.load_page(next).await
    }

    /// Reloads page 1, dropping pagination progress.
    pub async fn refresh(&mut self) -> Result<LoadOutcome> {
        self.load_page(1).await
    }

    /// Re-issues a failed fetch with identical parameters.
    pub async fn retry(&mut self, request: &PageRequest) -> Result<LoadOutcome> {
        info!("Retrying page {}", request.page);
        self.fetch(*request).await
    }

    pub async fn retry_last(&mut self) -> Result<LoadOutcome> {
        match self.state.last_failure {
            Some(request) => self.retry(&request).await,
            None => Ok(LoadOutcome::Skipped),
        }
    }

    /// Reacts to a platform connectivity signal.
    pub async fn handle_event(&mut self, event: NetworkEvent) -> Result<Option<LoadOutcome>> {
        match self.state.network.apply(event) {
            Some(Transition::GoneOnline) => {
                self.view.notify(Notification::BackOnline);
                self.load_page(1).await.map(Some)
            }
            Some(Transition::GoneOffline) => {
                self.view.notify(Notification::WentOffline);
                Ok(Some(self.show_cache()))
            }
            None => Ok(None),
        }
    }

    /// Feeds connectivity events into the controller until the channel closes.
    /// Failures are already surfaced to the view, so they are only logged here.
    pub async fn follow_network(&mut self, mut events: mpsc::Receiver<NetworkEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(err) = self.handle_event(event).await {
                warn!("Reload after {event:?} failed: {err}");
            }
        }
    }

    /// Deletes a post on the backend, then drops it from the in-memory feed.
    ///
    /// Returns whether the post was present locally. The snapshot is left as is.
    pub async fn delete_post(&mut self, id: PostId) -> Result<bool> {
        match self.api.delete_post(id).await {
            Ok(()) => {
                let before = self.state.posts.len();
                self.state.posts.retain(|post| post.id != id);
                let removed = self.state.posts.len() != before;
                self.view.render(&self.state.posts);
                self.view.notify(Notification::PostDeleted(id));
                Ok(removed)
            }
            Err(FetchError::Unauthorized) => {
                self.view.redirect_to_login();
                Err(FeedError::AuthExpired)
            }
            Err(FetchError::NotConnected(msg)) => Err(FeedError::Offline(msg)),
            Err(FetchError::Transient(msg)) => {
                error!("Deleting post {id} failed: {msg}");
                Err(FeedError::Transient(msg))
            }
        }
    }

    /// Starts scrolling to a deep-linked post. Drop the handle on teardown.
    pub fn locate(&self, post_id: PostId) -> LocatorHandle {
        PostLocator::spawn(Arc::clone(&self.view), post_id)
    }

    async fn fetch(&mut self, request: PageRequest) -> Result<LoadOutcome> {
        self.state.is_loading = true;
        let result = self.api.fetch_page(&request).await;
        self.state.is_loading = false;

        match result {
            Ok(envelope) => Ok(self.apply_page(FeedPage::from_envelope(envelope, request.page))),
            Err(err) => Err(self.handle_failure(err, request)),
        }
    }

    fn apply_page(&mut self, page: FeedPage) -> LoadOutcome {
        self.state.cursor.advance(&page);
        let FeedPage {
            posts,
            has_next: has_more,
            page_number: number,
        } = page;
        let received = posts.len();

        if number <= 1 {
            self.state.posts = posts;
            if let Err(err) = self.cache.save(&self.state.posts) {
                warn!("Couldn't save feed snapshot: {err}");
            }
        } else {
            self.state.posts.extend(posts);
        }
        self.state.showing_cached = false;
        self.state.last_failure = None;
        self.view.render(&self.state.posts);

        info!("Loaded page {number} ({received} posts, more: {has_more})");
        LoadOutcome::Loaded {
            page: number,
            received,
            has_more,
        }
    }

    fn show_cache(&mut self) -> LoadOutcome {
        self.state.posts = self.cache.load();
        // Paging resumes from page 1 once live data is back.
        self.state.cursor = PaginationCursor::default();
        self.state.showing_cached = true;
        self.view.render(&self.state.posts);
        LoadOutcome::FromCache {
            posts: self.state.posts.len(),
        }
    }

    fn handle_failure(&mut self, err: FetchError, request: PageRequest) -> FeedError {
        match failure_action(&err, self.state.is_offline()) {
            FailureAction::RedirectToLogin => {
                warn!("Session expired while loading page {}", request.page);
                self.view.redirect_to_login();
                FeedError::AuthExpired
            }
            FailureAction::FallBackToCache => {
                warn!("Page {} unavailable ({err}), showing saved posts", request.page);
                self.show_cache();
                self.view.notify(Notification::WentOffline);
                FeedError::Offline(err.to_string())
            }
            FailureAction::OfferRetry => {
                error!("Loading page {} failed: {err}", request.page);
                self.state.last_failure = Some(request);
                self.view.notify(Notification::LoadFailed { request });
                FeedError::Transient(err.to_string())
            }
        }
    }
}
