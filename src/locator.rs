//! Scrolls a deep-linked post into view once it shows up in the render.
//!
//! The locator polls the view a bounded number of times, so posts that arrive
//! with a later page are still found as long as they land within the window.

use log::{debug, info, warn};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::models::PostId;
use crate::view::{FeedView, ScrollOptions, POST_ID_PARAM};

pub const MAX_ATTEMPTS: u32 = 10;
pub const RETRY_DELAY: Duration = Duration::from_millis(500);
pub const HIGHLIGHT_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorState {
    Idle,
    Searching {
        post_id: PostId,
        attempts_remaining: u32,
    },
    Found(PostId),
    Exhausted(PostId),
}

impl LocatorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LocatorState::Found(_) | LocatorState::Exhausted(_))
    }
}

#[derive(Debug)]
pub struct PostLocator {
    state: LocatorState,
}

impl Default for PostLocator {
    fn default() -> Self {
        PostLocator {
            state: LocatorState::Idle,
        }
    }
}

impl PostLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn searching(post_id: PostId) -> Self {
        let mut locator = Self::new();
        locator.start(post_id);
        locator
    }

    pub fn state(&self) -> LocatorState {
        self.state
    }

    /// The post still being looked for, if any.
    pub fn target(&self) -> Option<PostId> {
        match self.state {
            LocatorState::Searching { post_id, .. } => Some(post_id),
            _ => None,
        }
    }

    pub fn start(&mut self, post_id: PostId) {
        info!("Looking for deep-linked post {post_id}");
        self.state = LocatorState::Searching {
            post_id,
            attempts_remaining: MAX_ATTEMPTS,
        };
    }

    /// Makes one lookup attempt. Must run inside a tokio runtime since a hit
    /// schedules the highlight removal.
    pub fn step<V: FeedView + 'static>(&mut self, view: &Arc<V>) -> LocatorState {
        let LocatorState::Searching {
            post_id,
            attempts_remaining,
        } = self.state
        else {
            return self.state;
        };

        let attempts_remaining = attempts_remaining.saturating_sub(1);
        self.state = if view.has_post_marker(post_id) {
            reveal(view, post_id);
            LocatorState::Found(post_id)
        } else if attempts_remaining == 0 {
            warn!("Post {post_id} never appeared after {MAX_ATTEMPTS} attempts");
            LocatorState::Exhausted(post_id)
        } else {
            debug!("Post {post_id} not rendered yet, {attempts_remaining} attempts left");
            LocatorState::Searching {
                post_id,
                attempts_remaining,
            }
        };
        self.state
    }

    /// Attempts until the post is found or the attempts run out.
    pub async fn run<V: FeedView + 'static>(&mut self, view: &Arc<V>) -> LocatorState {
        loop {
            let state = self.step(view);
            if !matches!(state, LocatorState::Searching { .. }) {
                return state;
            }
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }

    /// Runs the search on the runtime. Dropping the handle stops it.
    pub fn spawn<V: FeedView + 'static>(view: Arc<V>, post_id: PostId) -> LocatorHandle {
        let handle = tokio::spawn(async move {
            let mut locator = PostLocator::searching(post_id);
            locator.run(&view).await
        });
        LocatorHandle {
            handle: Some(handle),
        }
    }
}

fn reveal<V: FeedView + 'static>(view: &Arc<V>, post_id: PostId) {
    info!("Scrolling to post {post_id}");
    view.scroll_to_post(post_id, ScrollOptions::CENTERED);
    view.set_highlight(post_id, true);
    view.replace_query_param(POST_ID_PARAM, None);

    // Detached on purpose: the highlight clears even if the page goes away.
    let view = Arc::clone(view);
    tokio::spawn(async move {
        tokio::time::sleep(HIGHLIGHT_DURATION).await;
        view.set_highlight(post_id, false);
    });
}

/// Owner of a running search. Aborts the pending timer when dropped.
#[derive(Debug)]
pub struct LocatorHandle {
    handle: Option<JoinHandle<LocatorState>>,
}

impl LocatorHandle {
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the outcome. `None` if the search was cancelled.
    pub async fn join(mut self) -> Option<LocatorState> {
        let handle = self.handle.take()?;
        handle.await.ok()
    }
}

impl Drop for LocatorHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Reads the `postId` parameter out of a route query string.
pub fn target_from_query(query: &str) -> Option<PostId> {
    let mut route = Url::parse("http://route.local/").ok()?;
    route.set_query(Some(query.trim_start_matches('?')));
    let value = route
        .query_pairs()
        .find(|(key, _)| key == POST_ID_PARAM)
        .map(|(_, value)| value.into_owned())?;
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::recording::{RecordingView, ViewCall};
    use tokio::time::Instant;

    #[test]
    fn query_parsing() {
        assert_eq!(target_from_query("?postId=42"), Some(PostId(42)));
        assert_eq!(target_from_query("tab=feed&postId=7"), Some(PostId(7)));
        assert_eq!(target_from_query("postId=%34%32"), Some(PostId(42)));
        assert_eq!(target_from_query("?tab=a%26b&postId=+9"), Some(PostId(9)));
        assert_eq!(target_from_query("postId=abc"), None);
        assert_eq!(target_from_query("tab=feed"), None);
        assert_eq!(target_from_query(""), None);
    }

    #[test]
    fn idle_locator_has_no_target() {
        let locator = PostLocator::new();
        assert_eq!(locator.state(), LocatorState::Idle);
        assert_eq!(locator.target(), None);
        assert!(!locator.state().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn rendered_post_is_found_on_first_attempt() {
        let view = Arc::new(RecordingView::default());
        view.add_marker(PostId(5));

        let mut locator = PostLocator::searching(PostId(5));
        assert_eq!(locator.target(), Some(PostId(5)));
        let state = locator.step(&view);

        assert_eq!(state, LocatorState::Found(PostId(5)));
        assert_eq!(locator.target(), None);
        assert_eq!(view.lookups(), 1);
        assert_eq!(
            view.calls(),
            vec![
                ViewCall::Scroll(PostId(5), ScrollOptions::CENTERED),
                ViewCall::Highlight(PostId(5), true),
                ViewCall::ReplaceQuery(POST_ID_PARAM.to_string(), None),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn highlight_is_removed_after_three_seconds() {
        let view = Arc::new(RecordingView::default());
        view.add_marker(PostId(5));
        PostLocator::searching(PostId(5)).step(&view);

        tokio::time::sleep(HIGHLIGHT_DURATION - Duration::from_millis(10)).await;
        assert!(!view
            .calls()
            .contains(&ViewCall::Highlight(PostId(5), false)));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            view.calls().last(),
            Some(&ViewCall::Highlight(PostId(5), false))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_post_exhausts_after_ten_spaced_attempts() {
        let view = Arc::new(RecordingView::default());
        let started = Instant::now();

        let state = PostLocator::searching(PostId(99)).run(&view).await;

        assert_eq!(state, LocatorState::Exhausted(PostId(99)));
        assert_eq!(view.lookups(), MAX_ATTEMPTS);
        assert_eq!(started.elapsed(), RETRY_DELAY * (MAX_ATTEMPTS - 1));
        assert!(view.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn post_rendered_later_is_picked_up() {
        let view = Arc::new(RecordingView::default());
        let late = Arc::clone(&view);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1200)).await;
            late.add_marker(PostId(8));
        });

        let state = PostLocator::searching(PostId(8)).run(&view).await;

        assert_eq!(state, LocatorState::Found(PostId(8)));
        assert_eq!(view.lookups(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_states_ignore_further_steps() {
        let view = Arc::new(RecordingView::default());
        let mut locator = PostLocator::searching(PostId(1));
        locator.run(&view).await;
        assert_eq!(locator.step(&view), LocatorState::Exhausted(PostId(1)));
        assert_eq!(view.lookups(), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_timer() {
        let view = Arc::new(RecordingView::default());
        let handle = PostLocator::spawn(Arc::clone(&view), PostId(3));

        tokio::time::sleep(Duration::from_millis(1200)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(view.lookups(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_search_reports_outcome() {
        let view = Arc::new(RecordingView::default());
        view.add_marker(PostId(4));
        let handle = PostLocator::spawn(Arc::clone(&view), PostId(4));
        assert_eq!(handle.join().await, Some(LocatorState::Found(PostId(4))));
    }
}
