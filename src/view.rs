use crate::models::{FeedPost, PageRequest, PostId};

pub const POST_ID_PARAM: &str = "postId";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBlock {
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOptions {
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

impl ScrollOptions {
    pub const CENTERED: ScrollOptions = ScrollOptions {
        behavior: ScrollBehavior::Smooth,
        block: ScrollBlock::Center,
    };
}

/// Transient, dismissible messages shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    WentOffline,
    BackOnline,
    LoadFailed { request: PageRequest },
    PostDeleted(PostId),
}

impl Notification {
    pub fn message(&self) -> &'static str {
        match self {
            Notification::WentOffline => "You are offline. Showing saved posts.",
            Notification::BackOnline => "Back online",
            Notification::LoadFailed { .. } => "Could not load posts",
            Notification::PostDeleted(_) => "Post deleted",
        }
    }

    /// Label of the action button, if the message offers one.
    pub fn action(&self) -> Option<&'static str> {
        match self {
            Notification::LoadFailed { .. } => Some("Retry"),
            _ => None,
        }
    }
}

/// The host that renders the feed and owns navigation.
///
/// Calls arrive from the controller and from timer tasks, so implementations
/// keep their own interior state.
pub trait FeedView: Send + Sync {
    fn render(&self, posts: &[FeedPost]);
    fn notify(&self, notification: Notification);
    fn redirect_to_login(&self);

    /// Whether the element for `id` is present in the current render.
    fn has_post_marker(&self, id: PostId) -> bool;
    fn scroll_to_post(&self, id: PostId, options: ScrollOptions);
    fn set_highlight(&self, id: PostId, highlighted: bool);

    /// Rewrites the current URL without pushing a history entry.
    fn replace_query_param(&self, name: &str, value: Option<&str>);
}
