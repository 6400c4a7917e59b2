use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use mbiufun_feed::{
    target_from_query, Config, FeedController, FeedError, FeedPost, FeedView, FileStore,
    HttpFeedApi, LoadOutcome, LocatorState, Notification, PostId, ScrollOptions,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Parser, Debug)]
struct Args {
    /// Backend base URL. Overrides MBIUFUN_API_URL
    /// Ex: http://127.0.0.1:3030
    #[arg(long)]
    api_url: Option<String>,

    /// How many pages to walk through
    #[arg(long, default_value_t = 1)]
    pages: u32,

    /// Only show posts of this activity
    #[arg(long)]
    activity: Option<i64>,

    /// Route query carrying a deep link, e.g. `postId=42`
    #[arg(long)]
    query: Option<String>,

    /// Delete this post after loading
    #[arg(long)]
    delete: Option<i64>,

    /// Start as if the device had no connectivity
    #[arg(long)]
    offline: bool,

    /// How many times to accept the Retry action after a failed load
    #[arg(long, default_value_t = 0)]
    retries: u32,
}

/// Prints the feed to stdout and remembers what is "on screen".
#[derive(Default)]
struct TerminalView {
    on_screen: Mutex<HashSet<PostId>>,
}

impl FeedView for TerminalView {
    fn render(&self, posts: &[FeedPost]) {
        let mut on_screen = self.on_screen.lock().unwrap_or_else(|e| e.into_inner());
        on_screen.clear();
        println!("--- {} posts ---", posts.len());
        for post in posts {
            on_screen.insert(post.id);
            println!(
                "#{:<5} {:<12} {}  {}",
                post.id,
                post.author.username,
                post.created_at.format("%Y-%m-%d %H:%M"),
                post.content
            );
        }
    }

    fn notify(&self, notification: Notification) {
        match notification.action() {
            Some(action) => println!("[{}] ({action})", notification.message()),
            None => println!("[{}]", notification.message()),
        }
    }

    fn redirect_to_login(&self) {
        println!("Session expired, please log in again.");
    }

    fn has_post_marker(&self, id: PostId) -> bool {
        self.on_screen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&id)
    }

    fn scroll_to_post(&self, id: PostId, _options: ScrollOptions) {
        println!(">>> post #{id}");
    }

    fn set_highlight(&self, id: PostId, highlighted: bool) {
        info!("Highlight on post {id}: {highlighted}");
    }

    fn replace_query_param(&self, name: &str, value: Option<&str>) {
        info!("Route query {name} -> {value:?}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match (Config::load_env_config(), &args.api_url) {
        (Ok(config), _) => config,
        (Err(FeedError::Config(_)), Some(url)) => Config::new(url.clone()),
        (Err(err), _) => return Err(err.into()),
    };
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if args.activity.is_some() {
        config.activity = args.activity;
    }

    let view = Arc::new(TerminalView::default());
    let api = HttpFeedApi::new(config.api_url.clone())
        .with_token(config.api_token.clone())
        .with_timeout(config.request_timeout);
    let store = FileStore::new(&config.cache_dir);
    let mut feed = FeedController::with_config(api, store, Arc::clone(&view), !args.offline, &config);

    // Polling starts right away so posts from later pages are still caught.
    let locator = args
        .query
        .as_deref()
        .and_then(target_from_query)
        .map(|post_id| feed.locate(post_id));

    let mut result = feed.start().await;
    let mut retries = args.retries;
    for page in 0..args.pages {
        if page > 0 && result.is_ok() {
            result = feed.load_more().await;
        }
        while retries > 0 && matches!(result, Err(FeedError::Transient(_))) {
            retries -= 1;
            result = feed.retry_last().await;
        }
        match &result {
            Ok(LoadOutcome::Skipped) => break,
            Ok(outcome) => info!("{outcome:?}"),
            Err(FeedError::AuthExpired) => return Ok(()),
            Err(err) => {
                warn!("Stopped paging: {err}");
                break;
            }
        }
    }

    if let Some(id) = args.delete {
        match feed.delete_post(PostId(id)).await {
            Ok(true) => info!("Deleted post {id}"),
            Ok(false) => info!("Post {id} was deleted but wasn't loaded"),
            Err(err) => warn!("Couldn't delete post {id}: {err}"),
        }
    }

    if let Some(locator) = locator {
        match locator.join().await {
            Some(LocatorState::Found(id)) => info!("Deep link to post {id} resolved"),
            Some(state) => info!("Deep link not resolved: {state:?}"),
            None => warn!("Deep link search was cancelled"),
        }
    }
    Ok(())
}
