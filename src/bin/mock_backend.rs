use chrono::{Duration, TimeZone, Utc};
use clap::Parser;
use env_logger::Env;
use log::info;
use mbiufun_feed::{AuthorRef, FeedEnvelope, FeedPost, PostId};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

#[derive(Parser, Debug)]
struct Args {
    /// Port to serve the fixture backend on
    #[arg(long, default_value_t = 3030)]
    port: u16,

    /// Number of fixture posts
    #[arg(long, default_value_t = 45)]
    posts: i64,

    /// Require `Authorization: Bearer <token>`; other requests get a 401
    #[arg(long)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedQuery {
    page: Option<u32>,
    page_size: Option<u32>,
    activity_id: Option<i64>,
}

#[derive(Debug, Clone)]
struct StoredPost {
    activity: i64,
    post: FeedPost,
}

#[derive(Clone)]
struct Backend {
    posts: Arc<Mutex<Vec<StoredPost>>>,
    token: Option<String>,
    address: SocketAddr,
}

impl Backend {
    fn authorized(&self, header: Option<String>) -> bool {
        match &self.token {
            Some(token) => header.as_deref() == Some(format!("Bearer {token}").as_str()),
            None => true,
        }
    }
}

fn fixture_posts(count: i64) -> Vec<StoredPost> {
    let newest = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).single().unwrap_or_else(Utc::now);
    (1..=count)
        .rev()
        .map(|id| StoredPost {
            activity: id % 3 + 1,
            post: FeedPost {
                id: PostId(id),
                content: format!("Dare #{id} completed"),
                media: (id % 4 == 0).then(|| format!("/media/{id}.jpg")),
                created_at: newest - Duration::minutes(count - id),
                author: AuthorRef {
                    id: id % 5 + 1,
                    username: format!("player{}", id % 5 + 1),
                    avatar: None,
                },
            },
        })
        .collect()
}

/// Index range of `page` within `len` items, clamped to the collection.
fn page_window(page: u32, page_size: u32, len: usize) -> (usize, usize) {
    let size = page_size as usize;
    let start = (page.saturating_sub(1) as usize).saturating_mul(size).min(len);
    let end = start.saturating_add(size).min(len);
    (start, end)
}

fn unauthorized() -> Response {
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "detail": "Invalid token." })),
        StatusCode::UNAUTHORIZED,
    )
    .into_response()
}

async fn get_feed(
    query: FeedQuery,
    auth: Option<String>,
    backend: Backend,
) -> Result<Response, warp::Rejection> {
    if !backend.authorized(auth) {
        return Ok(unauthorized());
    }
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).max(1);

    let posts = backend.posts.lock().await;
    let matching: Vec<FeedPost> = posts
        .iter()
        .filter(|stored| query.activity_id.map_or(true, |a| a == stored.activity))
        .map(|stored| stored.post.clone())
        .collect();

    let (start, end) = page_window(page, page_size, matching.len());
    let results = matching[start..end].to_vec();
    let next = (end < matching.len()).then(|| {
        let mut next = format!(
            "http://{}/feed?page={}&page_size={}",
            backend.address,
            page.saturating_add(1),
            page_size
        );
        if let Some(activity) = query.activity_id {
            next.push_str(&format!("&activity_id={activity}"));
        }
        next
    });

    Ok(warp::reply::json(&FeedEnvelope { results, next }).into_response())
}

async fn delete_post(
    id: i64,
    auth: Option<String>,
    backend: Backend,
) -> Result<Response, warp::Rejection> {
    if !backend.authorized(auth) {
        return Ok(unauthorized());
    }
    let mut posts = backend.posts.lock().await;
    let before = posts.len();
    posts.retain(|stored| stored.post.id != PostId(id));
    let status = if posts.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    };
    Ok(warp::reply::with_status(warp::reply(), status).into_response())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let address = SocketAddr::from(([127, 0, 0, 1], args.port));
    let backend = Backend {
        posts: Arc::new(Mutex::new(fixture_posts(args.posts))),
        token: args.token,
        address,
    };
    let with_backend = warp::any().map(move || backend.clone());

    let feed = warp::path("feed")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<FeedQuery>())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_backend.clone())
        .and_then(get_feed);

    let delete = warp::path!("feed" / i64)
        .and(warp::delete())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_backend)
        .and_then(delete_post);

    info!("Serving fixture feed on {address}");

    let routes = feed.or(delete).with(warp::log::custom(|info| {
        let method = info.method();
        let path = info.path();
        let status = info.status();
        let elapsed = info.elapsed().as_millis();

        if status.is_success() {
            info!(
                "Method: {}, Path: {}, Status: {}, Elapsed Time: {}ms",
                method, path, status, elapsed
            );
        } else {
            log::error!(
                "Method: {}, Path: {}, Status: {}, Elapsed Time: {}ms",
                method,
                path,
                status,
                elapsed,
            );
        }
    }));
    warp::serve(routes).run(address).await;
}
