use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PostId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(PostId)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A single feed entry as served by `GET /feed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: PostId,
    pub content: String,
    #[serde(default)]
    pub media: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: AuthorRef,
}

/// Response envelope of `GET /feed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEnvelope {
    pub results: Vec<FeedPost>,
    #[serde(default)]
    pub next: Option<String>,
}

impl FeedEnvelope {
    /// More pages exist whenever the backend hands out a `next` pointer,
    /// regardless of how many results came back.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub posts: Vec<FeedPost>,
    pub has_next: bool,
    pub page_number: u32,
}

impl FeedPage {
    pub fn from_envelope(envelope: FeedEnvelope, page_number: u32) -> Self {
        let has_next = envelope.has_next();
        FeedPage {
            posts: envelope.results,
            has_next,
            page_number,
        }
    }
}

/// Parameters of one fetch. Retries reuse the exact same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub activity: Option<i64>,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32, activity: Option<i64>) -> Self {
        PageRequest {
            page: page.max(1),
            page_size,
            activity,
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(activity) = self.activity {
            pairs.push(("activity_id", activity.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub current_page: u32,
    pub has_more: bool,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        PaginationCursor {
            current_page: 1,
            has_more: false,
        }
    }
}

impl PaginationCursor {
    pub(crate) fn advance(&mut self, page: &FeedPage) {
        self.current_page = page.page_number.max(1);
        self.has_more = page.has_next;
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn post(id: i64) -> FeedPost {
        FeedPost {
            id: PostId(id),
            content: format!("post #{id}"),
            media: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            author: AuthorRef {
                id: 1,
                username: "dare_master".to_string(),
                avatar: None,
            },
        }
    }

    pub(crate) fn envelope(ids: &[i64], next: Option<&str>) -> FeedEnvelope {
        FeedEnvelope {
            results: ids.iter().copied().map(post).collect(),
            next: next.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::envelope;
    use super::*;

    #[test]
    fn has_next_follows_next_pointer_not_result_count() {
        assert!(envelope(&[], Some("p=2")).has_next());
        assert!(!envelope(&[1, 2, 3], None).has_next());
    }

    #[test]
    fn envelope_deserializes_backend_shape() {
        let raw = r#"{
            "results": [{
                "id": 5,
                "content": "first dare done",
                "created_at": "2024-05-01T12:00:00Z",
                "author": {"id": 3, "username": "kemi"}
            }],
            "next": "https://api.mbiufun.test/feed?page=2"
        }"#;
        let envelope: FeedEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.results[0].id, PostId(5));
        assert_eq!(envelope.results[0].media, None);
        assert!(envelope.has_next());
    }

    #[test]
    fn page_request_omits_missing_activity_filter() {
        let pairs = PageRequest::new(2, 20, None).query_pairs();
        assert_eq!(
            pairs,
            vec![("page", "2".to_string()), ("page_size", "20".to_string())]
        );
        let filtered = PageRequest::new(0, 10, Some(7));
        assert_eq!(filtered.page, 1);
        assert_eq!(filtered.query_pairs()[2], ("activity_id", "7".to_string()));
    }

    #[test]
    fn post_id_parses_query_values() {
        assert_eq!(" 42 ".parse::<PostId>().unwrap(), PostId(42));
        assert!("abc".parse::<PostId>().is_err());
    }
}
