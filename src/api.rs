use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

use crate::error::FetchError;
use crate::models::{FeedEnvelope, PageRequest, PostId};

/// The REST backend the feed is read from.
pub trait FeedApi {
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl std::future::Future<Output = Result<FeedEnvelope, FetchError>> + Send;
    fn delete_post(
        &self,
        id: PostId,
    ) -> impl std::future::Future<Output = Result<(), FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpFeedApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpFeedApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpFeedApi {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout: crate::config::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Upper bound for a whole request, body included. A backend that never
    /// answers fails with `FetchError::Transient` once it elapses.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.timeout(self.timeout);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

impl FeedApi for HttpFeedApi {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FeedEnvelope, FetchError> {
        let url = format!("{}/feed", self.base_url);
        debug!("GET {url} page={} size={}", request.page, request.page_size);
        let response = self
            .prepare(self.client.get(url).query(&request.query_pairs()))
            .send()
            .await
            .map_err(classify_transport)?;
        check_status(response.status())?;
        response
            .json::<FeedEnvelope>()
            .await
            .map_err(|err| FetchError::Transient(format!("invalid feed body: {err}")))
    }

    async fn delete_post(&self, id: PostId) -> Result<(), FetchError> {
        let url = format!("{}/feed/{}", self.base_url, id);
        debug!("DELETE {url}");
        let response = self
            .prepare(self.client.delete(url))
            .send()
            .await
            .map_err(classify_transport)?;
        check_status(response.status())
    }
}

fn check_status(status: StatusCode) -> Result<(), FetchError> {
    if status == StatusCode::UNAUTHORIZED {
        Err(FetchError::Unauthorized)
    } else if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Transient(format!("server answered {status}")))
    }
}

fn classify_transport(err: reqwest::Error) -> FetchError {
    // Only a failed connect counts as offline; timeouts stay transient.
    if err.is_connect() {
        FetchError::NotConnected(err.to_string())
    } else {
        FetchError::Transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            check_status(StatusCode::UNAUTHORIZED),
            Err(FetchError::Unauthorized)
        );
        assert_eq!(check_status(StatusCode::NO_CONTENT), Ok(()));
        assert!(matches!(
            check_status(StatusCode::INTERNAL_SERVER_ERROR),
            Err(FetchError::Transient(_))
        ));
        assert!(matches!(
            check_status(StatusCode::FORBIDDEN),
            Err(FetchError::Transient(_))
        ));
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let api = HttpFeedApi::new("http://api.test/");
        assert_eq!(api.base_url, "http://api.test");
    }
}
