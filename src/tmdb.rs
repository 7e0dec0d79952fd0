use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    error::{AppError, AppResult},
    models::{CatalogMovieDetails, MoviePage, ResultsResponse, Review, Video},
};

/// Remote movie catalog. Implemented by [`TmdbClient`] and by fakes in tests.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// One page of a category listing such as `popular` or `top_rated`.
    async fn list_movies(&self, category: &str, page: u32) -> AppResult<MoviePage>;

    /// Movie details with credits appended.
    async fn movie_details(&self, movie_id: i32) -> AppResult<CatalogMovieDetails>;

    async fn movie_videos(&self, movie_id: i32) -> AppResult<Vec<Video>>;

    async fn movie_reviews(&self, movie_id: i32) -> AppResult<Vec<Review>>;
}

pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        language: String,
        rps: u32,
    ) -> Self {
        if api_key.trim().is_empty() {
            warn!("no TMDB_API_KEY provided, catalog requests will be rejected");
        }

        let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(RateLimiter::direct(quota));
        Self { client, api_key, base_url, language, limiter }
    }

    /// Connectivity check. Any HTTP response, even an error status, counts as
    /// reachable.
    pub async fn is_reachable(&self) -> bool {
        match self.client.get(self.url("configuration")).send().await {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, "catalog unreachable");
                !(err.is_connect() || err.is_timeout())
            },
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, String)],
    ) -> AppResult<T> {
        self.limiter.until_ready().await;

        let url = self.url(path);
        debug!(%url, "catalog request");

        let resp = self
            .client
            .get(url)
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
            .query(extra)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "catalog rejected the API key");
            return Err(AppError::InvalidApiKey);
        }
        if !status.is_success() {
            let message = resp
                .json::<ErrorBody>()
                .await
                .map(|b| b.status_message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
            return Err(AppError::Status { status: status.as_u16(), message });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn list_movies(&self, category: &str, page: u32) -> AppResult<MoviePage> {
        self.get_json(&format!("movie/{category}"), &[("page", page.to_string())]).await
    }

    async fn movie_details(&self, movie_id: i32) -> AppResult<CatalogMovieDetails> {
        self.get_json(
            &format!("movie/{movie_id}"),
            &[("append_to_response", "credits".to_string())],
        )
        .await
    }

    async fn movie_videos(&self, movie_id: i32) -> AppResult<Vec<Video>> {
        let resp: ResultsResponse<Video> =
            self.get_json(&format!("movie/{movie_id}/videos"), &[]).await?;
        Ok(resp.results)
    }

    async fn movie_reviews(&self, movie_id: i32) -> AppResult<Vec<Review>> {
        let resp: ResultsResponse<Review> =
            self.get_json(&format!("movie/{movie_id}/reviews"), &[("page", "1".to_string())]).await?;
        Ok(resp.results)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> TmdbClient {
        TmdbClient::new(
            reqwest::Client::new(),
            "key".into(),
            base_url.into(),
            "en-US".into(),
            0,
        )
    }

    #[test]
    fn url_joins_base_and_path() {
        let tmdb = client("https://api.themoviedb.org/3/");
        assert_eq!(tmdb.url("movie/popular"), "https://api.themoviedb.org/3/movie/popular");
        assert_eq!(tmdb.url("/movie/550/videos"), "https://api.themoviedb.org/3/movie/550/videos");
    }

    #[test]
    fn popular_fixture_parses_in_server_order() {
        let page: MoviePage =
            serde_json::from_str(include_str!("../tests/fixtures/popular_page_1.json")).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        let ids: Vec<i32> = page.results.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![550, 680, 13]);
    }

    #[test]
    fn details_fixture_includes_credits() {
        let details: CatalogMovieDetails =
            serde_json::from_str(include_str!("../tests/fixtures/movie_550.json")).unwrap();
        assert_eq!(details.movie.id, 550);
        assert_eq!(details.runtime, Some(139));
        assert_eq!(details.credits.cast[0].name, "Edward Norton");
        assert_eq!(details.credits.directors().next().map(|d| d.name.as_str()), Some("David Fincher"));
    }

    #[test]
    fn videos_and_reviews_fixtures_parse() {
        let videos: ResultsResponse<Video> =
            serde_json::from_str(include_str!("../tests/fixtures/movie_550_videos.json")).unwrap();
        assert_eq!(videos.results.len(), 2);
        assert_eq!(videos.results.iter().filter(|v| v.is_trailer()).count(), 1);

        let reviews: ResultsResponse<Review> =
            serde_json::from_str(include_str!("../tests/fixtures/movie_550_reviews.json")).unwrap();
        assert_eq!(reviews.results[0].author, "Goddard");
    }

    #[test]
    fn error_body_message() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key.","success":false}"#,
        )
        .unwrap();
        assert!(body.status_message.starts_with("Invalid API key"));
    }

    /// Serves one canned HTTP response and hands back the request head.
    async fn canned(status: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });

        (format!("http://{addr}/3"), server)
    }

    #[tokio::test]
    async fn success_sends_key_and_language() {
        let (base, server) =
            canned("200 OK", include_str!("../tests/fixtures/popular_page_1.json")).await;

        let page = client(&base).list_movies("popular", 2).await.unwrap();
        let ids: Vec<i32> = page.results.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![550, 680, 13]);

        let head = server.await.unwrap();
        let request_line = head.lines().next().unwrap();
        assert!(request_line.starts_with("GET /3/movie/popular?"), "{request_line}");
        assert!(request_line.contains("api_key=key"), "{request_line}");
        assert!(request_line.contains("language=en-US"), "{request_line}");
        assert!(request_line.contains("page=2"), "{request_line}");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_invalid_api_key() {
        let (base, _server) = canned(
            "401 Unauthorized",
            r#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key.","success":false}"#,
        )
        .await;

        let err = client(&base).list_movies("popular", 1).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidApiKey), "{err:?}");
        assert!(!err.is_offline());
    }

    #[tokio::test]
    async fn error_status_carries_catalog_message() {
        let (base, _server) = canned(
            "404 Not Found",
            r#"{"status_code":34,"status_message":"The resource you requested could not be found.","success":false}"#,
        )
        .await;

        let err = client(&base).movie_details(42).await.unwrap_err();
        match err {
            AppError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "The resource you requested could not be found.");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_status_without_json_uses_reason_phrase() {
        let (base, _server) = canned("503 Service Unavailable", "upstream down").await;

        let err = client(&base).movie_videos(550).await.unwrap_err();
        assert!(
            matches!(&err, AppError::Status { status: 503, message } if message == "Service Unavailable"),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn any_response_counts_as_reachable() {
        let (base, _server) = canned("404 Not Found", "{}").await;
        assert!(client(&base).is_reachable().await);
    }

    #[tokio::test]
    async fn unreachable_catalog_is_offline() {
        // Nothing listens on port 9 locally.
        let tmdb = client("http://127.0.0.1:9/3");
        let err = tmdb.list_movies("popular", 1).await.unwrap_err();
        assert!(err.is_offline(), "{err:?}");
        assert!(!tmdb.is_reachable().await);
    }
}
