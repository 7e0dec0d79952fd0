use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogMovieDetails, MoviePage, ResultsResponse, Review, Video},
    tmdb::CatalogApi,
};

/// Catalog fed from the JSON fixtures under `tests/fixtures`.
#[derive(Default)]
pub(crate) struct FixtureCatalog {
    pages: HashMap<(String, u32), MoviePage>,
    details: HashMap<i32, CatalogMovieDetails>,
    videos: HashMap<i32, Vec<Video>>,
    reviews: HashMap<i32, Vec<Review>>,
    failing_pages: HashSet<u32>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl FixtureCatalog {
    pub fn popular() -> Self {
        let mut catalog = Self::default();
        catalog.pages.insert(
            ("popular".into(), 1),
            serde_json::from_str(include_str!("../tests/fixtures/popular_page_1.json")).unwrap(),
        );
        catalog.pages.insert(
            ("popular".into(), 2),
            serde_json::from_str(include_str!("../tests/fixtures/popular_page_2.json")).unwrap(),
        );
        catalog.details.insert(
            550,
            serde_json::from_str(include_str!("../tests/fixtures/movie_550.json")).unwrap(),
        );
        catalog.details.insert(
            13,
            serde_json::from_str(include_str!("../tests/fixtures/movie_13_no_genres.json")).unwrap(),
        );
        let videos: ResultsResponse<Video> =
            serde_json::from_str(include_str!("../tests/fixtures/movie_550_videos.json")).unwrap();
        catalog.videos.insert(550, videos.results);
        let reviews: ResultsResponse<Review> =
            serde_json::from_str(include_str!("../tests/fixtures/movie_550_reviews.json")).unwrap();
        catalog.reviews.insert(550, reviews.results);
        catalog
    }

    pub fn with_page(mut self, category: &str, page: MoviePage) -> Self {
        self.pages.insert((category.to_string(), page.page), page);
        self
    }

    pub fn failing_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CatalogApi for FixtureCatalog {
    async fn list_movies(&self, category: &str, page: u32) -> AppResult<MoviePage> {
        self.record(format!("list {category} {page}")).await;
        if self.failing_pages.contains(&page) {
            return Err(AppError::Status { status: 500, message: "fixture failure".into() });
        }
        Ok(self.pages.get(&(category.to_string(), page)).cloned().unwrap_or(MoviePage {
            page,
            results: Vec::new(),
            total_pages: 0,
            total_results: 0,
        }))
    }

    async fn movie_details(&self, movie_id: i32) -> AppResult<CatalogMovieDetails> {
        self.record(format!("details {movie_id}")).await;
        self.details.get(&movie_id).cloned().ok_or(AppError::Status {
            status: 404,
            message: "The resource you requested could not be found.".into(),
        })
    }

    async fn movie_videos(&self, movie_id: i32) -> AppResult<Vec<Video>> {
        self.record(format!("videos {movie_id}")).await;
        Ok(self.videos.get(&movie_id).cloned().unwrap_or_default())
    }

    async fn movie_reviews(&self, movie_id: i32) -> AppResult<Vec<Review>> {
        self.record(format!("reviews {movie_id}")).await;
        Ok(self.reviews.get(&movie_id).cloned().unwrap_or_default())
    }
}
