use std::{fmt, str::FromStr};

use jiff::civil::Date;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

/// Server-side listing filter. `Favorites` is served from the local store
/// and has no catalog endpoint.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCriteria {
    #[default]
    Popular,
    TopRated,
    NowPlaying,
    Upcoming,
    Favorites,
}

impl SortCriteria {
    pub const ALL: [SortCriteria; 5] = [
        SortCriteria::Popular,
        SortCriteria::TopRated,
        SortCriteria::NowPlaying,
        SortCriteria::Upcoming,
        SortCriteria::Favorites,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortCriteria::Popular => "popular",
            SortCriteria::TopRated => "top_rated",
            SortCriteria::NowPlaying => "now_playing",
            SortCriteria::Upcoming => "upcoming",
            SortCriteria::Favorites => "favorites",
        }
    }

    /// Path segment under `movie/` for catalog-backed criteria.
    pub fn catalog_path(self) -> Option<&'static str> {
        match self {
            SortCriteria::Favorites => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for SortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortCriteria {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase().replace('-', "_");
        SortCriteria::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::Config(format!("unknown sort criteria `{s}`")))
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CatalogMovie {
    pub id: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MoviePage {
    pub page: u32,
    #[serde(default)]
    pub results: Vec<CatalogMovie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CastMember {
    pub id: i32,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub character: String,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CrewMember {
    pub id: i32,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub job: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub department: String,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

impl Credits {
    pub fn directors(&self) -> impl Iterator<Item = &CrewMember> {
        self.crew.iter().filter(|c| c.job == "Director")
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CatalogMovieDetails {
    #[serde(flatten)]
    pub movie: CatalogMovie,
    #[serde(default, deserialize_with = "null_as_default")]
    pub budget: i64,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub revenue: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_count: u32,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub credits: Credits,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Video {
    pub id: String,
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub size: u32,
}

impl Video {
    pub fn is_trailer(&self) -> bool {
        self.kind == "Trailer"
    }

    pub fn youtube_url(&self) -> Option<String> {
        (self.site == "YouTube").then(|| format!("https://www.youtube.com/watch?v={}", self.key))
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Review {
    pub id: String,
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultsResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageSize {
    Poster,
    Backdrop,
    Original,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Poster => "w185",
            ImageSize::Backdrop => "w780",
            ImageSize::Original => "original",
        }
    }
}

/// Full image URL for a catalog path fragment such as `/kqjL17yufvn9OVLyXYpvtyrFfak.jpg`.
pub fn image_url(base_url: &str, path: &str, size: ImageSize) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), size.as_str(), path.trim_start_matches('/'))
}

/// `Some(139)` renders as `2h 19m`; unknown or zero runtimes render empty.
pub fn format_runtime(minutes: Option<u32>) -> String {
    match minutes {
        None | Some(0) => String::new(),
        Some(m) if m < 60 => format!("{m}m"),
        Some(m) => format!("{}h {}m", m / 60, m % 60),
    }
}

pub fn release_year(release_date: &str) -> String {
    release_date.trim().parse::<Date>().map(|d| d.year().to_string()).unwrap_or_default()
}

pub fn genre_list(genres: &[Genre]) -> String {
    genres.iter().map(|g| g.name.as_str()).collect::<Vec<_>>().join(", ")
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
