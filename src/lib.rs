//! Movie catalog client: paged category listings from TMDB, per-movie
//! detail, and locally stored favorites with live observation.

pub mod browse;
pub mod config;
pub mod db;
pub mod detail;
pub mod entities;
pub mod error;
pub mod favorites;
pub mod models;
pub mod paging;
pub mod prefs;
pub mod tmdb;

#[cfg(test)]
mod testing;
