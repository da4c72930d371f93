//! Headline ingestion client for NewsPulse
//!
//! This crate provides:
//! - NewsAPI `top-headlines` client (primary upstream)
//! - `HeadlineSource` trait the scheduler polls through
//! - `DisabledSource` used when no API key is configured

pub mod error;
pub mod newsapi;
pub mod source;
pub mod types;

pub use error::NewsError;
pub use newsapi::{NewsApiClient, DEFAULT_BASE_URL, HEADLINE_PAGE_SIZE};
pub use source::{DisabledSource, HeadlineSource};
pub use types::{NewsApiArticle, NewsApiResponse, NewsApiSource};
