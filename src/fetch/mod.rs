//! Fetch Module
//!
//! The `Fetcher` seam between the refresh cache and the upstream sites, and
//! the scrapers implementing it for each resource.
//!
//! Fetchers do one attempt and never retry; timeouts and retries are applied
//! by the cache around every call.

mod details;
mod fixtures;
mod la14hd;
mod standings;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Selector};
use serde_json::Value;
use thiserror::Error;

use crate::resource::ResourceId;

pub use details::{DetailsFetcher, MatchDetails};
pub use fixtures::{Fixture, FixturesFetcher, League};
pub use la14hd::{slug, ChannelsFetcher, EventsFetcher};
pub use standings::{StandingRow, StandingsFetcher};

/// Browser user agent sent with every upstream request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

// == Fetch Error ==
/// Typed failure of a single fetch attempt.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport failure talking to the upstream site
    #[error("HTTP error: {0}")]
    Http(String),

    /// Upstream answered with a non-success status
    #[error("Upstream returned status {0}")]
    Status(u16),

    /// The page did not contain the structure the extractor expects
    #[error("Extraction incomplete: {0}")]
    ExtractionIncomplete(String),

    /// The response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// A CSS selector failed to parse
    #[error("Invalid selector {0}")]
    InvalidSelector(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() || err.is_body() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

// == Fetcher Trait ==
/// Produces a fresh payload for a resource.
///
/// Implementations must leave no external state behind on failure.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, id: &ResourceId) -> Result<Value, FetchError>;
}

// == Day ==
/// Day offset of a fixtures page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Day {
    Yesterday,
    Today,
    Tomorrow,
}

impl Day {
    pub const ALL: [Day; 3] = [Day::Today, Day::Yesterday, Day::Tomorrow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Yesterday => "yesterday",
            Day::Today => "today",
            Day::Tomorrow => "tomorrow",
        }
    }

    /// Path of the day's page relative to the fixtures site root.
    pub fn path(&self) -> &'static str {
        match self {
            Day::Yesterday => "ayer",
            Day::Today => "",
            Day::Tomorrow => "man",
        }
    }

    /// Parses an English day name or the upstream site's path alias.
    pub fn parse(raw: &str) -> Option<Day> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "today" | "hoy" => Some(Day::Today),
            "yesterday" | "ayer" => Some(Day::Yesterday),
            "tomorrow" | "man" => Some(Day::Tomorrow),
            _ => None,
        }
    }
}

// == Shared helpers ==

/// Builds the HTTP client shared by every fetcher.
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Downloads a page and returns its body, failing on non-success statuses.
pub(crate) async fn get_html(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::Status(response.status().as_u16()));
    }

    Ok(response.text().await?)
}

/// Joins a site root and a relative path with exactly one slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub(crate) fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|err| FetchError::InvalidSelector(format!("{css}: {err:?}")))
}

/// Visible text of an element with whitespace collapsed.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match of `selector` under `element`, if any.
pub(crate) fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element.select(selector).next().map(text_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_day_parse_aliases() {
        assert_eq!(Day::parse("ayer"), Some(Day::Yesterday));
        assert_eq!(Day::parse("Tomorrow"), Some(Day::Tomorrow));
        assert_eq!(Day::parse("hoy"), Some(Day::Today));
        assert_eq!(Day::parse(""), Some(Day::Today));
        assert_eq!(Day::parse("next-week"), None);
    }

    #[test]
    fn test_day_paths() {
        assert_eq!(Day::Today.path(), "");
        assert_eq!(Day::Yesterday.path(), "ayer");
        assert_eq!(Day::Tomorrow.path(), "man");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.com/", "/game/1"), "https://a.com/game/1");
        assert_eq!(join_url("https://a.com", "man"), "https://a.com/man");
        assert_eq!(join_url("https://a.com/", ""), "https://a.com/");
    }

    #[test]
    fn test_text_of_collapses_whitespace() {
        let html = Html::parse_fragment("<p>  River \n <b>Plate</b>  </p>");
        let p = selector("p").unwrap();
        let element = html.select(&p).next().unwrap();
        assert_eq!(text_of(element), "River Plate");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            selector("div[[["),
            Err(FetchError::InvalidSelector(_))
        ));
    }
}
