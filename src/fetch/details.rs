//! Match details scraper: calendar events, stat lines and lineups of every
//! match listed on a day's fixtures page.

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::fixtures::parse_fixtures;
use super::{get_html, join_url, selector, text_of, Day, FetchError, Fetcher};
use crate::resource::ResourceId;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub text: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Lineups {
    pub home: Vec<String>,
    pub away: Vec<String>,
}

/// Everything scraped from one match page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchDetails {
    pub calendar: Vec<CalendarEvent>,
    pub stats: Vec<String>,
    pub lineups: Lineups,
}

/// Details of one fixture; a failing match page sets `error` instead.
#[derive(Debug, Clone, Serialize)]
struct DetailsEntry {
    href: String,
    home: String,
    away: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<MatchDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// == Details Fetcher ==
pub struct DetailsFetcher {
    client: Client,
    site_root: String,
    day: Day,
}

impl DetailsFetcher {
    pub fn new(client: Client, site_root: &str, day: Day) -> Self {
        Self {
            client,
            site_root: site_root.to_string(),
            day,
        }
    }
}

#[async_trait]
impl Fetcher for DetailsFetcher {
    async fn fetch(&self, id: &ResourceId) -> Result<Value, FetchError> {
        let day_url = join_url(&self.site_root, self.day.path());
        let day_page = get_html(&self.client, &day_url).await?;

        let matches: Vec<(String, String, String)> = parse_fixtures(&day_page, &self.site_root)?
            .into_iter()
            .flat_map(|league| league.fixtures)
            .filter_map(|fixture| Some((fixture.href?, fixture.home, fixture.away)))
            .collect();

        debug!(resource = %id, matches = matches.len(), "Scraping match pages");

        let mut entries = Vec::with_capacity(matches.len());
        for (href, home, away) in matches {
            let url = join_url(&self.site_root, &href);
            let outcome = match get_html(&self.client, &url).await {
                Ok(page) => parse_match_page(&page),
                Err(err) => Err(err),
            };

            let (details, error) = match outcome {
                Ok(details) => (Some(details), None),
                Err(err) => {
                    warn!(resource = %id, %url, error = %err, "Match page skipped");
                    (None, Some(err.to_string()))
                }
            };

            entries.push(DetailsEntry {
                href,
                home,
                away,
                details,
                error,
            });
        }

        Ok(json!({ "matches": entries.len(), "details": entries }))
    }
}

// == Parsing ==

/// Extracts the details sections of a match page.
///
/// Fails only when none of the sections exist. Lineups fall back to splitting
/// the flat player list in halves, and identical home/away lineups are
/// treated as a scraping artifact and cleared.
pub(crate) fn parse_match_page(html: &str) -> Result<MatchDetails, FetchError> {
    let document = Html::parse_document(html);
    let sections = selector(".events-items, .content-block, .team-lineups")?;
    let calendar_item = selector(".events-items .calendario-events__items")?;
    let icon = selector("img")?;
    let stat = selector(".content-block.min .content-block__body .stats_item__4HYCD")?;
    let home_players = selector(".team-lineups .team-lineup:first-child .player-name")?;
    let away_players = selector(".team-lineups .team-lineup:last-child .player-name")?;
    let flat_players = selector(".player_player__name__ZrMOH")?;

    if document.select(&sections).next().is_none() {
        return Err(FetchError::ExtractionIncomplete(
            "match page has no detail sections".to_string(),
        ));
    }

    let calendar = document
        .select(&calendar_item)
        .filter_map(|item| {
            let text = text_of(item);
            let image = item
                .select(&icon)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(str::to_string);
            (!text.is_empty() || image.is_some()).then_some(CalendarEvent { text, image })
        })
        .collect();

    let stats = document
        .select(&stat)
        .map(text_of)
        .filter(|line| !line.is_empty())
        .collect();

    let names = |sel: &scraper::Selector| -> Vec<String> {
        document
            .select(sel)
            .map(text_of)
            .filter(|name| !name.is_empty())
            .collect()
    };

    let mut lineups = Lineups {
        home: names(&home_players),
        away: names(&away_players),
    };

    if lineups.home.is_empty() && lineups.away.is_empty() {
        let all = names(&flat_players);
        let half = all.len() / 2;
        lineups.home = all[..half].to_vec();
        lineups.away = all[half..].to_vec();
    }

    if !lineups.home.is_empty() && lineups.home == lineups.away {
        warn!("Identical lineups on match page, clearing them");
        lineups = Lineups::default();
    }

    Ok(MatchDetails {
        calendar,
        stats,
        lineups,
    })
}
