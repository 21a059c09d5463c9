//! Standings scraper for the PromediosInfo league pages.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{first_text, get_html, join_url, selector, text_of, FetchError, Fetcher};
use crate::resource::ResourceId;

/// Standings tables scraped per league page.
const MAX_TABLES: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingRow {
    pub position: String,
    pub team: String,
    pub points: String,
    pub played: String,
    pub won: String,
    pub drawn: String,
    pub lost: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundMatch {
    pub home: String,
    pub away: String,
    pub time: String,
    pub result: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Round {
    pub title: String,
    pub matches: Vec<RoundMatch>,
}

/// What one league page yielded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LeagueStandings {
    Table {
        tables: BTreeMap<String, Vec<StandingRow>>,
        rounds: Vec<Round>,
    },
    Cup {
        content: String,
        html: String,
        rounds: Vec<Round>,
    },
    Failed {
        error: String,
    },
}

// == Standings Fetcher ==
pub struct StandingsFetcher {
    client: Client,
    site_root: String,
    leagues: Vec<String>,
}

impl StandingsFetcher {
    pub fn new(client: Client, site_root: &str, leagues: Vec<String>) -> Self {
        Self {
            client,
            site_root: site_root.to_string(),
            leagues,
        }
    }
}

#[async_trait]
impl Fetcher for StandingsFetcher {
    async fn fetch(&self, id: &ResourceId) -> Result<Value, FetchError> {
        let mut leagues = BTreeMap::new();
        let mut failures = 0usize;

        for league in &self.leagues {
            let url = join_url(&self.site_root, league);
            debug!(resource = %id, %url, "Fetching league page");

            let outcome = match get_html(&self.client, &url).await {
                Ok(page) => parse_league_page(&page, league.contains("liga/")),
                Err(err) => Err(err),
            };

            let standings = outcome.unwrap_or_else(|err| {
                warn!(resource = %id, %league, error = %err, "League standings skipped");
                failures += 1;
                LeagueStandings::Failed {
                    error: err.to_string(),
                }
            });
            leagues.insert(league.clone(), standings);
        }

        if !self.leagues.is_empty() && failures == self.leagues.len() {
            return Err(FetchError::ExtractionIncomplete(format!(
                "all {failures} league pages failed"
            )));
        }

        Ok(json!({ "leagues": leagues }))
    }
}

// == Parsing ==

/// Extracts standings from a league page, or the points section of a cup page.
pub(crate) fn parse_league_page(html: &str, is_league: bool) -> Result<LeagueStandings, FetchError> {
    let document = Html::parse_document(html);

    if !is_league {
        let points = selector("#points")?;
        let section = document.select(&points).next().ok_or_else(|| {
            FetchError::ExtractionIncomplete("cup page has no points section".to_string())
        })?;
        return Ok(LeagueStandings::Cup {
            content: text_of(section),
            html: section.inner_html().trim().to_string(),
            rounds: Vec::new(),
        });
    }

    let table = selector(".table.is-fullwidth.tablePos.mb-5")?;
    let row = selector("tbody tr")?;
    let cell = selector("td")?;

    let zones: Vec<Vec<StandingRow>> = document
        .select(&table)
        .take(MAX_TABLES)
        .map(|table| {
            table
                .select(&row)
                .filter_map(|tr| standing_row(tr.select(&cell).map(text_of).collect()))
                .collect()
        })
        .collect();

    let rounds = parse_rounds(&document)?;

    if zones.is_empty() && rounds.is_empty() {
        return Err(FetchError::ExtractionIncomplete(
            "league page has no standings or rounds".to_string(),
        ));
    }

    let tables = match zones.len() {
        1 => zones
            .into_iter()
            .map(|rows| ("Single zone".to_string(), rows))
            .collect(),
        _ => ["Zone A", "Zone B"]
            .into_iter()
            .map(str::to_string)
            .zip(zones)
            .collect(),
    };

    Ok(LeagueStandings::Table { tables, rounds })
}

fn standing_row(cells: Vec<String>) -> Option<StandingRow> {
    if cells.len() <= 3 {
        return None;
    }
    let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();
    Some(StandingRow {
        position: cell(0),
        team: cell(1),
        points: cell(2),
        played: cell(3),
        won: cell(4),
        drawn: cell(5),
        lost: cell(6),
    })
}

fn parse_rounds(document: &Html) -> Result<Vec<Round>, FetchError> {
    let round = selector(".table.is-fullwidth.mb-6.noselect")?;
    let heading = selector("thead th")?;
    let row = selector("tbody tr")?;
    let home = selector(".team.tr")?;
    let away = selector(".team.tl")?;
    let time = selector(".hours.time")?;
    let result = selector(".result")?;
    let status = selector(".status")?;

    let rounds = document
        .select(&round)
        .filter_map(|block| {
            let title = first_text(block, &heading)?;
            let matches: Vec<RoundMatch> = block
                .select(&row)
                .filter_map(|tr| round_match(tr, &home, &away, &time, &result, &status))
                .collect();
            (!matches.is_empty()).then_some(Round { title, matches })
        })
        .collect();

    Ok(rounds)
}

fn round_match(
    tr: ElementRef<'_>,
    home: &Selector,
    away: &Selector,
    time: &Selector,
    result: &Selector,
    status: &Selector,
) -> Option<RoundMatch> {
    Some(RoundMatch {
        home: first_text(tr, home)?,
        away: first_text(tr, away)?,
        time: first_text(tr, time)?,
        result: first_text(tr, result).unwrap_or_default(),
        status: first_text(tr, status).unwrap_or_default(),
    })
}
