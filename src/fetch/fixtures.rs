//! Fixtures scraper for one day of the Promiedos fixtures page.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{first_text, get_html, join_url, selector, text_of, Day, FetchError, Fetcher};
use crate::resource::ResourceId;

const LEAGUE_HEADER: &str = "event-header_left";
const MATCH_ITEM: &str = "item_item";

/// One league block and its fixtures, in page order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct League {
    pub league: String,
    pub fixtures: Vec<Fixture>,
}

/// One fixture. Score and minute fields are null when the page has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fixture {
    pub home: String,
    pub home_logo: Option<String>,
    pub home_goals: Option<u32>,
    pub home_scorers: Vec<String>,
    pub away: String,
    pub away_logo: Option<String>,
    pub away_goals: Option<u32>,
    pub away_scorers: Vec<String>,
    pub minute: Option<String>,
    /// Match page path relative to the site root
    pub href: Option<String>,
}

// == Fixtures Fetcher ==
pub struct FixturesFetcher {
    client: Client,
    site_root: String,
    day: Day,
}

impl FixturesFetcher {
    pub fn new(client: Client, site_root: &str, day: Day) -> Self {
        Self {
            client,
            site_root: site_root.to_string(),
            day,
        }
    }
}

#[async_trait]
impl Fetcher for FixturesFetcher {
    async fn fetch(&self, id: &ResourceId) -> Result<Value, FetchError> {
        let url = join_url(&self.site_root, self.day.path());
        debug!(resource = %id, %url, "Fetching fixtures page");

        let html = get_html(&self.client, &url).await?;
        let leagues = parse_fixtures(&html, &self.site_root)?;

        debug!(resource = %id, leagues = leagues.len(), "Fixtures extracted");
        Ok(json!({ "leagues": leagues }))
    }
}

// == Parsing ==

/// Extracts the leagues of a fixtures page.
///
/// Nodes are visited in document order: a league header opens a new league
/// and every following match node belongs to it. Match nodes without exactly
/// two team names are skipped.
pub(crate) fn parse_fixtures(html: &str, site_root: &str) -> Result<Vec<League>, FetchError> {
    let document = Html::parse_document(html);
    let main = selector("main")?;
    let any = selector("*")?;
    let team = selector("span[class*='command_title']")?;
    let logo = selector("div.comand-imageteam img.team")?;
    let minute = selector("div[class*='time_block']")?;
    let score = selector("span[class*='scores_scoreseventresult']")?;
    let left_goals = selector("div[class*='gols_itemLeft'] span[class*='gols_block']")?;
    let right_goals = selector("div[class*='gols_itemRight'] span[class*='gols_block']")?;
    let goal_minute = selector("span.green")?;
    let goal_player = selector("p")?;

    let root = document
        .select(&main)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut leagues: Vec<League> = Vec::new();
    let mut saw_header = false;

    for node in root.select(&any) {
        let class = node.value().attr("class").unwrap_or_default();

        if class.contains(LEAGUE_HEADER) {
            saw_header = true;
            leagues.push(League {
                league: text_of(node),
                fixtures: Vec::new(),
            });
            continue;
        }

        if !class.contains(MATCH_ITEM) {
            continue;
        }

        // A match before the first header has no league to belong to
        let Some(current) = leagues.last_mut() else {
            continue;
        };

        let teams: Vec<String> = node.select(&team).map(text_of).collect();
        let Ok([home, away]) = <[String; 2]>::try_from(teams) else {
            continue;
        };

        let logos: Vec<Option<String>> = node
            .select(&logo)
            .map(|img| img.value().attr("src").map(str::to_string))
            .collect();

        let scores: Vec<String> = node.select(&score).map(text_of).collect();
        let (home_goals, away_goals) = match scores.as_slice() {
            [home, away, ..] => (parse_goals(home), parse_goals(away)),
            _ => (None, None),
        };

        current.fixtures.push(Fixture {
            home,
            home_logo: logos.first().cloned().flatten(),
            home_goals,
            home_scorers: scorers(node, &left_goals, &goal_minute, &goal_player),
            away,
            away_logo: logos.get(1).cloned().flatten(),
            away_goals,
            away_scorers: scorers(node, &right_goals, &goal_minute, &goal_player),
            minute: first_text(node, &minute).filter(|m| !m.is_empty()),
            href: node
                .value()
                .attr("href")
                .map(|href| relative_href(href, site_root)),
        });
    }

    if !saw_header {
        return Err(FetchError::ExtractionIncomplete(
            "no league headers on fixtures page".to_string(),
        ));
    }

    Ok(leagues)
}

fn parse_goals(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Scorer lines ("23' Player") of one side, de-duplicated in page order.
fn scorers(
    node: ElementRef<'_>,
    blocks: &scraper::Selector,
    minute: &scraper::Selector,
    player: &scraper::Selector,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for block in node.select(blocks) {
        let (Some(mut at), Some(name)) = (first_text(block, minute), first_text(block, player))
        else {
            continue;
        };
        if at.is_empty() || name.is_empty() {
            continue;
        }
        if !at.ends_with('\'') {
            at.push('\'');
        }

        let line = format!("{at} {name}");
        if !lines.contains(&line) {
            lines.push(line);
        }
    }

    lines
}

fn relative_href(href: &str, site_root: &str) -> String {
    let root = site_root.trim_end_matches('/');
    href.strip_prefix(root)
        .map(str::to_string)
        .unwrap_or_else(|| href.to_string())
}
