//! Channel listing and live event scrapers for La14HD.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{first_text, get_html, join_url, selector, FetchError, Fetcher};
use crate::resource::ResourceId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub channel: String,
    pub link: String,
}

// == Channels Fetcher ==
pub struct ChannelsFetcher {
    client: Client,
    site_root: String,
}

impl ChannelsFetcher {
    pub fn new(client: Client, site_root: &str) -> Self {
        Self {
            client,
            site_root: site_root.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for ChannelsFetcher {
    async fn fetch(&self, id: &ResourceId) -> Result<Value, FetchError> {
        let html = get_html(&self.client, &self.site_root).await?;
        let channels = parse_channels(&html)?;
        debug!(resource = %id, channels = channels.len(), "Channels extracted");
        Ok(json!({ "channels": channels }))
    }
}

pub(crate) fn parse_channels(html: &str) -> Result<Vec<Channel>, FetchError> {
    let document = Html::parse_document(html);
    let card = selector("div[data-canal]")?;
    let anchor = selector("a")?;

    let channels: Vec<Channel> = document
        .select(&card)
        .filter_map(|div| {
            let channel = div.value().attr("data-canal")?.trim().to_string();
            let link = div.select(&anchor).next()?.value().attr("href")?.trim().to_string();
            Some(Channel { channel, link })
        })
        .collect();

    if channels.is_empty() {
        return Err(FetchError::ExtractionIncomplete(
            "no channel cards on page".to_string(),
        ));
    }

    Ok(channels)
}

// == Events Fetcher ==
/// Maps the slug of every live event title to its player link.
pub struct EventsFetcher {
    client: Client,
    site_root: String,
}

impl EventsFetcher {
    pub fn new(client: Client, site_root: &str) -> Self {
        Self {
            client,
            site_root: site_root.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for EventsFetcher {
    async fn fetch(&self, id: &ResourceId) -> Result<Value, FetchError> {
        let url = join_url(&self.site_root, "eventos/");
        let html = get_html(&self.client, &url).await?;
        let events = parse_events(&html)?;
        debug!(resource = %id, events = events.len(), "Events extracted");
        Ok(json!({ "events": events }))
    }
}

/// An events page without events is valid: nothing is being streamed.
pub(crate) fn parse_events(html: &str) -> Result<BTreeMap<String, String>, FetchError> {
    let document = Html::parse_document(html);
    let event = selector(".event")?;
    let name = selector(".event-name")?;
    let link = selector(".iframe-link")?;

    let events = document
        .select(&event)
        .filter_map(|ev| {
            let title = first_text(ev, &name)?;
            let href = ev.select(&link).next()?.value().attr("value")?.trim();
            let key = slug(&title);
            (!key.is_empty() && !href.is_empty()).then(|| (key, href.to_string()))
        })
        .collect();

    Ok(events)
}

// == Slug ==
/// Lowercase ASCII key for an event title: accents folded, punctuation
/// replaced by spaces, whitespace collapsed.
pub fn slug(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            let c = fold_accent(c);
            if c.is_ascii_alphanumeric() {
                Some(c)
            } else if c.is_ascii() || c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Atlético Tucumán vs. Newell's"), "atletico tucuman vs newell s");
        assert_eq!(slug("  ÑUBLENSE -- Colo-Colo "), "nublense colo colo");
        assert_eq!(slug("⚽"), "");
    }

    #[test]
    fn test_parse_channels() {
        let html = r#"
            <div data-canal=" ESPN "><a href=" https://la14hd.com/vivo/espn "></a></div>
            <div data-canal="broken"></div>"#;

        let channels = parse_channels(html).unwrap();
        assert_eq!(
            channels,
            vec![Channel {
                channel: "ESPN".to_string(),
                link: "https://la14hd.com/vivo/espn".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_channels_empty_page_fails() {
        assert!(matches!(
            parse_channels("<p>down</p>"),
            Err(FetchError::ExtractionIncomplete(_))
        ));
    }

    #[test]
    fn test_parse_events() {
        let html = r#"
            <div class="event">
              <span class="event-name">River Plate vs Boca</span>
              <input class="iframe-link" value="https://player/1">
            </div>
            <div class="event"><span class="event-name">No link</span></div>"#;

        let events = parse_events(html).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events["river plate vs boca"], "https://player/1");
    }

    #[test]
    fn test_parse_events_allows_empty_page() {
        assert!(parse_events("<html></html>").unwrap().is_empty());
    }
}
