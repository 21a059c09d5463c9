//! Resource Module
//!
//! Identity and static metadata of every cacheable resource, plus the
//! catalog of resources the service registers at startup.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::StalenessPolicy;
use crate::config::Config;
use crate::fetch::{
    ChannelsFetcher, Day, DetailsFetcher, EventsFetcher, Fetcher, FixturesFetcher,
    StandingsFetcher,
};

// == Resource Id ==
/// Opaque key identifying one cacheable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Cadence ==
/// Which scheduler loop proactively refreshes a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Frequent,
    Infrequent,
}

// == Resource Descriptor ==
/// Static metadata of one resource.
#[derive(Clone)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    pub policy: StalenessPolicy,
    pub cadence: Cadence,
    /// Per-attempt timeout, None = the cache's default
    pub timeout: Option<Duration>,
    pub fetcher: Arc<dyn Fetcher>,
}

impl ResourceDescriptor {
    pub fn new(
        id: impl Into<ResourceId>,
        policy: StalenessPolicy,
        cadence: Cadence,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            id: id.into(),
            policy,
            cadence,
            timeout: None,
            fetcher,
        }
    }

    /// Overrides the fetch timeout for this resource.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("cadence", &self.cadence)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// == Well-known ids ==
pub const STANDINGS: &str = "standings";
pub const CHANNELS: &str = "channels";
pub const EVENTS: &str = "events";

/// Id of the fixtures resource for a day.
pub fn fixtures_id(day: Day) -> ResourceId {
    ResourceId::new(format!("fixtures:{}", day.as_str()))
}

/// Id of the match details resource for a day.
pub fn details_id(day: Day) -> ResourceId {
    ResourceId::new(format!("details:{}", day.as_str()))
}

// == Catalog ==
/// Builds the descriptors of every resource the service exposes.
///
/// Today's fixtures and details are always refreshed on access; the other
/// days age out after `day_max_age`. Standings, channels and events are
/// refreshed by the infrequent loop once their max age has passed.
pub fn catalog(config: &Config, client: reqwest::Client) -> Vec<ResourceDescriptor> {
    let mut descriptors = Vec::new();

    for day in Day::ALL {
        let policy = match day {
            Day::Today => StalenessPolicy::AlwaysStale,
            Day::Yesterday | Day::Tomorrow => StalenessPolicy::max_age_secs(config.day_max_age),
        };

        descriptors.push(ResourceDescriptor::new(
            fixtures_id(day),
            policy,
            Cadence::Frequent,
            Arc::new(FixturesFetcher::new(
                client.clone(),
                &config.promiedos_url,
                day,
            )),
        ));

        descriptors.push(
            ResourceDescriptor::new(
                details_id(day),
                policy,
                Cadence::Frequent,
                Arc::new(DetailsFetcher::new(client.clone(), &config.promiedos_url, day)),
            )
            .with_timeout(Duration::from_secs(config.details_timeout)),
        );
    }

    descriptors.push(
        ResourceDescriptor::new(
            STANDINGS,
            StalenessPolicy::max_age_secs(config.standings_max_age),
            Cadence::Infrequent,
            Arc::new(StandingsFetcher::new(
                client.clone(),
                &config.promediosinfo_url,
                config.standings_leagues.clone(),
            )),
        )
        .with_timeout(Duration::from_secs(config.details_timeout)),
    );

    descriptors.push(ResourceDescriptor::new(
        CHANNELS,
        StalenessPolicy::max_age_secs(config.listing_max_age),
        Cadence::Infrequent,
        Arc::new(ChannelsFetcher::new(client.clone(), &config.la14hd_url)),
    ));

    descriptors.push(ResourceDescriptor::new(
        EVENTS,
        StalenessPolicy::max_age_secs(config.listing_max_age),
        Cadence::Infrequent,
        Arc::new(EventsFetcher::new(client, &config.la14hd_url)),
    ));

    descriptors
}
