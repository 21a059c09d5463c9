//! Refresh Cache Module
//!
//! Holds the latest envelope of every registered resource and refreshes it
//! through the resource's fetcher when its staleness policy says so.
//!
//! At most one refresh per resource is in flight at any time. Callers that
//! find a refresh running join it and receive the same outcome. A failed
//! refresh never discards a known-good payload: the previous envelope is kept,
//! annotated with the error, and served as stale.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStats, Envelope, StalenessPolicy, StatsRecorder};
use crate::config::Config;
use crate::error::{RefreshError, Result};
use crate::resource::{Cadence, ResourceDescriptor, ResourceId};
use crate::store::EnvelopeStore;

type RefreshOutcome = std::result::Result<Arc<Envelope>, RefreshError>;
type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Refresh in flight, tagged with the invalidation count it started at.
struct Flight {
    generation: u64,
    future: InFlight,
}

// == Refresh Options ==
/// Fetch bounds applied to every refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Per-attempt timeout for resources without their own
    pub fetch_timeout: Duration,
    /// Attempts per refresh, at least one
    pub fetch_attempts: u32,
    /// Pause between two attempts
    pub retry_delay: Duration,
    /// Limit on persisting the envelope of one refresh
    pub save_timeout: Duration,
}

impl RefreshOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetch_timeout: config.fetch_timeout_duration(),
            fetch_attempts: config.fetch_attempts,
            retry_delay: config.retry_delay(),
            save_timeout: config.store_timeout(),
        }
    }
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// == Served ==
/// Where a served envelope came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServeSource {
    /// Fresh envelope already in memory
    Cached,
    /// Envelope produced by the refresh this lookup waited on
    Refreshed,
    /// Previous envelope, served because the refresh failed
    StaleOnError,
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct Served {
    pub envelope: Arc<Envelope>,
    pub source: ServeSource,
    /// Refresh error, set only for `StaleOnError`
    pub error: Option<RefreshError>,
}

impl Served {
    pub fn is_stale(&self) -> bool {
        self.source == ServeSource::StaleOnError
    }
}

// == Resource Status ==
/// Snapshot of one resource, as listed by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceStatus {
    pub resource: ResourceId,
    pub policy: StalenessPolicy,
    pub cadence: Cadence,
    pub fetched_at: Option<DateTime<Utc>>,
    pub age_secs: Option<u64>,
    pub stale: bool,
    pub in_flight: bool,
    pub invalidated: bool,
    pub last_error: Option<String>,
}

// == Slot ==
struct Slot {
    descriptor: ResourceDescriptor,
    state: Mutex<SlotState>,
}

#[derive(Default)]
struct SlotState {
    envelope: Option<Arc<Envelope>>,
    last_error: Option<RefreshError>,
    /// Bumped by every invalidation
    invalidations: u64,
    /// Highest invalidation count covered by a successful refresh
    cleared_invalidations: u64,
    in_flight: Option<Flight>,
}

impl Slot {
    fn new(descriptor: ResourceDescriptor) -> Self {
        Self {
            descriptor,
            state: Mutex::new(SlotState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SlotState {
    fn invalidated(&self) -> bool {
        self.invalidations > self.cleared_invalidations
    }

    /// The current envelope if it can be served without a refresh.
    fn fresh_envelope(&self, policy: &StalenessPolicy, now: DateTime<Utc>) -> Option<Arc<Envelope>> {
        if self.invalidated() {
            return None;
        }
        self.envelope
            .as_ref()
            .filter(|envelope| !policy.is_stale(now, envelope.fetched_at_time()))
            .cloned()
    }
}

// == Refresh Cache ==
/// Single-flight, staleness-driven cache over a fixed set of resources.
pub struct RefreshCache {
    slots: HashMap<ResourceId, Arc<Slot>>,
    store: Arc<dyn EnvelopeStore>,
    options: RefreshOptions,
    stats: Arc<StatsRecorder>,
}

impl RefreshCache {
    // == Constructor ==
    /// Registers `descriptors` with empty state. Call [`restore`](Self::restore)
    /// to seed them from the store.
    pub fn new(
        descriptors: Vec<ResourceDescriptor>,
        store: Arc<dyn EnvelopeStore>,
        options: RefreshOptions,
    ) -> Self {
        let mut slots = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let id = descriptor.id.clone();
            if slots.insert(id.clone(), Arc::new(Slot::new(descriptor))).is_some() {
                warn!(resource = %id, "Duplicate resource registration, keeping the last one");
            }
        }

        Self {
            slots,
            store,
            options,
            stats: Arc::new(StatsRecorder::new()),
        }
    }

    fn slot(&self, id: &str) -> Result<&Arc<Slot>> {
        self.slots
            .get(id)
            .ok_or_else(|| RefreshError::UnknownResource(id.to_string()))
    }

    // == Get Fresh ==
    /// Returns an envelope of `id` that satisfies its staleness policy.
    ///
    /// A fresh envelope is served from memory without waiting. Otherwise the
    /// caller joins the refresh in flight, or starts one. When the refresh
    /// fails and a previous envelope exists, that envelope is served with
    /// `ServeSource::StaleOnError` and the error attached.
    pub async fn get_fresh(&self, id: &str) -> Result<Served> {
        let slot = self.slot(id)?;

        let flight = {
            let mut state = slot.lock();
            if let Some(envelope) = state.fresh_envelope(&slot.descriptor.policy, Utc::now()) {
                self.stats.record_hit();
                debug!(resource = %id, "Served from memory");
                return Ok(Served {
                    envelope,
                    source: ServeSource::Cached,
                    error: None,
                });
            }

            match state.in_flight.as_ref().map(|flight| flight.future.clone()) {
                Some(flight) => {
                    self.stats.record_join();
                    debug!(resource = %id, "Joining refresh in flight");
                    flight
                }
                None => self.start_refresh(slot, &mut state),
            }
        };
        self.stats.record_miss();

        match flight.await {
            Ok(envelope) => Ok(Served {
                envelope,
                source: ServeSource::Refreshed,
                error: None,
            }),
            Err(err) => {
                let previous = slot.lock().envelope.clone();
                match previous {
                    Some(envelope) => {
                        self.stats.record_stale_served();
                        debug!(resource = %id, error = %err, "Serving stale envelope");
                        Ok(Served {
                            envelope,
                            source: ServeSource::StaleOnError,
                            error: Some(err),
                        })
                    }
                    None => Err(err),
                }
            }
        }
    }

    // == Refresh Async ==
    /// Starts a background refresh of `id` if it is stale and idle.
    ///
    /// Returns `Ok(false)` without doing anything when the resource is fresh
    /// or already refreshing. Never waits on the fetch.
    pub fn refresh_async(&self, id: &str) -> Result<bool> {
        let slot = self.slot(id)?;
        let mut state = slot.lock();

        let fresh = state
            .fresh_envelope(&slot.descriptor.policy, Utc::now())
            .is_some();
        if fresh || state.in_flight.is_some() {
            self.stats.record_async_skip();
            debug!(resource = %id, fresh, "Background refresh skipped");
            return Ok(false);
        }

        // The spawned task drives the fetch; the shared handle is kept for joiners
        let _ = self.start_refresh(slot, &mut state);
        Ok(true)
    }

    // == Invalidate ==
    /// Marks `id` stale regardless of its policy until the next successful
    /// refresh that starts after this call.
    pub fn invalidate(&self, id: &str) -> Result<()> {
        let slot = self.slot(id)?;
        slot.lock().invalidations += 1;
        info!(resource = %id, "Resource invalidated");
        Ok(())
    }

    // == Refresh Now ==
    /// Invalidates `id` and waits for a refresh that started after the
    /// invalidation.
    ///
    /// A refresh already in flight is awaited first and its result dropped,
    /// since its payload predates the call.
    pub async fn refresh_now(&self, id: &str) -> Result<Served> {
        let slot = self.slot(id)?;
        let target = {
            let mut state = slot.lock();
            state.invalidations += 1;
            state.invalidations
        };
        info!(resource = %id, "Resource invalidated, waiting for a new refresh");

        loop {
            let earlier = slot
                .lock()
                .in_flight
                .as_ref()
                .filter(|flight| flight.generation < target)
                .map(|flight| flight.future.clone());

            match earlier {
                Some(flight) => {
                    debug!(resource = %id, "Waiting out a refresh started before the trigger");
                    let _ = flight.await;
                }
                None => return self.get_fresh(id).await,
            }
        }
    }

    /// Moves the slot to in flight and spawns the refresh task.
    ///
    /// Must be called with the slot lock held and no refresh in flight.
    fn start_refresh(&self, slot: &Arc<Slot>, state: &mut SlotState) -> InFlight {
        self.stats.record_refresh();

        let generation = state.invalidations;
        let job = RefreshJob {
            slot: slot.clone(),
            store: self.store.clone(),
            options: self.options,
            stats: self.stats.clone(),
            generation,
            _idle: IdleOnDrop(slot.clone()),
        };
        let resource = slot.descriptor.id.clone();
        let handle = tokio::spawn(job.run());

        let flight = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(%resource, error = %err, "Refresh task died");
                    Err(RefreshError::Internal(format!(
                        "refresh task of {resource} died: {err}"
                    )))
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some(Flight {
            generation,
            future: flight.clone(),
        });
        flight
    }

    // == Restore ==
    /// Seeds every resource without an envelope from the store.
    ///
    /// Unreadable or mismatched records are logged and skipped. Returns the
    /// number of envelopes restored.
    pub async fn restore(&self) -> usize {
        let mut restored = 0;

        for (id, slot) in &self.slots {
            let envelope = match self.store.load(id).await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => continue,
                Err(err) => {
                    warn!(resource = %id, error = %err, "Skipping unreadable record");
                    continue;
                }
            };

            if envelope.resource_id() != id {
                warn!(
                    resource = %id,
                    found = %envelope.resource_id(),
                    "Skipping record of another resource"
                );
                continue;
            }

            let mut state = slot.lock();
            if state.envelope.is_none() {
                state.envelope = Some(Arc::new(envelope));
                restored += 1;
            }
        }

        info!(restored, total = self.slots.len(), "Restored envelopes from store");
        restored
    }

    // == Introspection ==
    /// Current envelope of `id`, fresh or not, without refreshing.
    pub fn current(&self, id: &str) -> Result<Option<Arc<Envelope>>> {
        Ok(self.slot(id)?.lock().envelope.clone())
    }

    /// State of every resource, sorted by id.
    pub fn status(&self) -> Vec<ResourceStatus> {
        let now = Utc::now();
        let mut statuses: Vec<ResourceStatus> = self
            .slots
            .values()
            .map(|slot| {
                let state = slot.lock();
                let descriptor = &slot.descriptor;
                ResourceStatus {
                    resource: descriptor.id.clone(),
                    policy: descriptor.policy,
                    cadence: descriptor.cadence,
                    fetched_at: state.envelope.as_ref().map(|e| e.fetched_at_time()),
                    age_secs: state.envelope.as_ref().map(|e| e.age_at(now).as_secs()),
                    stale: state.fresh_envelope(&descriptor.policy, now).is_none(),
                    in_flight: state.in_flight.is_some(),
                    invalidated: state.invalidated(),
                    last_error: state.last_error.as_ref().map(ToString::to_string),
                }
            })
            .collect();
        statuses.sort_by(|a, b| a.resource.cmp(&b.resource));
        statuses
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.slots.len())
    }

    /// Registered ids, sorted.
    pub fn resource_ids(&self) -> Vec<ResourceId> {
        let mut ids: Vec<ResourceId> = self.slots.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Registered ids refreshed by the given scheduler loop, sorted.
    pub fn ids_with_cadence(&self, cadence: Cadence) -> Vec<ResourceId> {
        let mut ids: Vec<ResourceId> = self
            .slots
            .values()
            .filter(|slot| slot.descriptor.cadence == cadence)
            .map(|slot| slot.descriptor.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn descriptor(&self, id: &str) -> Option<&ResourceDescriptor> {
        self.slots.get(id).map(|slot| &slot.descriptor)
    }
}

// == Refresh Job ==
/// Returns the slot to idle when the job is dropped, whether it finished,
/// panicked or was cancelled.
struct IdleOnDrop(Arc<Slot>);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        self.0.lock().in_flight = None;
    }
}

/// One refresh of one resource, run on its own task.
struct RefreshJob {
    slot: Arc<Slot>,
    store: Arc<dyn EnvelopeStore>,
    options: RefreshOptions,
    stats: Arc<StatsRecorder>,
    /// Invalidation count when the refresh started
    generation: u64,
    _idle: IdleOnDrop,
}

impl RefreshJob {
    async fn run(self) -> RefreshOutcome {
        let id = self.slot.descriptor.id.clone();
        let started = std::time::Instant::now();
        let result = self.fetch_with_retry().await;

        let (outcome, to_save) = {
            let mut state = self.slot.lock();
            match result {
                Ok(payload) => {
                    let envelope = Arc::new(Envelope::new(id.clone(), payload));
                    state.envelope = Some(envelope.clone());
                    state.last_error = None;
                    state.cleared_invalidations = state.cleared_invalidations.max(self.generation);
                    (Ok(envelope.clone()), Some(envelope))
                }
                Err(err) => {
                    self.stats.record_fetch_failure();
                    let annotated = state
                        .envelope
                        .as_ref()
                        .map(|previous| Arc::new(previous.with_error(err.to_string())));
                    if let Some(annotated) = &annotated {
                        state.envelope = Some(annotated.clone());
                    }
                    state.last_error = Some(err.clone());
                    (Err(err), annotated)
                }
            }
        };

        match &outcome {
            Ok(_) => info!(
                resource = %id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Resource refreshed"
            ),
            Err(err) if err.is_fetch_error() => {
                warn!(resource = %id, error = %err, "Refresh failed")
            }
            Err(err) => error!(resource = %id, error = %err, "Refresh failed"),
        }

        if let Some(envelope) = to_save {
            self.persist(&envelope).await;
        }

        outcome
    }

    /// Saves `envelope`, bounded by the save timeout. Failures only count.
    async fn persist(&self, envelope: &Envelope) {
        let id = &self.slot.descriptor.id;
        let timeout = self.options.save_timeout;

        let save = AssertUnwindSafe(self.store.save(envelope)).catch_unwind();
        let failure = match tokio::time::timeout(timeout, save).await {
            Ok(Ok(Ok(()))) => return,
            Ok(Ok(Err(err))) => err.to_string(),
            Ok(Err(_)) => "store panicked".to_string(),
            Err(_) => format!("save timed out after {}ms", timeout.as_millis()),
        };

        self.stats.record_persistence_failure();
        warn!(resource = %id, error = %failure, "Envelope not persisted");
    }

    async fn fetch_with_retry(&self) -> std::result::Result<Value, RefreshError> {
        let attempts = self.options.fetch_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.fetch_once().await {
                Ok(payload) => return Ok(payload),
                Err(err) if attempt < attempts => {
                    debug!(
                        resource = %self.slot.descriptor.id,
                        attempt,
                        error = %err,
                        "Fetch attempt failed, retrying"
                    );
                    tokio::time::sleep(self.options.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self) -> std::result::Result<Value, RefreshError> {
        let descriptor = &self.slot.descriptor;
        let resource = descriptor.id.to_string();
        let timeout = descriptor.timeout.unwrap_or(self.options.fetch_timeout);

        let fetch = AssertUnwindSafe(descriptor.fetcher.fetch(&descriptor.id)).catch_unwind();
        match tokio::time::timeout(timeout, fetch).await {
            Err(_) => {
                self.stats.record_timeout();
                Err(RefreshError::FetchTimeout {
                    resource,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Ok(Err(_)) => {
                error!(%resource, "Fetcher panicked");
                Err(RefreshError::Internal(format!("fetcher of {resource} panicked")))
            }
            Ok(Ok(Err(err))) => Err(RefreshError::FetchFailure {
                resource,
                reason: err.to_string(),
            }),
            Ok(Ok(Ok(payload))) => Ok(payload),
        }
    }
}
