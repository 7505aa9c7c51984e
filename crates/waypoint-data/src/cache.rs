//! Query cache with request fencing.
//!
//! Every query is keyed by a [`QueryKey`] built from its parameters, so a
//! new time window or spatial filter is a new key. Entries keyed on an
//! open-ended window go stale after a configurable TTL because "now" keeps
//! moving; closed-window entries stay until invalidated.
//!
//! # Fencing
//!
//! Each consumer of query results owns a [`QuerySlot`] with a generation
//! counter. [`QueryClient::begin`] bumps the counter and hands out a
//! [`Ticket`]. When a response arrives for a ticket whose generation has
//! since been superseded, the response is cached but reported as
//! [`Fetched::Superseded`] so the caller never writes it into a store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use waypoint_types::{Entity, EntityDetails, EntityEvent, EntityKey, Highlight, Parameters, TimeRange};

use crate::error::DataError;
use crate::source::{DataSource, GroupSearchResults};

/// Default time-to-live of entries keyed on an open-ended window.
pub const DEFAULT_OPEN_RANGE_TTL: Duration = Duration::from_secs(30);

/// Cache key of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// Entity set for a parameter set.
    Entities(Parameters),
    /// One entity's events in a window.
    Events {
        /// Entity type.
        entity_type: String,
        /// Entity id.
        entity_id: String,
        /// Query window.
        range: TimeRange,
    },
    /// Highlights in a window.
    Highlights(TimeRange),
    /// Descriptive record of an entity.
    Details(EntityKey),
    /// Group search text.
    GroupSearch(String),
}

impl QueryKey {
    /// The time window this key depends on, if any.
    pub const fn time_range(&self) -> Option<&TimeRange> {
        match self {
            Self::Entities(params) => Some(&params.time_range),
            Self::Events { range, .. } | Self::Highlights(range) => Some(range),
            Self::Details(_) | Self::GroupSearch(_) => None,
        }
    }

    /// Whether the key depends on an open-ended window.
    pub fn is_open_ended(&self) -> bool {
        self.time_range().is_some_and(TimeRange::is_open)
    }
}

/// A consumer of query results with its own generation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuerySlot {
    /// The map's entity set.
    Entities,
    /// The master timeline's highlights.
    Highlights,
    /// The focused entity's timeline lanes.
    EntityEvents,
    /// The history overlay.
    History,
    /// The details drawer.
    Details,
    /// The group search box.
    GroupSearch,
}

/// Proof of a started request, checked when its response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    slot: QuerySlot,
    generation: u64,
}

impl Ticket {
    /// The slot this ticket was issued for.
    pub const fn slot(self) -> QuerySlot {
        self.slot
    }

    /// The generation this ticket carries.
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

/// Outcome of a fenced query.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// The response belongs to the latest request of its slot.
    Current(T),
    /// A newer request was started for the slot while this one was in
    /// flight. The response must not be applied.
    Superseded,
}

impl<T> Fetched<T> {
    /// The response, if it is still current.
    pub fn current(self) -> Option<T> {
        match self {
            Self::Current(value) => Some(value),
            Self::Superseded => None,
        }
    }
}

#[derive(Debug, Default)]
struct Generations {
    entities: AtomicU64,
    highlights: AtomicU64,
    entity_events: AtomicU64,
    history: AtomicU64,
    details: AtomicU64,
    group_search: AtomicU64,
}

impl Generations {
    const fn counter(&self, slot: QuerySlot) -> &AtomicU64 {
        match slot {
            QuerySlot::Entities => &self.entities,
            QuerySlot::Highlights => &self.highlights,
            QuerySlot::EntityEvents => &self.entity_events,
            QuerySlot::History => &self.history,
            QuerySlot::Details => &self.details,
            QuerySlot::GroupSearch => &self.group_search,
        }
    }
}

#[derive(Debug, Clone)]
enum CachedValue {
    Entities(Vec<Entity>),
    Events(Vec<EntityEvent>),
    Highlights(Vec<Highlight>),
    Details(Option<EntityDetails>),
    Groups(GroupSearchResults),
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    stored_at: Instant,
}

/// Caching, fencing front of a [`DataSource`].
#[derive(Debug)]
pub struct QueryClient<S> {
    source: Arc<S>,
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    generations: Generations,
    open_range_ttl: Duration,
}

impl<S: DataSource> QueryClient<S> {
    /// Wrap `source`. Entries keyed on an open window expire after
    /// `open_range_ttl`.
    pub fn new(source: Arc<S>, open_range_ttl: Duration) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
            generations: Generations::default(),
            open_range_ttl,
        }
    }

    /// The wrapped data source.
    pub const fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Start a request for `slot`, superseding any request in flight.
    pub fn begin(&self, slot: QuerySlot) -> Ticket {
        let previous = self.generations.counter(slot).fetch_add(1, Ordering::AcqRel);
        Ticket {
            slot,
            generation: previous.wrapping_add(1),
        }
    }

    /// Whether `ticket` is still the latest request of its slot.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generations.counter(ticket.slot).load(Ordering::Acquire) == ticket.generation
    }

    /// Drop every entry that depends on a time window.
    pub async fn invalidate_time_window(&self) {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| key.time_range().is_none());
        tracing::debug!(evicted = before.saturating_sub(entries.len()), "time window invalidated");
    }

    /// Drop every entry that depends on the entity set.
    pub async fn invalidate_entities(&self) {
        self.entries
            .lock()
            .await
            .retain(|key, _| !matches!(key, QueryKey::Entities(_)));
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Entities for `parameters`.
    ///
    /// # Errors
    ///
    /// Propagates the [`DataError`] of the underlying source.
    pub async fn entities(
        &self,
        ticket: Ticket,
        parameters: &Parameters,
    ) -> Result<Fetched<Vec<Entity>>, DataError> {
        self.run(
            ticket,
            QueryKey::Entities(parameters.clone()),
            self.source.entities(parameters),
            CachedValue::Entities,
            |value| match value {
                CachedValue::Entities(v) => Some(v.clone()),
                _ => None,
            },
        )
        .await
    }

    /// Events of one entity in `range`.
    ///
    /// # Errors
    ///
    /// Propagates the [`DataError`] of the underlying source.
    pub async fn events_of_entity(
        &self,
        ticket: Ticket,
        entity_type: &str,
        entity_id: &str,
        range: &TimeRange,
    ) -> Result<Fetched<Vec<EntityEvent>>, DataError> {
        let key = QueryKey::Events {
            entity_type: entity_type.to_owned(),
            entity_id: entity_id.to_owned(),
            range: *range,
        };
        self.run(
            ticket,
            key,
            self.source.events_of_entity(entity_type, entity_id, range),
            CachedValue::Events,
            |value| match value {
                CachedValue::Events(v) => Some(v.clone()),
                _ => None,
            },
        )
        .await
    }

    /// Highlights in `range`.
    ///
    /// # Errors
    ///
    /// Propagates the [`DataError`] of the underlying source.
    pub async fn highlights(
        &self,
        ticket: Ticket,
        range: &TimeRange,
    ) -> Result<Fetched<Vec<Highlight>>, DataError> {
        self.run(
            ticket,
            QueryKey::Highlights(*range),
            self.source.highlights(range),
            CachedValue::Highlights,
            |value| match value {
                CachedValue::Highlights(v) => Some(v.clone()),
                _ => None,
            },
        )
        .await
    }

    /// Descriptive record of `key`.
    ///
    /// # Errors
    ///
    /// Propagates the [`DataError`] of the underlying source.
    pub async fn entity_details(
        &self,
        ticket: Ticket,
        key: &EntityKey,
    ) -> Result<Fetched<Option<EntityDetails>>, DataError> {
        self.run(
            ticket,
            QueryKey::Details(key.clone()),
            self.source.entity_details(key),
            CachedValue::Details,
            |value| match value {
                CachedValue::Details(v) => Some(v.clone()),
                _ => None,
            },
        )
        .await
    }

    /// Group search results for `query`.
    ///
    /// # Errors
    ///
    /// Propagates the [`DataError`] of the underlying source.
    pub async fn group_search(
        &self,
        ticket: Ticket,
        query: &str,
    ) -> Result<Fetched<GroupSearchResults>, DataError> {
        self.run(
            ticket,
            QueryKey::GroupSearch(query.to_owned()),
            self.source.group_search(query),
            CachedValue::Groups,
            |value| match value {
                CachedValue::Groups(v) => Some(v.clone()),
                _ => None,
            },
        )
        .await
    }

    fn is_fresh(&self, key: &QueryKey, entry: &CacheEntry) -> bool {
        !key.is_open_ended() || entry.stored_at.elapsed() < self.open_range_ttl
    }

    async fn run<T>(
        &self,
        ticket: Ticket,
        key: QueryKey,
        fetch: impl Future<Output = Result<T, DataError>>,
        pack: fn(T) -> CachedValue,
        unpack: fn(&CachedValue) -> Option<T>,
    ) -> Result<Fetched<T>, DataError>
    where
        T: Clone,
    {
        let hit = {
            let entries = self.entries.lock().await;
            entries
                .get(&key)
                .filter(|entry| self.is_fresh(&key, entry))
                .and_then(|entry| unpack(&entry.value))
        };

        let value = if let Some(value) = hit {
            tracing::trace!(?key, "query cache hit");
            value
        } else {
            let value = fetch.await?;
            self.entries.lock().await.insert(
                key.clone(),
                CacheEntry {
                    value: pack(value.clone()),
                    stored_at: Instant::now(),
                },
            );
            value
        };

        if self.is_current(ticket) {
            Ok(Fetched::Current(value))
        } else {
            tracing::debug!(
                ?key,
                slot = ?ticket.slot,
                generation = ticket.generation,
                "superseded response fenced"
            );
            Ok(Fetched::Superseded)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use tokio::sync::Notify;

    use super::*;
    use crate::mock::MockDataSource;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    /// Counts calls and can hold entity responses until released.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        gate: Option<Notify>,
    }

    impl DataSource for CountingSource {
        async fn entities(&self, _parameters: &Parameters) -> Result<Vec<Entity>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(Vec::new())
        }

        async fn events_of_entity(
            &self,
            _entity_type: &str,
            _entity_id: &str,
            _range: &TimeRange,
        ) -> Result<Vec<EntityEvent>, DataError> {
            Ok(Vec::new())
        }

        async fn highlights(&self, _range: &TimeRange) -> Result<Vec<Highlight>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn entity_details(
            &self,
            _key: &EntityKey,
        ) -> Result<Option<EntityDetails>, DataError> {
            Ok(None)
        }

        async fn group_search(&self, _query: &str) -> Result<GroupSearchResults, DataError> {
            Err(DataError::Unavailable("search offline".to_owned()))
        }
    }

    fn closed() -> TimeRange {
        TimeRange::new(anchor() - TimeDelta::hours(6), Some(anchor())).unwrap()
    }

    #[tokio::test]
    async fn repeated_query_is_served_from_cache() {
        let client = QueryClient::new(Arc::new(CountingSource::default()), DEFAULT_OPEN_RANGE_TTL);
        for _ in 0..3 {
            let ticket = client.begin(QuerySlot::Highlights);
            client.highlights(ticket, &closed()).await.unwrap();
        }
        assert_eq!(client.source().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn open_range_entries_expire() {
        let client = QueryClient::new(Arc::new(CountingSource::default()), Duration::from_secs(30));
        let open = TimeRange::open(anchor());

        let ticket = client.begin(QuerySlot::Highlights);
        client.highlights(ticket, &open).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        let ticket = client.begin(QuerySlot::Highlights);
        client.highlights(ticket, &open).await.unwrap();
        assert_eq!(client.source().calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        let ticket = client.begin(QuerySlot::Highlights);
        client.highlights(ticket, &open).await.unwrap();
        assert_eq!(client.source().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn window_change_invalidates_windowed_entries() {
        let client = QueryClient::new(
            Arc::new(MockDataSource::new(anchor())),
            DEFAULT_OPEN_RANGE_TTL,
        );
        let ticket = client.begin(QuerySlot::Highlights);
        client.highlights(ticket, &closed()).await.unwrap();
        let ticket = client.begin(QuerySlot::Details);
        client
            .entity_details(ticket, &EntityKey::new("truck", "1").unwrap())
            .await
            .unwrap();
        assert_eq!(client.len().await, 2);

        client.invalidate_time_window().await;
        assert_eq!(client.len().await, 1);
    }

    #[tokio::test]
    async fn superseded_response_is_fenced() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            gate: Some(Notify::new()),
        });
        let client = Arc::new(QueryClient::new(Arc::clone(&source), DEFAULT_OPEN_RANGE_TTL));
        let params = Parameters::with_range(closed());

        let stale = client.begin(QuerySlot::Entities);
        let pending = {
            let client = Arc::clone(&client);
            let params = params.clone();
            tokio::spawn(async move { client.entities(stale, &params).await })
        };
        tokio::task::yield_now().await;

        let fresh = client.begin(QuerySlot::Entities);
        assert!(!client.is_current(stale));
        assert!(client.is_current(fresh));

        if let Some(gate) = &source.gate {
            gate.notify_one();
        }
        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome, Fetched::Superseded);

        // The fresh request is served from the entry the stale one stored.
        let outcome = client.entities(fresh, &params).await.unwrap();
        assert_eq!(outcome.current(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn source_errors_propagate_and_are_not_cached() {
        let client = QueryClient::new(Arc::new(CountingSource::default()), DEFAULT_OPEN_RANGE_TTL);
        let ticket = client.begin(QuerySlot::GroupSearch);
        let err = client.group_search(ticket, "x").await.unwrap_err();
        assert!(matches!(err, DataError::Unavailable(_)));
        assert!(client.is_empty().await);
    }

    #[tokio::test]
    async fn random_entity_is_unsupported_by_default() {
        let err = CountingSource::default().add_random_entity().await.unwrap_err();
        assert!(matches!(err, DataError::Unsupported(_)));
    }

    #[test]
    fn slots_fence_independently() {
        let client = QueryClient::new(Arc::new(CountingSource::default()), DEFAULT_OPEN_RANGE_TTL);
        let history = client.begin(QuerySlot::History);
        let _ = client.begin(QuerySlot::Entities);
        assert!(client.is_current(history));
        let newer = client.begin(QuerySlot::History);
        assert!(!client.is_current(history));
        assert_eq!(newer.generation(), history.generation() + 1);
    }
}
