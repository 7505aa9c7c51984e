//! A dashboard session.
//!
//! The session owns one dispatcher and the state it produces, runs the
//! effects of each reduction against the query client and publishes every
//! new state to the stores and to snapshot subscribers. All state changes
//! go through one lock so interactions and fetch results apply in order;
//! the lock is never held across a fetch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast};
use waypoint_data::{DataSource, Fetched, QueryClient, QuerySlot, Ticket};
use waypoint_types::{EntityKey, SessionId};

use crate::clock::Clock;
use crate::config::DashboardConfig;
use crate::debounce::Debouncer;
use crate::dispatcher::{DispatchError, Dispatcher, Effect, Interaction, Loaded, Transition};
use crate::history::HistoryProjector;
use crate::state::DashboardState;
use crate::store::Stores;

/// Capacity of the snapshot broadcast channel.
pub const SNAPSHOT_CAPACITY: usize = 16;

struct Inner {
    dispatcher: Dispatcher,
    state: Arc<DashboardState>,
}

/// One user's dashboard: state, stores and the effects runner.
pub struct Session<S> {
    id: SessionId,
    config: DashboardConfig,
    clock: Arc<dyn Clock>,
    client: Arc<QueryClient<S>>,
    projector: HistoryProjector,
    debouncer: Debouncer,
    inner: Mutex<Inner>,
    stores: Stores,
    snapshots: broadcast::Sender<Arc<DashboardState>>,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl<S: DataSource> Session<S> {
    /// Create a session over `source`. Nothing is fetched until
    /// [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the configured default window cannot
    /// be shown on the master timeline.
    pub fn new(
        config: DashboardConfig,
        source: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, DispatchError> {
        let now = clock.now();
        let dispatcher = Dispatcher::new(&config, now)?;
        let state = DashboardState::new(&config, now);
        let stores = Stores::new(&state);
        let (snapshots, _) = broadcast::channel(SNAPSHOT_CAPACITY);
        let client = Arc::new(QueryClient::new(source, config.cache.open_range_ttl()));
        let session = Self {
            id: SessionId::new(),
            projector: HistoryProjector::from_config(&config.history),
            debouncer: Debouncer::new(config.history.scrub_debounce()),
            config,
            clock,
            client,
            inner: Mutex::new(Inner {
                dispatcher,
                state: Arc::new(state),
            }),
            stores,
            snapshots,
        };
        tracing::info!(session = %session.id, "session created");
        Ok(Arc::new(session))
    }

    /// Session id.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The current instant on the session clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Loaded configuration.
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// The observable stores.
    pub const fn stores(&self) -> &Stores {
        &self.stores
    }

    /// The query client shared with direct data endpoints.
    pub const fn client(&self) -> &Arc<QueryClient<S>> {
        &self.client
    }

    /// The current state.
    pub async fn snapshot(&self) -> Arc<DashboardState> {
        Arc::clone(&self.inner.lock().await.state)
    }

    /// Receive every new state. A lagging receiver skips to the newest.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DashboardState>> {
        self.snapshots.subscribe()
    }

    /// Load the initial entity set and highlights.
    pub async fn start(self: &Arc<Self>) {
        self.run_effects(vec![Effect::FetchEntities, Effect::FetchHighlights])
            .await;
    }

    /// Reduce `interaction`, run its effects and return the resulting
    /// state. Debounced history recomputes may land after this returns.
    ///
    /// # Errors
    ///
    /// Returns the [`DispatchError`] of a rejected interaction; the state
    /// is unchanged in that case.
    pub async fn dispatch(
        self: &Arc<Self>,
        interaction: Interaction,
    ) -> Result<Arc<DashboardState>, DispatchError> {
        let now = self.clock.now();
        let effects = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            let Transition { state, effects } =
                inner.dispatcher.reduce(&inner.state, interaction, now)?;
            self.commit(inner, state);
            effects
        };
        self.run_effects(effects).await;
        Ok(self.snapshot().await)
    }

    fn commit(&self, inner: &mut Inner, state: DashboardState) {
        if *inner.state == state {
            return;
        }
        inner.state = Arc::new(state);
        self.stores.publish(&inner.state);
        if self.snapshots.send(Arc::clone(&inner.state)).is_err() {
            tracing::trace!("snapshot dropped, no subscribers");
        }
    }

    /// The current state and a fresh `slot` ticket, taken under one lock so
    /// the ticket order matches the order of the states they were read from.
    async fn read_for(&self, slot: QuerySlot) -> (Arc<DashboardState>, Ticket) {
        let guard = self.inner.lock().await;
        (Arc::clone(&guard.state), self.client.begin(slot))
    }

    /// Apply a fetch result unless a newer request of its slot has started.
    async fn apply(&self, ticket: Ticket, loaded: Loaded) {
        let mut guard = self.inner.lock().await;
        if !self.client.is_current(ticket) {
            tracing::trace!(slot = ?ticket.slot(), "dropping superseded result");
            return;
        }
        let inner = &mut *guard;
        match inner.dispatcher.apply(&inner.state, loaded) {
            Ok(state) => self.commit(inner, state),
            Err(err) => tracing::warn!(%err, "failed to apply fetch result"),
        }
    }

    async fn run_effects(self: &Arc<Self>, effects: Vec<Effect>) {
        for effect in effects {
            tracing::debug!(?effect, "running effect");
            match effect {
                Effect::FetchEntities => self.fetch_entities().await,
                Effect::FetchHighlights => self.fetch_highlights().await,
                Effect::FetchEntityData(key) => self.fetch_entity_data(key).await,
                Effect::RecomputeHistory => {
                    self.debouncer.cancel();
                    self.recompute_history().await;
                }
                Effect::ScheduleHistory => {
                    let session = Arc::clone(self);
                    self.debouncer.trigger(async move {
                        session.recompute_history().await;
                    });
                }
                Effect::InvalidateWindow => self.client.invalidate_time_window().await,
                Effect::AddRandomEntity => match self.client.source().add_random_entity().await {
                    Ok(entity) => {
                        tracing::info!(
                            entity_type = %entity.entity_type,
                            id = %entity.id,
                            "random entity added"
                        );
                        self.client.invalidate_entities().await;
                        self.fetch_entities().await;
                    }
                    Err(err) => tracing::warn!(%err, "failed to add random entity"),
                },
            }
        }
    }

    async fn fetch_entities(&self) {
        let (state, ticket) = self.read_for(QuerySlot::Entities).await;
        match self.client.entities(ticket, &state.parameters).await {
            Ok(Fetched::Current(entities)) => {
                self.apply(ticket, Loaded::Entities(entities)).await;
            }
            Ok(Fetched::Superseded) => {}
            Err(err) => tracing::warn!(%err, "entity fetch failed"),
        }
    }

    async fn fetch_highlights(&self) {
        let (state, ticket) = self.read_for(QuerySlot::Highlights).await;
        match self.client.highlights(ticket, &state.parameters.time_range).await {
            Ok(Fetched::Current(highlights)) => {
                self.apply(ticket, Loaded::Highlights(highlights)).await;
            }
            Ok(Fetched::Superseded) => {}
            Err(err) => tracing::warn!(%err, "highlight fetch failed"),
        }
    }

    async fn fetch_entity_data(&self, key: EntityKey) {
        let (state, ticket) = self.read_for(QuerySlot::EntityEvents).await;
        match self
            .client
            .events_of_entity(ticket, key.entity_type(), key.id(), &state.parameters.time_range)
            .await
        {
            Ok(Fetched::Current(events)) => {
                self.apply(
                    ticket,
                    Loaded::EntityEvents {
                        key: key.clone(),
                        events,
                    },
                )
                .await;
            }
            Ok(Fetched::Superseded) => {}
            Err(err) => tracing::warn!(%err, entity = %key, "event fetch failed"),
        }

        let ticket = self.client.begin(QuerySlot::Details);
        match self.client.entity_details(ticket, &key).await {
            Ok(Fetched::Current(details)) => {
                self.apply(ticket, Loaded::Details { key, details }).await;
            }
            Ok(Fetched::Superseded) => {}
            Err(err) => tracing::warn!(%err, entity = %key, "details fetch failed"),
        }
    }

    /// Project the focused entity's history at the current scrub instant.
    /// Projection errors clear the overlay.
    async fn recompute_history(&self) {
        let (state, ticket) = self.read_for(QuerySlot::History).await;
        let Some(key) = state.focus.focused_entity.clone() else {
            return;
        };
        let now = self.clock.now();
        let outcome = self
            .projector
            .recompute(
                &self.client,
                ticket,
                &key,
                &state.parameters.time_range,
                state.focus.scrub_time,
                now,
            )
            .await;
        match outcome {
            Ok(Fetched::Current(trail)) => {
                self.apply(
                    ticket,
                    Loaded::Trail {
                        key,
                        trail: Some(Box::new(trail)),
                    },
                )
                .await;
            }
            Ok(Fetched::Superseded) => {}
            Err(err) => {
                tracing::warn!(%err, entity = %key, "history projection failed");
                self.apply(ticket, Loaded::Trail { key, trail: None }).await;
            }
        }
    }
}
