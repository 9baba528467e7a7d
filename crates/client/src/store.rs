//! Cache-first profile store.
//!
//! Ordering guarantees:
//! - a valid cached profile is exposed synchronously at construction, before
//!   any fetch resolves;
//! - at most one fetch is in flight; concurrent callers join it;
//! - `refetch` clears the cache before its future is even polled;
//! - every fetch start and every clear bumps a generation counter, and a
//!   completion from an older generation is discarded.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use chrono::Duration;
use tokio::sync::watch;

use adminpanel_auth::{
    GuardDecision, GuardState, ModuleCatalog, PermissionResolver, Profile, RouteGuard,
    RouteRequirement,
};
use adminpanel_core::{Clock, SystemClock};

use crate::cache::{PROFILE_TTL_MINUTES, ProfileCache};
use crate::fetch::{FetchError, ProfileFetcher};
use crate::session::Session;
use crate::storage::{KeyValueStorage, StorageError};

type FetchOutcome = Result<Profile, FetchError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Automatic retries after a failed fetch before the error is surfaced.
    pub fetch_retries: u32,
    pub cache_ttl: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            fetch_retries: 1,
            cache_ttl: Duration::minutes(PROFILE_TTL_MINUTES),
        }
    }
}

/// Point-in-time view of the store, as consumed by guards and views.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub profile: Option<Profile>,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_error: bool,
    pub error: Option<FetchError>,
}

impl StoreSnapshot {
    pub fn resolver<'a>(&'a self, catalog: &'a ModuleCatalog) -> PermissionResolver<'a> {
        PermissionResolver::new(self.profile.as_ref(), catalog)
    }

    /// Run the route guard against this snapshot.
    pub fn guard(
        &self,
        catalog: &ModuleCatalog,
        requirement: &RouteRequirement,
        location: &str,
    ) -> GuardDecision {
        let state = GuardState {
            is_loading: self.is_loading,
            resolver: self.resolver(catalog),
            location,
        };
        RouteGuard::new(requirement.clone()).decide(&state)
    }
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    outcome: watch::Receiver<Option<FetchOutcome>>,
}

#[derive(Debug, Default)]
struct StoreState {
    profile: Option<Profile>,
    error: Option<FetchError>,
    generation: u64,
    in_flight: Option<InFlight>,
}

enum FetchStart {
    Join(watch::Receiver<Option<FetchOutcome>>),
    Lead(u64, watch::Sender<Option<FetchOutcome>>),
}

/// Clears the in-flight slot if the leading future is dropped before settling,
/// so later callers start a new request instead of joining a dead one.
struct LeaderGuard<'a> {
    state: &'a Mutex<StoreState>,
    generation: u64,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if state
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == self.generation)
        {
            state.in_flight = None;
        }
    }
}

fn lock(state: &Mutex<StoreState>) -> MutexGuard<'_, StoreState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns the signed-in administrator's profile for the rest of the console.
pub struct ProfileStore<F, S, C = SystemClock> {
    fetcher: F,
    cache: ProfileCache<S, C>,
    session: Session<S>,
    options: StoreOptions,
    state: Mutex<StoreState>,
}

impl<F, S, C> ProfileStore<F, S, C>
where
    F: ProfileFetcher,
    S: KeyValueStorage + Clone,
    C: Clock,
{
    /// Build the store over shared storage.
    ///
    /// With a session token present, a valid cached profile is surfaced
    /// immediately.
    pub fn new(fetcher: F, storage: S, clock: C, options: StoreOptions) -> Self {
        let cache = ProfileCache::new(storage.clone(), clock).with_ttl(options.cache_ttl);
        let session = Session::new(storage);

        let profile = if session.is_authenticated() {
            cache.read()
        } else {
            None
        };

        Self {
            fetcher,
            cache,
            session,
            options,
            state: Mutex::new(StoreState {
                profile,
                ..StoreState::default()
            }),
        }
    }

    pub fn cache(&self) -> &ProfileCache<S, C> {
        &self.cache
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let has_token = self.session.is_authenticated();
        let state = lock(&self.state);
        let is_fetching = state.in_flight.is_some();

        StoreSnapshot {
            profile: state.profile.clone(),
            is_loading: state.profile.is_none()
                && (is_fetching || (has_token && state.error.is_none())),
            is_fetching,
            is_error: state.error.is_some(),
            error: state.error.clone(),
        }
    }

    /// Make sure a profile is available: serve a valid cache entry, otherwise
    /// fetch (joining any request already in flight).
    ///
    /// Does nothing without a session token.
    pub async fn ensure_profile(&self) -> StoreSnapshot {
        if !self.session.is_authenticated() {
            return self.snapshot();
        }

        {
            let mut state = lock(&self.state);
            if let Some(profile) = self.cache.read() {
                state.profile = Some(profile);
                state.error = None;
                drop(state);
                return self.snapshot();
            }
        }

        let _ = self.fetch(false).await;
        self.snapshot()
    }

    /// Drop the cached profile and fetch a fresh one.
    ///
    /// The cache is cleared when this is called, not when the returned future
    /// is first polled.
    pub fn refetch(&self) -> impl Future<Output = StoreSnapshot> + '_ {
        self.clear_cache();
        async move {
            let _ = self.fetch(true).await;
            self.snapshot()
        }
    }

    /// Forget the profile without fetching again. Any fetch still in flight
    /// will not write its result.
    pub fn clear_cache(&self) {
        // Same critical section as `settle`, so a completing fetch either
        // lands before the clear or sees the bumped generation.
        let mut state = lock(&self.state);
        state.generation += 1;
        state.in_flight = None;
        state.profile = None;
        state.error = None;
        self.cache.clear();
    }

    /// Log out: clear the profile and end the session.
    pub fn sign_out(&self) -> Result<(), StorageError> {
        self.clear_cache();
        self.session.end()
    }

    async fn fetch(&self, force: bool) -> FetchOutcome {
        let Some(token) = self.session.token() else {
            return Err(FetchError::Unauthenticated);
        };

        let start = {
            let mut state = lock(&self.state);
            let pending = match (&state.in_flight, force) {
                (Some(in_flight), false) => Some(in_flight.outcome.clone()),
                _ => None,
            };
            match pending {
                Some(rx) => FetchStart::Join(rx),
                None => {
                    state.generation += 1;
                    let generation = state.generation;
                    let (tx, rx) = watch::channel(None);
                    state.in_flight = Some(InFlight {
                        generation,
                        outcome: rx,
                    });
                    FetchStart::Lead(generation, tx)
                }
            }
        };

        match start {
            FetchStart::Join(rx) => {
                tracing::debug!("joining profile fetch already in flight");
                join(rx).await
            }
            FetchStart::Lead(generation, tx) => {
                let _guard = LeaderGuard {
                    state: &self.state,
                    generation,
                };
                let outcome = self.fetch_with_retry(&token).await;
                self.settle(generation, &outcome);
                tx.send_replace(Some(outcome.clone()));
                outcome
            }
        }
    }

    async fn fetch_with_retry(&self, token: &str) -> FetchOutcome {
        let attempts = self.options.fetch_retries + 1;
        let mut attempt = 1;
        loop {
            match self.fetcher.fetch_profile(token).await {
                Ok(profile) => return Ok(profile),
                Err(err) if attempt < attempts => {
                    tracing::warn!(attempt, "profile fetch failed; retrying: {err}");
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(attempt, "profile fetch failed: {err}");
                    return Err(err);
                }
            }
        }
    }

    fn settle(&self, generation: u64, outcome: &FetchOutcome) {
        let mut state = lock(&self.state);
        if state.generation != generation {
            tracing::debug!(
                generation,
                current = state.generation,
                "discarding superseded profile fetch"
            );
            return;
        }

        state.in_flight = None;
        match outcome {
            Ok(profile) => {
                self.cache.write(profile);
                state.profile = Some(profile.clone());
                state.error = None;
            }
            Err(err) => {
                state.error = Some(err.clone());
            }
        }
    }
}

async fn join(mut rx: watch::Receiver<Option<FetchOutcome>>) -> FetchOutcome {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => {
            let outcome: Option<FetchOutcome> = (*outcome).clone();
            outcome.unwrap_or(Err(FetchError::Abandoned))
        }
        Err(_) => Err(FetchError::Abandoned),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Notify;

    use adminpanel_auth::{DASHBOARD, ModulePermission, Role};
    use adminpanel_core::{AdminId, ManualClock};

    use super::*;
    use crate::storage::{MemoryStorage, keys};

    struct Step {
        gate: Option<Arc<Notify>>,
        result: FetchOutcome,
    }

    impl Step {
        fn ready(result: FetchOutcome) -> Self {
            Self { gate: None, result }
        }

        fn gated(gate: Arc<Notify>, result: FetchOutcome) -> Self {
            Self {
                gate: Some(gate),
                result,
            }
        }
    }

    struct ScriptedFetcher {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Step>>,
    }

    impl ScriptedFetcher {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(steps.into()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileFetcher for ScriptedFetcher {
        async fn fetch_profile(&self, token: &str) -> Result<Profile, FetchError> {
            assert_eq!(token, "tok");
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().unwrap().pop_front();
            let Some(step) = step else {
                return Err(FetchError::Network("script exhausted".into()));
            };
            if let Some(gate) = step.gate {
                gate.notified().await;
            }
            step.result
        }
    }

    type TestStore = ProfileStore<Arc<ScriptedFetcher>, Arc<MemoryStorage>, Arc<ManualClock>>;

    fn profile(role: &str) -> Profile {
        Profile::new(
            AdminId::new("admin-1").unwrap(),
            Role::new(role, vec![ModulePermission::new("food-orders").with_view(true)]),
        )
    }

    fn signed_in() -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::TOKEN, "tok").unwrap();
        storage
    }

    fn store(fetcher: &Arc<ScriptedFetcher>, storage: &Arc<MemoryStorage>) -> (TestStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = ProfileStore::new(
            fetcher.clone(),
            storage.clone(),
            clock.clone(),
            StoreOptions::default(),
        );
        (store, clock)
    }

    fn seed_cache(storage: &Arc<MemoryStorage>, clock: &Arc<ManualClock>, p: &Profile) {
        ProfileCache::new(storage.clone(), clock.clone()).write(p);
    }

    #[tokio::test]
    async fn without_token_nothing_is_fetched() {
        let fetcher = ScriptedFetcher::new(vec![Step::ready(Ok(profile("Ops")))]);
        let storage = Arc::new(MemoryStorage::new());
        let (store, _) = store(&fetcher, &storage);

        let initial = store.snapshot();
        assert!(!initial.is_loading);
        assert_eq!(initial.profile, None);

        let snap = store.ensure_profile().await;
        assert_eq!(fetcher.calls(), 0);
        assert!(!snap.is_loading);
        assert_eq!(snap.profile, None);
    }

    #[tokio::test]
    async fn valid_cache_is_served_without_fetching() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let storage = signed_in();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        seed_cache(&storage, &clock, &profile("Cached"));

        let store = ProfileStore::new(fetcher.clone(), storage, clock, StoreOptions::default());
        let initial = store.snapshot();
        assert!(!initial.is_loading);
        assert_eq!(initial.profile, Some(profile("Cached")));

        store.ensure_profile().await;
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn cache_miss_fetches_and_writes_through() {
        let fetcher = ScriptedFetcher::new(vec![Step::ready(Ok(profile("Ops")))]);
        let storage = signed_in();
        let (store, _) = store(&fetcher, &storage);
        assert!(store.snapshot().is_loading);

        let snap = store.ensure_profile().await;
        assert_eq!(snap.profile, Some(profile("Ops")));
        assert!(!snap.is_loading && !snap.is_error);
        assert_eq!(store.cache().read(), Some(profile("Ops")));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_request() {
        let gate = Arc::new(Notify::new());
        let fetcher = ScriptedFetcher::new(vec![Step::gated(gate.clone(), Ok(profile("Ops")))]);
        let storage = signed_in();
        let (store, _) = store(&fetcher, &storage);

        let (a, b, ()) = tokio::join!(store.ensure_profile(), store.ensure_profile(), async {
            gate.notify_one();
        });

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(a.profile, Some(profile("Ops")));
        assert_eq!(b.profile, Some(profile("Ops")));
    }

    #[tokio::test]
    async fn one_retry_then_success() {
        let fetcher = ScriptedFetcher::new(vec![
            Step::ready(Err(FetchError::Network("reset".into()))),
            Step::ready(Ok(profile("Ops"))),
        ]);
        let storage = signed_in();
        let (store, _) = store(&fetcher, &storage);

        let snap = store.ensure_profile().await;
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(snap.profile, Some(profile("Ops")));
        assert!(!snap.is_error);
    }

    #[tokio::test]
    async fn failure_surfaces_after_one_retry() {
        let fetcher = ScriptedFetcher::new(vec![
            Step::ready(Err(FetchError::Network("reset".into()))),
            Step::ready(Err(FetchError::Api { status: 500, body: "boom".into() })),
            Step::ready(Ok(profile("Never"))),
        ]);
        let storage = signed_in();
        let (store, _) = store(&fetcher, &storage);

        let snap = store.ensure_profile().await;
        assert_eq!(fetcher.calls(), 2);
        assert!(snap.is_error);
        assert!(!snap.is_loading);
        assert_eq!(snap.error, Some(FetchError::Api { status: 500, body: "boom".into() }));
        assert_eq!(snap.profile, None);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_profile() {
        let fetcher = ScriptedFetcher::new(vec![
            Step::ready(Err(FetchError::Network("down".into()))),
            Step::ready(Err(FetchError::Network("down".into()))),
        ]);
        let storage = signed_in();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        seed_cache(&storage, &clock, &profile("Cached"));
        let store = ProfileStore::new(fetcher.clone(), storage, clock.clone(), StoreOptions::default());

        clock.advance(Duration::minutes(11));
        let snap = store.ensure_profile().await;

        assert_eq!(fetcher.calls(), 2);
        assert!(snap.is_error);
        assert_eq!(snap.profile, Some(profile("Cached")));
    }

    #[tokio::test]
    async fn refetch_clears_before_fetching() {
        let gate = Arc::new(Notify::new());
        let fetcher = ScriptedFetcher::new(vec![Step::gated(gate.clone(), Ok(profile("Fresh")))]);
        let storage = signed_in();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        seed_cache(&storage, &clock, &profile("Stale"));
        let store = ProfileStore::new(fetcher.clone(), storage, clock, StoreOptions::default());
        assert_eq!(store.snapshot().profile, Some(profile("Stale")));

        let pending = store.refetch();
        assert_eq!(store.cache().read(), None);
        assert_eq!(store.snapshot().profile, None);

        let (snap, ()) = tokio::join!(pending, async {
            gate.notify_one();
        });
        assert_eq!(snap.profile, Some(profile("Fresh")));
        assert_eq!(store.cache().read(), Some(profile("Fresh")));
    }

    #[tokio::test]
    async fn superseded_fetch_does_not_overwrite_newer_result() {
        let gate = Arc::new(Notify::new());
        let fetcher = ScriptedFetcher::new(vec![
            Step::gated(gate.clone(), Ok(profile("Old"))),
            Step::ready(Ok(profile("New"))),
        ]);
        let storage = signed_in();
        let (store, _) = store(&fetcher, &storage);

        let (_first, second) = tokio::join!(store.ensure_profile(), async {
            let snap = store.refetch().await;
            gate.notify_one();
            snap
        });

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(second.profile, Some(profile("New")));
        assert_eq!(store.snapshot().profile, Some(profile("New")));
        assert_eq!(store.cache().read(), Some(profile("New")));
    }

    #[tokio::test]
    async fn clear_cache_discards_in_flight_result() {
        let gate = Arc::new(Notify::new());
        let fetcher = ScriptedFetcher::new(vec![Step::gated(gate.clone(), Ok(profile("Ops")))]);
        let storage = signed_in();
        let (store, _) = store(&fetcher, &storage);

        tokio::join!(store.ensure_profile(), async {
            store.clear_cache();
            gate.notify_one();
        });

        assert_eq!(store.snapshot().profile, None);
        assert_eq!(store.cache().read(), None);
    }

    #[tokio::test]
    async fn sign_out_clears_profile_and_session() {
        let fetcher = ScriptedFetcher::new(vec![Step::ready(Ok(profile("Ops")))]);
        let storage = signed_in();
        let (store, _) = store(&fetcher, &storage);
        store.ensure_profile().await;

        store.sign_out().unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.profile, None);
        assert!(!snap.is_loading);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn snapshot_drives_the_route_guard() {
        let fetcher = ScriptedFetcher::new(vec![Step::ready(Ok(profile("Kitchen")))]);
        let storage = signed_in();
        let (store, _) = store(&fetcher, &storage);
        let catalog = ModuleCatalog::standard();
        let dashboard = RouteRequirement::new(DASHBOARD);

        assert_eq!(store.snapshot().guard(&catalog, &dashboard, "/"), GuardDecision::Loading);

        let snap = store.ensure_profile().await;
        assert_eq!(
            snap.guard(&catalog, &dashboard, "/"),
            GuardDecision::RedirectTo {
                path: "/food-orders".into()
            }
        );

        store.sign_out().unwrap();
        assert_eq!(
            store.snapshot().guard(&catalog, &dashboard, "/"),
            GuardDecision::RedirectLogin { from: "/".into() }
        );
    }

    #[tokio::test]
    async fn cache_hit_clears_earlier_error() {
        let fetcher = ScriptedFetcher::new(vec![
            Step::ready(Err(FetchError::Network("down".into()))),
            Step::ready(Err(FetchError::Network("down".into()))),
        ]);
        let storage = signed_in();
        let (store, clock) = store(&fetcher, &storage);

        assert!(store.ensure_profile().await.is_error);

        seed_cache(&storage, &clock, &profile("Ops"));
        let snap = store.ensure_profile().await;
        assert_eq!(snap.profile, Some(profile("Ops")));
        assert!(!snap.is_error);
        assert_eq!(snap.error, None);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn dropped_leader_abandons_joiners_and_frees_the_slot() {
        let gate = Arc::new(Notify::new());
        let fetcher = ScriptedFetcher::new(vec![
            Step::gated(gate.clone(), Ok(profile("Old"))),
            Step::ready(Ok(profile("New"))),
        ]);
        let storage = signed_in();
        let (store, _) = store(&fetcher, &storage);
        let tick = std::time::Duration::from_millis(10);

        let mut leader = Box::pin(store.ensure_profile());
        let mut joiner = Box::pin(store.fetch(false));
        assert!(tokio::time::timeout(tick, &mut leader).await.is_err());
        assert!(tokio::time::timeout(tick, &mut joiner).await.is_err());
        assert!(store.snapshot().is_fetching);

        drop(leader);
        assert_eq!(joiner.await, Err(FetchError::Abandoned));
        assert!(!store.snapshot().is_fetching);

        let snap = store.ensure_profile().await;
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(snap.profile, Some(profile("New")));
    }

    /// Storage that, while removing `profileTimestamp`, releases a gate and
    /// stalls, widening the window between clearing the cache and returning.
    #[derive(Default)]
    struct StallingStorage {
        inner: MemoryStorage,
        release_on_clear: Mutex<Option<Arc<Notify>>>,
    }

    impl KeyValueStorage for StallingStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            let gate = if key == keys::PROFILE_TIMESTAMP {
                self.release_on_clear.lock().unwrap().take()
            } else {
                None
            };
            if let Some(gate) = gate {
                gate.notify_one();
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            self.inner.remove(key)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sign_out_racing_a_fetch_leaves_nothing_persisted() {
        let gate = Arc::new(Notify::new());
        let fetcher = ScriptedFetcher::new(vec![Step::gated(gate.clone(), Ok(profile("Previous")))]);
        let storage = Arc::new(StallingStorage::default());
        storage.set(keys::TOKEN, "tok").unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(ProfileStore::new(
            fetcher.clone(),
            storage.clone(),
            clock,
            StoreOptions::default(),
        ));

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.ensure_profile().await }
        });
        while !store.snapshot().is_fetching {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        *storage.release_on_clear.lock().unwrap() = Some(gate.clone());
        store.sign_out().unwrap();
        task.await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(storage.get(keys::ADMIN_PROFILE), None);
        assert_eq!(storage.get(keys::PROFILE_TIMESTAMP), None);
        assert_eq!(store.snapshot().profile, None);
    }
}
