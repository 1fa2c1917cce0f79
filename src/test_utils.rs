//! Shared test fakes and arbitrary generators for property-based testing.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Weekday};
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::github::{GitHubApiError, HostingApi, InstallationLister};
use crate::schedule::{Hour, Tick, WEEKDAYS, WeeklySchedule, WeeklyWindow};
use crate::status::{CommitStatus, STATUS_CONTEXT};
use crate::store::{ConfigStore, ConfigsByOwner, DocumentError, MemoryConfigStore, StoreError};
use crate::types::{Installation, InstallationId, PullRequest, RepoId, RepositoryConfig, Sha};

// ─── Builders ─────────────────────────────────────────────────────────────────

/// A valid SHA derived from `n`.
pub fn make_sha(n: u64) -> Sha {
    Sha::parse(format!("{:040x}", n)).unwrap()
}

/// The UTC tick at `hour` on `day` in the week of Monday 2020-02-03.
pub fn tick_on(day: Weekday, hour: u32) -> Tick {
    let monday = NaiveDate::from_ymd_opt(2020, 2, 3).unwrap();
    let date = monday + chrono::Days::new(u64::from(day.num_days_from_monday()));
    assert_eq!(date.weekday(), day);
    let at = date.and_hms_opt(hour, 0, 0).unwrap().and_utc();
    Tick::utc(at)
}

pub fn window(start: u32, stop: u32) -> WeeklyWindow {
    WeeklyWindow::new(Hour::new(start).unwrap(), Hour::new(stop).unwrap())
}

/// A config with a single window on `day`.
pub fn config_with_window(
    owner: &str,
    name: &str,
    day: Weekday,
    start: u32,
    stop: u32,
    merge_available: bool,
) -> RepositoryConfig {
    RepositoryConfig::new(
        &RepoId::new(owner, name),
        WeeklySchedule::empty().with_window(day, window(start, stop)),
        merge_available,
    )
}

// ─── Strategies ───────────────────────────────────────────────────────────────

pub fn arb_window() -> impl Strategy<Value = WeeklyWindow> {
    (0u32..24, 0u32..24).prop_map(|(start, stop)| window(start, stop))
}

pub fn arb_schedule() -> impl Strategy<Value = WeeklySchedule> {
    prop::array::uniform7(prop::option::of(arb_window())).prop_map(|windows| {
        WEEKDAYS
            .iter()
            .zip(windows)
            .fold(WeeklySchedule::empty(), |schedule, (&day, window)| match window {
                Some(window) => schedule.with_window(day, window),
                None => schedule,
            })
    })
}

/// Ticks between 1970 and 2096, read in offsets from UTC-12 to UTC+14.
pub fn arb_tick() -> impl Strategy<Value = Tick> {
    (0i64..4_000_000_000, -12i32..=14).prop_map(|(secs, offset_hours)| {
        let at = DateTime::from_timestamp(secs, 0).unwrap();
        Tick::new(at, FixedOffset::east_opt(offset_hours * 3600).unwrap())
    })
}

// ─── Hosting API fake ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct HostingState {
    open_pulls: BTreeMap<RepoId, Vec<PullRequest>>,
    /// Latest status per context, like GitHub's combined status.
    statuses: BTreeMap<(RepoId, Sha), BTreeMap<String, CommitStatus>>,
    status_writes: usize,
    next_sha: u64,
    failing_lists: HashSet<RepoId>,
    panicking_lists: HashSet<RepoId>,
    failing_statuses: HashSet<RepoId>,
    /// While set and not cancelled, listings wait for it.
    listing_gate: Option<CancellationToken>,
    listings_started: usize,
}

/// An in-memory [`HostingApi`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeHostingApi {
    state: Arc<Mutex<HostingState>>,
}

impl FakeHostingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` open pull requests to `repo`, numbered from 1, each with
    /// a head SHA unique across the fake.
    pub fn add_open_pulls(&self, repo: &RepoId, count: u64) -> Vec<PullRequest> {
        let mut state = self.state.lock().unwrap();
        (1..=count)
            .map(|n| {
                state.next_sha += 1;
                let pull = PullRequest::new(repo.clone(), n, make_sha(state.next_sha));
                state.open_pulls.entry(repo.clone()).or_default().push(pull.clone());
                pull
            })
            .collect()
    }

    pub fn fail_listing_for(&self, repo: RepoId) {
        self.state.lock().unwrap().failing_lists.insert(repo);
    }

    /// Listing pull requests of `repo` panics.
    pub fn panic_listing_for(&self, repo: RepoId) {
        self.state.lock().unwrap().panicking_lists.insert(repo);
    }

    /// Holds every listing until the returned token is cancelled.
    pub fn hold_listings(&self) -> CancellationToken {
        let release = CancellationToken::new();
        self.state.lock().unwrap().listing_gate = Some(release.clone());
        release
    }

    /// How many listings have been started, held ones included.
    pub fn listings_started(&self) -> usize {
        self.state.lock().unwrap().listings_started
    }

    pub fn fail_statuses_for(&self, repo: RepoId) {
        self.state.lock().unwrap().failing_statuses.insert(repo);
    }

    /// The `merge-chance-time` status on `sha`, if any.
    pub fn status_for(&self, repo: &RepoId, sha: &Sha) -> Option<CommitStatus> {
        let state = self.state.lock().unwrap();
        state
            .statuses
            .get(&(repo.clone(), sha.clone()))
            .and_then(|by_context| by_context.get(STATUS_CONTEXT))
            .cloned()
    }

    /// Every status line on `sha`, one per context.
    pub fn statuses_for(&self, repo: &RepoId, sha: &Sha) -> Vec<CommitStatus> {
        let state = self.state.lock().unwrap();
        state
            .statuses
            .get(&(repo.clone(), sha.clone()))
            .map(|by_context| by_context.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn status_write_count(&self) -> usize {
        self.state.lock().unwrap().status_writes
    }
}

impl HostingApi for FakeHostingApi {
    async fn list_open_pull_requests(
        &self,
        repo: &RepoId,
    ) -> Result<Vec<PullRequest>, GitHubApiError> {
        let (gate, panics) = {
            let mut state = self.state.lock().unwrap();
            state.listings_started += 1;
            (state.listing_gate.clone(), state.panicking_lists.contains(repo))
        };
        if let Some(gate) = gate {
            gate.cancelled().await;
        }
        // Outside the lock, so the mutex is not poisoned.
        if panics {
            panic!("listing pull requests of {repo} panicked");
        }

        let state = self.state.lock().unwrap();
        if state.failing_lists.contains(repo) {
            return Err(GitHubApiError::permanent_without_source(format!(
                "listing pull requests of {repo} failed"
            )));
        }
        Ok(state.open_pulls.get(repo).cloned().unwrap_or_default())
    }

    async fn create_commit_status(
        &self,
        repo: &RepoId,
        sha: &Sha,
        status: &CommitStatus,
    ) -> Result<(), GitHubApiError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_statuses.contains(repo) {
            return Err(GitHubApiError::permanent_without_source("status write rejected"));
        }
        state.status_writes += 1;
        state
            .statuses
            .entry((repo.clone(), sha.clone()))
            .or_default()
            .insert(status.context.clone(), status.clone());
        Ok(())
    }
}

// ─── Installation fake ────────────────────────────────────────────────────────

/// An in-memory [`InstallationLister`]. Every installation shares one
/// [`FakeHostingApi`], so assertions can look at a single place.
#[derive(Debug, Clone, Default)]
pub struct FakeInstallations {
    installations: Vec<Installation>,
    api: FakeHostingApi,
    fail_listing: bool,
}

impl FakeInstallations {
    pub fn new(api: FakeHostingApi) -> Self {
        FakeInstallations {
            api,
            ..Self::default()
        }
    }

    pub fn with_installation(mut self, id: u64, owner_login: &str) -> Self {
        self.installations.push(Installation::new(id, owner_login));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_listing = true;
        self
    }
}

impl InstallationLister for FakeInstallations {
    type Client = FakeHostingApi;

    async fn list_installations(&self) -> Result<Vec<Installation>, GitHubApiError> {
        if self.fail_listing {
            return Err(GitHubApiError::transient_without_source("installations unavailable"));
        }
        Ok(self.installations.clone())
    }

    fn client_for(&self, installation: InstallationId) -> Result<FakeHostingApi, GitHubApiError> {
        if self.installations.iter().any(|i| i.id == installation) {
            Ok(self.api.clone())
        } else {
            Err(GitHubApiError::permanent_without_source(format!(
                "unknown installation {installation}"
            )))
        }
    }

    async fn find_repository_installation(
        &self,
        repo: &RepoId,
    ) -> Result<Option<Installation>, GitHubApiError> {
        Ok(self
            .installations
            .iter()
            .find(|i| i.owner_login == repo.owner)
            .cloned())
    }
}

// ─── Store fake ───────────────────────────────────────────────────────────────

/// A [`ConfigStore`] whose reads and/or writes fail with
/// [`StoreError::Unavailable`]. Reads that do not fail come from `inner`.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub inner: MemoryConfigStore,
    fail_reads: bool,
    fail_writes: bool,
    write_attempts: AtomicUsize,
}

impl FailingStore {
    /// Every call fails.
    pub fn unavailable() -> Self {
        FailingStore {
            fail_reads: true,
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Reads succeed from `configs`, writes fail.
    pub fn read_only(configs: impl IntoIterator<Item = RepositoryConfig>) -> Self {
        FailingStore {
            inner: MemoryConfigStore::with_configs(configs),
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn unavailable_error() -> StoreError {
        StoreError::Unavailable(DocumentError::Io(io::Error::other("disk on fire")))
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads {
            Err(Self::unavailable_error())
        } else {
            Ok(())
        }
    }

    fn check_write(&self) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            Err(Self::unavailable_error())
        } else {
            Ok(())
        }
    }
}

impl ConfigStore for FailingStore {
    async fn list_configs_grouped_by_owner(&self) -> Result<ConfigsByOwner, StoreError> {
        self.check_read()?;
        self.inner.list_configs_grouped_by_owner().await
    }

    async fn get_config(&self, repo: &RepoId) -> Result<RepositoryConfig, StoreError> {
        self.check_read()?;
        self.inner.get_config(repo).await
    }

    async fn put_configs(&self, batch: Vec<RepositoryConfig>) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.put_configs(batch).await
    }

    async fn delete_config(&self, repo: &RepoId) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.delete_config(repo).await
    }

    async fn delete_configs_by_owner(&self, owner: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.delete_configs_by_owner(owner).await
    }
}
