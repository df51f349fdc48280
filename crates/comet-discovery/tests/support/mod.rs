#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use comet_classifier::{Classifier, ClassifierError, CompletionRequest, InferenceProvider};
use comet_core::{
    AccountProfile, CandidateVideo, CreatorIdentity, PriorSnapshot, Provenance, SearchPage,
    StatSnapshot,
};
use comet_db::{RosterEntry, StaleCreator};
use comet_discovery::{
    AvatarCache, Collaborators, DiscoveryEngine, EngineConfig, ProfileFetcher, RosterStore,
    SourceError, StoreError, StoreSource, TrendSource, VideoSearch,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn today() -> NaiveDate {
    date(2025, 3, 10)
}

// ---------------------------------------------------------------------------
// In-memory roster store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredCreator {
    pub identity: CreatorIdentity,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub creators: BTreeMap<String, StoredCreator>,
    pub stats: BTreeMap<(String, NaiveDate), StatSnapshot>,
    pub trends: BTreeMap<(String, NaiveDate), i32>,
}

#[derive(Debug, Clone)]
enum Op {
    Creator(CreatorIdentity, Provenance),
    Snapshot(StatSnapshot),
    Trends(NaiveDate, Vec<(String, i32)>),
    Avatar(String, String),
    Evict(NaiveDate),
}

impl Tables {
    fn apply(&mut self, op: &Op) {
        match op {
            Op::Creator(identity, provenance) => {
                self.creators
                    .entry(identity.user_id.clone())
                    .and_modify(|c| c.identity = identity.clone())
                    .or_insert_with(|| StoredCreator {
                        identity: identity.clone(),
                        provenance: provenance.clone(),
                    });
            }
            Op::Snapshot(snapshot) => {
                let key = (snapshot.user_id.clone(), snapshot.recorded_date);
                let mut row = snapshot.clone();
                row.source_trend = match self.stats.get(&key) {
                    Some(existing) => row.source_trend.or_else(|| existing.source_trend.clone()),
                    None => row.source_trend.or_else(|| {
                        self.creators
                            .get(&snapshot.user_id)
                            .and_then(|c| c.provenance.discovered_via_trend.clone())
                    }),
                };
                self.stats.insert(key, row);
            }
            Op::Trends(day, trends) => {
                for (keyword, rank) in trends {
                    self.trends.insert((keyword.clone(), *day), *rank);
                }
            }
            Op::Avatar(user_id, url) => {
                if let Some(c) = self.creators.get_mut(user_id) {
                    c.identity.avatar_url = Some(url.clone());
                }
            }
            Op::Evict(cutoff) => {
                for user_id in self.stale(*cutoff) {
                    self.creators.remove(&user_id);
                    self.stats.retain(|(id, _), _| id != &user_id);
                }
            }
        }
    }

    fn stale(&self, cutoff: NaiveDate) -> Vec<String> {
        self.creators
            .keys()
            .filter(|id| {
                !self
                    .stats
                    .keys()
                    .any(|(sid, day)| sid == *id && *day >= cutoff)
            })
            .cloned()
            .collect()
    }

    pub fn snapshot(&self, user_id: &str, day: NaiveDate) -> Option<&StatSnapshot> {
        self.stats.get(&(user_id.to_string(), day))
    }
}

/// Shared "database". Phases buffer operations and replay them on commit,
/// so concurrent workers never clobber each other.
#[derive(Default)]
pub struct MemoryDb {
    committed: Mutex<Tables>,
    fail_snapshots_for: Mutex<HashSet<String>>,
    fail_commit_containing: Mutex<Option<String>>,
    fail_list_roster: Mutex<bool>,
    pub phases_committed: AtomicUsize,
    pub phases_aborted: AtomicUsize,
}

impl MemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn tables(&self) -> Tables {
        self.committed.lock().unwrap().clone()
    }

    pub fn seed_creator(&self, profile: &AccountProfile, trend: Option<&str>) {
        let identity = CreatorIdentity {
            user_id: profile.user_id.clone(),
            handle: profile.handle.clone(),
            nickname: profile.nickname.clone(),
            avatar_url: profile.avatar_url.clone(),
            signature: profile.signature.clone(),
            last_updated_at: chrono::Utc::now(),
        };
        let provenance = Provenance {
            discovered_via_trend: trend.map(str::to_string),
            breakout_video_id: None,
        };
        self.committed
            .lock()
            .unwrap()
            .apply(&Op::Creator(identity, provenance));
    }

    pub fn seed_snapshot(&self, user_id: &str, day: NaiveDate, followers: i64) {
        let snapshot = StatSnapshot {
            user_id: user_id.to_string(),
            recorded_date: day,
            follower_count: followers,
            heart_count: 0,
            video_count: 0,
            daily_growth_followers: 0,
            daily_growth_percent: rust_decimal::Decimal::ZERO,
            source_trend: None,
        };
        self.committed
            .lock()
            .unwrap()
            .apply(&Op::Snapshot(snapshot));
    }

    /// Makes every snapshot write for `user_id` fail.
    pub fn fail_snapshots_for(&self, user_id: &str) {
        self.fail_snapshots_for
            .lock()
            .unwrap()
            .insert(user_id.to_string());
    }

    /// Makes any phase that wrote `user_id` fail to commit.
    pub fn fail_commit_containing(&self, user_id: &str) {
        *self.fail_commit_containing.lock().unwrap() = Some(user_id.to_string());
    }

    pub fn fail_list_roster(&self) {
        *self.fail_list_roster.lock().unwrap() = true;
    }
}

pub struct MemoryStore {
    db: Arc<MemoryDb>,
    ops: Option<Vec<Op>>,
    savepoint: Option<usize>,
}

impl MemoryStore {
    fn ops(&mut self) -> Result<&mut Vec<Op>, StoreError> {
        self.ops.as_mut().ok_or(StoreError::NoUnitOfWork("phase"))
    }

    fn view(&self) -> Result<Tables, StoreError> {
        let ops = self.ops.as_ref().ok_or(StoreError::NoUnitOfWork("phase"))?;
        let mut tables = self.db.tables();
        for op in ops {
            tables.apply(op);
        }
        Ok(tables)
    }
}

#[async_trait]
impl RosterStore for MemoryStore {
    async fn begin_phase(&mut self) -> Result<(), StoreError> {
        if self.ops.is_some() {
            return Err(StoreError::UnitAlreadyOpen("phase"));
        }
        self.ops = Some(Vec::new());
        Ok(())
    }

    async fn commit_phase(&mut self) -> Result<(), StoreError> {
        let ops = self.ops.take().ok_or(StoreError::NoUnitOfWork("phase"))?;
        self.savepoint = None;
        let poisoned = self.db.fail_commit_containing.lock().unwrap().clone();
        if let Some(user_id) = poisoned {
            let touches = ops.iter().any(|op| match op {
                Op::Creator(identity, _) => identity.user_id == user_id,
                Op::Snapshot(s) => s.user_id == user_id,
                _ => false,
            });
            if touches {
                self.db.phases_aborted.fetch_add(1, Ordering::SeqCst);
                return Err(StoreError::Unavailable("commit rejected".into()));
            }
        }
        let mut committed = self.db.committed.lock().unwrap();
        for op in &ops {
            committed.apply(op);
        }
        self.db.phases_committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort_phase(&mut self) -> Result<(), StoreError> {
        self.savepoint = None;
        if self.ops.take().is_some() {
            self.db.phases_aborted.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn begin_item(&mut self) -> Result<(), StoreError> {
        if self.savepoint.is_some() {
            return Err(StoreError::UnitAlreadyOpen("item"));
        }
        let mark = self.ops()?.len();
        self.savepoint = Some(mark);
        Ok(())
    }

    async fn commit_item(&mut self) -> Result<(), StoreError> {
        self.savepoint
            .take()
            .map(|_| ())
            .ok_or(StoreError::NoUnitOfWork("item"))
    }

    async fn abort_item(&mut self) -> Result<(), StoreError> {
        let mark = self.savepoint.take().ok_or(StoreError::NoUnitOfWork("item"))?;
        self.ops()?.truncate(mark);
        Ok(())
    }

    async fn upsert_creator(
        &mut self,
        identity: &CreatorIdentity,
        provenance: &Provenance,
    ) -> Result<(), StoreError> {
        self.ops()?
            .push(Op::Creator(identity.clone(), provenance.clone()));
        Ok(())
    }

    async fn prior_snapshot(
        &mut self,
        user_id: &str,
        before: NaiveDate,
    ) -> Result<Option<PriorSnapshot>, StoreError> {
        let view = self.view()?;
        Ok(view
            .stats
            .values()
            .filter(|s| s.user_id == user_id && s.recorded_date < before)
            .max_by_key(|s| s.recorded_date)
            .map(|s| PriorSnapshot {
                follower_count: s.follower_count,
                heart_count: s.heart_count,
                video_count: s.video_count,
                recorded_date: s.recorded_date,
            }))
    }

    async fn upsert_snapshot(&mut self, snapshot: &StatSnapshot) -> Result<(), StoreError> {
        if self
            .db
            .fail_snapshots_for
            .lock()
            .unwrap()
            .contains(&snapshot.user_id)
        {
            return Err(StoreError::Unavailable("injected snapshot failure".into()));
        }
        if !self.view()?.creators.contains_key(&snapshot.user_id) {
            return Err(StoreError::Unavailable("foreign key violation".into()));
        }
        self.ops()?.push(Op::Snapshot(snapshot.clone()));
        Ok(())
    }

    async fn upsert_trends(
        &mut self,
        date: NaiveDate,
        trends: &[(String, i32)],
    ) -> Result<(), StoreError> {
        self.ops()?.push(Op::Trends(date, trends.to_vec()));
        Ok(())
    }

    async fn list_roster(&mut self) -> Result<Vec<RosterEntry>, StoreError> {
        if *self.db.fail_list_roster.lock().unwrap() {
            return Err(StoreError::Unavailable("roster unavailable".into()));
        }
        let mut roster: Vec<RosterEntry> = self
            .view()?
            .creators
            .values()
            .map(|c| RosterEntry {
                user_id: c.identity.user_id.clone(),
                handle: c.identity.handle.clone(),
                avatar_url: c.identity.avatar_url.clone(),
            })
            .collect();
        roster.sort_by(|a, b| (&a.handle, &a.user_id).cmp(&(&b.handle, &b.user_id)));
        Ok(roster)
    }

    async fn update_avatar(&mut self, user_id: &str, avatar_url: &str) -> Result<bool, StoreError> {
        let exists = self.view()?.creators.contains_key(user_id);
        if exists {
            self.ops()?
                .push(Op::Avatar(user_id.to_string(), avatar_url.to_string()));
        }
        Ok(exists)
    }

    async fn evict_stale(&mut self, cutoff: NaiveDate) -> Result<Vec<StaleCreator>, StoreError> {
        let view = self.view()?;
        let evicted = view
            .stale(cutoff)
            .into_iter()
            .map(|user_id| StaleCreator {
                handle: view.creators[&user_id].identity.handle.clone(),
                user_id,
            })
            .collect();
        self.ops()?.push(Op::Evict(cutoff));
        Ok(evicted)
    }
}

pub struct MemoryStoreSource {
    pub db: Arc<MemoryDb>,
}

#[async_trait]
impl StoreSource for MemoryStoreSource {
    async fn open(&self) -> Result<Box<dyn RosterStore>, StoreError> {
        Ok(Box::new(MemoryStore {
            db: Arc::clone(&self.db),
            ops: None,
            savepoint: None,
        }))
    }
}

// ---------------------------------------------------------------------------
// Fake sources
// ---------------------------------------------------------------------------

pub fn account(user_id: &str, handle: &str, followers: i64) -> AccountProfile {
    AccountProfile {
        user_id: user_id.to_string(),
        handle: handle.to_string(),
        nickname: handle.to_string(),
        avatar_url: Some(format!("https://cdn.example/{handle}.jpeg")),
        signature: String::new(),
        follower_count: followers,
        heart_count: followers * 10,
        video_count: 42,
    }
}

pub fn video(id: &str, author: AccountProfile, plays: i64, caption: &str) -> CandidateVideo {
    CandidateVideo {
        video_id: id.to_string(),
        caption: caption.to_string(),
        play_count: plays,
        author,
    }
}

pub fn page(items: Vec<CandidateVideo>, has_more: bool, next_cursor: i64) -> SearchPage {
    SearchPage {
        items,
        has_more,
        next_cursor,
    }
}

pub struct FakeTrends(pub Result<Vec<String>, String>);

#[async_trait]
impl TrendSource for FakeTrends {
    async fn fetch_trending(&self, limit: usize, _region: &str) -> Result<Vec<String>, SourceError> {
        match &self.0 {
            Ok(words) => Ok(words.iter().take(limit).cloned().collect()),
            Err(msg) => Err(SourceError::Unavailable(msg.clone())),
        }
    }
}

/// Time between each recorded call and the one before it.
pub fn gaps(times: &Mutex<Vec<Instant>>) -> Vec<Duration> {
    let mut times = times.lock().unwrap().clone();
    times.sort();
    times.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Serves scripted pages per keyword, indexed by call order; records calls.
#[derive(Default)]
pub struct FakeSearch {
    pages: HashMap<String, Vec<Result<SearchPage, String>>>,
    pub calls: Mutex<Vec<(String, i64)>>,
    pub call_times: Mutex<Vec<Instant>>,
}

impl FakeSearch {
    pub fn with(mut self, keyword: &str, pages: Vec<Result<SearchPage, String>>) -> Self {
        self.pages.insert(keyword.to_string(), pages);
        self
    }

    pub fn calls_for(&self, keyword: &str) -> Vec<i64> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == keyword)
            .map(|(_, cursor)| *cursor)
            .collect()
    }
}

#[async_trait]
impl VideoSearch for FakeSearch {
    async fn search(&self, keyword: &str, cursor: i64) -> Result<SearchPage, SourceError> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.iter().filter(|(k, _)| k == keyword).count();
            calls.push((keyword.to_string(), cursor));
            self.call_times.lock().unwrap().push(Instant::now());
            index
        };
        match self.pages.get(keyword).and_then(|p| p.get(call_index)) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(msg)) => Err(SourceError::Unavailable(msg.clone())),
            None => Ok(SearchPage::default()),
        }
    }
}

#[derive(Default)]
pub struct FakeProfiles {
    profiles: HashMap<String, AccountProfile>,
    failing: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
    pub call_times: Mutex<Vec<Instant>>,
}

impl FakeProfiles {
    pub fn with(mut self, profile: AccountProfile) -> Self {
        self.profiles.insert(profile.handle.clone(), profile);
        self
    }

    pub fn failing(mut self, handle: &str) -> Self {
        self.failing.insert(handle.to_string());
        self
    }
}

#[async_trait]
impl ProfileFetcher for FakeProfiles {
    async fn fetch_profile(&self, handle: &str) -> Result<Option<AccountProfile>, SourceError> {
        self.calls.lock().unwrap().push(handle.to_string());
        self.call_times.lock().unwrap().push(Instant::now());
        if self.failing.contains(handle) {
            return Err(SourceError::Unavailable("timeout".into()));
        }
        Ok(self.profiles.get(handle).cloned())
    }
}

/// Relevance: answers with `relevant` as a JSON array (or a JSON object,
/// which keeps every keyword). Personality: REJECT for listed handles.
pub struct ScriptedAi {
    pub relevant: Option<Vec<String>>,
    pub reject_handles: Vec<String>,
    pub personality_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl InferenceProvider for ScriptedAi {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClassifierError> {
        if request.prompt.contains("Respond with ONLY: ACCEPT or REJECT") {
            self.personality_calls.fetch_add(1, Ordering::SeqCst);
            let rejected = self
                .reject_handles
                .iter()
                .any(|h| request.prompt.contains(&format!("Username: @{h}\n")));
            return Ok(if rejected { "REJECT" } else { "ACCEPT" }.to_string());
        }
        Ok(match &self.relevant {
            Some(words) => serde_json::to_string(words).unwrap(),
            None => "{}".to_string(),
        })
    }
}

/// Rewrites every avatar to a fixed storage prefix.
pub struct PrefixAvatars;

#[async_trait]
impl AvatarCache for PrefixAvatars {
    async fn cache(&self, user_id: &str, original_url: &str) -> String {
        if original_url.is_empty() {
            return String::new();
        }
        format!("https://storage.example/avatars/{user_id}.jpg")
    }
}

// ---------------------------------------------------------------------------
// Engine assembly
// ---------------------------------------------------------------------------

pub struct Harness {
    pub db: Arc<MemoryDb>,
    pub search: Arc<FakeSearch>,
    pub profiles: Arc<FakeProfiles>,
    pub personality_calls: Arc<AtomicUsize>,
    pub engine: DiscoveryEngine,
}

pub struct HarnessBuilder {
    pub config: EngineConfig,
    pub trends: Result<Vec<String>, String>,
    pub relevant: Option<Vec<String>>,
    pub reject_handles: Vec<String>,
    pub search: FakeSearch,
    pub profiles: FakeProfiles,
    pub avatars: bool,
    pub db: Arc<MemoryDb>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                inter_request_delay: Duration::ZERO,
                fetch_profile_in_discovery: false,
                ..EngineConfig::default()
            },
            trends: Ok(Vec::new()),
            relevant: None,
            reject_handles: Vec::new(),
            search: FakeSearch::default(),
            profiles: FakeProfiles::default(),
            avatars: false,
            db: MemoryDb::new(),
        }
    }

    pub fn trends(mut self, trends: &[&str]) -> Self {
        self.trends = Ok(trends.iter().map(|t| (*t).to_string()).collect());
        self
    }

    pub fn build(self) -> Harness {
        let personality_calls = Arc::new(AtomicUsize::new(0));
        let ai = ScriptedAi {
            relevant: self.relevant,
            reject_handles: self.reject_handles,
            personality_calls: Arc::clone(&personality_calls),
        };
        let providers: Vec<Box<dyn InferenceProvider>> = vec![Box::new(ai)];
        let classifier = Classifier::new(providers).with_personality_check(true);

        let search = Arc::new(self.search);
        let profiles = Arc::new(self.profiles);
        let avatars: Option<Arc<dyn AvatarCache>> = if self.avatars {
            Some(Arc::new(PrefixAvatars))
        } else {
            None
        };
        let deps = Collaborators {
            trends: Arc::new(FakeTrends(self.trends)),
            videos: Arc::clone(&search) as Arc<dyn VideoSearch>,
            profiles: Arc::clone(&profiles) as Arc<dyn ProfileFetcher>,
            classifier: Arc::new(classifier),
            stores: Arc::new(MemoryStoreSource {
                db: Arc::clone(&self.db),
            }),
            avatars,
        };
        Harness {
            db: self.db,
            search,
            profiles,
            personality_calls,
            engine: DiscoveryEngine::new(self.config, deps),
        }
    }
}
