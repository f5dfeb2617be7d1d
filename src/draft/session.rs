// The draft session state machine.
//
// All mutation for one league's draft flows through a single-writer task:
// pick commands (with oneshot replies) and clock events land in the same
// select loop, so exactly one mutation is applied at a time and the
// human-pick/auto-pick race resolves to whichever reaches the queue first.
// Reads never touch the task — an immutable snapshot is republished through
// a watch channel after every mutation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::clock::{ClockEvent, DraftClock};
use super::order::PickSlot;
use super::DraftError;
use crate::catalog::DraftCatalog;
use crate::db::Database;
use crate::hub::BroadcastHub;
use crate::model::{AcquisitionType, LeagueStatus};
use crate::protocol::ServerEvent;

/// Session lifecycle. `Waiting` exists only between construction and the
/// driver's first iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Waiting,
    Active,
    Completed,
    Aborted,
}

/// One fulfilled pick in the session ledger. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub pick_number: u32,
    pub round: u32,
    pub team_id: i64,
    /// None for a skipped pick (auto-pick with an empty pool).
    pub movie_id: Option<i64>,
    pub movie_title: Option<String>,
    pub poster_url: Option<String>,
    pub acquisition: AcquisitionType,
    pub skipped: bool,
    pub fulfilled_at: DateTime<Utc>,
}

/// Immutable view of a draft session, published after every mutation and
/// embedded in `status_update` events for client resync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub league_id: i64,
    pub phase: SessionPhase,
    pub current_pick_number: Option<u32>,
    pub on_clock_team: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
    pub total_picks: u32,
    pub ledger: Vec<LedgerEntry>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub league_id: i64,
    /// Per-pick window; comes from `[draft].pick_seconds`.
    pub pick_window: Duration,
}

enum Command {
    Pick {
        team_id: i64,
        movie_id: i64,
        reply: oneshot::Sender<Result<LedgerEntry, DraftError>>,
    },
    Abort {
        reply: oneshot::Sender<bool>,
    },
}

/// Handle to a running draft session. Cheap to clone via `Arc`; the actual
/// state lives in the driver task.
#[derive(Debug)]
pub struct DraftSession {
    league_id: i64,
    cmd_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<Arc<DraftSnapshot>>,
    done_rx: watch::Receiver<bool>,
}

impl DraftSession {
    /// Spawn the driver task for one league's draft. The session starts on
    /// the clock immediately.
    pub fn spawn(
        config: SessionConfig,
        slots: Vec<PickSlot>,
        catalog: DraftCatalog,
        db: Arc<Database>,
        hub: BroadcastHub,
    ) -> Arc<Self> {
        let league_id = config.league_id;
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (clock_tx, clock_rx) = mpsc::channel(64);

        let initial = Arc::new(DraftSnapshot {
            league_id,
            phase: SessionPhase::Waiting,
            current_pick_number: slots.first().map(|s| s.pick_number),
            on_clock_team: slots.first().map(|s| s.team_id),
            deadline: None,
            total_picks: slots.len() as u32,
            ledger: Vec::new(),
        });
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let (done_tx, done_rx) = watch::channel(false);

        let driver = Driver {
            league_id,
            pick_window: config.pick_window,
            slots,
            cursor: 0,
            ledger: Vec::new(),
            phase: SessionPhase::Waiting,
            deadline: None,
            drafted: HashSet::new(),
            catalog,
            clock: DraftClock::new(clock_tx),
            db,
            hub,
            snapshot_tx,
        };
        tokio::spawn(driver.run(cmd_rx, clock_rx, done_tx));

        Arc::new(DraftSession {
            league_id,
            cmd_tx,
            snapshot_rx,
            done_rx,
        })
    }

    pub fn league_id(&self) -> i64 {
        self.league_id
    }

    /// Current immutable snapshot. Never blocks the driver.
    pub fn snapshot(&self) -> Arc<DraftSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Submit a pick for the team believed to be on the clock.
    pub async fn make_pick(&self, team_id: i64, movie_id: i64) -> Result<LedgerEntry, DraftError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Pick {
                team_id,
                movie_id,
                reply,
            })
            .await
            .map_err(|_| DraftError::DraftNotActive {
                league_id: self.league_id,
            })?;
        rx.await.map_err(|_| DraftError::DraftNotActive {
            league_id: self.league_id,
        })?
    }

    /// Abort the draft. Returns false when the session had already left the
    /// active phase.
    pub async fn abort(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Abort { reply }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub fn is_finished(&self) -> bool {
        *self.done_rx.borrow()
    }

    /// Resolve once the driver has left `Waiting` (clock armed, first
    /// snapshot published).
    pub async fn started(&self) {
        let mut rx = self.snapshot_rx.clone();
        while rx.borrow_and_update().phase == SessionPhase::Waiting {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Resolve once the driver has torn down (completed or aborted).
    pub async fn finished(&self) {
        let mut rx = self.done_rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Driver: owns every mutable piece of one draft
// ---------------------------------------------------------------------------

struct Driver {
    league_id: i64,
    pick_window: Duration,
    slots: Vec<PickSlot>,
    cursor: usize,
    ledger: Vec<LedgerEntry>,
    phase: SessionPhase,
    deadline: Option<DateTime<Utc>>,
    drafted: HashSet<i64>,
    catalog: DraftCatalog,
    clock: DraftClock,
    db: Arc<Database>,
    hub: BroadcastHub,
    snapshot_tx: watch::Sender<Arc<DraftSnapshot>>,
}

impl Driver {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut clock_rx: mpsc::Receiver<ClockEvent>,
        done_tx: watch::Sender<bool>,
    ) {
        info!(
            league_id = self.league_id,
            total_picks = self.slots.len(),
            "draft session starting"
        );

        if self.slots.is_empty() {
            self.phase = SessionPhase::Completed;
            self.publish_snapshot();
        } else {
            self.phase = SessionPhase::Active;
            self.arm_clock();
            self.publish_snapshot();
            self.hub.publish(
                self.league_id,
                ServerEvent::StatusUpdate {
                    state: self.build_snapshot(),
                },
            );
        }

        while self.phase == SessionPhase::Active {
            tokio::select! {
                maybe_cmd = cmd_rx.recv() => match maybe_cmd {
                    Some(Command::Pick { team_id, movie_id, reply }) => {
                        let result = self.apply_human_pick(team_id, movie_id).await;
                        let _ = reply.send(result);
                    }
                    Some(Command::Abort { reply }) => {
                        let aborted = self.apply_abort();
                        let _ = reply.send(aborted);
                    }
                    None => {
                        // Every handle dropped; nothing can drive this draft
                        // any further.
                        self.apply_abort();
                    }
                },
                Some(event) = clock_rx.recv() => match event {
                    ClockEvent::Tick { seconds_remaining } => {
                        self.hub.publish(
                            self.league_id,
                            ServerEvent::TimerUpdate { seconds_remaining },
                        );
                    }
                    ClockEvent::Expired { epoch } => {
                        if epoch == self.clock.current_epoch() {
                            self.apply_auto_pick().await;
                        } else {
                            // A pick committed while this expiry was in
                            // flight; the re-arm bumped the epoch.
                            debug!(
                                league_id = self.league_id,
                                epoch, "discarding stale clock expiry"
                            );
                        }
                    }
                },
            }
        }

        // Reject any commands that raced with completion so callers get a
        // definitive answer instead of a dropped reply.
        cmd_rx.close();
        while let Ok(cmd) = cmd_rx.try_recv() {
            if let Command::Pick { reply, .. } = cmd {
                let _ = reply.send(Err(DraftError::DraftNotActive {
                    league_id: self.league_id,
                }));
            }
        }

        let _ = done_tx.send(true);
        info!(
            league_id = self.league_id,
            phase = ?self.phase,
            picks = self.ledger.len(),
            "draft session finished"
        );
    }

    async fn apply_human_pick(
        &mut self,
        team_id: i64,
        movie_id: i64,
    ) -> Result<LedgerEntry, DraftError> {
        if self.phase != SessionPhase::Active {
            return Err(DraftError::DraftNotActive {
                league_id: self.league_id,
            });
        }
        let slot = self.slots[self.cursor];
        if slot.team_id != team_id {
            return Err(DraftError::NotOnClock { team_id });
        }
        let available = self
            .catalog
            .get(movie_id)
            .map(|e| e.draftable && !self.drafted.contains(&movie_id))
            .unwrap_or(false);
        if !available {
            return Err(DraftError::MovieUnavailable { movie_id });
        }

        Ok(self
            .fulfill_current(Some(movie_id), AcquisitionType::Draft)
            .await)
    }

    async fn apply_auto_pick(&mut self) {
        if self.phase != SessionPhase::Active {
            debug!(league_id = self.league_id, "expiry after draft left active phase");
            return;
        }
        match self.catalog.best_available(&self.drafted).map(|e| e.movie_id) {
            Some(movie_id) => {
                info!(
                    league_id = self.league_id,
                    pick_number = self.slots[self.cursor].pick_number,
                    movie_id,
                    "pick window expired, auto-picking"
                );
                self.fulfill_current(Some(movie_id), AcquisitionType::Auto)
                    .await;
            }
            None => {
                // Should not happen when draft start verified the catalog
                // covers every slot; recorded as a flagged skip either way.
                warn!(
                    league_id = self.league_id,
                    pick_number = self.slots[self.cursor].pick_number,
                    "no movie available for auto-pick, skipping pick"
                );
                self.fulfill_current(None, AcquisitionType::Auto).await;
            }
        }
    }

    /// Fulfill the pick on the clock. One atomic mutation: ledger append,
    /// availability update, pointer advance, clock re-arm/cancel, snapshot
    /// republish — then persist and broadcast, still serialized in this
    /// task so broadcasts can never reorder against commits.
    async fn fulfill_current(
        &mut self,
        movie_id: Option<i64>,
        acquisition: AcquisitionType,
    ) -> LedgerEntry {
        let slot = self.slots[self.cursor];
        let (movie_title, poster_url) = match movie_id.and_then(|id| self.catalog.get(id)) {
            Some(entry) => (Some(entry.title.clone()), Some(entry.poster_url.clone())),
            None => (None, None),
        };
        let entry = LedgerEntry {
            pick_number: slot.pick_number,
            round: slot.round,
            team_id: slot.team_id,
            movie_id,
            movie_title,
            poster_url,
            acquisition,
            skipped: movie_id.is_none(),
            fulfilled_at: Utc::now(),
        };

        if let Some(id) = movie_id {
            self.drafted.insert(id);
        }
        self.ledger.push(entry.clone());
        self.cursor += 1;

        let completed = self.cursor >= self.slots.len();
        let next = if completed {
            self.phase = SessionPhase::Completed;
            self.deadline = None;
            self.clock.cancel();
            None
        } else {
            let next_slot = self.slots[self.cursor];
            self.arm_clock();
            Some((next_slot.pick_number, next_slot.team_id))
        };

        self.publish_snapshot();

        self.persist_pick(&entry).await;
        if completed {
            self.persist_league_active().await;
        }

        self.hub.publish(
            self.league_id,
            ServerEvent::pick_made(&entry, next, self.deadline),
        );
        if completed {
            self.hub.publish(
                self.league_id,
                ServerEvent::DraftComplete {
                    league_id: self.league_id,
                },
            );
        }

        entry
    }

    fn apply_abort(&mut self) -> bool {
        if self.phase != SessionPhase::Active {
            return false;
        }
        warn!(
            league_id = self.league_id,
            fulfilled = self.ledger.len(),
            total = self.slots.len(),
            "draft aborted"
        );
        self.phase = SessionPhase::Aborted;
        self.deadline = None;
        self.clock.cancel();
        self.publish_snapshot();
        self.hub.publish(
            self.league_id,
            ServerEvent::StatusUpdate {
                state: self.build_snapshot(),
            },
        );
        true
    }

    fn arm_clock(&mut self) {
        self.deadline =
            Some(Utc::now() + chrono::Duration::milliseconds(self.pick_window.as_millis() as i64));
        self.clock.arm(self.pick_window);
    }

    fn build_snapshot(&self) -> DraftSnapshot {
        let current = self.slots.get(self.cursor);
        DraftSnapshot {
            league_id: self.league_id,
            phase: self.phase,
            current_pick_number: current.map(|s| s.pick_number),
            on_clock_team: current.map(|s| s.team_id),
            deadline: self.deadline,
            total_picks: self.slots.len() as u32,
            ledger: self.ledger.clone(),
        }
    }

    fn publish_snapshot(&self) {
        let _ = self.snapshot_tx.send(Arc::new(self.build_snapshot()));
    }

    /// Persist a committed pick with bounded retry. The in-memory ledger is
    /// authoritative for the live draft; a store that stays down gets the
    /// error log, not a rollback.
    async fn persist_pick(&self, entry: &LedgerEntry) {
        const ATTEMPTS: u32 = 3;
        for attempt in 1..=ATTEMPTS {
            match self.db.persist_fulfilled_pick(
                self.league_id,
                entry.pick_number,
                entry.team_id,
                entry.movie_id,
                entry.acquisition,
                entry.fulfilled_at,
            ) {
                Ok(()) => return,
                Err(e) if attempt < ATTEMPTS => {
                    warn!(
                        league_id = self.league_id,
                        pick_number = entry.pick_number,
                        attempt,
                        "pick persistence failed, retrying: {e:#}"
                    );
                    tokio::time::sleep(Duration::from_millis(50 * attempt as u64)).await;
                }
                Err(e) => {
                    error!(
                        league_id = self.league_id,
                        pick_number = entry.pick_number,
                        "pick persistence failed after {ATTEMPTS} attempts: {e:#}"
                    );
                }
            }
        }
    }

    async fn persist_league_active(&self) {
        const ATTEMPTS: u32 = 3;
        for attempt in 1..=ATTEMPTS {
            match self
                .db
                .set_league_status(self.league_id, LeagueStatus::Active)
            {
                Ok(()) => return,
                Err(e) if attempt < ATTEMPTS => {
                    warn!(
                        league_id = self.league_id,
                        attempt, "league status update failed, retrying: {e:#}"
                    );
                    tokio::time::sleep(Duration::from_millis(50 * attempt as u64)).await;
                }
                Err(e) => {
                    error!(
                        league_id = self.league_id,
                        "league status update failed after {ATTEMPTS} attempts: {e:#}"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::order::build_order;
    use crate::model::{Movie, MovieStatus};
    use crate::scoring::projection::BudgetHeuristic;

    fn upcoming_movie(id: i64, budget: f64) -> Movie {
        Movie {
            id,
            tmdb_id: id * 1000,
            title: format!("Movie {id}"),
            release_date: None,
            poster_url: format!("https://img.example/{id}.jpg"),
            budget,
            domestic_gross: 0.0,
            worldwide_gross: 0.0,
            opening_weekend_gross: 0.0,
            rt_score: 0.0,
            number_one_opening: false,
            status: MovieStatus::Upcoming,
        }
    }

    fn catalog_of(count: i64) -> DraftCatalog {
        // Budgets descend with id so movie 1 has the highest projection.
        let movies: Vec<Movie> = (1..=count)
            .map(|id| upcoming_movie(id, (count - id + 1) as f64 * 10_000_000.0))
            .collect();
        DraftCatalog::from_movies(&movies, &BudgetHeuristic)
    }

    fn test_session(
        league_id: i64,
        team_ids: &[i64],
        rounds: u32,
        movies: i64,
        window: Duration,
    ) -> Arc<DraftSession> {
        let db = Arc::new(Database::open(":memory:").unwrap());
        let hub = BroadcastHub::new(64);
        DraftSession::spawn(
            SessionConfig {
                league_id,
                pick_window: window,
            },
            build_order(team_ids, rounds),
            catalog_of(movies),
            db,
            hub,
        )
    }

    const LONG: Duration = Duration::from_secs(600);

    #[tokio::test(start_paused = true)]
    async fn out_of_turn_pick_is_rejected_without_mutation() {
        let session = test_session(1, &[10, 20], 1, 4, LONG);
        // Let the driver arm itself.
        tokio::task::yield_now().await;
        let before = session.snapshot();

        let err = session.make_pick(20, 1).await.unwrap_err();
        assert_eq!(err, DraftError::NotOnClock { team_id: 20 });

        let after = session.snapshot();
        assert_eq!(*before, *after);
        assert!(after.ledger.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn valid_pick_advances_and_locks_the_movie() {
        let session = test_session(1, &[10, 20], 1, 4, LONG);

        let entry = session.make_pick(10, 3).await.unwrap();
        assert_eq!(entry.pick_number, 1);
        assert_eq!(entry.movie_id, Some(3));
        assert_eq!(entry.acquisition, AcquisitionType::Draft);

        let snap = session.snapshot();
        assert_eq!(snap.current_pick_number, Some(2));
        assert_eq!(snap.on_clock_team, Some(20));
        assert_eq!(snap.ledger.len(), 1);

        // Same movie again: rejected, ledger untouched.
        let err = session.make_pick(20, 3).await.unwrap_err();
        assert_eq!(err, DraftError::MovieUnavailable { movie_id: 3 });
        assert_eq!(session.snapshot().ledger.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_movie_is_unavailable() {
        let session = test_session(1, &[10, 20], 1, 4, LONG);
        let err = session.make_pick(10, 999).await.unwrap_err();
        assert_eq!(err, DraftError::MovieUnavailable { movie_id: 999 });
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_auto_picks_highest_projection() {
        let session = test_session(1, &[10, 20], 1, 4, Duration::from_secs(5));

        // Nobody picks; the window runs out.
        session.finished().await;

        let snap = session.snapshot();
        assert_eq!(snap.phase, SessionPhase::Completed);
        assert_eq!(snap.ledger.len(), 2);
        // Movie 1 has the highest budget-derived projection, then movie 2.
        assert_eq!(snap.ledger[0].movie_id, Some(1));
        assert_eq!(snap.ledger[0].acquisition, AcquisitionType::Auto);
        assert_eq!(snap.ledger[1].movie_id, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_pool_records_flagged_skip() {
        // Two slots, only one draftable movie.
        let session = test_session(1, &[10, 20], 1, 1, Duration::from_secs(5));

        let entry = session.make_pick(10, 1).await.unwrap();
        assert!(!entry.skipped);

        session.finished().await;
        let snap = session.snapshot();
        assert_eq!(snap.phase, SessionPhase::Completed);
        assert_eq!(snap.ledger.len(), 2);
        assert!(snap.ledger[1].skipped);
        assert_eq!(snap.ledger[1].movie_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_fixes_rosters_and_updates_league() {
        let db = Arc::new(Database::open(":memory:").unwrap());
        let hub = BroadcastHub::new(64);
        let league_id = db.create_league("L", 2025).unwrap();
        let t1 = db.add_team(league_id, "A").unwrap();
        let t2 = db.add_team(league_id, "B").unwrap();
        db.set_league_status(league_id, LeagueStatus::Drafting)
            .unwrap();

        let movies: Vec<Movie> = (1..=4)
            .map(|i| upcoming_movie(i, 10_000_000.0 * i as f64))
            .collect();
        let mut movie_ids = Vec::new();
        for m in &movies {
            movie_ids.push(db.insert_movie(m).unwrap());
        }
        let slots = build_order(&[t1, t2], 1);
        db.insert_pick_slots(league_id, &slots).unwrap();

        let catalog = DraftCatalog::from_movies(
            &db.all_movies().unwrap(),
            &BudgetHeuristic,
        );
        let session = DraftSession::spawn(
            SessionConfig {
                league_id,
                pick_window: LONG,
            },
            slots,
            catalog,
            Arc::clone(&db),
            hub,
        );

        session.make_pick(t1, movie_ids[0]).await.unwrap();
        session.make_pick(t2, movie_ids[1]).await.unwrap();
        session.finished().await;

        assert!(session.is_finished());
        assert_eq!(session.snapshot().phase, SessionPhase::Completed);

        // Committed picks and the league transition landed in the store.
        let picks = db.league_picks(league_id).unwrap();
        assert_eq!(picks.len(), 2);
        assert!(picks.iter().all(|p| p.fulfilled_at.is_some()));
        assert_eq!(
            db.league(league_id).unwrap().unwrap().status,
            LeagueStatus::Active
        );
        assert_eq!(db.team_roster(t1).unwrap().len(), 1);
        assert_eq!(db.team_roster(t2).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn picks_after_completion_are_rejected() {
        let session = test_session(1, &[10, 20], 1, 4, LONG);
        session.make_pick(10, 1).await.unwrap();
        session.make_pick(20, 2).await.unwrap();
        session.finished().await;

        let err = session.make_pick(10, 3).await.unwrap_err();
        assert_eq!(err, DraftError::DraftNotActive { league_id: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn race_commits_exactly_one_pick_per_slot() {
        // A short window so the expiry and the human pick contend for
        // slot 1. Whichever reaches the command queue first wins; the
        // ledger must contain exactly one entry for pick 1 either way.
        let session = test_session(1, &[10, 20], 1, 4, Duration::from_millis(10));

        let human = session.make_pick(10, 3).await;

        let snap = session.snapshot();
        let for_pick_1: Vec<&LedgerEntry> = snap
            .ledger
            .iter()
            .filter(|e| e.pick_number == 1)
            .collect();
        assert_eq!(for_pick_1.len(), 1);
        match &human {
            Ok(entry) => {
                assert_eq!(entry.movie_id, Some(3));
                assert_eq!(for_pick_1[0].acquisition, AcquisitionType::Draft);
            }
            Err(e) => {
                // Auto-pick won; the human request was rejected, not lost.
                assert!(matches!(
                    e,
                    DraftError::NotOnClock { .. }
                        | DraftError::DraftNotActive { .. }
                        | DraftError::MovieUnavailable { .. }
                ));
                assert_eq!(for_pick_1[0].acquisition, AcquisitionType::Auto);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_the_draft() {
        let session = test_session(1, &[10, 20], 2, 8, LONG);
        session.make_pick(10, 1).await.unwrap();

        assert!(session.abort().await);
        session.finished().await;

        let snap = session.snapshot();
        assert_eq!(snap.phase, SessionPhase::Aborted);
        assert_eq!(snap.ledger.len(), 1);

        let err = session.make_pick(20, 2).await.unwrap_err();
        assert_eq!(err, DraftError::DraftNotActive { league_id: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn events_fan_out_in_commit_order() {
        let db = Arc::new(Database::open(":memory:").unwrap());
        let hub = BroadcastHub::new(64);
        let (_conn, mut rx) = hub.subscribe(1);

        let session = DraftSession::spawn(
            SessionConfig {
                league_id: 1,
                pick_window: LONG,
            },
            build_order(&[10, 20], 1),
            catalog_of(4),
            db,
            hub,
        );

        session.make_pick(10, 2).await.unwrap();
        session.make_pick(20, 1).await.unwrap();
        session.finished().await;

        // First event is the initial status_update, then picks in commit
        // order, then draft_complete.
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push((*event).clone());
        }
        assert!(matches!(kinds[0], ServerEvent::StatusUpdate { .. }));
        assert!(
            matches!(kinds[1], ServerEvent::PickMade { pick_number: 1, movie_id: Some(2), .. })
        );
        assert!(
            matches!(kinds[2], ServerEvent::PickMade { pick_number: 2, movie_id: Some(1), .. })
        );
        assert!(matches!(kinds[3], ServerEvent::DraftComplete { league_id: 1 }));
    }
}
